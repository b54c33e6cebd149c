//! Command Line Interface (CLI) arguments.

use clap::Parser;

use crate::config::{PipelineConfig, DEFAULT_RESOLUTION};
use crate::models::Scenario;

/// Rainfall indices command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// Path to the observational gridded dataset
    #[arg(
        long,
        env = "RAINFALL_INDICES_OBSERVED",
        required_unless_present = "demo"
    )]
    pub observed: Option<String>,
    /// Path to the climate model projection gridded dataset
    #[arg(
        long,
        env = "RAINFALL_INDICES_PROJECTION",
        required_unless_present = "demo"
    )]
    pub projection: Option<String>,
    /// Path to which the JSON report is written. Defaults to stdout.
    #[arg(long, env = "RAINFALL_INDICES_OUTPUT")]
    pub output: Option<String>,
    /// Target grid resolution in degrees
    #[arg(long, default_value_t = DEFAULT_RESOLUTION, env = "RAINFALL_INDICES_RESOLUTION")]
    pub resolution: f64,
    /// Months of the season, comma separated
    #[arg(
        long,
        default_value = "6,7,8,9",
        value_delimiter = ',',
        env = "RAINFALL_INDICES_SEASON_MONTHS"
    )]
    pub season_months: Vec<u32>,
    /// Scenario label of the projection
    #[arg(
        long,
        default_value = "SSP5-8.5",
        value_parser = parse_scenario,
        env = "RAINFALL_INDICES_SCENARIO"
    )]
    pub scenario: Scenario,
    /// Baseline period label
    #[arg(long, default_value = "1990-2019", env = "RAINFALL_INDICES_BASELINE_PERIOD")]
    pub baseline_period: String,
    /// Projection year label
    #[arg(long, default_value = "2050", env = "RAINFALL_INDICES_PROJECTION_YEAR")]
    pub projection_year: String,
    /// Generate synthetic input data instead of reading files
    #[arg(long, default_value_t = false, env = "RAINFALL_INDICES_DEMO")]
    pub demo: bool,
    /// Seed for synthetic data
    #[arg(long, default_value_t = 42, env = "RAINFALL_INDICES_DEMO_SEED")]
    pub demo_seed: u64,
    /// Grid spacing of synthetic data in degrees
    #[arg(long, default_value_t = 1.0, env = "RAINFALL_INDICES_DEMO_RESOLUTION")]
    pub demo_resolution: f64,
}

impl CommandLineArgs {
    /// Return the pipeline configuration described by the arguments.
    ///
    /// The configuration is not validated here.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            resolution: self.resolution,
            season_months: self.season_months.clone(),
            scenario: self.scenario,
            baseline_period: self.baseline_period.clone(),
            projection_year: self.projection_year.clone(),
        }
    }
}

fn parse_scenario(value: &str) -> Result<Scenario, String> {
    [Scenario::Ssp245, Scenario::Ssp585]
        .into_iter()
        .find(|s| s.to_string().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("expected SSP2-4.5 or SSP5-8.5, got {value}"))
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

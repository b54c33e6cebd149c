//! Pipeline orchestration.
//!
//! Stages run strictly in sequence, each consuming the complete output of the previous one:
//! regridding, seasonal aggregation, index computation, then ensemble and regional statistics.

use tracing::{info, info_span};

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::ensemble;
use crate::error::{PipelineError, PipelineResult};
use crate::indices::IndexEngine;
use crate::models::{AnalysisReport, Source};
use crate::regional;
use crate::regrid;
use crate::seasonal;

/// Runs every pipeline stage with a fixed configuration
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    engine: IndexEngine,
}

impl Pipeline {
    /// Return a new Pipeline using the default index engine.
    ///
    /// Fails if `config` is invalid.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        Ok(Pipeline {
            config: config.validated()?,
            engine: IndexEngine::default(),
        })
    }

    /// Replace the index engine.
    pub fn with_engine(self, engine: IndexEngine) -> Self {
        Pipeline { engine, ..self }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline on loaded observational and projection datasets.
    ///
    /// Indices are computed from the projection's seasonal series.
    #[tracing::instrument(level = "DEBUG", skip_all)]
    pub fn run(&self, observed: &Dataset, projection: &Dataset) -> PipelineResult<AnalysisReport> {
        let config = &self.config;
        let pair = info_span!("regrid", resolution = config.resolution)
            .in_scope(|| regrid::regrid(observed, projection, config.resolution))?;
        info!(
            lat = pair.lat.len(),
            lon = pair.lon.len(),
            "Regridded to common grid"
        );

        let mut seasonal = info_span!("seasonal")
            .in_scope(|| seasonal::aggregate(&pair, &config.season_months))?;
        let series = seasonal
            .remove(&Source::Projection)
            .ok_or_else(|| PipelineError::Aggregate {
                operation: "calculating seasonal totals",
                reason: "no projection series".to_string(),
            })?;
        info!(season = %series.season, months = %series.months, "Calculated seasonal totals");

        let index_set = info_span!("indices").in_scope(|| {
            self.engine
                .compute(&series.fields, config.scenario, &config.baseline_period)
        })?;
        info!(variable = %index_set.variable, "Calculated rainfall indices");

        let ensemble = info_span!("ensemble").in_scope(|| {
            ensemble::summarize(&index_set, config.scenario, &config.projection_year)
        })?;
        info!(
            mean_change = ensemble.summary.mean_change,
            confidence_level = ensemble.summary.confidence_level,
            "Completed ensemble analysis"
        );

        let regional = info_span!("regional").in_scope(|| regional::regional_stats(&index_set));
        Ok(AnalysisReport {
            index_set,
            ensemble,
            regional,
        })
    }
}

//! This file defines the rainfall-indices binary entry point.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use expanduser::expanduser;
use tracing::info;

use rainfall_indices::cli::{self, CommandLineArgs};
use rainfall_indices::dataset::Dataset;
use rainfall_indices::demo::{DemoGenerator, OBSERVED_YEARS, PROJECTION_YEARS};
use rainfall_indices::error::{ErrorReport, PipelineError, PipelineResult};
use rainfall_indices::loader;
use rainfall_indices::models::AnalysisReport;
use rainfall_indices::pipeline::Pipeline;

const LOAD_OPERATION: &str = "loading gridded data";
const OUTPUT_OPERATION: &str = "writing the analysis report";

/// Load a dataset from a user supplied path, expanding `~`.
fn load(path: Option<&str>) -> PipelineResult<Dataset> {
    let path = path.ok_or_else(|| PipelineError::format(LOAD_OPERATION, "no input path given"))?;
    let path: PathBuf =
        expanduser(path).map_err(|err| PipelineError::load(LOAD_OPERATION, err))?;
    loader::load_path(&path)
}

/// Return the observed and projection datasets.
fn inputs(args: &CommandLineArgs) -> PipelineResult<(Dataset, Dataset)> {
    if args.demo {
        info!(seed = args.demo_seed, "Generating synthetic data");
        let mut generator = DemoGenerator::new(args.demo_seed, args.demo_resolution);
        let observed = generator.observed(OBSERVED_YEARS)?;
        let projection = generator.projection(args.scenario, PROJECTION_YEARS)?;
        Ok((observed, projection))
    } else {
        Ok((
            load(args.observed.as_deref())?,
            load(args.projection.as_deref())?,
        ))
    }
}

fn write_report(report: &AnalysisReport, output: Option<&str>) -> PipelineResult<()> {
    let to_output = |err| PipelineError::Output {
        operation: OUTPUT_OPERATION,
        source: err,
    };
    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let path = expanduser(path).map_err(to_output)?;
            Box::new(File::create(path).map_err(to_output)?)
        }
        None => Box::new(io::stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut writer, report).map_err(|err| to_output(err.into()))?;
    writeln!(writer).map_err(to_output)
}

fn run(args: &CommandLineArgs) -> PipelineResult<()> {
    let pipeline = Pipeline::new(args.pipeline_config())?;
    let (observed, projection) = inputs(args)?;
    let report = pipeline.run(&observed, &projection)?;
    write_report(&report, args.output.as_deref())?;
    info!("Analysis complete");
    Ok(())
}

/// Application entry point
fn main() {
    let args = cli::parse();
    rainfall_indices::tracing::init_tracing();
    if let Err(error) = run(&args) {
        let report = ErrorReport::from(&error);
        match serde_json::to_string_pretty(&report) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{error}"),
        }
        std::process::exit(1);
    }
}

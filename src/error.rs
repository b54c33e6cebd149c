//! Error handling.

use std::collections::BTreeMap;

use ndarray::ShapeError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

use crate::models::{IndexName, IndexStatistics};

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Underlying cause of a failure to read a gridded dataset.
#[derive(Debug, Error)]
pub enum LoadCause {
    /// Error reading the file or stream
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error parsing the JSON dataset format
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Error opening or reading a NetCDF file
    #[cfg(feature = "netcdf")]
    #[error(transparent)]
    Netcdf(#[from] netcdf::Error),

    /// Data does not fit the declared dimensions
    #[error("failed to create array from shape")]
    Shape(#[from] ShapeError),

    /// The dataset is readable but structurally invalid
    #[error("{0}")]
    Format(String),
}

/// Pipeline error type
///
/// This type encapsulates the various errors that may occur in each stage of the pipeline.
/// Every variant renders as `Error <doing X>: <cause>`, where `operation` names the stage and
/// sub-operation that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unreadable or unparseable input file
    #[error("Error {operation}: {source}")]
    Load {
        operation: &'static str,
        #[source]
        source: LoadCause,
    },

    /// Unresolvable coordinates or non-overlapping grids
    #[error("Error {operation}: {reason}")]
    Regrid {
        operation: &'static str,
        reason: String,
    },

    /// Seasonal aggregation could not produce any yearly totals
    #[error("Error {operation}: {reason}")]
    Aggregate {
        operation: &'static str,
        reason: String,
    },

    /// A dataset declares no data variables
    #[error("Error {operation}: dataset declares no data variables")]
    VariableNotFound { operation: &'static str },

    /// A required index is absent or entirely missing
    ///
    /// `statistics` holds the per-index results that could still be computed.
    #[error("Error {operation}: {reason}")]
    Ensemble {
        operation: &'static str,
        reason: String,
        statistics: BTreeMap<IndexName, IndexStatistics>,
    },

    /// Inputs to a supplementary analysis are inconsistent
    #[error("Error {operation}: {reason}")]
    Analysis {
        operation: &'static str,
        reason: String,
    },

    /// Error validating the pipeline configuration
    #[error("Error validating configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    /// Error writing the analysis report
    #[error("Error {operation}: {source}")]
    Output {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Return a load error for `operation` caused by `source`.
    pub fn load(operation: &'static str, source: impl Into<LoadCause>) -> Self {
        Self::Load {
            operation,
            source: source.into(),
        }
    }

    /// Return a load error for a structurally invalid dataset.
    pub fn format(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::load(operation, LoadCause::Format(reason.into()))
    }

    /// Return a regrid error.
    pub fn regrid(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Regrid {
            operation,
            reason: reason.into(),
        }
    }

    /// Return an analysis error.
    pub fn analysis(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Analysis {
            operation,
            reason: reason.into(),
        }
    }
}

/// Serialisable description of an error and its causes
///
/// This is what the presentation layer displays when a pipeline stage fails.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorReport {
    /// Main error message
    pub message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<Vec<String>>,
}

impl ErrorReport {
    /// Return a new ErrorReport
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    pub fn new<E>(error: &E) -> Self
    where
        E: std::error::Error,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorReport { message, caused_by }
    }
}

impl From<&PipelineError> for ErrorReport {
    /// Convert from a `PipelineError` into an `ErrorReport`, logging it on the way.
    fn from(error: &PipelineError) -> Self {
        event!(Level::ERROR, "{}", error.to_string());
        let mut current = error.source();
        while let Some(source) = current {
            event!(Level::ERROR, "Caused by: {}", source.to_string());
            current = source.source();
        }
        ErrorReport::new(error)
    }
}

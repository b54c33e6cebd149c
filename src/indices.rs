//! Index engine.
//!
//! Selects the rainfall variable of a series, normalises it to mm/day and computes every index in
//! [IndexName::ALL].

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView3};
use tracing::debug;

use crate::coords::{self, RAINFALL_ALIASES};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{GriddedField, IndexName, IndexSet, Scenario, SpatialField, TimeAxis};
use crate::operation::IndexOperation;
use crate::operations;
use crate::units::{FluxDetector, MagnitudeFallback, Units, SECONDS_PER_DAY};

const OPERATION: &str = "calculating rainfall indices";

/// Execute the operation for one index.
fn execute(index: IndexName, series: ArrayView3<f64>, time: &TimeAxis) -> Array2<f64> {
    match index {
        IndexName::Prcptot => operations::Prcptot::execute(series, time),
        IndexName::Rx1day => operations::Rx1day::execute(series, time),
        IndexName::Rx5day => operations::Rx5day::execute(series, time),
        IndexName::HeavyRainDays => operations::HeavyRainDays::execute(series, time),
        IndexName::Cdd => operations::Cdd::execute(series, time),
        IndexName::Cwd => operations::Cwd::execute(series, time),
        IndexName::Sdii => operations::Sdii::execute(series, time),
    }
}

/// Pick the rainfall field from a series.
///
/// The first field whose variable name matches a rainfall alias wins; otherwise the first field is
/// assumed to be rainfall.
pub fn select_rainfall(fields: &[GriddedField]) -> PipelineResult<&GriddedField> {
    let names = fields.iter().filter_map(|f| f.variable.as_deref());
    let selected = coords::resolve(names, &RAINFALL_ALIASES)
        .and_then(|name| fields.iter().find(|f| f.variable.as_deref() == Some(name)));
    match selected {
        Some(field) => Ok(field),
        None => {
            let field = fields.first().ok_or(PipelineError::VariableNotFound {
                operation: OPERATION,
            })?;
            debug!(variable = ?field.variable, "No rainfall alias matched; using first variable");
            Ok(field)
        }
    }
}

/// Computes precipitation indices using a pluggable unit detection strategy.
#[derive(Debug)]
pub struct IndexEngine {
    detector: Box<dyn FluxDetector>,
}

impl Default for IndexEngine {
    fn default() -> Self {
        Self::new(Box::<MagnitudeFallback>::default())
    }
}

impl IndexEngine {
    /// Return a new IndexEngine using `detector` to decide when to convert flux to mm/day.
    pub fn new(detector: Box<dyn FluxDetector>) -> Self {
        IndexEngine { detector }
    }

    /// Return an IndexEngine using the metadata-aware magnitude threshold.
    pub fn metadata_aware() -> Self {
        Self::new(Box::new(MagnitudeFallback::metadata_aware()))
    }

    /// Convert `field` to mm/day if the detector classifies it as a flux.
    pub fn normalise(&self, field: &GriddedField) -> GriddedField {
        if self.detector.is_flux(field) {
            debug!(variable = ?field.variable, units = %field.units, "Converting flux to mm/day");
            field.with_data(
                field.time.clone(),
                Units::MmPerDay,
                &field.data * SECONDS_PER_DAY,
            )
        } else {
            field.clone()
        }
    }

    /// Compute every index from a daily or seasonal series.
    ///
    /// # Arguments
    ///
    /// * `fields`: Fields of the series, in declaration order
    /// * `scenario`: Scenario label carried through to the result
    /// * `baseline_period`: Baseline period label carried through to the result
    #[tracing::instrument(level = "DEBUG", skip(self, fields))]
    pub fn compute(
        &self,
        fields: &[GriddedField],
        scenario: Scenario,
        baseline_period: &str,
    ) -> PipelineResult<IndexSet> {
        let field = self.normalise(select_rainfall(fields)?);
        let indices: BTreeMap<IndexName, SpatialField> = IndexName::ALL
            .iter()
            .map(|index| {
                let values = execute(*index, field.data.view(), &field.time);
                (*index, SpatialField(values))
            })
            .collect();
        Ok(IndexSet {
            indices,
            variable: field.variable.clone().unwrap_or_default(),
            scenario,
            baseline_period: baseline_period.to_string(),
            lat: field.lat,
            lon: field.lon,
        })
    }
}

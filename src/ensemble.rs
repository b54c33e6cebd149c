//! Ensemble statistics.
//!
//! Reduces each index field to scalar statistics over its valid grid cells and derives the PRCPTOT
//! change signal against the baseline reference.

use std::collections::BTreeMap;

use ndarray::{Array1, Axis};
use ndarray_stats::{interpolate::Linear, QuantileExt};
use noisy_float::types::n64;
use tracing::debug;

use crate::config::{BASELINE_REFERENCE, CONFIDENCE_TIERS, LOWEST_CONFIDENCE, PERCENTILES};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    ChangeSummary, EnsembleSummary, IndexName, IndexSet, IndexStatistics, Percentiles, Scenario,
};

const OPERATION: &str = "in ensemble analysis";

/// Returns the `p`th percentile of `values`, interpolating linearly between closest ranks.
///
/// `values` is reordered. Returns `None` if every value is missing.
pub(crate) fn percentile(values: &mut Array1<f64>, p: f64) -> Option<f64> {
    values
        .quantile_axis_skipnan_mut(Axis(0), n64(p / 100.0), &Linear)
        .ok()
        .map(|q| q[()])
        .filter(|q| !q.is_nan())
}

impl IndexStatistics {
    /// Compute statistics over the non-missing entries of `values`.
    ///
    /// Returns `None` if there are none.
    pub fn from_valid(values: &[f64]) -> Option<Self> {
        let mut valid: Array1<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
        let mean = valid.mean()?;
        // Population standard deviation.
        let std = valid.std(0.0);
        let ranked = PERCENTILES
            .iter()
            .map(|p| percentile(&mut valid, *p))
            .collect::<Option<Vec<f64>>>()?;
        let [p10, p25, p50, p75, p90] = <[f64; 5]>::try_from(ranked).ok()?;
        Some(IndexStatistics {
            mean,
            std,
            percentiles: Percentiles {
                p10,
                p25,
                p50,
                p75,
                p90,
            },
            valid_samples: valid.len(),
        })
    }
}

/// Map relative uncertainty in percent to a confidence level.
///
/// Each tier bound is exclusive, so 20 maps to the second tier.
pub fn confidence_level(relative_uncertainty: f64) -> u8 {
    CONFIDENCE_TIERS
        .iter()
        .find(|(bound, _)| relative_uncertainty < *bound)
        .map(|(_, level)| *level)
        .unwrap_or(LOWEST_CONFIDENCE)
}

/// Derive the change signal from PRCPTOT statistics.
///
/// The p10/p90 bounds are offsets from the mean change, scaled by each percentile's distance from
/// the PRCPTOT mean. With a zero mean the relative quantities are undefined: the relative
/// uncertainty is missing, confidence is lowest and both bounds equal the mean change.
pub fn change_summary(
    prcptot: &IndexStatistics,
    affected_grid_points: usize,
    scenario: Scenario,
    projection_year: &str,
) -> ChangeSummary {
    let mean = prcptot.mean;
    let Percentiles { p10, p90, .. } = prcptot.percentiles;
    let mean_change = (mean - BASELINE_REFERENCE) / BASELINE_REFERENCE * 100.0;
    let uncertainty_range = p90 - p10;
    let (relative_uncertainty, lower, upper) = if mean == 0.0 {
        (f64::NAN, mean_change, mean_change)
    } else {
        (
            uncertainty_range / mean * 100.0,
            mean_change - (mean - p10) / mean * 100.0,
            mean_change + (p90 - mean) / mean * 100.0,
        )
    };
    ChangeSummary {
        mean_change,
        absolute_mean: mean,
        baseline_reference: BASELINE_REFERENCE,
        p10: lower,
        p90: upper,
        confidence_level: confidence_level(relative_uncertainty),
        uncertainty_range,
        relative_uncertainty,
        affected_grid_points,
        scenario,
        projection_year: projection_year.to_string(),
    }
}

/// Summarise every index of `set` and derive the PRCPTOT change signal.
///
/// Indices without any valid cell are omitted. Fails if PRCPTOT is absent or entirely missing; the
/// error carries the statistics of the other indices.
#[tracing::instrument(level = "DEBUG", skip(set))]
pub fn summarize(
    set: &IndexSet,
    scenario: Scenario,
    projection_year: &str,
) -> PipelineResult<EnsembleSummary> {
    let mut indices = BTreeMap::new();
    for (name, field) in &set.indices {
        let values: Vec<f64> = field.0.iter().copied().collect();
        match IndexStatistics::from_valid(&values) {
            Some(statistics) => {
                indices.insert(*name, statistics);
            }
            None => debug!(index = %name, "Index has no valid cells; omitting"),
        }
    }

    let prcptot = match (
        set.indices.contains_key(&IndexName::Prcptot),
        indices.get(&IndexName::Prcptot),
    ) {
        (_, Some(prcptot)) => *prcptot,
        (present, None) => {
            let reason = if present {
                "PRCPTOT has no valid grid cells"
            } else {
                "PRCPTOT index is absent"
            };
            return Err(PipelineError::Ensemble {
                operation: OPERATION,
                reason: reason.to_string(),
                statistics: indices,
            });
        }
    };
    let summary = change_summary(
        &prcptot,
        prcptot.valid_samples,
        scenario,
        projection_year,
    );
    Ok(EnsembleSummary { indices, summary })
}

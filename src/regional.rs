//! Regional aggregation.
//!
//! Index fields are subset by the fixed region boxes of [Region::bounds]. Bounds are inclusive, so
//! a cell on an edge shared by two regions counts towards both.

use std::collections::BTreeMap;

use ndarray::Array1;
use tracing::debug;

use crate::config::BoundingBox;
use crate::models::{IndexSet, Region, RegionStatistics, RegionalSummary, SpatialField};

impl RegionStatistics {
    /// Compute statistics over the non-missing entries of `values`.
    ///
    /// The standard deviation is the population standard deviation. Returns `None` if there are no
    /// valid values.
    pub fn from_valid(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let valid: Array1<f64> = values.into_iter().filter(|x| !x.is_nan()).collect();
        let mean = valid.mean()?;
        Some(RegionStatistics {
            mean,
            std: valid.std(0.0),
            min: valid.fold(f64::INFINITY, |a, b| a.min(*b)),
            max: valid.fold(f64::NEG_INFINITY, |a, b| a.max(*b)),
        })
    }
}

/// Returns the values of `field` whose cell centre lies within `bounds`.
fn select<'a>(
    field: &'a SpatialField,
    lat: &'a [f64],
    lon: &'a [f64],
    bounds: &'a BoundingBox,
) -> impl Iterator<Item = f64> + 'a {
    field
        .0
        .indexed_iter()
        .filter(move |((i, j), _)| match (lat.get(*i), lon.get(*j)) {
            (Some(y), Some(x)) => bounds.contains(*y, *x),
            _ => false,
        })
        .map(|(_, value)| *value)
}

/// Compute per-region statistics of every index in `set`.
///
/// Every region appears in the result. An index with no valid cell inside a region is omitted from
/// that region's entry.
#[tracing::instrument(level = "DEBUG", skip(set))]
pub fn regional_stats(set: &IndexSet) -> RegionalSummary {
    let mut summary = RegionalSummary::new();
    for region in Region::ALL {
        let bounds = region.bounds();
        let mut statistics = BTreeMap::new();
        for (name, field) in &set.indices {
            match RegionStatistics::from_valid(select(field, &set.lat, &set.lon, &bounds)) {
                Some(stats) => {
                    statistics.insert(*name, stats);
                }
                None => debug!(%region, index = %name, "No valid cells in region"),
            }
        }
        summary.insert(region, statistics);
    }
    summary
}

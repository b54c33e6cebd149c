//! Data types and associated functions and methods

use std::collections::BTreeMap;

use ndarray::{Array2, Array3};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::Display;
use time::Date;

use crate::units::Units;

/// Supported climate scenarios
///
/// The scenario is an opaque label carried through to the outputs.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Scenario {
    /// Middle of the road
    #[serde(rename = "SSP2-4.5")]
    #[strum(serialize = "SSP2-4.5")]
    Ssp245,
    /// Fossil-fuelled development
    #[serde(rename = "SSP5-8.5")]
    #[strum(serialize = "SSP5-8.5")]
    Ssp585,
}

/// Time axis of a gridded field
#[derive(Clone, Debug, PartialEq)]
pub enum TimeAxis {
    /// A single undated step
    None,
    /// One step per day
    Daily(Vec<Date>),
    /// One step per calendar year
    Yearly(Vec<i32>),
}

impl TimeAxis {
    /// Number of time steps in the axis. An undated field has a single step.
    pub fn len(&self) -> usize {
        match self {
            TimeAxis::None => 1,
            TimeAxis::Daily(dates) => dates.len(),
            TimeAxis::Yearly(years) => years.len(),
        }
    }
}

/// A gridded field on canonical (time, lat, lon) axes
///
/// Latitudes and longitudes are strictly ascending. The data array shape is exactly
/// `(time.len(), lat.len(), lon.len())`; missing cells are NaN.
#[derive(Clone, Debug, PartialEq)]
pub struct GriddedField {
    /// Name of the data variable, when known
    pub variable: Option<String>,
    /// Declared units
    pub units: Units,
    /// Latitudes in degrees north
    pub lat: Vec<f64>,
    /// Longitudes in degrees east
    pub lon: Vec<f64>,
    /// Time coordinate
    pub time: TimeAxis,
    /// Data indexed by (time, lat, lon)
    pub data: Array3<f64>,
}

impl GriddedField {
    /// Return a new GriddedField, checking the shape invariant.
    pub fn new(
        variable: Option<String>,
        units: Units,
        lat: Vec<f64>,
        lon: Vec<f64>,
        time: TimeAxis,
        data: Array3<f64>,
    ) -> Option<Self> {
        let expected = [time.len(), lat.len(), lon.len()];
        if data.shape() != expected || lat.is_empty() || lon.is_empty() {
            return None;
        }
        Some(GriddedField {
            variable,
            units,
            lat,
            lon,
            time,
            data,
        })
    }

    /// Return a copy of this field with different data and time axis.
    pub fn with_data(&self, time: TimeAxis, units: Units, data: Array3<f64>) -> Self {
        GriddedField {
            variable: self.variable.clone(),
            units,
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            time,
            data,
        }
    }

    /// Largest non-missing value in the field, or NaN if every cell is missing.
    pub fn max_valid(&self) -> f64 {
        self.data
            .iter()
            .copied()
            .filter(|x| !x.is_nan())
            .fold(f64::NAN, f64::max)
    }
}

/// Two fields regridded onto the same target grid
#[derive(Clone, Debug)]
pub struct RegriddedPair {
    /// Observational (historical) fields, one per data variable
    pub observed: Vec<GriddedField>,
    /// Projection fields, one per data variable
    pub projection: Vec<GriddedField>,
    /// Target latitudes shared by every field
    pub lat: Vec<f64>,
    /// Target longitudes shared by every field
    pub lon: Vec<f64>,
}

/// Which member of a pair a series came from
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Source {
    /// Historical observations
    Observed,
    /// Model projections
    Projection,
}

/// Seasonal accumulations: one value per (year, lat, lon) for each field
#[derive(Clone, Debug)]
pub struct SeasonalSeries {
    /// Fields reduced to yearly seasonal totals
    pub fields: Vec<GriddedField>,
    /// Season label, e.g. `JJAS`
    pub season: String,
    /// Month range label, e.g. `June-September`
    pub months: String,
}

/// Names of the computed precipitation indices
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum IndexName {
    /// Total precipitation
    #[serde(rename = "PRCPTOT")]
    #[strum(serialize = "PRCPTOT")]
    Prcptot,
    /// Maximum 1-day precipitation
    Rx1day,
    /// Maximum 5-day precipitation
    Rx5day,
    /// Steps above the heavy rain threshold
    #[serde(rename = "heavy_rain_days")]
    #[strum(serialize = "heavy_rain_days")]
    HeavyRainDays,
    /// Dry steps
    #[serde(rename = "CDD")]
    #[strum(serialize = "CDD")]
    Cdd,
    /// Wet steps
    #[serde(rename = "CWD")]
    #[strum(serialize = "CWD")]
    Cwd,
    /// Simple daily intensity index
    #[serde(rename = "SDII")]
    #[strum(serialize = "SDII")]
    Sdii,
}

impl IndexName {
    /// All indices, in computation order.
    pub const ALL: [IndexName; 7] = [
        IndexName::Prcptot,
        IndexName::Rx1day,
        IndexName::Rx5day,
        IndexName::HeavyRainDays,
        IndexName::Cdd,
        IndexName::Cwd,
        IndexName::Sdii,
    ];
}

/// A 2-D field over (lat, lon)
///
/// Serialises as nested rows of numbers, with missing cells as `null`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialField(pub Array2<f64>);

impl Serialize for SpatialField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut rows = serializer.serialize_seq(Some(self.0.nrows()))?;
        for row in self.0.rows() {
            let row: Vec<Option<f64>> = row
                .iter()
                .map(|x| if x.is_finite() { Some(*x) } else { None })
                .collect();
            rows.serialize_element(&row)?;
        }
        rows.end()
    }
}

/// Computed indices with carried-through metadata
#[derive(Clone, Debug, Serialize)]
pub struct IndexSet {
    /// Index fields, each with the spatial shape of the source series
    pub indices: BTreeMap<IndexName, SpatialField>,
    /// Rainfall variable the indices were computed from
    pub variable: String,
    /// Scenario label
    pub scenario: Scenario,
    /// Baseline period label
    pub baseline_period: String,
    /// Latitudes of the index fields
    pub lat: Vec<f64>,
    /// Longitudes of the index fields
    pub lon: Vec<f64>,
}

/// The five-point percentile set
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Summary statistics of one index over all valid grid cells
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct IndexStatistics {
    /// Mean of valid samples
    pub mean: f64,
    /// Population standard deviation of valid samples
    pub std: f64,
    /// Percentiles of valid samples
    pub percentiles: Percentiles,
    /// Number of valid samples
    pub valid_samples: usize,
}

/// Top-level change signal derived from PRCPTOT
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChangeSummary {
    /// Percent change of the PRCPTOT mean against the baseline reference
    pub mean_change: f64,
    /// PRCPTOT mean in millimetres
    pub absolute_mean: f64,
    /// Baseline reference in millimetres
    pub baseline_reference: f64,
    /// Lower bound expressed as percent change
    pub p10: f64,
    /// Upper bound expressed as percent change
    pub p90: f64,
    /// Confidence level in percent
    pub confidence_level: u8,
    /// PRCPTOT p90 - p10 in millimetres
    pub uncertainty_range: f64,
    /// Uncertainty range as a percentage of the mean
    pub relative_uncertainty: f64,
    /// Number of grid cells with a valid PRCPTOT
    pub affected_grid_points: usize,
    /// Scenario label
    pub scenario: Scenario,
    /// Projection year label
    pub projection_year: String,
}

/// Ensemble statistics for every index plus the derived summary
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EnsembleSummary {
    /// Statistics per index; indices without valid samples are omitted
    pub indices: BTreeMap<IndexName, IndexStatistics>,
    /// Change signal
    pub summary: ChangeSummary,
}

/// Named regions of the study area
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Region {
    Northern,
    Western,
    Central,
    Eastern,
    Southern,
    Northeastern,
}

/// Statistics of one index within one region
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct RegionStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-region, per-index statistics
pub type RegionalSummary = BTreeMap<Region, BTreeMap<IndexName, RegionStatistics>>;

/// Everything the pipeline produces for the reporting layer
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    /// Index fields
    pub index_set: IndexSet,
    /// Ensemble statistics
    pub ensemble: EnsembleSummary,
    /// Regional breakdown
    pub regional: RegionalSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_test::{assert_tokens, Token};

    #[test]
    fn test_index_name_display() {
        let names: Vec<String> = IndexName::ALL.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            vec!["PRCPTOT", "Rx1day", "Rx5day", "heavy_rain_days", "CDD", "CWD", "SDII"],
            names
        );
    }

    #[test]
    fn test_index_name_serde() {
        assert_tokens(
            &IndexName::HeavyRainDays,
            &[Token::UnitVariant {
                name: "IndexName",
                variant: "heavy_rain_days",
            }],
        );
        assert_tokens(
            &IndexName::Rx5day,
            &[Token::UnitVariant {
                name: "IndexName",
                variant: "Rx5day",
            }],
        );
    }

    #[test]
    fn test_scenario_serde() {
        assert_tokens(
            &Scenario::Ssp245,
            &[Token::UnitVariant {
                name: "Scenario",
                variant: "SSP2-4.5",
            }],
        );
        assert_eq!("SSP5-8.5", Scenario::Ssp585.to_string());
    }

    #[test]
    fn test_source_display() {
        assert_eq!("observed", Source::Observed.to_string());
        assert_eq!("projection", Source::Projection.to_string());
    }

    #[test]
    fn test_time_axis_len() {
        assert_eq!(1, TimeAxis::None.len());
        assert_eq!(3, TimeAxis::Yearly(vec![2000, 2001, 2002]).len());
    }

    #[test]
    fn test_gridded_field_shape_mismatch() {
        let field = GriddedField::new(
            None,
            Units::Unknown,
            vec![1.0, 2.0],
            vec![1.0],
            TimeAxis::None,
            Array3::zeros((1, 1, 1)),
        );
        assert!(field.is_none());
    }

    #[test]
    fn test_max_valid_skips_nan() {
        let field = GriddedField::new(
            None,
            Units::Unknown,
            vec![1.0],
            vec![1.0, 2.0],
            TimeAxis::None,
            array![[[f64::NAN, 0.5]]],
        )
        .unwrap();
        assert_eq!(0.5, field.max_valid());
    }

    #[test]
    fn test_spatial_field_serialises_nan_as_null() {
        let field = SpatialField(array![[1.0, f64::NAN], [2.5, 3.0]]);
        assert_eq!(
            "[[1.0,null],[2.5,3.0]]",
            serde_json::to_string(&field).unwrap()
        );
    }

    #[test]
    fn test_index_map_keys() {
        let mut indices = BTreeMap::new();
        indices.insert(IndexName::Sdii, 1);
        indices.insert(IndexName::Prcptot, 2);
        assert_eq!(
            r#"{"PRCPTOT":2,"SDII":1}"#,
            serde_json::to_string(&indices).unwrap()
        );
    }
}

//! Pipeline configuration and fixed constants.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use validator::{Validate, ValidationError};

use crate::error::PipelineResult;
use crate::models::{Region, Scenario};

/// Dry/wet boundary in mm/day
pub const WET_DAY_THRESHOLD: f64 = 1.0;

/// Heavy rain boundary in mm/day
pub const HEAVY_RAIN_THRESHOLD: f64 = 100.0;

/// Typical seasonal total over the study area in mm, used as the change reference
pub const BASELINE_REFERENCE: f64 = 1000.0;

/// Percentiles reported for every index
pub const PERCENTILES: [f64; 5] = [10.0, 25.0, 50.0, 75.0, 90.0];

/// Confidence levels by relative uncertainty: below each bound in percent, the paired level applies
pub const CONFIDENCE_TIERS: [(f64, u8); 2] = [(20.0, 90), (40.0, 75)];

/// Confidence level when relative uncertainty is at or above every tier bound
pub const LOWEST_CONFIDENCE: u8 = 60;

/// Default monsoon season: June to September
pub const DEFAULT_SEASON_MONTHS: [u32; 4] = [6, 7, 8, 9];

/// Default target grid resolution in degrees
pub const DEFAULT_RESOLUTION: f64 = 0.25;

/// A latitude/longitude box with inclusive bounds
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Whether the latitude lies within the box, bounds included.
    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max
    }

    /// Whether the longitude lies within the box, bounds included.
    pub fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max
    }

    /// Whether the point lies within the box, bounds included.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.contains_lat(lat) && self.contains_lon(lon)
    }
}

/// The Indian subcontinent
pub const STUDY_AREA: BoundingBox = BoundingBox {
    lat_min: 6.0,
    lat_max: 37.0,
    lon_min: 68.0,
    lon_max: 97.0,
};

impl Region {
    /// All regions in reporting order.
    pub const ALL: [Region; 6] = [
        Region::Northern,
        Region::Western,
        Region::Central,
        Region::Eastern,
        Region::Southern,
        Region::Northeastern,
    ];

    /// Bounds of the region.
    ///
    /// Adjacent boxes share their edge coordinates, so a cell exactly on a shared edge belongs to
    /// both regions. Northeastern also overlaps Eastern.
    pub fn bounds(&self) -> BoundingBox {
        let (lat_min, lat_max, lon_min, lon_max) = match self {
            Region::Northern => (28.0, 37.0, 68.0, 88.0),
            Region::Western => (15.0, 28.0, 68.0, 78.0),
            Region::Central => (15.0, 28.0, 78.0, 88.0),
            Region::Eastern => (15.0, 28.0, 88.0, 97.0),
            Region::Southern => (6.0, 15.0, 68.0, 88.0),
            Region::Northeastern => (22.0, 30.0, 88.0, 97.0),
        };
        BoundingBox {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }
}

/// Daily rainfall intensity classes
///
/// These thresholds are available to callers but no index currently uses them.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RainfallClass {
    /// Below the light threshold
    None,
    Light,
    Moderate,
    Heavy,
    VeryHeavy,
    Extreme,
}

impl RainfallClass {
    /// Class lower bounds in mm/day, ascending.
    pub const THRESHOLDS: [(RainfallClass, f64); 5] = [
        (RainfallClass::Light, 2.5),
        (RainfallClass::Moderate, 10.0),
        (RainfallClass::Heavy, 64.5),
        (RainfallClass::VeryHeavy, 124.5),
        (RainfallClass::Extreme, 244.4),
    ];

    /// Return the class of a daily total. Missing values classify as `None`.
    pub fn classify(mm_per_day: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .rev()
            .find(|(_, threshold)| mm_per_day >= *threshold)
            .map(|(class, _)| *class)
            .unwrap_or(RainfallClass::None)
    }

    /// Lower bound of the class in mm/day.
    pub fn threshold(&self) -> f64 {
        Self::THRESHOLDS
            .iter()
            .find(|(class, _)| class == self)
            .map(|(_, threshold)| *threshold)
            .unwrap_or(0.0)
    }
}

/// Scalar configuration of a pipeline run
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Target grid resolution in degrees
    #[validate(range(min = 0.001, max = 31.0))]
    pub resolution: f64,
    /// Calendar months making up the season
    #[validate(length(min = 1, max = 12), custom = "validate_months")]
    pub season_months: Vec<u32>,
    /// Scenario label
    pub scenario: Scenario,
    /// Baseline period label
    #[validate(length(min = 1))]
    pub baseline_period: String,
    /// Projection year label
    #[validate(length(min = 1))]
    pub projection_year: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            resolution: DEFAULT_RESOLUTION,
            season_months: DEFAULT_SEASON_MONTHS.to_vec(),
            scenario: Scenario::Ssp585,
            baseline_period: "1990-2019".to_string(),
            projection_year: "2050".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Return the configuration if it is valid.
    pub fn validated(self) -> PipelineResult<Self> {
        self.validate()?;
        Ok(self)
    }
}

/// Validate season months
#[allow(clippy::ptr_arg)]
fn validate_months(months: &Vec<u32>) -> Result<(), ValidationError> {
    if let Some(month) = months.iter().find(|m| !(1..=12).contains(*m)) {
        let mut error = ValidationError::new("Season months must be between 1 and 12");
        error.add_param("month".into(), month);
        return Err(error);
    }
    let mut sorted = months.clone();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != months.len() {
        return Err(ValidationError::new("Season months must not repeat"));
    }
    Ok(())
}

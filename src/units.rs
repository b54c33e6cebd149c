//! Precipitation units and flux detection.
//!
//! Model output usually stores precipitation as a mass flux (kg m-2 s-1), observational grids as a
//! daily depth (mm/day). One millimetre of water over a square metre weighs one kilogram, so a flux
//! becomes a daily depth by multiplying by the number of seconds in a day.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::models::GriddedField;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Unit tag of a precipitation field
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    /// A rate per second (kg m-2 s-1, mm/s)
    #[strum(serialize = "kg m-2 s-1")]
    Flux,
    /// A daily depth
    #[strum(serialize = "mm/day")]
    MmPerDay,
    /// Units metadata present but not recognised
    #[strum(serialize = "unrecognised")]
    Other,
    /// No units metadata
    #[strum(serialize = "unknown")]
    Unknown,
}

/// Spellings of per-second precipitation units.
const FLUX_UNITS: [&str; 7] = [
    "kg m-2 s-1",
    "kg/m2/s",
    "kg m**-2 s**-1",
    "kg/m^2/s",
    "mm/s",
    "mm s-1",
    "mm sec-1",
];

/// Spellings of daily precipitation units.
const DAILY_UNITS: [&str; 5] = ["mm/day", "mm day-1", "mm/d", "mm d-1", "mm"];

impl Units {
    /// Parse a units attribute.
    pub fn parse(units: Option<&str>) -> Self {
        let Some(units) = units else {
            return Units::Unknown;
        };
        let units = units.trim().to_lowercase();
        if units.is_empty() {
            Units::Unknown
        } else if FLUX_UNITS.iter().any(|flux| units.contains(flux)) {
            Units::Flux
        } else if DAILY_UNITS.iter().any(|daily| units == *daily) {
            Units::MmPerDay
        } else {
            Units::Other
        }
    }
}

/// Strategy deciding whether a field holds a flux that must be scaled to mm/day.
///
/// The index engine calls this once per input field. Replacing the strategy changes how units are
/// detected without touching the engine.
pub trait FluxDetector: std::fmt::Debug {
    /// Returns true if `field` should be multiplied by [SECONDS_PER_DAY].
    fn is_flux(&self, field: &GriddedField) -> bool;
}

/// Trust units metadata, and fall back to the magnitude of the data when there is none.
///
/// A field without units whose largest value is below `threshold` is treated as a flux. Very light,
/// metadata-less daily series are silently misclassified by this rule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MagnitudeFallback {
    pub threshold: f64,
}

impl MagnitudeFallback {
    /// Threshold used when units metadata is absent.
    pub const DEFAULT_THRESHOLD: f64 = 1.0;

    /// Threshold used by the metadata-aware variant.
    pub const METADATA_AWARE_THRESHOLD: f64 = 0.1;

    /// Return the metadata-aware variant, which is more reluctant to treat data as a flux.
    pub fn metadata_aware() -> Self {
        MagnitudeFallback {
            threshold: Self::METADATA_AWARE_THRESHOLD,
        }
    }
}

impl Default for MagnitudeFallback {
    fn default() -> Self {
        MagnitudeFallback {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

impl FluxDetector for MagnitudeFallback {
    fn is_flux(&self, field: &GriddedField) -> bool {
        match field.units {
            Units::Flux => true,
            Units::MmPerDay | Units::Other => false,
            // NaN max (all missing) compares false.
            Units::Unknown => field.max_valid() < self.threshold,
        }
    }
}

/// Trust units metadata only.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetadataOnly;

impl FluxDetector for MetadataOnly {
    fn is_flux(&self, field: &GriddedField) -> bool {
        field.units == Units::Flux
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_parse_flux() {
        assert_eq!(Units::Flux, Units::parse(Some("kg m-2 s-1")));
        assert_eq!(Units::Flux, Units::parse(Some("kg/m2/s")));
        assert_eq!(Units::Flux, Units::parse(Some("MM/S")));
    }

    #[test]
    fn test_parse_daily() {
        assert_eq!(Units::MmPerDay, Units::parse(Some("mm/day")));
        assert_eq!(Units::MmPerDay, Units::parse(Some(" mm d-1 ")));
    }

    #[test]
    fn test_parse_missing_and_other() {
        assert_eq!(Units::Unknown, Units::parse(None));
        assert_eq!(Units::Unknown, Units::parse(Some("")));
        assert_eq!(Units::Other, Units::parse(Some("inches")));
    }

    #[test]
    fn test_magnitude_fallback_metadata_wins() {
        let detector = MagnitudeFallback::default();
        let flux = test_utils::constant_field(500.0, 2, 2, 2, Units::Flux);
        assert!(detector.is_flux(&flux));
        let daily = test_utils::constant_field(0.01, 2, 2, 2, Units::MmPerDay);
        assert!(!detector.is_flux(&daily));
    }

    #[test]
    fn test_magnitude_fallback_without_metadata() {
        let detector = MagnitudeFallback::default();
        let small = test_utils::constant_field(0.5, 2, 2, 2, Units::Unknown);
        assert!(detector.is_flux(&small));
        let large = test_utils::constant_field(1.0, 2, 2, 2, Units::Unknown);
        assert!(!detector.is_flux(&large));
    }

    #[test]
    fn test_metadata_aware_threshold() {
        let detector = MagnitudeFallback::metadata_aware();
        let light = test_utils::constant_field(0.5, 2, 2, 2, Units::Unknown);
        assert!(!detector.is_flux(&light));
        let flux = test_utils::constant_field(5e-5, 2, 2, 2, Units::Unknown);
        assert!(detector.is_flux(&flux));
    }

    #[test]
    fn test_all_missing_is_not_flux() {
        let detector = MagnitudeFallback::default();
        let missing = test_utils::constant_field(f64::NAN, 2, 2, 2, Units::Unknown);
        assert!(!detector.is_flux(&missing));
    }

    #[test]
    fn test_metadata_only() {
        let small = test_utils::constant_field(0.5, 2, 2, 2, Units::Unknown);
        assert!(!MetadataOnly.is_flux(&small));
        let flux = test_utils::constant_field(0.5, 2, 2, 2, Units::Flux);
        assert!(MetadataOnly.is_flux(&flux));
    }
}

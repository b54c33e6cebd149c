//! Self-describing gridded dataset container.
//!
//! A [Dataset] mirrors the structure of a NetCDF file: named coordinate axes, named data variables
//! defined over those axes, and free-form attributes. Declaration order of coordinates and
//! variables is preserved.

use std::collections::BTreeMap;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::error::{PipelineError, PipelineResult};
use crate::types::Missing;
use crate::units::Units;

const OPERATION: &str = "loading gridded data";

/// An attribute value
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

impl AttrValue {
    /// Return the value as a single number, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(value) => Some(*value),
            AttrValue::Numbers(values) if values.len() == 1 => Some(values[0]),
            _ => None,
        }
    }

    /// Return the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Attributes of a dataset, coordinate or variable
pub type Attributes = BTreeMap<String, AttrValue>;

/// Values of a coordinate axis
#[derive(Clone, Debug, PartialEq)]
pub enum CoordinateValues {
    Numeric(Vec<f64>),
    Time(Vec<Date>),
}

/// A named coordinate axis
#[derive(Clone, Debug, PartialEq)]
pub struct Coordinate {
    pub name: String,
    pub values: CoordinateValues,
    pub attributes: Attributes,
}

impl Coordinate {
    /// Return a new numeric coordinate without attributes.
    pub fn numeric(name: &str, values: Vec<f64>) -> Self {
        Coordinate {
            name: name.to_string(),
            values: CoordinateValues::Numeric(values),
            attributes: Attributes::new(),
        }
    }

    /// Return a new time coordinate without attributes.
    pub fn time(name: &str, values: Vec<Date>) -> Self {
        Coordinate {
            name: name.to_string(),
            values: CoordinateValues::Time(values),
            attributes: Attributes::new(),
        }
    }

    /// Number of values along the axis.
    pub fn len(&self) -> usize {
        match &self.values {
            CoordinateValues::Numeric(values) => values.len(),
            CoordinateValues::Time(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric values, if the coordinate is numeric.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.values {
            CoordinateValues::Numeric(values) => Some(values),
            CoordinateValues::Time(_) => None,
        }
    }

    /// Whether the values are strictly increasing or strictly decreasing.
    pub fn is_strictly_monotonic(&self) -> bool {
        match &self.values {
            CoordinateValues::Numeric(values) => {
                values.windows(2).all(|w| w[0] < w[1]) || values.windows(2).all(|w| w[0] > w[1])
            }
            CoordinateValues::Time(values) => {
                values.windows(2).all(|w| w[0] < w[1]) || values.windows(2).all(|w| w[0] > w[1])
            }
        }
    }

    /// Decode a numeric CF time axis (`<unit> since <date>`) to calendar dates.
    ///
    /// Coordinates that are already dates, or have no such units, are returned unchanged.
    pub fn decode_time(self) -> Result<Self, String> {
        let units = self.attributes.get("units").and_then(AttrValue::as_str);
        let dates = match (&self.values, units) {
            (CoordinateValues::Numeric(values), Some(units)) if units.contains(" since ") => {
                decode_cf_time(values, units)?
            }
            _ => return Ok(self),
        };
        Ok(Coordinate {
            values: CoordinateValues::Time(dates),
            ..self
        })
    }
}

/// Number of days between the first and last representable dates, years -9999 to 9999
const MAX_DAY_OFFSET: f64 = 7_304_850.0;

/// Convert offsets in `units` (e.g. `days since 1850-01-01 00:00:00`) to dates.
///
/// The proleptic Gregorian calendar is assumed and any time of day is dropped.
pub fn decode_cf_time(values: &[f64], units: &str) -> Result<Vec<Date>, String> {
    let (unit, reference) = units
        .split_once(" since ")
        .ok_or_else(|| format!("unsupported time units {units}"))?;
    let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
        "days" | "day" | "d" => 86400.0,
        "hours" | "hour" | "h" => 3600.0,
        "minutes" | "minute" | "min" => 60.0,
        "seconds" | "second" | "s" => 1.0,
        other => return Err(format!("unsupported time unit {other}")),
    };
    let reference = parse_reference_date(reference.trim())
        .ok_or_else(|| format!("invalid reference date in time units {units}"))?;
    values
        .iter()
        .map(|value| {
            let days = (value * seconds_per_unit / 86400.0).floor();
            if !days.is_finite() {
                return Err(format!("invalid time value {value}"));
            }
            if days.abs() > MAX_DAY_OFFSET {
                return Err(format!("time value {value} out of range"));
            }
            reference
                .checked_add(Duration::days(days as i64))
                .ok_or_else(|| format!("time value {value} out of range"))
        })
        .collect()
}

/// Parse the date part of a CF reference time, accepting unpadded months and days.
fn parse_reference_date(reference: &str) -> Option<Date> {
    let date = reference.split(['T', ' ']).next()?;
    let mut parts = date.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// A named data variable
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Dimension names, one per array axis
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub attributes: Attributes,
}

impl Variable {
    /// Declared units of the variable.
    pub fn units(&self) -> Units {
        Units::parse(self.attributes.get("units").and_then(AttrValue::as_str))
    }

    /// Index of the axis named `dim`.
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Apply CF packing and missing data attributes.
    ///
    /// Cells matching a missing data descriptor become NaN, then `scale_factor` and `add_offset`
    /// are applied. The packing attributes are removed so that unpacking is not repeated.
    pub fn unpack(mut self) -> PipelineResult<Self> {
        let missing = Missing::from_attributes(&self.attributes).map_err(|err| {
            PipelineError::format(OPERATION, format!("variable {}: {}", self.name, err))
        })?;
        let scale = self.attributes.get("scale_factor").and_then(AttrValue::as_f64);
        let offset = self.attributes.get("add_offset").and_then(AttrValue::as_f64);
        let scale = scale.unwrap_or(1.0);
        let offset = offset.unwrap_or(0.0);
        self.data.mapv_inplace(|x| {
            if missing.iter().any(|m| m.is_missing(&x)) {
                f64::NAN
            } else {
                x * scale + offset
            }
        });
        for name in [
            "_FillValue",
            "missing_value",
            "valid_min",
            "valid_max",
            "valid_range",
            "scale_factor",
            "add_offset",
        ] {
            self.attributes.remove(name);
        }
        Ok(self)
    }
}

/// A gridded dataset
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    coordinates: Vec<Coordinate>,
    variables: Vec<Variable>,
    pub attributes: Attributes,
}

impl Dataset {
    /// Return a new Dataset, validating coordinates against variables.
    ///
    /// Coordinates must be non-empty and strictly monotonic, every variable must have one
    /// dimension name per array axis, and each dimension backed by a coordinate must match the
    /// coordinate's length.
    pub fn new(
        coordinates: Vec<Coordinate>,
        variables: Vec<Variable>,
        attributes: Attributes,
    ) -> PipelineResult<Self> {
        for coordinate in &coordinates {
            if coordinate.is_empty() {
                return Err(PipelineError::format(
                    OPERATION,
                    format!("coordinate {} is empty", coordinate.name),
                ));
            }
            if !coordinate.is_strictly_monotonic() {
                return Err(PipelineError::format(
                    OPERATION,
                    format!("coordinate {} is not strictly monotonic", coordinate.name),
                ));
            }
        }
        for variable in &variables {
            if variable.dims.len() != variable.data.ndim() {
                return Err(PipelineError::format(
                    OPERATION,
                    format!(
                        "variable {} has {} dimensions but {} dimension names",
                        variable.name,
                        variable.data.ndim(),
                        variable.dims.len()
                    ),
                ));
            }
            for (dim, length) in variable.dims.iter().zip(variable.data.shape()) {
                let coordinate = coordinates.iter().find(|c| &c.name == dim);
                if let Some(coordinate) = coordinate {
                    if coordinate.len() != *length {
                        return Err(PipelineError::format(
                            OPERATION,
                            format!(
                                "variable {} has length {} along {} but the coordinate has length {}",
                                variable.name,
                                length,
                                dim,
                                coordinate.len()
                            ),
                        ));
                    }
                }
            }
        }
        Ok(Dataset {
            coordinates,
            variables,
            attributes,
        })
    }

    /// Return a Dataset from parts derived from an already validated dataset.
    pub(crate) fn from_parts_unchecked(
        coordinates: Vec<Coordinate>,
        variables: Vec<Variable>,
        attributes: Attributes,
    ) -> Self {
        Dataset {
            coordinates,
            variables,
            attributes,
        }
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Coordinate names in declaration order.
    pub fn coordinate_names(&self) -> impl Iterator<Item = &str> + Clone {
        self.coordinates.iter().map(|c| c.name.as_str())
    }

    pub fn coordinate(&self, name: &str) -> Option<&Coordinate> {
        self.coordinates.iter().find(|c| c.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Decompose into coordinates, variables and attributes.
    pub fn into_parts(self) -> (Vec<Coordinate>, Vec<Variable>, Attributes) {
        (self.coordinates, self.variables, self.attributes)
    }
}

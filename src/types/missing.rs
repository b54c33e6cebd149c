//! Missing data descriptors
//!
//! Arrays can contain missing data which should be ignored during computation. There are multiple
//! ways to describe the missing data. Currently we support:
//!
//! * A single missing value
//! * Multiple missing values
//! * A valid minimum value
//! * A valid maximum value
//! * A valid range of values
//!
//! The loader reads these from CF attributes (`_FillValue`, `missing_value`, `valid_min`,
//! `valid_max`, `valid_range`) and replaces every matching cell with NaN.

use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::dataset::{AttrValue, Attributes};

/// Missing data
///
/// This enum can represent all known descriptions of missing data used in NetCDF files.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Missing<T> {
    /// A single missing value
    MissingValue(T),
    /// Multiple missing values
    MissingValues(Vec<T>),
    /// Valid minimum
    ValidMin(T),
    /// Valid maximum
    ValidMax(T),
    /// Valid range
    ValidRange(T, T),
}

impl<T: PartialOrd + Serialize> Missing<T> {
    /// Validate a [Missing] object.
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Validate min + max for valid ranges.
        if let Missing::ValidRange(min, max) = self {
            if min >= max {
                let mut error =
                    ValidationError::new("Missing data valid range min must be less than max");
                error.add_param("min".into(), min);
                error.add_param("max".into(), max);
                return Err(error);
            };
        };
        Ok(())
    }

    /// Filter function to check whether the provided value is a 'missing' value
    pub fn is_missing(&self, x: &T) -> bool {
        match self {
            Missing::MissingValue(value) => x == value,
            Missing::MissingValues(values) => values.contains(x),
            Missing::ValidMin(min) => x < min,
            Missing::ValidMax(max) => x > max,
            Missing::ValidRange(min, max) => x < min || x > max,
        }
    }
}

/// Return an error for an attribute that is not numeric.
fn non_numeric(name: &str) -> ValidationError {
    let mut error = ValidationError::new("Missing data attribute must be numeric");
    error.add_param("attribute".into(), &name);
    error
}

impl Missing<f64> {
    /// Build descriptors from the CF attributes of a variable.
    ///
    /// Returns an empty list when the variable declares no missing data.
    pub fn from_attributes(attributes: &Attributes) -> Result<Vec<Self>, ValidationError> {
        let mut result = vec![];
        for name in ["_FillValue", "missing_value"] {
            match attributes.get(name) {
                None => (),
                Some(AttrValue::Number(value)) => result.push(Missing::MissingValue(*value)),
                Some(AttrValue::Numbers(values)) => {
                    result.push(Missing::MissingValues(values.clone()))
                }
                Some(AttrValue::Text(_)) => return Err(non_numeric(name)),
            }
        }
        match attributes.get("valid_range") {
            None => {
                let min = attributes.get("valid_min");
                let max = attributes.get("valid_max");
                match (min, max) {
                    (Some(min), Some(max)) => result.push(Missing::ValidRange(
                        min.as_f64().ok_or_else(|| non_numeric("valid_min"))?,
                        max.as_f64().ok_or_else(|| non_numeric("valid_max"))?,
                    )),
                    (Some(min), None) => result.push(Missing::ValidMin(
                        min.as_f64().ok_or_else(|| non_numeric("valid_min"))?,
                    )),
                    (None, Some(max)) => result.push(Missing::ValidMax(
                        max.as_f64().ok_or_else(|| non_numeric("valid_max"))?,
                    )),
                    (None, None) => (),
                }
            }
            Some(AttrValue::Numbers(values)) if values.len() == 2 => {
                result.push(Missing::ValidRange(values[0], values[1]))
            }
            Some(_) => {
                return Err(ValidationError::new(
                    "Missing data valid range must contain two numbers",
                ))
            }
        }
        for missing in &result {
            missing.validate()?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(items: &[(&str, AttrValue)]) -> Attributes {
        items
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_validate_f64() {
        Missing::MissingValue(42.0).validate().unwrap();
        Missing::ValidRange(-1.0, 1.0).validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "Missing data valid range min must be less than max")]
    fn test_validate_f64_range_min_gt_max() {
        Missing::ValidRange(42.0, -42.0).validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "Missing data valid range min must be less than max")]
    fn test_validate_f64_range_min_eq_max() {
        Missing::ValidRange(42.0, 42.0).validate().unwrap();
    }

    #[test]
    fn test_is_missing_value() {
        let missing = Missing::MissingValue(1);
        assert!(!missing.is_missing(&0));
        assert!(missing.is_missing(&1));
        assert!(!missing.is_missing(&2));
    }

    #[test]
    fn test_is_missing_values() {
        let missing = Missing::MissingValues(vec![1, 2]);
        assert!(!missing.is_missing(&0));
        assert!(missing.is_missing(&1));
        assert!(missing.is_missing(&2));
        assert!(!missing.is_missing(&3));
    }

    #[test]
    fn test_is_missing_valid_min() {
        let missing = Missing::ValidMin(1);
        assert!(missing.is_missing(&0));
        assert!(!missing.is_missing(&1));
        assert!(!missing.is_missing(&2));
    }

    #[test]
    fn test_is_missing_valid_max() {
        let missing = Missing::ValidMax(1);
        assert!(!missing.is_missing(&0));
        assert!(!missing.is_missing(&1));
        assert!(missing.is_missing(&2));
    }

    #[test]
    fn test_is_missing_valid_range() {
        let missing = Missing::ValidRange(1, 2);
        assert!(missing.is_missing(&0));
        assert!(!missing.is_missing(&1));
        assert!(!missing.is_missing(&2));
        assert!(missing.is_missing(&3));
    }

    #[test]
    fn test_from_attributes_empty() {
        let result = Missing::from_attributes(&Attributes::new()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_from_attributes_fill_and_missing_values() {
        let attrs = attributes(&[
            ("_FillValue", AttrValue::Number(-9999.0)),
            ("missing_value", AttrValue::Numbers(vec![-999.0, -99.0])),
            ("units", AttrValue::Text("mm/day".to_string())),
        ]);
        let result = Missing::from_attributes(&attrs).unwrap();
        assert_eq!(
            vec![
                Missing::MissingValue(-9999.0),
                Missing::MissingValues(vec![-999.0, -99.0])
            ],
            result
        );
    }

    #[test]
    fn test_from_attributes_valid_min_max() {
        let attrs = attributes(&[
            ("valid_min", AttrValue::Number(0.0)),
            ("valid_max", AttrValue::Number(1000.0)),
        ]);
        let result = Missing::from_attributes(&attrs).unwrap();
        assert_eq!(vec![Missing::ValidRange(0.0, 1000.0)], result);

        let attrs = attributes(&[("valid_min", AttrValue::Number(0.0))]);
        let result = Missing::from_attributes(&attrs).unwrap();
        assert_eq!(vec![Missing::ValidMin(0.0)], result);
    }

    #[test]
    fn test_from_attributes_valid_range() {
        let attrs = attributes(&[("valid_range", AttrValue::Numbers(vec![0.0, 500.0]))]);
        let result = Missing::from_attributes(&attrs).unwrap();
        assert_eq!(vec![Missing::ValidRange(0.0, 500.0)], result);
    }

    #[test]
    #[should_panic(expected = "Missing data valid range must contain two numbers")]
    fn test_from_attributes_valid_range_wrong_length() {
        let attrs = attributes(&[("valid_range", AttrValue::Numbers(vec![0.0]))]);
        Missing::from_attributes(&attrs).unwrap();
    }

    #[test]
    #[should_panic(expected = "Missing data attribute must be numeric")]
    fn test_from_attributes_text_fill_value() {
        let attrs = attributes(&[("_FillValue", AttrValue::Text("NaN".to_string()))]);
        Missing::from_attributes(&attrs).unwrap();
    }

    #[test]
    #[should_panic(expected = "Missing data valid range min must be less than max")]
    fn test_from_attributes_inverted_range() {
        let attrs = attributes(&[("valid_range", AttrValue::Numbers(vec![10.0, 0.0]))]);
        Missing::from_attributes(&attrs).unwrap();
    }
}

//! Dataset readers.
//!
//! A [DatasetReader] turns the bytes or path of an input file into a raw [Dataset]. Readers do
//! not interpret CF attributes; the [loader](crate::loader) does that uniformly for every format.
//!
//! The default format is JSON:
//!
//! ```json
//! {
//!   "coordinates": [
//!     {"name": "time", "values": ["2001-06-01", "2001-06-02"]},
//!     {"name": "lat", "values": [10.0, 10.5]},
//!     {"name": "lon", "values": [80.0, 80.5, 81.0]}
//!   ],
//!   "variables": [
//!     {
//!       "name": "pr",
//!       "dims": ["time", "lat", "lon"],
//!       "data": [0.1, 0.2, null, ...],
//!       "attributes": {"units": "kg m-2 s-1"}
//!     }
//!   ],
//!   "attributes": {"source": "model"}
//! }
//! ```
//!
//! Variable data is flat and row-major, with `null` for missing cells. A variable's shape is taken
//! from its coordinates, or from an explicit `shape` for dimensions without a coordinate. Inputs
//! may be gzip-compressed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::array;
use crate::compression;
use crate::dataset::{Attributes, Coordinate, CoordinateValues, Dataset, Variable};
use crate::error::{PipelineError, PipelineResult};

const OPERATION: &str = "loading gridded data";

/// Trait for dataset readers.
pub trait DatasetReader: std::fmt::Debug {
    /// Read a dataset from the full contents of an input.
    fn read_bytes(&self, data: Vec<u8>) -> PipelineResult<Dataset>;

    /// Read a dataset from a file.
    fn read_path(&self, path: &Path) -> PipelineResult<Dataset> {
        let data = std::fs::read(path).map_err(|err| PipelineError::load(OPERATION, err))?;
        self.read_bytes(data)
    }
}

/// Returns the reader for a file, chosen by extension.
///
/// `.nc`, `.nc4` and `.netcdf` files use the NetCDF reader; everything else is read as JSON.
pub fn reader_for_path(path: &Path) -> PipelineResult<Box<dyn DatasetReader>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match extension.as_deref() {
        Some("nc") | Some("nc4") | Some("netcdf") => netcdf_reader(),
        _ => Ok(Box::new(JsonReader)),
    }
}

#[cfg(feature = "netcdf")]
fn netcdf_reader() -> PipelineResult<Box<dyn DatasetReader>> {
    Ok(Box::new(netcdf_reader::NetcdfReader))
}

#[cfg(not(feature = "netcdf"))]
fn netcdf_reader() -> PipelineResult<Box<dyn DatasetReader>> {
    Err(PipelineError::format(
        OPERATION,
        "NetCDF support is not enabled; rebuild with the netcdf feature",
    ))
}

/// Coordinate values as they appear in JSON
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
enum ValuesDto {
    Numeric(Vec<f64>),
    Dates(Vec<Date>),
}

#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
struct CoordinateDto {
    name: String,
    values: ValuesDto,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
struct VariableDto {
    name: String,
    dims: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shape: Option<Vec<usize>>,
    data: Vec<Option<f64>>,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
struct DatasetDto {
    #[serde(default)]
    coordinates: Vec<CoordinateDto>,
    variables: Vec<VariableDto>,
    #[serde(default)]
    attributes: Attributes,
}

/// Reader for the JSON dataset format
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonReader;

impl JsonReader {
    fn convert(dto: DatasetDto) -> PipelineResult<Dataset> {
        let coordinates: Vec<Coordinate> = dto
            .coordinates
            .into_iter()
            .map(|c| Coordinate {
                name: c.name,
                values: match c.values {
                    ValuesDto::Numeric(values) => CoordinateValues::Numeric(values),
                    ValuesDto::Dates(values) => CoordinateValues::Time(values),
                },
                attributes: c.attributes,
            })
            .collect();
        let variables = dto
            .variables
            .into_iter()
            .map(|v| {
                let shape = match v.shape {
                    Some(shape) => shape,
                    None => v
                        .dims
                        .iter()
                        .map(|dim| {
                            coordinates
                                .iter()
                                .find(|c| &c.name == dim)
                                .map(Coordinate::len)
                                .ok_or_else(|| {
                                    PipelineError::format(
                                        OPERATION,
                                        format!(
                                            "variable {} needs a shape: dimension {} has no coordinate",
                                            v.name, dim
                                        ),
                                    )
                                })
                        })
                        .collect::<PipelineResult<Vec<usize>>>()?,
                };
                let data = v.data.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect();
                let data = array::build_array_from_shape(&shape, data)
                    .map_err(|err| PipelineError::load(OPERATION, err))?;
                Ok(Variable {
                    name: v.name,
                    dims: v.dims,
                    data,
                    attributes: v.attributes,
                })
            })
            .collect::<PipelineResult<Vec<Variable>>>()?;
        Dataset::new(coordinates, variables, dto.attributes)
    }
}

impl DatasetReader for JsonReader {
    fn read_bytes(&self, data: Vec<u8>) -> PipelineResult<Dataset> {
        let data = compression::decompress_if_needed(data)
            .map_err(|err| PipelineError::load(OPERATION, err))?;
        let dto: DatasetDto =
            serde_json::from_slice(&data).map_err(|err| PipelineError::load(OPERATION, err))?;
        Self::convert(dto)
    }
}

/// Serialise a dataset to the JSON format.
///
/// Missing cells are written as `null`.
pub fn to_json(dataset: &Dataset) -> Result<String, serde_json::Error> {
    let dto = DatasetDto {
        coordinates: dataset
            .coordinates()
            .iter()
            .map(|c| CoordinateDto {
                name: c.name.clone(),
                values: match &c.values {
                    CoordinateValues::Numeric(values) => ValuesDto::Numeric(values.clone()),
                    CoordinateValues::Time(values) => ValuesDto::Dates(values.clone()),
                },
                attributes: c.attributes.clone(),
            })
            .collect(),
        variables: dataset
            .variables()
            .iter()
            .map(|v| VariableDto {
                name: v.name.clone(),
                dims: v.dims.clone(),
                shape: None,
                data: v
                    .data
                    .iter()
                    .map(|x| if x.is_nan() { None } else { Some(*x) })
                    .collect(),
                attributes: v.attributes.clone(),
            })
            .collect(),
        attributes: dataset.attributes.clone(),
    };
    serde_json::to_string(&dto)
}

#[cfg(feature = "netcdf")]
mod netcdf_reader {
    use super::*;

    use netcdf::AttributeValue;

    use crate::dataset::AttrValue;
    use crate::error::LoadCause;

    fn load_error(err: netcdf::Error) -> PipelineError {
        PipelineError::load(OPERATION, LoadCause::Netcdf(err))
    }

    /// Convert a NetCDF attribute to an [AttrValue]. Unsupported types are dropped.
    fn attr_value(value: AttributeValue) -> Option<AttrValue> {
        let numbers = |values: Vec<f64>| {
            if values.len() == 1 {
                AttrValue::Number(values[0])
            } else {
                AttrValue::Numbers(values)
            }
        };
        let value = match value {
            AttributeValue::Str(text) => AttrValue::Text(text),
            AttributeValue::Double(x) => AttrValue::Number(x),
            AttributeValue::Float(x) => AttrValue::Number(x.into()),
            AttributeValue::Int(x) => AttrValue::Number(x.into()),
            AttributeValue::Short(x) => AttrValue::Number(x.into()),
            AttributeValue::Schar(x) => AttrValue::Number(x.into()),
            AttributeValue::Uchar(x) => AttrValue::Number(x.into()),
            AttributeValue::Doubles(xs) => numbers(xs),
            AttributeValue::Floats(xs) => numbers(xs.into_iter().map(f64::from).collect()),
            AttributeValue::Ints(xs) => numbers(xs.into_iter().map(f64::from).collect()),
            AttributeValue::Shorts(xs) => numbers(xs.into_iter().map(f64::from).collect()),
            _ => return None,
        };
        Some(value)
    }

    fn attributes<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attributes {
        attrs
            .filter_map(|attr| {
                let name = attr.name().to_string();
                let value = attr.value().ok().and_then(attr_value)?;
                Some((name, value))
            })
            .collect()
    }

    /// Reader for NetCDF files
    ///
    /// One-dimensional variables named after their dimension are coordinates; all other
    /// variables are data variables.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct NetcdfReader;

    impl DatasetReader for NetcdfReader {
        fn read_bytes(&self, _data: Vec<u8>) -> PipelineResult<Dataset> {
            Err(PipelineError::format(
                OPERATION,
                "NetCDF input must be read from a path",
            ))
        }

        fn read_path(&self, path: &Path) -> PipelineResult<Dataset> {
            let file = netcdf::open(path).map_err(load_error)?;
            let mut coordinates = vec![];
            let mut variables = vec![];
            for var in file.variables() {
                let name = var.name();
                let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
                let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
                let values: Vec<f64> = var.get_values::<f64, _>(..).map_err(load_error)?;
                let attrs = attributes(var.attributes());
                if dims.len() == 1 && dims[0] == name {
                    coordinates.push(Coordinate {
                        name,
                        values: CoordinateValues::Numeric(values),
                        attributes: attrs,
                    });
                } else {
                    let data = array::build_array_from_shape(&shape, values)
                        .map_err(|err| PipelineError::load(OPERATION, err))?;
                    variables.push(Variable {
                        name,
                        dims,
                        data,
                        attributes: attrs,
                    });
                }
            }
            Dataset::new(coordinates, variables, attributes(file.attributes()))
        }
    }
}

#[cfg(feature = "netcdf")]
pub use netcdf_reader::NetcdfReader;

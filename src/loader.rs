//! Grid loader.
//!
//! Reads a dataset, applies CF conventions and clips it to the study area.

use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::array;
use crate::config::{BoundingBox, STUDY_AREA};
use crate::coords::{self, LOADER_LAT_ALIASES, LOADER_LON_ALIASES};
use crate::dataset::{Coordinate, CoordinateValues, Dataset, Variable};
use crate::error::{PipelineError, PipelineResult};
use crate::reader::{self, DatasetReader};

const OPERATION: &str = "loading gridded data";

/// Load a dataset from a stream.
///
/// The whole stream is read before parsing.
#[tracing::instrument(level = "DEBUG", skip(reader, source))]
pub fn load<R: Read>(reader: &dyn DatasetReader, mut source: R) -> PipelineResult<Dataset> {
    let mut data = vec![];
    source
        .read_to_end(&mut data)
        .map_err(|err| PipelineError::load(OPERATION, err))?;
    let dataset = reader.read_bytes(data)?;
    prepare(dataset, &STUDY_AREA)
}

/// Load a dataset from a file, choosing the reader by file extension.
#[tracing::instrument(level = "DEBUG")]
pub fn load_path(path: &Path) -> PipelineResult<Dataset> {
    let reader = reader::reader_for_path(path)?;
    let dataset = reader.read_path(path)?;
    prepare(dataset, &STUDY_AREA)
}

/// Decode CF attributes, then clip to `bounds`.
fn prepare(dataset: Dataset, bounds: &BoundingBox) -> PipelineResult<Dataset> {
    let (coordinates, variables, attributes) = dataset.into_parts();
    let coordinates = coordinates
        .into_iter()
        .map(|c| {
            let name = c.name.clone();
            c.decode_time()
                .map_err(|reason| PipelineError::format(OPERATION, format!("{name}: {reason}")))
        })
        .collect::<PipelineResult<Vec<Coordinate>>>()?;
    let variables = variables
        .into_iter()
        .map(Variable::unpack)
        .collect::<PipelineResult<Vec<Variable>>>()?;
    let dataset = Dataset::new(coordinates, variables, attributes)?;
    Ok(clip(dataset, bounds))
}

/// Clip a dataset to `bounds`, bounds included.
///
/// If the spatial coordinates cannot be identified, or no cell lies within the bounds, the dataset
/// is returned unclipped with a warning.
pub fn clip(dataset: Dataset, bounds: &BoundingBox) -> Dataset {
    let lat_name = coords::resolve(dataset.coordinate_names(), &LOADER_LAT_ALIASES);
    let lon_name = coords::resolve(dataset.coordinate_names(), &LOADER_LON_ALIASES);
    let (Some(lat_name), Some(lon_name)) = (lat_name, lon_name) else {
        warn!("Could not identify lat/lon coordinates; returning unclipped data");
        return dataset;
    };
    let lat = dataset.coordinate(lat_name).and_then(Coordinate::as_numeric);
    let lon = dataset.coordinate(lon_name).and_then(Coordinate::as_numeric);
    let (Some(lat), Some(lon)) = (lat, lon) else {
        warn!("Spatial coordinates are not numeric; returning unclipped data");
        return dataset;
    };
    let lat_range = array::matching_range(lat, |v| bounds.contains_lat(v));
    let lon_range = array::matching_range(lon, |v| bounds.contains_lon(v));
    let (Some(lat_range), Some(lon_range)) = (lat_range, lon_range) else {
        warn!("Dataset does not intersect the study area; returning unclipped data");
        return dataset;
    };
    debug!(
        lat = lat_name,
        lon = lon_name,
        lat_cells = lat_range.len(),
        lon_cells = lon_range.len(),
        "Clipping to study area"
    );

    let (lat_name, lon_name) = (lat_name.to_string(), lon_name.to_string());
    let ranges = [(lat_name, lat_range), (lon_name, lon_range)];
    let (coordinates, variables, attributes) = dataset.into_parts();
    let coordinates = coordinates
        .into_iter()
        .map(|c| match ranges.iter().find(|(name, _)| *name == c.name) {
            Some((_, range)) => {
                let values = match c.values {
                    CoordinateValues::Numeric(values) => {
                        CoordinateValues::Numeric(values[range.clone()].to_vec())
                    }
                    CoordinateValues::Time(values) => {
                        CoordinateValues::Time(values[range.clone()].to_vec())
                    }
                };
                Coordinate { values, ..c }
            }
            None => c,
        })
        .collect();
    let variables = variables
        .into_iter()
        .map(|v| {
            let selection: Vec<_> = ranges
                .iter()
                .filter_map(|(name, range)| v.axis_of(name).map(|axis| (axis, range.clone())))
                .collect();
            let data = array::select_ranges(&v.data, &selection);
            Variable { data, ..v }
        })
        .collect();
    Dataset::from_parts_unchecked(coordinates, variables, attributes)
}

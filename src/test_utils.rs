use crate::dataset::{AttrValue, Attributes, Coordinate, Dataset, Variable};
use crate::models::*;
use crate::units::Units;

use ndarray::{Array2, Array3, ArrayD, IxDyn};
use time::{Date, Month};

pub(crate) use crate::demo::jjas_dates;

fn axis(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

/// Create a GriddedField with every cell set to `value`.
///
/// A single step field is undated; otherwise it is yearly from 2000.
pub(crate) fn constant_field(
    value: f64,
    nt: usize,
    nlat: usize,
    nlon: usize,
    units: Units,
) -> GriddedField {
    let time = if nt == 1 {
        TimeAxis::None
    } else {
        TimeAxis::Yearly((2000..).take(nt).collect())
    };
    GriddedField::new(
        Some("pr".to_string()),
        units,
        axis(nlat),
        axis(nlon),
        time,
        Array3::from_elem((nt, nlat, nlon), value),
    )
    .unwrap()
}

/// Create a daily GriddedField with every cell set to `value`.
pub(crate) fn daily_field(
    dates: Vec<Date>,
    nlat: usize,
    nlon: usize,
    value: f64,
    units: Units,
) -> GriddedField {
    let data = Array3::from_elem((dates.len(), nlat, nlon), value);
    GriddedField::new(
        Some("pr".to_string()),
        units,
        axis(nlat),
        axis(nlon),
        TimeAxis::Daily(dates),
        data,
    )
    .unwrap()
}

fn variable(name: &str, dims: &[&str], data: ArrayD<f64>, attributes: Attributes) -> Variable {
    Variable {
        name: name.to_string(),
        dims: dims.iter().map(|d| d.to_string()).collect(),
        data,
        attributes,
    }
}

/// Create a 2-D Dataset whose variable `var` holds its flat index at each cell.
pub(crate) fn spatial_dataset(
    lat_name: &str,
    lat: Vec<f64>,
    lon_name: &str,
    lon: Vec<f64>,
    var: &str,
) -> Dataset {
    let nlon = lon.len();
    let data = Array2::from_shape_fn((lat.len(), nlon), |(i, j)| (i * nlon + j) as f64);
    Dataset::new(
        vec![
            Coordinate::numeric(lat_name, lat),
            Coordinate::numeric(lon_name, lon),
        ],
        vec![variable(
            var,
            &[lat_name, lon_name],
            data.into_dyn(),
            Attributes::new(),
        )],
        Attributes::new(),
    )
    .unwrap()
}

/// Create a 2-D Dataset whose variable `pr` is `2 * lat + lon`.
pub(crate) fn linear_dataset(lat: &[f64], lon: &[f64]) -> Dataset {
    let data = Array2::from_shape_fn((lat.len(), lon.len()), |(i, j)| 2.0 * lat[i] + lon[j]);
    Dataset::new(
        vec![
            Coordinate::numeric("lat", lat.to_vec()),
            Coordinate::numeric("lon", lon.to_vec()),
        ],
        vec![variable("pr", &["lat", "lon"], data.into_dyn(), Attributes::new())],
        Attributes::new(),
    )
    .unwrap()
}

/// Create a (time, lat, lon) Dataset of `n_days` days from 1 June of `year`, every cell `value`.
pub(crate) fn daily_dataset(
    var: &str,
    year: i32,
    n_days: usize,
    lat: &[f64],
    lon: &[f64],
    value: f64,
    units: &str,
) -> Dataset {
    let start = Date::from_calendar_date(year, Month::June, 1).unwrap();
    let dates: Vec<Date> = std::iter::successors(Some(start), |d| d.next_day())
        .take(n_days)
        .collect();
    let data = Array3::from_elem((dates.len(), lat.len(), lon.len()), value);
    let mut attributes = Attributes::new();
    attributes.insert("units".to_string(), AttrValue::Text(units.to_string()));
    Dataset::new(
        vec![
            Coordinate::time("time", dates),
            Coordinate::numeric("lat", lat.to_vec()),
            Coordinate::numeric("lon", lon.to_vec()),
        ],
        vec![variable(
            var,
            &["time", "lat", "lon"],
            data.into_dyn(),
            attributes,
        )],
        Attributes::new(),
    )
    .unwrap()
}

/// Return `dataset` with one cell of variable `var` set to `value`.
pub(crate) fn with_value(dataset: Dataset, var: &str, index: &[usize], value: f64) -> Dataset {
    let (coordinates, mut variables, attributes) = dataset.into_parts();
    let variable = variables.iter_mut().find(|v| v.name == var).unwrap();
    variable.data[IxDyn(index)] = value;
    Dataset::from_parts_unchecked(coordinates, variables, attributes)
}

/// Return `dataset` with an extra zero-filled variable over `dims`.
pub(crate) fn with_variable(dataset: Dataset, name: &str, dims: &[&str]) -> Dataset {
    let shape: Vec<usize> = dims
        .iter()
        .map(|d| dataset.coordinate(d).unwrap().len())
        .collect();
    let data = ArrayD::zeros(IxDyn(&shape));
    let (coordinates, mut variables, attributes) = dataset.into_parts();
    variables.push(variable(name, dims, data, Attributes::new()));
    Dataset::new(coordinates, variables, attributes).unwrap()
}

//! Functions and utilities for working with [ndarray] objects.

use std::ops::Range;

use ndarray::prelude::*;
use ndarray::{ErrorKind, ShapeError, Slice};

/// Returns an owned n-d array built from row-major data.
///
/// # Arguments
///
/// * `shape`: The shape of the array
/// * `data`: Row-major data, one value per element of `shape`
pub fn build_array_from_shape(shape: &[usize], data: Vec<f64>) -> Result<ArrayD<f64>, ShapeError> {
    ArrayD::from_shape_vec(IxDyn(shape), data)
}

/// Returns the range of indices between the first and last value satisfying `keep`.
///
/// For a monotonic coordinate and an interval predicate, every index in the range satisfies it.
pub fn matching_range<F>(values: &[f64], keep: F) -> Option<Range<usize>>
where
    F: Fn(f64) -> bool,
{
    let start = values.iter().position(|v| keep(*v))?;
    let end = values.iter().rposition(|v| keep(*v))? + 1;
    Some(start..end)
}

/// Returns a copy of `array` restricted to the given index range along each listed axis.
///
/// Axes not listed are kept whole.
pub fn select_ranges(array: &ArrayD<f64>, selection: &[(usize, Range<usize>)]) -> ArrayD<f64> {
    let mut view = array.view();
    for (axis, range) in selection {
        view.slice_axis_inplace(Axis(*axis), Slice::from(range.clone()));
    }
    view.to_owned()
}

/// Returns `array` as a 3-D (time, lat, lon) array.
///
/// `lat_axis` and `lon_axis` index the spatial axes of `array`. If `time_axis` is `None` the
/// array must be 2-D and a length-1 time axis is inserted.
pub fn to_canonical(
    array: ArrayD<f64>,
    time_axis: Option<usize>,
    lat_axis: usize,
    lon_axis: usize,
) -> Result<Array3<f64>, ShapeError> {
    let expected_ndim = if time_axis.is_some() { 3 } else { 2 };
    let repeated =
        lat_axis == lon_axis || time_axis.map_or(false, |t| t == lat_axis || t == lon_axis);
    if array.ndim() != expected_ndim || repeated {
        return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape));
    }
    let array = match time_axis {
        Some(time_axis) => array.permuted_axes(IxDyn(&[time_axis, lat_axis, lon_axis])),
        None => array
            .permuted_axes(IxDyn(&[lat_axis, lon_axis]))
            .insert_axis(Axis(0)),
    };
    array.into_dimensionality::<Ix3>()
}

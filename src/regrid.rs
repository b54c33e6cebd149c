//! Regridding onto a common lat/lon grid.
//!
//! Both datasets are interpolated onto the same target grid spanning the study area, rather than
//! one onto the other's native grid, so that neither source's resolution is favoured.

use ndarray::{Array3, ArrayView2, Axis};
use tracing::{debug, warn};

use crate::array;
use crate::config::{BoundingBox, STUDY_AREA};
use crate::coords::{self, GEOGRAPHIC_LAT_ALIASES, GEOGRAPHIC_LON_ALIASES};
use crate::dataset::{Coordinate, CoordinateValues, Dataset, Variable};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{GriddedField, RegriddedPair, TimeAxis};

const REGRID: &str = "regridding data";
const INTERPOLATE: &str = "interpolating data";

/// Returns a target axis from `min` in steps of `resolution`, up to and including `max`.
///
/// A tolerance of 1e-9 steps absorbs floating point error so that `max` itself is included when
/// the span is a whole number of steps.
pub fn target_axis(min: f64, max: f64, resolution: f64) -> Vec<f64> {
    let steps = ((max - min) / resolution + 1e-9).floor() as usize;
    (0..=steps).map(|i| min + i as f64 * resolution).collect()
}

/// Interpolate both datasets onto a common grid over the study area.
#[tracing::instrument(level = "DEBUG", skip(observed, projection))]
pub fn regrid(
    observed: &Dataset,
    projection: &Dataset,
    resolution: f64,
) -> PipelineResult<RegriddedPair> {
    regrid_within(observed, projection, resolution, &STUDY_AREA)
}

/// Interpolate both datasets onto a common grid over `bounds`.
pub fn regrid_within(
    observed: &Dataset,
    projection: &Dataset,
    resolution: f64,
    bounds: &BoundingBox,
) -> PipelineResult<RegriddedPair> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(PipelineError::regrid(
            REGRID,
            format!("resolution must be positive, got {resolution}"),
        ));
    }
    let lat = target_axis(bounds.lat_min, bounds.lat_max, resolution);
    let lon = target_axis(bounds.lon_min, bounds.lon_max, resolution);
    debug!(lat = lat.len(), lon = lon.len(), "Built target grid");
    let observed = interpolate_to_grid(observed, &lat, &lon)?;
    let projection = interpolate_to_grid(projection, &lat, &lon)?;
    Ok(RegriddedPair {
        observed,
        projection,
        lat,
        lon,
    })
}

/// Position of a target point between two source points
#[derive(Clone, Copy, Debug, PartialEq)]
struct Weight {
    lower: usize,
    upper: usize,
    /// Fraction of the distance from `lower` to `upper`
    fraction: f64,
}

/// Returns interpolation weights of each target point on an ascending source axis.
///
/// Targets outside the source extent have no weight.
fn weights(source: &[f64], target: &[f64]) -> Vec<Option<Weight>> {
    let (first, last) = match (source.first(), source.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return vec![None; target.len()],
    };
    target
        .iter()
        .map(|&t| {
            if t < first || t > last {
                return None;
            }
            if source.len() == 1 {
                return Some(Weight {
                    lower: 0,
                    upper: 0,
                    fraction: 0.0,
                });
            }
            let lower = source
                .partition_point(|&s| s <= t)
                .saturating_sub(1)
                .min(source.len() - 2);
            let upper = lower + 1;
            let fraction = (t - source[lower]) / (source[upper] - source[lower]);
            Some(Weight {
                lower,
                upper,
                fraction,
            })
        })
        .collect()
}

/// Bilinear interpolation.
///
/// If any of the four surrounding values is missing, the result is missing.
fn bilinear(data: &ArrayView2<f64>, y: Weight, x: Weight) -> f64 {
    let v00 = data[[y.lower, x.lower]];
    let v01 = data[[y.lower, x.upper]];
    let v10 = data[[y.upper, x.lower]];
    let v11 = data[[y.upper, x.upper]];
    if v00.is_nan() || v01.is_nan() || v10.is_nan() || v11.is_nan() {
        return f64::NAN;
    }
    let top = v00 * (1.0 - x.fraction) + v01 * x.fraction;
    let bottom = v10 * (1.0 - x.fraction) + v11 * x.fraction;
    top * (1.0 - y.fraction) + bottom * y.fraction
}

/// Interpolate a (time, lat, lon) array onto target weights.
fn interpolate(
    data: &Array3<f64>,
    lat_weights: &[Option<Weight>],
    lon_weights: &[Option<Weight>],
) -> Array3<f64> {
    let shape = (data.len_of(Axis(0)), lat_weights.len(), lon_weights.len());
    let mut result = Array3::from_elem(shape, f64::NAN);
    for (mut out, source) in result.outer_iter_mut().zip(data.outer_iter()) {
        for (i, y) in lat_weights.iter().enumerate() {
            let Some(y) = y else { continue };
            for (j, x) in lon_weights.iter().enumerate() {
                let Some(x) = x else { continue };
                out[[i, j]] = bilinear(&source, *y, *x);
            }
        }
    }
    result
}

/// Returns a coordinate's values in ascending order and whether they were reversed.
fn ascending(coordinate: &Coordinate) -> PipelineResult<(Vec<f64>, bool)> {
    let values = coordinate.as_numeric().ok_or_else(|| {
        PipelineError::regrid(
            INTERPOLATE,
            format!("coordinate {} is not numeric", coordinate.name),
        )
    })?;
    let descending = values.len() > 1 && values[0] > values[values.len() - 1];
    let mut values = values.to_vec();
    if descending {
        values.reverse();
    }
    Ok((values, descending))
}

/// Returns the time axis of a variable dimension, if it has a supported one.
fn time_axis(dataset: &Dataset, dim: &str) -> Option<TimeAxis> {
    let coordinate = dataset.coordinate(dim)?;
    match &coordinate.values {
        CoordinateValues::Time(dates) => Some(TimeAxis::Daily(dates.clone())),
        CoordinateValues::Numeric(values) if dim.eq_ignore_ascii_case("year") => {
            let years: Vec<i32> = values
                .iter()
                .filter(|y| y.fract() == 0.0)
                .map(|y| *y as i32)
                .collect();
            (years.len() == values.len()).then_some(TimeAxis::Yearly(years))
        }
        CoordinateValues::Numeric(_) => None,
    }
}

/// Reorder a variable to (time, lat, lon), if it has that structure.
fn canonical_field(
    dataset: &Dataset,
    variable: &Variable,
    lat_name: &str,
    lon_name: &str,
) -> PipelineResult<Option<(TimeAxis, Array3<f64>)>> {
    let (Some(lat_axis), Some(lon_axis)) = (variable.axis_of(lat_name), variable.axis_of(lon_name))
    else {
        debug!(variable = %variable.name, "Skipping variable without lat/lon dimensions");
        return Ok(None);
    };
    let others: Vec<usize> = (0..variable.dims.len())
        .filter(|axis| *axis != lat_axis && *axis != lon_axis)
        .collect();
    let (time, time_index) = match others.as_slice() {
        [] => (TimeAxis::None, None),
        [axis] => match time_axis(dataset, &variable.dims[*axis]) {
            Some(time) => (time, Some(*axis)),
            None => {
                warn!(
                    variable = %variable.name,
                    dim = %variable.dims[*axis],
                    "Skipping variable whose extra dimension is not a time axis"
                );
                return Ok(None);
            }
        },
        _ => {
            warn!(variable = %variable.name, "Skipping variable with more than 3 dimensions");
            return Ok(None);
        }
    };
    let data = array::to_canonical(variable.data.clone(), time_index, lat_axis, lon_axis)
        .map_err(|err| PipelineError::regrid(INTERPOLATE, err.to_string()))?;
    Ok(Some((time, data)))
}

/// Interpolate every gridded variable of a dataset onto the target grid.
///
/// Coordinates are renamed to `lat`/`lon` whatever their input names. Variables without both
/// spatial dimensions are skipped.
pub fn interpolate_to_grid(
    dataset: &Dataset,
    lat: &[f64],
    lon: &[f64],
) -> PipelineResult<Vec<GriddedField>> {
    let lat_name = coords::resolve(dataset.coordinate_names(), &GEOGRAPHIC_LAT_ALIASES);
    let lon_name = coords::resolve(dataset.coordinate_names(), &GEOGRAPHIC_LON_ALIASES);
    let (Some(lat_name), Some(lon_name)) = (lat_name, lon_name) else {
        return Err(PipelineError::regrid(
            INTERPOLATE,
            "could not identify lat/lon coordinates",
        ));
    };
    let (source_lat, flip_lat) = ascending(dataset.coordinate(lat_name).ok_or_else(|| {
        PipelineError::regrid(INTERPOLATE, "could not identify lat/lon coordinates")
    })?)?;
    let (source_lon, flip_lon) = ascending(dataset.coordinate(lon_name).ok_or_else(|| {
        PipelineError::regrid(INTERPOLATE, "could not identify lat/lon coordinates")
    })?)?;
    let lat_weights = weights(&source_lat, lat);
    let lon_weights = weights(&source_lon, lon);

    let mut fields = vec![];
    for variable in dataset.variables() {
        let Some((time, mut data)) = canonical_field(dataset, variable, lat_name, lon_name)? else {
            continue;
        };
        if flip_lat {
            data.invert_axis(Axis(1));
        }
        if flip_lon {
            data.invert_axis(Axis(2));
        }
        let data = interpolate(&data, &lat_weights, &lon_weights);
        let field = GriddedField::new(
            Some(variable.name.clone()),
            variable.units(),
            lat.to_vec(),
            lon.to_vec(),
            time,
            data,
        )
        .ok_or_else(|| {
            PipelineError::regrid(INTERPOLATE, format!("variable {} is empty", variable.name))
        })?;
        fields.push(field);
    }

    if !fields.is_empty() && fields.iter().all(|f| f.data.iter().all(|x| x.is_nan())) {
        return Err(PipelineError::regrid(
            REGRID,
            "no overlap between the source grid and the target grid",
        ));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use crate::units::Units;

    #[test]
    fn test_target_axis_inclusive() {
        let lat = target_axis(6.0, 37.0, 0.25);
        assert_eq!(125, lat.len());
        assert_eq!(6.0, lat[0]);
        assert_eq!(37.0, lat[124]);
        let lon = target_axis(68.0, 97.0, 0.25);
        assert_eq!(117, lon.len());
    }

    #[test]
    fn test_target_axis_never_exceeds_max() {
        let lat = target_axis(6.0, 37.0, 0.3);
        assert!(*lat.last().unwrap() <= 37.0);
        assert_eq!(104, lat.len());
    }

    #[test]
    fn test_weights() {
        let source = [0.0, 1.0, 2.0];
        let w = weights(&source, &[-0.5, 0.0, 0.25, 2.0, 2.5]);
        assert_eq!(None, w[0]);
        assert_eq!(
            Some(Weight {
                lower: 0,
                upper: 1,
                fraction: 0.0
            }),
            w[1]
        );
        assert_eq!(
            Some(Weight {
                lower: 0,
                upper: 1,
                fraction: 0.25
            }),
            w[2]
        );
        assert_eq!(
            Some(Weight {
                lower: 1,
                upper: 2,
                fraction: 1.0
            }),
            w[3]
        );
        assert_eq!(None, w[4]);
    }

    #[test]
    fn test_weights_single_point() {
        let w = weights(&[5.0], &[4.0, 5.0]);
        assert_eq!(None, w[0]);
        assert_eq!(Some(0), w[1].map(|w| w.lower));
    }

    #[test]
    fn test_bilinear_linear_field_is_exact() {
        // f(lat, lon) = 2 * lat + lon is reproduced exactly by bilinear interpolation.
        let dataset = test_utils::linear_dataset(&[0.0, 1.0, 2.0], &[10.0, 11.0, 12.0]);
        let fields = interpolate_to_grid(&dataset, &[0.5, 1.5], &[10.25, 11.75]).unwrap();
        let data = &fields[0].data;
        assert_eq!(&[1, 2, 2], data.shape());
        assert!((data[[0, 0, 0]] - (1.0 + 10.25)).abs() < 1e-12);
        assert!((data[[0, 1, 1]] - (3.0 + 11.75)).abs() < 1e-12);
    }

    #[test]
    fn test_descending_source() {
        let ascending = test_utils::linear_dataset(&[0.0, 1.0, 2.0], &[10.0, 11.0]);
        let descending = test_utils::linear_dataset(&[2.0, 1.0, 0.0], &[11.0, 10.0]);
        let a = interpolate_to_grid(&ascending, &[0.5, 1.5], &[10.5]).unwrap();
        let d = interpolate_to_grid(&descending, &[0.5, 1.5], &[10.5]).unwrap();
        assert_eq!(a[0].data, d[0].data);
    }

    #[test]
    fn test_outside_extent_is_missing() {
        let dataset = test_utils::linear_dataset(&[0.0, 1.0], &[10.0, 11.0]);
        let fields = interpolate_to_grid(&dataset, &[0.5, 5.0], &[10.5]).unwrap();
        assert!(!fields[0].data[[0, 0, 0]].is_nan());
        assert!(fields[0].data[[0, 1, 0]].is_nan());
    }

    #[test]
    fn test_missing_corner_propagates() {
        let mut dataset = test_utils::linear_dataset(&[0.0, 1.0, 2.0], &[10.0, 11.0]);
        dataset = test_utils::with_value(dataset, "pr", &[0, 1], f64::NAN);
        let fields = interpolate_to_grid(&dataset, &[0.5, 1.5], &[10.5]).unwrap();
        // Only the first target point has the missing value among its corners.
        assert!(fields[0].data[[0, 0, 0]].is_nan());
        assert!((fields[0].data[[0, 1, 0]] - 13.5).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "could not identify lat/lon coordinates")]
    fn test_unresolved_coordinates() {
        let dataset = test_utils::spatial_dataset("rlat", vec![0.0, 1.0], "rlon", vec![0.0], "pr");
        interpolate_to_grid(&dataset, &[0.5], &[0.0]).unwrap();
    }

    #[test]
    #[should_panic(expected = "no overlap between the source grid and the target grid")]
    fn test_no_overlap() {
        let dataset = test_utils::linear_dataset(&[0.0, 1.0], &[10.0, 11.0]);
        interpolate_to_grid(&dataset, &[50.0], &[50.0]).unwrap();
    }

    #[test]
    #[should_panic(expected = "resolution must be positive")]
    fn test_non_positive_resolution() {
        let dataset = test_utils::linear_dataset(&[6.0, 7.0], &[68.0, 69.0]);
        regrid(&dataset, &dataset, 0.0).unwrap();
    }

    /// Two days of flux covering the whole study area.
    fn flux_projection() -> Dataset {
        let lat = [0.0, 40.0];
        let lon = [60.0, 100.0];
        test_utils::daily_dataset("pr", 2050, 2, &lat, &lon, 5e-5, "kg m-2 s-1")
    }

    #[test]
    fn test_regrid_pair_shares_coordinates() {
        let observed = test_utils::daily_dataset(
            "rainfall",
            2001,
            3,
            &[6.0, 20.0, 37.0],
            &[68.0, 97.0],
            5.0,
            "mm/day",
        );
        let projection = flux_projection();
        for resolution in [0.25, 1.0, 2.5, 7.0] {
            let pair = regrid(&observed, &projection, resolution).unwrap();
            for field in pair.observed.iter().chain(pair.projection.iter()) {
                assert_eq!(pair.lat, field.lat);
                assert_eq!(pair.lon, field.lon);
                assert_eq!(
                    (field.time.len(), pair.lat.len(), pair.lon.len()),
                    field.data.dim()
                );
            }
        }
    }

    #[test]
    fn test_regrid_keeps_units_and_time() {
        let projection = flux_projection();
        let pair = regrid(&projection, &projection, 1.0).unwrap();
        let field = &pair.projection[0];
        assert_eq!(Some("pr".to_string()), field.variable);
        assert_eq!(Units::Flux, field.units);
        assert!(matches!(&field.time, TimeAxis::Daily(dates) if dates.len() == 2));
        assert!((field.data[[0, 0, 0]] - 5e-5).abs() < 1e-15);
    }

    #[test]
    fn test_variable_without_time_axis() {
        let dataset = test_utils::linear_dataset(&[6.0, 37.0], &[68.0, 97.0]);
        let pair = regrid(&dataset, &dataset, 1.0).unwrap();
        assert_eq!(TimeAxis::None, pair.observed[0].time);
        assert_eq!(1, pair.observed[0].data.len_of(Axis(0)));
    }

    #[test]
    fn test_skips_non_spatial_variables() {
        let dataset = test_utils::with_variable(
            test_utils::linear_dataset(&[0.0, 1.0], &[10.0, 11.0]),
            "crs",
            &[],
        );
        let fields = interpolate_to_grid(&dataset, &[0.5], &[10.5]).unwrap();
        assert_eq!(1, fields.len());
    }
}

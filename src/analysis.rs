//! Supplementary analyses: anomalies against a baseline, per-cell linear trends and data quality.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use serde::Serialize;

use crate::dataset::Dataset;
use crate::ensemble::percentile;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{GriddedField, SpatialField, TimeAxis};

const ANOMALIES: &str = "calculating anomalies";
const TREND: &str = "calculating trends";

/// Minimum number of valid steps for a trend
pub const MIN_TREND_STEPS: usize = 3;

/// Anomalies of a series against a baseline
#[derive(Clone, Debug, PartialEq)]
pub struct Anomalies {
    /// Per-cell mean of the baseline over its time axis
    pub baseline_mean: SpatialField,
    /// Series minus the baseline mean
    pub absolute: GriddedField,
    /// Absolute anomalies as a percentage of the baseline mean
    pub percent_change: GriddedField,
}

/// Per-cell least squares trend
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trend {
    /// Change per year for yearly series, per step otherwise
    pub slope: SpatialField,
    pub intercept: SpatialField,
    /// Coefficient of determination
    pub r_squared: SpatialField,
}

/// Completeness and outlier summary of one data variable
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QualityReport {
    pub missing_percentage: f64,
    /// Values below the 0.1th percentile
    pub extreme_low_count: usize,
    /// Values above the 99.9th percentile
    pub extreme_high_count: usize,
    /// Smallest and largest valid value
    pub data_range: [f64; 2],
}

/// Mean of the non-missing values of a lane, or NaN if there are none.
fn nan_mean(lane: ArrayView1<f64>) -> f64 {
    let (total, count) = lane
        .iter()
        .filter(|x| !x.is_nan())
        .fold((0.0, 0_usize), |(total, count), x| (total + x, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

/// Compute anomalies of `series` against the time mean of `baseline`.
///
/// Both fields must share a spatial shape. Cells with a zero baseline mean have no percent change.
#[tracing::instrument(level = "DEBUG", skip(series, baseline))]
pub fn anomalies(series: &GriddedField, baseline: &GriddedField) -> PipelineResult<Anomalies> {
    let (_, n_lat, n_lon) = series.data.dim();
    let (_, b_lat, b_lon) = baseline.data.dim();
    if (n_lat, n_lon) != (b_lat, b_lon) {
        return Err(PipelineError::analysis(
            ANOMALIES,
            format!("series grid {n_lat}x{n_lon} does not match baseline grid {b_lat}x{b_lon}"),
        ));
    }
    let baseline_mean = baseline.data.map_axis(Axis(0), nan_mean);
    let absolute = &series.data - &baseline_mean;
    let mut percent_change = absolute.clone();
    for step in percent_change.axis_iter_mut(Axis(0)) {
        Zip::from(step)
            .and(&baseline_mean)
            .for_each(|anomaly, mean| {
                *anomaly = if *mean == 0.0 {
                    f64::NAN
                } else {
                    *anomaly / mean * 100.0
                }
            });
    }
    Ok(Anomalies {
        baseline_mean: SpatialField(baseline_mean),
        absolute: series.with_data(series.time.clone(), series.units, absolute),
        percent_change: series.with_data(series.time.clone(), series.units, percent_change),
    })
}

/// Ordinary least squares fit of `y` against `x`, skipping steps where `y` is missing.
///
/// Returns `(slope, intercept, r_squared)`, all NaN with fewer than [MIN_TREND_STEPS] valid steps.
/// A constant series has an r² of zero.
fn least_squares(x: &[f64], y: ArrayView1<f64>) -> (f64, f64, f64) {
    let points: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(_, y)| !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();
    if points.len() < MIN_TREND_STEPS {
        return (f64::NAN, f64::NAN, f64::NAN);
    }
    let n = points.len() as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (sxx, syy, sxy) = points.iter().fold((0.0, 0.0, 0.0), |(sxx, syy, sxy), (x, y)| {
        let (dx, dy) = (x - x_mean, y - y_mean);
        (sxx + dx * dx, syy + dy * dy, sxy + dx * dy)
    });
    if sxx == 0.0 {
        return (f64::NAN, f64::NAN, f64::NAN);
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = if syy == 0.0 {
        0.0
    } else {
        sxy * sxy / (sxx * syy)
    };
    (slope, intercept, r_squared)
}

/// Fit a linear trend to every grid cell of `field` along its time axis.
///
/// The regressor is the calendar year for yearly series and the step index otherwise.
#[tracing::instrument(level = "DEBUG", skip(field))]
pub fn trend(field: &GriddedField) -> PipelineResult<Trend> {
    let x: Vec<f64> = match &field.time {
        TimeAxis::None => {
            return Err(PipelineError::analysis(TREND, "field has no time axis"));
        }
        TimeAxis::Yearly(years) => years.iter().map(|y| f64::from(*y)).collect(),
        TimeAxis::Daily(dates) => (0..dates.len()).map(|i| i as f64).collect(),
    };
    let (_, n_lat, n_lon) = field.data.dim();
    let mut slope = Array2::from_elem((n_lat, n_lon), f64::NAN);
    let mut intercept = slope.clone();
    let mut r_squared = slope.clone();
    for ((i, j), s) in slope.indexed_iter_mut() {
        let lane = field.data.slice(ndarray::s![.., i, j]);
        let (fit_slope, fit_intercept, fit_r_squared) = least_squares(&x, lane);
        *s = fit_slope;
        intercept[[i, j]] = fit_intercept;
        r_squared[[i, j]] = fit_r_squared;
    }
    Ok(Trend {
        slope: SpatialField(slope),
        intercept: SpatialField(intercept),
        r_squared: SpatialField(r_squared),
    })
}

/// Summarise missing data and outliers of every data variable in `dataset`.
#[tracing::instrument(level = "DEBUG", skip(dataset))]
pub fn quality_report(dataset: &Dataset) -> BTreeMap<String, QualityReport> {
    dataset
        .variables()
        .iter()
        .map(|variable| {
            let size = variable.data.len();
            let mut valid: Array1<f64> = variable
                .data
                .iter()
                .copied()
                .filter(|x| !x.is_nan())
                .collect();
            let missing_percentage = if size == 0 {
                0.0
            } else {
                (size - valid.len()) as f64 / size as f64 * 100.0
            };
            let low = percentile(&mut valid, 0.1).unwrap_or(f64::NAN);
            let high = percentile(&mut valid, 99.9).unwrap_or(f64::NAN);
            let report = QualityReport {
                missing_percentage,
                extreme_low_count: valid.iter().filter(|x| **x < low).count(),
                extreme_high_count: valid.iter().filter(|x| **x > high).count(),
                data_range: [
                    valid.fold(f64::NAN, |a, b| a.min(*b)),
                    valid.fold(f64::NAN, |a, b| a.max(*b)),
                ],
            };
            (variable.name.clone(), report)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use crate::units::Units;
    use ndarray::Array3;

    fn yearly(years: Vec<i32>, data: Array3<f64>) -> GriddedField {
        let (_, n_lat, n_lon) = data.dim();
        GriddedField::new(
            Some("pr".to_string()),
            Units::MmPerDay,
            (0..n_lat).map(|i| i as f64).collect(),
            (0..n_lon).map(|j| j as f64).collect(),
            TimeAxis::Yearly(years),
            data,
        )
        .unwrap()
    }

    #[test]
    fn test_anomalies() {
        let baseline = yearly(
            vec![1990, 1991],
            Array3::from_shape_vec((2, 1, 3), vec![90.0, 0.0, 4.0, 110.0, 0.0, f64::NAN]).unwrap(),
        );
        let series = yearly(
            vec![2050],
            Array3::from_shape_vec((1, 1, 3), vec![120.0, 5.0, 2.0]).unwrap(),
        );
        let result = anomalies(&series, &baseline).unwrap();
        assert_eq!(100.0, result.baseline_mean.0[[0, 0]]);
        assert_eq!(4.0, result.baseline_mean.0[[0, 2]]);
        assert_eq!(20.0, result.absolute.data[[0, 0, 0]]);
        assert_eq!(5.0, result.absolute.data[[0, 0, 1]]);
        assert_eq!(20.0, result.percent_change.data[[0, 0, 0]]);
        assert!(result.percent_change.data[[0, 0, 1]].is_nan());
        assert_eq!(-50.0, result.percent_change.data[[0, 0, 2]]);
        assert_eq!(TimeAxis::Yearly(vec![2050]), result.percent_change.time);
    }

    #[test]
    #[should_panic(expected = "series grid 2x2 does not match baseline grid 1x3")]
    fn test_anomalies_shape_mismatch() {
        let series = test_utils::constant_field(1.0, 2, 2, 2, Units::MmPerDay);
        let baseline = test_utils::constant_field(1.0, 2, 1, 3, Units::MmPerDay);
        anomalies(&series, &baseline).unwrap();
    }

    #[test]
    fn test_trend_yearly() {
        let years = vec![2000, 2001, 2002, 2003];
        let data = Array3::from_shape_vec(
            (4, 1, 2),
            vec![1.0, 5.0, 3.0, 5.0, 5.0, 5.0, 7.0, 5.0],
        )
        .unwrap();
        let result = trend(&yearly(years, data)).unwrap();
        assert!((result.slope.0[[0, 0]] - 2.0).abs() < 1e-9);
        assert!((result.intercept.0[[0, 0]] + 3999.0).abs() < 1e-6);
        assert!((result.r_squared.0[[0, 0]] - 1.0).abs() < 1e-9);
        assert_eq!(0.0, result.slope.0[[0, 1]]);
        assert_eq!(0.0, result.r_squared.0[[0, 1]]);
    }

    #[test]
    fn test_trend_skips_missing_steps() {
        let data =
            Array3::from_shape_vec((4, 1, 1), vec![0.0, f64::NAN, 2.0, 3.0]).unwrap();
        let result = trend(&yearly(vec![0, 1, 2, 3], data)).unwrap();
        assert!((result.slope.0[[0, 0]] - 1.0).abs() < 1e-9);
        assert!(result.intercept.0[[0, 0]].abs() < 1e-9);
    }

    #[test]
    fn test_trend_too_few_steps() {
        let data = Array3::from_shape_vec((3, 1, 1), vec![1.0, f64::NAN, 2.0]).unwrap();
        let result = trend(&yearly(vec![2000, 2001, 2002], data)).unwrap();
        assert!(result.slope.0[[0, 0]].is_nan());
        assert!(result.r_squared.0[[0, 0]].is_nan());
    }

    #[test]
    fn test_trend_daily_uses_step_index() {
        let dates = test_utils::jjas_dates(2001);
        let mut field = test_utils::daily_field(dates, 1, 1, 0.0, Units::MmPerDay);
        for (step, value) in field.data.iter_mut().enumerate() {
            *value = 0.5 * step as f64;
        }
        let result = trend(&field).unwrap();
        assert!((result.slope.0[[0, 0]] - 0.5).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "field has no time axis")]
    fn test_trend_undated() {
        let field = test_utils::constant_field(1.0, 1, 1, 1, Units::MmPerDay);
        trend(&field).unwrap();
    }

    #[test]
    fn test_quality_report() {
        let lat: Vec<f64> = (0..10).map(f64::from).collect();
        let lon: Vec<f64> = (0..100).map(f64::from).collect();
        let dataset = test_utils::spatial_dataset("lat", lat, "lon", lon, "pr");
        let dataset = test_utils::with_value(dataset, "pr", &[0, 1], f64::NAN);
        let report = quality_report(&dataset);
        let pr = &report["pr"];
        assert!((pr.missing_percentage - 0.1).abs() < 1e-9);
        assert_eq!(1, pr.extreme_low_count);
        assert_eq!(1, pr.extreme_high_count);
        assert_eq!([0.0, 999.0], pr.data_range);
    }

    #[test]
    fn test_quality_report_all_missing() {
        let dataset = test_utils::spatial_dataset("lat", vec![0.0], "lon", vec![0.0], "pr");
        let dataset = test_utils::with_value(dataset, "pr", &[0, 0], f64::NAN);
        let pr = &quality_report(&dataset)["pr"];
        assert_eq!(100.0, pr.missing_percentage);
        assert_eq!(0, pr.extreme_low_count);
        assert!(pr.data_range[0].is_nan());
    }
}

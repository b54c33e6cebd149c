//! Precipitation index operations.
//!
//! Each index is implemented as a struct that implements the
//! [IndexOperation](crate::operation::IndexOperation) trait, most of them through
//! [CellOperation](crate::operation::CellOperation). Inputs are in mm/day with missing values as
//! NaN. Missing steps are skipped. The counting indices and SDII are zero for a cell with no valid
//! steps; the others are missing.

use ndarray::{Array2, ArrayView1, ArrayView3, Axis};

use crate::config::{HEAVY_RAIN_THRESHOLD, WET_DAY_THRESHOLD};
use crate::models::TimeAxis;
use crate::operation::{CellOperation, IndexOperation};

/// Rolling window length of [Rx5day].
pub const RX5DAY_WINDOW: usize = 5;

/// Returns an iterator over the non-missing values of a series.
fn valid(series: ArrayView1<'_, f64>) -> impl Iterator<Item = f64> + '_ {
    series.into_iter().copied().filter(|x| !x.is_nan())
}

/// Count the non-missing values of a series satisfying a predicate.
fn count_where(series: ArrayView1<f64>, predicate: impl Fn(f64) -> bool) -> f64 {
    valid(series).filter(|x| predicate(*x)).count() as f64
}

/// Total precipitation over all steps.
pub struct Prcptot {}

impl CellOperation for Prcptot {
    fn execute_cell(series: ArrayView1<f64>) -> f64 {
        valid(series).sum()
    }
}

/// Largest single-step value.
pub struct Rx1day {}

impl CellOperation for Rx1day {
    fn execute_cell(series: ArrayView1<f64>) -> f64 {
        valid(series).fold(f64::NAN, f64::max)
    }
}

/// Largest centred five-step rolling sum.
///
/// Only daily series are rolled. A window containing a missing step, or running over either end of
/// the series, has no sum, so a daily series shorter than five steps yields a missing value.
/// Seasonal totals and undated fields have no daily steps to roll over; they are approximated as
/// five times their largest value.
pub struct Rx5day {}

impl Rx5day {
    fn rolling_max(series: ArrayView1<f64>) -> f64 {
        let values = series.to_vec();
        values
            .windows(RX5DAY_WINDOW)
            .filter(|window| window.iter().all(|x| !x.is_nan()))
            .map(|window| window.iter().sum::<f64>())
            .fold(f64::NAN, f64::max)
    }

    fn scaled_max(series: ArrayView1<f64>) -> f64 {
        valid(series).fold(f64::NAN, f64::max) * RX5DAY_WINDOW as f64
    }
}

impl IndexOperation for Rx5day {
    fn execute(series: ArrayView3<f64>, time: &TimeAxis) -> Array2<f64> {
        match time {
            TimeAxis::Daily(_) => series.map_axis(Axis(0), Self::rolling_max),
            TimeAxis::Yearly(_) | TimeAxis::None => series.map_axis(Axis(0), Self::scaled_max),
        }
    }
}

/// Number of steps above the heavy rain threshold.
pub struct HeavyRainDays {}

impl CellOperation for HeavyRainDays {
    const ALL_MISSING: f64 = 0.0;

    fn execute_cell(series: ArrayView1<f64>) -> f64 {
        count_where(series, |x| x > HEAVY_RAIN_THRESHOLD)
    }
}

/// Number of dry steps, below the wet day threshold.
///
/// This is a plain count, not the longest run of consecutive dry days.
pub struct Cdd {}

impl CellOperation for Cdd {
    const ALL_MISSING: f64 = 0.0;

    fn execute_cell(series: ArrayView1<f64>) -> f64 {
        count_where(series, |x| x < WET_DAY_THRESHOLD)
    }
}

/// Number of wet steps, at or above the wet day threshold.
///
/// This is a plain count, not the longest run of consecutive wet days.
pub struct Cwd {}

impl CellOperation for Cwd {
    const ALL_MISSING: f64 = 0.0;

    fn execute_cell(series: ArrayView1<f64>) -> f64 {
        count_where(series, |x| x >= WET_DAY_THRESHOLD)
    }
}

/// Mean precipitation on wet steps.
///
/// A cell with no wet steps yields zero, including a cell whose steps are all missing.
pub struct Sdii {}

impl CellOperation for Sdii {
    const ALL_MISSING: f64 = 0.0;

    fn execute_cell(series: ArrayView1<f64>) -> f64 {
        let (total, count) = valid(series)
            .filter(|x| *x >= WET_DAY_THRESHOLD)
            .fold((0.0, 0_usize), |(total, count), x| (total + x, count + 1));
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

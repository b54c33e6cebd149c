use ndarray::{Array2, ArrayView1, ArrayView3, Axis};

use crate::models::TimeAxis;

/// Trait for precipitation index operations.
///
/// This forms the contract between the index engine and the individual indices.
pub trait IndexOperation {
    /// Execute the operation.
    ///
    /// Returns a (lat, lon) field reduced over the time axis.
    ///
    /// # Arguments
    ///
    /// * `series`: Values in mm/day indexed by (time, lat, lon)
    /// * `time`: Time axis of `series`
    fn execute(series: ArrayView3<f64>, time: &TimeAxis) -> Array2<f64>;
}

/// Trait for index operations that reduce each grid cell's time series independently.
///
/// Missing values are NaN. A cell whose every step is missing yields [Self::ALL_MISSING] without
/// calling `execute_cell`.
pub trait CellOperation: IndexOperation {
    /// Result for a cell with no valid steps
    const ALL_MISSING: f64 = f64::NAN;

    fn execute_cell(series: ArrayView1<f64>) -> f64;
}

impl<T: CellOperation> IndexOperation for T {
    /// Execute the operation.
    ///
    /// This method maps `execute_cell` over every (lat, lon) lane of the time axis.
    fn execute(series: ArrayView3<f64>, _time: &TimeAxis) -> Array2<f64> {
        series.map_axis(Axis(0), |lane| {
            if lane.iter().all(|x| x.is_nan()) {
                Self::ALL_MISSING
            } else {
                Self::execute_cell(lane)
            }
        })
    }
}

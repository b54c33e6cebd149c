//! This crate computes extreme-precipitation indices from gridded rainfall data. It harmonises an
//! observational grid and a climate model projection grid onto a common regular grid, aggregates
//! daily rainfall into seasonal totals, computes a standard set of indices per grid cell, and
//! derives ensemble uncertainty and regional statistics from them.
//!
//! The pipeline runs in sequence:
//!
//! * [loader] reads a self-describing gridded dataset and clips it to the study area.
//! * [regrid] interpolates both datasets onto a common grid.
//! * [seasonal] sums daily rainfall over the months of a season, per year.
//! * [indices] computes PRCPTOT, Rx1day, Rx5day, heavy rain days, CDD, CWD and SDII per cell.
//! * [ensemble] and [regional] summarise the index fields.
//!
//! [pipeline::Pipeline] runs every stage. The crate is built on top of a number of open source
//! components.
//!
//! * [ndarray] provides [NumPy](https://numpy.org)-like n-dimensional arrays used in numerical
//!   computation, with [ndarray_stats] for quantiles.
//! * [Serde](serde) performs (de)serialisation of JSON datasets and reports.
//! * [Tracing](::tracing) provides structured logging.

pub mod analysis;
pub mod array;
pub mod cli;
pub mod compression;
pub mod config;
pub mod coords;
pub mod dataset;
pub mod demo;
pub mod ensemble;
pub mod error;
pub mod indices;
pub mod loader;
pub mod models;
pub mod operation;
pub mod operations;
pub mod pipeline;
pub mod reader;
pub mod regional;
pub mod regrid;
pub mod seasonal;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod types;
pub mod units;

//! Seasonal aggregation.
//!
//! Daily fields are filtered to the season's calendar months and reduced to one accumulated total
//! per calendar year.

use std::collections::BTreeMap;

use ndarray::{Array3, Axis};
use time::{Date, Month};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{GriddedField, RegriddedPair, SeasonalSeries, Source, TimeAxis};
use crate::units::{Units, SECONDS_PER_DAY};

const AGGREGATE: &str = "calculating seasonal totals";
const EXTRACT: &str = "extracting time period";

/// Returns the calendar month number (1-12) of a date.
fn month_number(date: &Date) -> u32 {
    u8::from(date.month()).into()
}

/// Returns the English name of a month number, if valid.
fn month_name(month: u32) -> Option<String> {
    let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
    Some(month.to_string())
}

/// Season label made of month initials, e.g. `JJAS`.
pub fn season_label(months: &[u32]) -> String {
    months
        .iter()
        .filter_map(|m| month_name(*m))
        .filter_map(|name| name.chars().next())
        .collect()
}

/// Month range label, e.g. `June-September`.
pub fn months_label(months: &[u32]) -> String {
    let first = months.first().and_then(|m| month_name(*m));
    let last = months.last().and_then(|m| month_name(*m));
    match (first, last) {
        (Some(first), Some(last)) if months.len() > 1 => format!("{first}-{last}"),
        (Some(first), _) => first,
        _ => String::new(),
    }
}

/// Aggregate both members of a regridded pair to seasonal totals.
#[tracing::instrument(level = "DEBUG", skip(pair))]
pub fn aggregate(
    pair: &RegriddedPair,
    season_months: &[u32],
) -> PipelineResult<BTreeMap<Source, SeasonalSeries>> {
    let mut result = BTreeMap::new();
    for (source, fields) in [
        (Source::Observed, &pair.observed),
        (Source::Projection, &pair.projection),
    ] {
        let fields = fields
            .iter()
            .map(|field| aggregate_field(field, season_months))
            .collect::<PipelineResult<Vec<GriddedField>>>()?;
        result.insert(
            source,
            SeasonalSeries {
                fields,
                season: season_label(season_months),
                months: months_label(season_months),
            },
        );
    }
    Ok(result)
}

/// Reduce one daily field to seasonal totals per calendar year.
///
/// Flux fields are converted to mm/day before summation. Missing values contribute nothing to a
/// total, so a year with missing days gets a partial total and a cell with no valid day in a year
/// totals zero. Fields that are not daily are returned unchanged.
pub fn aggregate_field(
    field: &GriddedField,
    season_months: &[u32],
) -> PipelineResult<GriddedField> {
    let TimeAxis::Daily(dates) = &field.time else {
        return Ok(field.clone());
    };
    let in_season = |date: &Date| season_months.contains(&month_number(date));
    let mut years: Vec<i32> = dates
        .iter()
        .filter(|d| in_season(d))
        .map(|d| d.year())
        .collect();
    years.sort_unstable();
    years.dedup();
    if years.is_empty() {
        return Err(PipelineError::Aggregate {
            operation: AGGREGATE,
            reason: format!(
                "no time steps fall within the {} season",
                season_label(season_months)
            ),
        });
    }

    let (scale, units) = if field.units == Units::Flux {
        debug!(variable = ?field.variable, "Converting flux to mm/day");
        (SECONDS_PER_DAY, Units::MmPerDay)
    } else {
        (1.0, field.units)
    };
    let (_, n_lat, n_lon) = field.data.dim();
    let mut totals = Array3::<f64>::zeros((years.len(), n_lat, n_lon));
    for (step, date) in dates.iter().enumerate() {
        if !in_season(date) {
            continue;
        }
        let Ok(year_index) = years.binary_search(&date.year()) else {
            continue;
        };
        let mut total = totals.index_axis_mut(Axis(0), year_index);
        total.zip_mut_with(&field.data.index_axis(Axis(0), step), |t, x| {
            if !x.is_nan() {
                *t += x * scale
            }
        });
    }
    Ok(field.with_data(TimeAxis::Yearly(years), units, totals))
}

/// Restrict a field to the years `start_year..=end_year`.
///
/// Fields without a time axis are returned unchanged.
pub fn extract_time_period(
    field: &GriddedField,
    start_year: i32,
    end_year: i32,
) -> PipelineResult<GriddedField> {
    let (indices, time): (Vec<usize>, TimeAxis) = match &field.time {
        TimeAxis::None => return Ok(field.clone()),
        TimeAxis::Daily(dates) => {
            let (indices, dates): (Vec<usize>, Vec<Date>) = dates
                .iter()
                .enumerate()
                .filter(|(_, d)| (start_year..=end_year).contains(&d.year()))
                .map(|(i, d)| (i, *d))
                .unzip();
            (indices, TimeAxis::Daily(dates))
        }
        TimeAxis::Yearly(years) => {
            let (indices, years): (Vec<usize>, Vec<i32>) = years
                .iter()
                .enumerate()
                .filter(|(_, y)| (start_year..=end_year).contains(*y))
                .map(|(i, y)| (i, *y))
                .unzip();
            (indices, TimeAxis::Yearly(years))
        }
    };
    if indices.is_empty() {
        return Err(PipelineError::Aggregate {
            operation: EXTRACT,
            reason: format!("no time steps between {start_year} and {end_year}"),
        });
    }
    let data = field.data.select(Axis(0), &indices);
    Ok(field.with_data(time, field.units, data))
}

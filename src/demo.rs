//! Deterministic synthetic monsoon data.
//!
//! [DemoGenerator] produces an observation-like and a projection-like dataset over the study area
//! for the JJAS days of a range of years. All randomness comes from a seeded [ChaCha8Rng], so the
//! same seed always yields the same data.

use std::ops::RangeInclusive;

use ndarray::{Array2, Array3, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Gamma, Normal};
use time::{Date, Month};

use crate::config::STUDY_AREA;
use crate::dataset::{AttrValue, Attributes, Coordinate, Dataset, Variable};
use crate::error::{PipelineError, PipelineResult};
use crate::models::Scenario;
use crate::units::SECONDS_PER_DAY;

const OPERATION: &str = "generating demo data";

/// Years covered by the demo observations
pub const OBSERVED_YEARS: RangeInclusive<i32> = 1981..=2010;

/// Years covered by the demo projection
pub const PROJECTION_YEARS: RangeInclusive<i32> = 2040..=2060;

/// Returns every day from 1 June to 30 September of `year`.
pub fn jjas_dates(year: i32) -> Vec<Date> {
    let Ok(start) = Date::from_calendar_date(year, Month::June, 1) else {
        return vec![];
    };
    std::iter::successors(Some(start), |date| date.next_day())
        .take_while(|date| date.month() != Month::October)
        .collect()
}

/// Returns `start, start + step, ...` up to but excluding `stop`.
fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || step.is_nan() {
        return vec![];
    }
    (0_u32..)
        .map(|i| start + f64::from(i) * step)
        .take_while(|x| *x < stop - step * 1e-9)
        .collect()
}

/// Gaussian bump centred on (`lat0`, `lon0`).
fn bump(lat: f64, lon: f64, lat0: f64, lon0: f64, lat_width: f64, lon_width: f64) -> f64 {
    (-((lon - lon0).powi(2) / lon_width + (lat - lat0).powi(2) / lat_width)).exp()
}

fn invalid_distribution(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::analysis(OPERATION, err.to_string())
}

/// Distribution of the domain-wide daily multiplier
#[derive(Clone, Debug)]
enum DailyVariation {
    Normal(Normal<f64>),
    Gamma(Gamma<f64>),
}

impl Distribution<f64> for DailyVariation {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            DailyVariation::Normal(normal) => normal.sample(rng),
            DailyVariation::Gamma(gamma) => gamma.sample(rng),
        }
    }
}

/// Parameters of one synthetic rainfall climate
#[derive(Clone, Debug)]
struct Profile {
    /// Amplitudes of the Western Ghats, northeast and northwest features in mm/day
    western_ghats: f64,
    northeast: f64,
    northwest_dry: f64,
    /// Multiplier applied to the whole base pattern
    change_factor: f64,
    /// Seasonal multipliers for June, July-August and September
    seasonal: [f64; 3],
    daily: DailyVariation,
    /// Per-cell multiplicative noise
    noise: Normal<f64>,
    event_probability: f64,
    event_amplitude: f64,
    event_width: f64,
}

impl Profile {
    fn observed() -> PipelineResult<Self> {
        Ok(Profile {
            western_ghats: 30.0,
            northeast: 25.0,
            northwest_dry: -10.0,
            change_factor: 1.0,
            seasonal: [0.8, 1.5, 1.0],
            daily: DailyVariation::Normal(Normal::new(1.0, 0.3).map_err(invalid_distribution)?),
            noise: Normal::new(0.0, 0.2).map_err(invalid_distribution)?,
            event_probability: 0.1,
            event_amplitude: 50.0,
            event_width: 50.0,
        })
    }

    fn projection(scenario: Scenario) -> PipelineResult<Self> {
        let (change_factor, extreme_factor) = match scenario {
            Scenario::Ssp585 => (1.15, 1.3),
            Scenario::Ssp245 => (1.08, 1.15),
        };
        Ok(Profile {
            western_ghats: 35.0,
            northeast: 30.0,
            northwest_dry: -15.0,
            change_factor,
            seasonal: [0.7, 1.6, 1.1],
            daily: DailyVariation::Gamma(Gamma::new(2.0, 0.5).map_err(invalid_distribution)?),
            noise: Normal::new(0.0, 0.25).map_err(invalid_distribution)?,
            event_probability: 0.15,
            event_amplitude: 80.0 * extreme_factor,
            event_width: 40.0,
        })
    }

    /// Mean rainfall in mm/day before seasonal and daily variation.
    fn base(&self, lat: f64, lon: f64) -> f64 {
        let pattern = 10.0
            + self.western_ghats * bump(lat, lon, 15.0, 75.0, 100.0, 25.0)
            + self.northeast * bump(lat, lon, 25.0, 92.0, 50.0, 50.0)
            + self.northwest_dry * bump(lat, lon, 28.0, 72.0, 100.0, 100.0);
        (pattern * self.change_factor).max(0.0)
    }

    fn seasonal_factor(&self, month: Month) -> f64 {
        match month {
            Month::June => self.seasonal[0],
            Month::July | Month::August => self.seasonal[1],
            _ => self.seasonal[2],
        }
    }
}

/// Generates synthetic gridded rainfall from a caller-supplied seed
#[derive(Clone, Debug)]
pub struct DemoGenerator {
    rng: ChaCha8Rng,
    resolution: f64,
}

impl DemoGenerator {
    /// Return a new DemoGenerator.
    ///
    /// # Arguments
    ///
    /// * `seed`: Seed of the random source
    /// * `resolution`: Grid spacing in degrees
    pub fn new(seed: u64, resolution: f64) -> Self {
        DemoGenerator {
            rng: ChaCha8Rng::seed_from_u64(seed),
            resolution,
        }
    }

    /// Generate daily rainfall in mm/day.
    fn generate(
        &mut self,
        profile: &Profile,
        years: RangeInclusive<i32>,
    ) -> (Vec<Date>, Vec<f64>, Vec<f64>, Array3<f64>) {
        let lat = arange(STUDY_AREA.lat_min, STUDY_AREA.lat_max, self.resolution);
        let lon = arange(STUDY_AREA.lon_min, STUDY_AREA.lon_max, self.resolution);
        let base = Array2::from_shape_fn((lat.len(), lon.len()), |(i, j)| {
            profile.base(lat[i], lon[j])
        });
        let dates: Vec<Date> = years.flat_map(jjas_dates).collect();
        let mut data = Array3::<f64>::zeros((dates.len(), lat.len(), lon.len()));
        for (mut day, date) in data.axis_iter_mut(Axis(0)).zip(&dates) {
            let seasonal = profile.seasonal_factor(date.month());
            let variation = profile.daily.sample(&mut self.rng).max(0.0);
            for ((i, j), value) in day.indexed_iter_mut() {
                let noise = profile.noise.sample(&mut self.rng);
                *value = (base[[i, j]] * seasonal * variation * (1.0 + noise)).max(0.0);
            }
            if self.rng.gen_bool(profile.event_probability) {
                let lat0 = self.rng.gen_range(STUDY_AREA.lat_min..STUDY_AREA.lat_max);
                let lon0 = self.rng.gen_range(STUDY_AREA.lon_min..STUDY_AREA.lon_max);
                let width = profile.event_width;
                for ((i, j), value) in day.indexed_iter_mut() {
                    *value +=
                        profile.event_amplitude * bump(lat[i], lon[j], lat0, lon0, width, width);
                }
            }
        }
        (dates, lat, lon, data)
    }

    /// Generate an observation-like dataset with a `rainfall` variable in mm/day.
    pub fn observed(&mut self, years: RangeInclusive<i32>) -> PipelineResult<Dataset> {
        let (dates, lat, lon, data) = self.generate(&Profile::observed()?, years);
        let mut attributes = Attributes::new();
        attributes.insert(
            "title".to_string(),
            AttrValue::Text("Gridded rainfall observations (demo)".to_string()),
        );
        to_dataset(dates, lat, lon, "rainfall", data, "mm/day", attributes)
    }

    /// Generate a projection-like dataset with a `pr` variable in kg m-2 s-1.
    pub fn projection(
        &mut self,
        scenario: Scenario,
        years: RangeInclusive<i32>,
    ) -> PipelineResult<Dataset> {
        let (dates, lat, lon, data) = self.generate(&Profile::projection(scenario)?, years);
        let mut attributes = Attributes::new();
        attributes.insert(
            "title".to_string(),
            AttrValue::Text(format!("Rainfall projection ({scenario}) (demo)")),
        );
        attributes.insert("scenario".to_string(), AttrValue::Text(scenario.to_string()));
        let data = data / SECONDS_PER_DAY;
        to_dataset(dates, lat, lon, "pr", data, "kg m-2 s-1", attributes)
    }
}

fn to_dataset(
    dates: Vec<Date>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    name: &str,
    data: Array3<f64>,
    units: &str,
    attributes: Attributes,
) -> PipelineResult<Dataset> {
    let mut variable_attributes = Attributes::new();
    variable_attributes.insert("units".to_string(), AttrValue::Text(units.to_string()));
    let variable = Variable {
        name: name.to_string(),
        dims: ["time", "lat", "lon"].map(String::from).to_vec(),
        data: data.into_dyn(),
        attributes: variable_attributes,
    };
    Dataset::new(
        vec![
            Coordinate::time("time", dates),
            Coordinate::numeric("lat", lat),
            Coordinate::numeric("lon", lon),
        ],
        vec![variable],
        attributes,
    )
}

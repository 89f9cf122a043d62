//! Code for normalising the optimisation time horizon.
//!
//! The horizon determines how many timesteps the problem has, how long each one is and
//! which calendar year length is used to annualise sub-year horizons. It is only ever
//! used to pick the annualisation divisor, never to fabricate missing data.
use crate::error::{ValidationError, ValidationResult};
use crate::units::{Dimensionless, Hours};
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Number of hours in a non-leap year
const NON_LEAP_YEAR_HOURS: f64 = 8760.0;

/// Number of hours in a leap year
const LEAP_YEAR_HOURS: f64 = 8784.0;

/// The normalised time horizon of a single optimisation run.
///
/// All timeseries supplied to the model are aligned to the ordinal timestep index
/// `0..n_timesteps`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeHorizon {
    /// Number of timesteps in the horizon
    pub n_timesteps: usize,
    /// Duration of a single timestep
    pub hours_per_timestep: Hours,
    /// Whether the horizon belongs to a leap year
    pub is_leap_year: bool,
}

/// Whether the given calendar year is a leap year
fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

impl TimeHorizon {
    /// Derive a horizon from a consumption series and optional explicit timestamps.
    ///
    /// If timestamps are supplied, the leap-year classification comes from the calendar
    /// year of the first timestamp. Otherwise the series is classified as a leap year
    /// exactly when it spans 8784 hours.
    ///
    /// # Arguments
    ///
    /// * `n_timesteps` - Length of the consumption series
    /// * `timestamps` - Optional explicit timestamp labels, aligned to the series
    /// * `hours_per_timestep` - Duration of a single timestep
    pub fn from_series(
        n_timesteps: usize,
        timestamps: Option<&[DateTime<Utc>]>,
        hours_per_timestep: Hours,
    ) -> ValidationResult<TimeHorizon> {
        if hours_per_timestep.value() <= 0.0 {
            return Err(ValidationError::new(format!(
                "hours_per_timestep must be positive (got {})",
                hours_per_timestep.value()
            )));
        }
        if n_timesteps == 0 {
            return Err(ValidationError::new("consumption timeseries is empty"));
        }

        let leap = match timestamps {
            Some(timestamps) => {
                if timestamps.len() != n_timesteps {
                    return Err(ValidationError::new(format!(
                        "timestamps have {} entries but the consumption timeseries has {}",
                        timestamps.len(),
                        n_timesteps
                    )));
                }
                is_leap_year(timestamps[0].year())
            }
            None => n_timesteps as f64 * hours_per_timestep.value() == LEAP_YEAR_HOURS,
        };

        Ok(TimeHorizon {
            n_timesteps,
            hours_per_timestep,
            is_leap_year: leap,
        })
    }

    /// Total length of the horizon
    pub fn horizon_hours(&self) -> Hours {
        self.hours_per_timestep * Dimensionless(self.n_timesteps as f64)
    }

    /// Length of the implied calendar year
    pub fn year_hours(&self) -> Hours {
        if self.is_leap_year {
            Hours(LEAP_YEAR_HOURS)
        } else {
            Hours(NON_LEAP_YEAR_HOURS)
        }
    }

    /// Factor which scales per-timestep operational costs to full-year costs.
    ///
    /// Annuities and capacity charges are already yearly and must not be scaled by this.
    pub fn annualisation_factor(&self) -> Dimensionless {
        self.year_hours() / self.horizon_hours()
    }
}

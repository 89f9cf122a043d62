//! The run configuration value object.
//!
//! A [`Config`] carries everything one optimisation run needs: the consumption profile,
//! price information and per-asset economic/technical parameters. It is built once by
//! the calling harness (which owns all file and network I/O), validated once and never
//! mutated after model building begins. Defaults come from a single versioned table of
//! economic assumptions rather than being scattered through the formulation.
use crate::error::{ValidationError, ValidationResult};
use crate::units::{Dimensionless, Energy, Hours, MoneyPerEnergy, MoneyPerPower, Power};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A versioned table of default economic assumptions.
///
/// Values are injected into [`Config`] construction; the optimisation core never reads
/// this table directly.
#[derive(Debug, Clone, Copy)]
pub struct EconomicDefaults {
    /// Energy price paid to the producer, €/kWh
    pub producer_energy_price: MoneyPerEnergy,
    /// Grid fee per unit of imported energy, €/kWh
    pub grid_energy_price: MoneyPerEnergy,
    /// Yearly charge on the peak import power, €/kW
    pub grid_capacity_price: MoneyPerPower,
    /// Interest rate as a fraction (0.03 = 3 %)
    pub interest_rate: Dimensionless,
    /// Battery investment cost, €/kWh
    pub storage_cost_per_kwh: MoneyPerEnergy,
    /// Battery economic lifetime, years
    pub storage_lifetime: u32,
    /// Inverter investment cost, €/kW
    pub inverter_cost_per_kw: MoneyPerPower,
    /// Inverter economic lifetime, years
    pub inverter_lifetime: u32,
    /// PV module investment cost, €/kWp
    pub pv_cost_per_kwp: MoneyPerPower,
    /// PV module economic lifetime, years
    pub pv_lifetime: u32,
}

/// Default economic assumptions for 2024 (German industrial tariffs, BDEW price
/// analysis and the literature cited in the README).
pub const DEFAULTS_2024: EconomicDefaults = EconomicDefaults {
    producer_energy_price: MoneyPerEnergy(0.1665),
    grid_energy_price: MoneyPerEnergy(0.046),
    grid_capacity_price: MoneyPerPower(101.22),
    interest_rate: Dimensionless(0.03),
    storage_cost_per_kwh: MoneyPerEnergy(285.0),
    storage_lifetime: 15,
    inverter_cost_per_kw: MoneyPerPower(180.0),
    inverter_lifetime: 15,
    pv_cost_per_kwp: MoneyPerPower(1200.0),
    pv_lifetime: 30,
};

/// Price information for grid imports
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriceParameters {
    /// Producer energy price series, €/kWh, aligned to the consumption series
    pub series_eur_per_kwh: Option<Vec<f64>>,
    /// Scalar producer energy price used when no series is supplied
    pub producer_energy_price: Option<MoneyPerEnergy>,
    /// Replace a supplied price series with the scalar producer price
    pub overwrite_price_series: bool,
    /// Grid fee per unit of imported energy, €/kWh
    pub grid_energy_price: MoneyPerEnergy,
    /// Yearly charge on the peak import power, €/kW
    pub grid_capacity_price: MoneyPerPower,
}

impl Default for PriceParameters {
    fn default() -> Self {
        PriceParameters {
            series_eur_per_kwh: None,
            producer_energy_price: Some(DEFAULTS_2024.producer_energy_price),
            overwrite_price_series: false,
            grid_energy_price: DEFAULTS_2024.grid_energy_price,
            grid_capacity_price: DEFAULTS_2024.grid_capacity_price,
        }
    }
}

/// Battery storage and its conversion paths
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageParameters {
    /// Investment cost, €/kWh of reservoir capacity
    pub cost_per_kwh: MoneyPerEnergy,
    /// Economic lifetime, years
    pub lifetime: u32,
    /// Number of full charge/discharge cycles the cells survive
    pub cyclic_lifetime: f64,
    /// Yearly operational cost per unit of reservoir capacity, €/kWh·a
    pub opex_per_kwh: MoneyPerEnergy,
    /// Fraction of charged energy that reaches the reservoir
    pub charge_efficiency: Dimensionless,
    /// Fraction of discharged energy that reaches the load
    pub discharge_efficiency: Dimensionless,
    /// Maximum charge power as a multiple of reservoir capacity per hour
    pub charge_rate: Dimensionless,
    /// Maximum discharge power as a multiple of reservoir capacity per hour
    pub discharge_rate: Dimensionless,
    /// Upper bound on reservoir size; unbounded when unset
    pub max_capacity_kwh: Option<Energy>,
    /// Inverter investment cost, €/kW
    pub inverter_cost_per_kw: MoneyPerPower,
    /// Inverter economic lifetime, years
    pub inverter_lifetime: u32,
    /// Optional cap on the charge conversion path, kW
    pub max_charge_kw: Option<Power>,
    /// Optional cap on the discharge conversion path, kW
    pub max_discharge_kw: Option<Power>,
}

impl Default for StorageParameters {
    fn default() -> Self {
        StorageParameters {
            cost_per_kwh: DEFAULTS_2024.storage_cost_per_kwh,
            lifetime: DEFAULTS_2024.storage_lifetime,
            cyclic_lifetime: 10_000.0,
            opex_per_kwh: MoneyPerEnergy(0.002),
            charge_efficiency: Dimensionless(0.95),
            discharge_efficiency: Dimensionless(0.95),
            charge_rate: Dimensionless(5.0),
            discharge_rate: Dimensionless(5.0),
            max_capacity_kwh: None,
            inverter_cost_per_kw: DEFAULTS_2024.inverter_cost_per_kw,
            inverter_lifetime: DEFAULTS_2024.inverter_lifetime,
            max_charge_kw: None,
            max_discharge_kw: None,
        }
    }
}

impl StorageParameters {
    /// Investment cost inflated for cells that wear out by cycling before their
    /// economic lifetime ends.
    ///
    /// Assumes one equivalent full cycle per day, the typical duty for peak shaving.
    pub fn effective_cost_per_kwh(&self) -> MoneyPerEnergy {
        let expected_cycles = self.lifetime as f64 * 365.25;
        let derate = (expected_cycles / self.cyclic_lifetime).max(1.0);
        self.cost_per_kwh * Dimensionless(derate)
    }
}

/// Photovoltaic generation, both newly sized and already installed
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PvParameters {
    /// Weather-normalised availability per timestep, fraction of installed kWp
    pub availability: Option<Vec<f64>>,
    /// Investment cost of a new system, €/kWp
    pub cost_per_kwp: MoneyPerPower,
    /// Economic lifetime of a new system, years
    pub lifetime: u32,
    /// Upper bound on new system size; unbounded when unset
    pub max_capacity_kwp: Option<Power>,
    /// Generation of a PV system that already exists on site, kW per timestep.
    /// A sunk cost: it contributes nothing to the objective.
    pub existing_generation_kw: Option<Vec<f64>>,
}

impl Default for PvParameters {
    fn default() -> Self {
        PvParameters {
            availability: None,
            cost_per_kwp: DEFAULTS_2024.pv_cost_per_kwp,
            lifetime: DEFAULTS_2024.pv_lifetime,
            max_capacity_kwp: None,
            existing_generation_kw: None,
        }
    }
}

/// The immutable configuration of one optimisation run.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Name keying the run's result record
    pub name: String,
    /// Consumption per timestep, kW
    pub consumption_kw: Vec<f64>,
    /// Duration of a single timestep
    pub hours_per_timestep: Hours,
    /// Optional explicit timestamp labels, aligned to the consumption series
    #[serde(default)]
    pub timestamps: Option<Vec<DateTime<Utc>>>,
    /// Price information
    #[serde(default)]
    pub prices: PriceParameters,
    /// Whether the run may invest in battery storage
    #[serde(default = "default_true")]
    pub add_storage: bool,
    /// Storage parameters
    #[serde(default)]
    pub storage: StorageParameters,
    /// Whether the run may invest in a new PV system
    #[serde(default)]
    pub add_solar: bool,
    /// PV parameters
    #[serde(default)]
    pub pv: PvParameters,
    /// Interest rate applied to all annuities, as a fraction
    #[serde(default = "default_interest_rate")]
    pub interest_rate: Dimensionless,
}

fn default_true() -> bool {
    true
}

fn default_interest_rate() -> Dimensionless {
    DEFAULTS_2024.interest_rate
}

impl Config {
    /// Create a configuration with the default economic assumptions.
    pub fn new(name: impl Into<String>, consumption_kw: Vec<f64>, hours_per_timestep: Hours) -> Self {
        Config {
            name: name.into(),
            consumption_kw,
            hours_per_timestep,
            timestamps: None,
            prices: PriceParameters::default(),
            add_storage: true,
            storage: StorageParameters::default(),
            add_solar: false,
            pv: PvParameters::default(),
            interest_rate: default_interest_rate(),
        }
    }

    /// Number of timesteps implied by the consumption series
    pub fn n_timesteps(&self) -> usize {
        self.consumption_kw.len()
    }

    /// Check the whole configuration once, before any model is built.
    ///
    /// Every supplied timeseries must have exactly `n_timesteps` entries; a mismatch is
    /// a hard error, never silently truncated. Requesting solar without an availability
    /// series is also an error: the core never invents weather data.
    pub fn validate(&self) -> ValidationResult<()> {
        let n = self.n_timesteps();
        if n == 0 {
            return Err(ValidationError::new("consumption timeseries is empty"));
        }
        if self.hours_per_timestep.value() <= 0.0 {
            return Err(ValidationError::new(format!(
                "hours_per_timestep must be positive (got {})",
                self.hours_per_timestep.value()
            )));
        }
        if self.consumption_kw.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::new(
                "consumption timeseries contains non-finite values",
            ));
        }

        if let Some(timestamps) = &self.timestamps {
            if timestamps.len() != n {
                return Err(length_mismatch("timestamps", timestamps.len(), n));
            }
        }

        self.validate_prices(n)?;

        if self.add_storage {
            self.validate_storage()?;
        }
        self.validate_pv(n)?;

        if self.interest_rate.value() < 0.0 {
            return Err(ValidationError::new("interest_rate must not be negative"));
        }

        Ok(())
    }

    fn validate_prices(&self, n: usize) -> ValidationResult<()> {
        let prices = &self.prices;
        if let Some(series) = &prices.series_eur_per_kwh {
            if series.len() != n {
                return Err(length_mismatch("price timeseries", series.len(), n));
            }
            if series.iter().any(|v| !v.is_finite()) {
                return Err(ValidationError::new(
                    "price timeseries contains non-finite values",
                ));
            }
        }
        if prices.series_eur_per_kwh.is_none() && prices.producer_energy_price.is_none() {
            return Err(ValidationError::new(
                "no price information found; provide either a producer energy price \
                 or a price timeseries",
            ));
        }
        if prices.overwrite_price_series && prices.producer_energy_price.is_none() {
            return Err(ValidationError::new(
                "overwrite_price_series requires a producer energy price",
            ));
        }
        Ok(())
    }

    fn validate_storage(&self) -> ValidationResult<()> {
        let storage = &self.storage;
        for (name, value) in [
            ("charge_efficiency", storage.charge_efficiency),
            ("discharge_efficiency", storage.discharge_efficiency),
        ] {
            if !(value.value() > 0.0 && value.value() <= 1.0) {
                return Err(ValidationError::new(format!(
                    "storage {name} must be in (0, 1] (got {})",
                    value.value()
                )));
            }
        }
        for (name, value) in [
            ("charge_rate", storage.charge_rate),
            ("discharge_rate", storage.discharge_rate),
        ] {
            if value.value() <= 0.0 {
                return Err(ValidationError::new(format!(
                    "storage {name} must be positive (got {})",
                    value.value()
                )));
            }
        }
        if storage.lifetime == 0 || storage.inverter_lifetime == 0 {
            return Err(ValidationError::new("asset lifetimes must be at least one year"));
        }
        if storage.cyclic_lifetime <= 0.0 {
            return Err(ValidationError::new("storage cyclic_lifetime must be positive"));
        }
        Ok(())
    }

    fn validate_pv(&self, n: usize) -> ValidationResult<()> {
        let pv = &self.pv;
        if self.add_solar {
            let Some(availability) = &pv.availability else {
                return Err(ValidationError::new(
                    "add_solar requested but no PV availability timeseries supplied",
                ));
            };
            if availability.len() != n {
                return Err(length_mismatch("PV availability", availability.len(), n));
            }
            if availability.iter().any(|v| !(0.0..=1.0).contains(v)) {
                return Err(ValidationError::new(
                    "PV availability values must be between 0 and 1",
                ));
            }
            if pv.lifetime == 0 {
                return Err(ValidationError::new("asset lifetimes must be at least one year"));
            }
        }
        if let Some(existing) = &pv.existing_generation_kw {
            if existing.len() != n {
                return Err(length_mismatch("existing PV generation", existing.len(), n));
            }
            if existing.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(ValidationError::new(
                    "existing PV generation must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Resolve the per-timestep producer energy price.
    ///
    /// A scalar producer price stands in for a missing series; the overwrite flag
    /// replaces a supplied series with the scalar.
    pub fn resolved_price_series(&self) -> ValidationResult<Vec<MoneyPerEnergy>> {
        let prices = &self.prices;
        match &prices.series_eur_per_kwh {
            Some(series) if !prices.overwrite_price_series => {
                Ok(series.iter().map(|p| MoneyPerEnergy(*p)).collect())
            }
            _ => {
                let Some(price) = prices.producer_energy_price else {
                    return Err(ValidationError::new(
                        "no price information found; provide either a producer energy price \
                         or a price timeseries",
                    ));
                };
                Ok(vec![price; self.n_timesteps()])
            }
        }
    }
}

fn length_mismatch(what: &str, got: usize, expected: usize) -> ValidationError {
    ValidationError::new(format!(
        "{what} has {got} entries but the consumption timeseries has {expected}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn valid_config() -> Config {
        Config::new("test", vec![1.0; 5], Hours(1.0))
    }

    #[test]
    fn test_defaults() {
        let config = valid_config();
        assert!(config.add_storage);
        assert!(!config.add_solar);
        assert_eq!(config.storage.lifetime, 15);
        assert_eq!(config.pv.lifetime, 30);
        assert_approx_eq!(f64, config.prices.grid_capacity_price.value(), 101.22);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_consumption_rejected() {
        let config = Config::new("test", vec![], Hours(1.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_timestep_rejected() {
        let config = Config::new("test", vec![1.0; 5], Hours(0.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_price_series_length_mismatch_rejected() {
        let mut config = valid_config();
        config.prices.series_eur_per_kwh = Some(vec![0.3; 4]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_price_information_rejected() {
        let mut config = valid_config();
        config.prices.producer_energy_price = None;
        assert!(config.validate().is_err());
        assert!(config.resolved_price_series().is_err());
    }

    #[test]
    fn test_solar_without_availability_rejected() {
        let mut config = valid_config();
        config.add_solar = true;
        assert!(config.validate().is_err());

        config.pv.availability = Some(vec![0.5; 5]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_availability_out_of_range_rejected() {
        let mut config = valid_config();
        config.add_solar = true;
        config.pv.availability = Some(vec![0.5, 0.5, 1.2, 0.5, 0.5]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scalar_price_fallback() {
        let mut config = valid_config();
        config.prices.producer_energy_price = Some(MoneyPerEnergy(0.3));
        let series = config.resolved_price_series().unwrap();
        assert_eq!(series.len(), 5);
        assert_approx_eq!(f64, series[0].value(), 0.3);
    }

    #[test]
    fn test_overwrite_price_series() {
        let mut config = valid_config();
        config.prices.series_eur_per_kwh = Some(vec![0.9; 5]);
        config.prices.producer_energy_price = Some(MoneyPerEnergy(0.2));

        let series = config.resolved_price_series().unwrap();
        assert_approx_eq!(f64, series[0].value(), 0.9);

        config.prices.overwrite_price_series = true;
        let series = config.resolved_price_series().unwrap();
        assert_approx_eq!(f64, series[0].value(), 0.2);
    }

    #[test]
    fn test_cyclic_lifetime_derate() {
        let mut storage = StorageParameters::default();
        // Default: 15 * 365.25 cycles expected, cyclic lifetime 10000, no derate
        assert_approx_eq!(f64, storage.effective_cost_per_kwh().value(), 285.0);

        // Heavily cycled cells get a proportional penalty
        storage.cyclic_lifetime = 1000.0;
        let expected = 285.0 * (15.0 * 365.25 / 1000.0);
        assert_approx_eq!(f64, storage.effective_cost_per_kwh().value(), expected);
    }
}

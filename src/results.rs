//! Mapping of solved variable values into named economic and technical results.
//!
//! This is a pure derived view over the solve outcome: nothing here mutates the model
//! or re-solves, and optional subsystems that were disabled report exactly zero rather
//! than being absent, so downstream consumers never branch on field presence.
use crate::config::Config;
use crate::finance::annuity_per_unit;
use crate::horizon::TimeHorizon;
use crate::optimisation::VariableMap;
use crate::solver::SolveResult;
use crate::units::MoneyPerEnergy;
use itertools::izip;
use serde::Serialize;

/// Per-timestep dispatch of a solved run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DispatchTimeseries {
    /// Grid import, kW
    pub grid_import_kw: Vec<f64>,
    /// Battery charge power, kW
    pub charge_kw: Vec<f64>,
    /// Battery discharge power, kW
    pub discharge_kw: Vec<f64>,
    /// Battery state of charge, kWh
    pub state_of_charge_kwh: Vec<f64>,
    /// New-PV generation delivered to the load, kW
    pub pv_generation_kw: Vec<f64>,
    /// Utilised generation of the already-installed PV system, kW
    pub existing_pv_generation_kw: Vec<f64>,
}

/// The result record of one optimisation run, keyed by the run name.
///
/// All cost fields are yearly (annualised) EUR; `total_yearly_costs_eur` is their sum
/// and equals the solved objective value within floating-point tolerance.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OptimizationResults {
    /// Name of the run this record belongs to
    pub name: String,
    /// Dispatch per timestep
    pub timeseries: DispatchTimeseries,

    /// Sized grid connection (peak import), kW
    pub grid_capacity_kw: f64,
    /// Sized storage reservoir, kWh
    pub storage_capacity_kwh: f64,
    /// Sized inverter (discharge path), kW
    pub inverter_capacity_kw: f64,
    /// Sized new PV system, kWp
    pub pv_capacity_kwp: f64,

    /// Producer energy cost, €/a
    pub energy_costs_eur: f64,
    /// Grid energy fee, €/a
    pub grid_energy_costs_eur: f64,
    /// Grid capacity charge, €/a
    pub grid_capacity_costs_eur: f64,
    /// Storage annuity, €/a
    pub storage_annuity_eur: f64,
    /// Storage capacity opex, €/a
    pub storage_opex_eur: f64,
    /// Inverter annuity, €/a
    pub inverter_annuity_eur: f64,
    /// PV annuity, €/a
    pub pv_annuity_eur: f64,
    /// Sum of all yearly cost buckets, €/a
    pub total_yearly_costs_eur: f64,

    /// One-time storage investment, €
    pub storage_investment_eur: f64,
    /// One-time inverter investment, €
    pub inverter_investment_eur: f64,
    /// One-time PV investment, €
    pub pv_investment_eur: f64,
    /// Sum of all one-time investments, €
    pub total_investment_eur: f64,

    /// Objective value reported by the solver, €/a
    pub objective_value_eur: f64,
}

/// Map the solved variable values back into named result fields.
///
/// Must only be called with an optimal solve result.
pub fn extract_results(
    config: &Config,
    horizon: &TimeHorizon,
    producer_prices: &[MoneyPerEnergy],
    variables: &VariableMap,
    solution: &SolveResult,
) -> OptimizationResults {
    assert!(solution.is_optimal(), "results require an optimal solution");

    let n = horizon.n_timesteps;
    let value = |var| solution.value(variables.index(var));
    let series = |vars: &[crate::optimisation::Variable]| vars.iter().map(|v| value(*v)).collect();

    let grid_import_kw: Vec<f64> = series(&variables.grid_import);
    let zeros = || vec![0.0; n];

    let (charge_kw, discharge_kw, state_of_charge_kwh) = match &variables.storage {
        Some(storage) => (
            series(&storage.charge),
            series(&storage.discharge),
            series(&storage.state_of_charge),
        ),
        None => (zeros(), zeros(), zeros()),
    };
    let pv_generation_kw = match &variables.pv {
        Some(pv) => series(&pv.generation),
        None => zeros(),
    };
    let existing_pv_generation_kw = match &variables.existing_pv {
        Some(existing) => series(existing),
        None => zeros(),
    };

    let hours = horizon.hours_per_timestep.value();
    let annualise = horizon.annualisation_factor().value();
    let energy_costs_eur: f64 = izip!(&grid_import_kw, producer_prices)
        .map(|(import, price)| import * price.value() * hours * annualise)
        .sum();
    let grid_energy_costs_eur: f64 = grid_import_kw
        .iter()
        .map(|import| import * config.prices.grid_energy_price.value() * hours * annualise)
        .sum();

    let grid_capacity_kw = value(variables.grid_capacity);
    let grid_capacity_costs_eur = grid_capacity_kw * config.prices.grid_capacity_price.value();

    let storage_params = &config.storage;
    let (storage_capacity_kwh, inverter_capacity_kw) = match &variables.storage {
        Some(storage) => (value(storage.capacity), value(storage.discharge_capacity)),
        None => (0.0, 0.0),
    };
    let storage_annuity_eur = annuity_per_unit(
        storage_params.effective_cost_per_kwh(),
        storage_params.lifetime,
        config.interest_rate,
    )
    .value()
        * storage_capacity_kwh;
    let storage_opex_eur = storage_params.opex_per_kwh.value() * storage_capacity_kwh;
    let storage_investment_eur = storage_params.cost_per_kwh.value() * storage_capacity_kwh;
    let inverter_annuity_eur = annuity_per_unit(
        storage_params.inverter_cost_per_kw,
        storage_params.inverter_lifetime,
        config.interest_rate,
    )
    .value()
        * inverter_capacity_kw;
    let inverter_investment_eur =
        storage_params.inverter_cost_per_kw.value() * inverter_capacity_kw;

    let pv_capacity_kwp = match &variables.pv {
        Some(pv) => value(pv.capacity),
        None => 0.0,
    };
    let pv_annuity_eur =
        annuity_per_unit(config.pv.cost_per_kwp, config.pv.lifetime, config.interest_rate).value()
            * pv_capacity_kwp;
    let pv_investment_eur = config.pv.cost_per_kwp.value() * pv_capacity_kwp;

    let total_yearly_costs_eur = energy_costs_eur
        + grid_energy_costs_eur
        + grid_capacity_costs_eur
        + storage_annuity_eur
        + storage_opex_eur
        + inverter_annuity_eur
        + pv_annuity_eur;
    let total_investment_eur = storage_investment_eur + inverter_investment_eur + pv_investment_eur;

    OptimizationResults {
        name: config.name.clone(),
        timeseries: DispatchTimeseries {
            grid_import_kw,
            charge_kw,
            discharge_kw,
            state_of_charge_kwh,
            pv_generation_kw,
            existing_pv_generation_kw,
        },
        grid_capacity_kw,
        storage_capacity_kwh,
        inverter_capacity_kw,
        pv_capacity_kwp,
        energy_costs_eur,
        grid_energy_costs_eur,
        grid_capacity_costs_eur,
        storage_annuity_eur,
        storage_opex_eur,
        inverter_annuity_eur,
        pv_annuity_eur,
        total_yearly_costs_eur,
        storage_investment_eur,
        inverter_investment_eur,
        pv_investment_eur,
        total_investment_eur,
        objective_value_eur: solution.objective_value,
    }
}

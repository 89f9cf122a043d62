//! Full solve-and-extract runs over small hand-checkable scenarios.
use float_cmp::assert_approx_eq;
use peakshaver::analysis::{optimize, RunOutcome};
use peakshaver::config::Config;
use peakshaver::results::OptimizationResults;
use peakshaver::solver::SolverOptions;
use peakshaver::units::{Hours, MoneyPerEnergy, MoneyPerPower};
use rstest::rstest;

const TOLERANCE: f64 = 1e-6;

/// Solve a configuration and unwrap the optimal outcome
fn solve_optimal(config: &Config) -> OptimizationResults {
    match optimize(config, &SolverOptions::default()).unwrap() {
        RunOutcome::Optimal(results) => results,
        outcome => panic!("expected an optimal outcome, got {outcome:?}"),
    }
}

/// Check the per-timestep energy conservation of a solved run
fn assert_energy_balance(config: &Config, results: &OptimizationResults) {
    let ts = &results.timeseries;
    for (t, demand) in config.consumption_kw.iter().enumerate() {
        let supplied = ts.grid_import_kw[t] + ts.discharge_kw[t] + ts.pv_generation_kw[t]
            + ts.existing_pv_generation_kw[t]
            - ts.charge_kw[t];
        assert_approx_eq!(f64, supplied, *demand, epsilon = TOLERANCE);
    }
}

/// Check that the cost buckets sum to the solved objective
fn assert_cost_decomposition(results: &OptimizationResults) {
    let sum = results.energy_costs_eur
        + results.grid_energy_costs_eur
        + results.grid_capacity_costs_eur
        + results.storage_annuity_eur
        + results.storage_opex_eur
        + results.inverter_annuity_eur
        + results.pv_annuity_eur;
    assert_approx_eq!(f64, results.total_yearly_costs_eur, sum, epsilon = 1e-9);
    assert_approx_eq!(
        f64,
        results.total_yearly_costs_eur,
        results.objective_value_eur,
        epsilon = TOLERANCE
    );
    assert_approx_eq!(
        f64,
        results.total_investment_eur,
        results.storage_investment_eur + results.inverter_investment_eur
            + results.pv_investment_eur,
        epsilon = 1e-9
    );
}

fn grid_only_config(n_timesteps: usize, price: f64) -> Config {
    let mut config = Config::new("test", vec![1.0; n_timesteps], Hours(1.0));
    config.add_storage = false;
    config.prices.producer_energy_price = Some(MoneyPerEnergy(price));
    config
}

#[test]
fn no_flexibility_baseline() {
    let config = grid_only_config(5, 0.3);
    let results = solve_optimal(&config);

    for import in &results.timeseries.grid_import_kw {
        assert_approx_eq!(f64, *import, 1.0, epsilon = TOLERANCE);
    }
    assert_approx_eq!(f64, results.energy_costs_eur, 8760.0 * 0.3, epsilon = 1e-4);
    assert_approx_eq!(
        f64,
        results.grid_energy_costs_eur,
        8760.0 * config.prices.grid_energy_price.value(),
        epsilon = 1e-4
    );
    assert_approx_eq!(
        f64,
        results.grid_capacity_costs_eur,
        config.prices.grid_capacity_price.value(),
        epsilon = 1e-4
    );
    assert_approx_eq!(f64, results.storage_capacity_kwh, 0.0);
    assert_approx_eq!(f64, results.pv_capacity_kwp, 0.0);
    assert_approx_eq!(f64, results.total_investment_eur, 0.0);

    assert_energy_balance(&config, &results);
    assert_cost_decomposition(&results);
}

/// Annualisation must not depend on the horizon length
#[rstest]
#[case(1)]
#[case(2)]
#[case(50)]
#[case(100)]
fn scale_invariance_under_timestep_count(#[case] n_timesteps: usize) {
    let config = grid_only_config(n_timesteps, 300.0);
    let results = solve_optimal(&config);

    for import in &results.timeseries.grid_import_kw {
        assert_approx_eq!(f64, *import, 1.0, epsilon = TOLERANCE);
    }
    assert_approx_eq!(f64, results.energy_costs_eur, 8760.0 * 300.0, epsilon = 1e-2);
    assert_approx_eq!(
        f64,
        results.grid_energy_costs_eur,
        8760.0 * config.prices.grid_energy_price.value(),
        epsilon = 1e-4
    );
    assert_approx_eq!(
        f64,
        results.grid_capacity_costs_eur,
        config.prices.grid_capacity_price.value(),
        epsilon = 1e-4
    );
    assert_cost_decomposition(&results);
}

/// Quarter-hourly and hourly runs of the same load produce the same yearly costs
#[test]
fn quarter_hourly_resolution_is_consistent() {
    let hourly = grid_only_config(5, 0.3);

    let mut quarter = Config::new("test", vec![1.0; 20], Hours(0.25));
    quarter.add_storage = false;
    quarter.prices.producer_energy_price = Some(MoneyPerEnergy(0.3));

    let hourly_results = solve_optimal(&hourly);
    let quarter_results = solve_optimal(&quarter);
    assert_approx_eq!(
        f64,
        hourly_results.total_yearly_costs_eur,
        quarter_results.total_yearly_costs_eur,
        epsilon = 1e-4
    );
}

fn price_spike_config(add_storage: bool) -> Config {
    let mut config = Config::new("spike", vec![1.0; 6], Hours(1.0));
    config.add_storage = add_storage;
    config.prices.series_eur_per_kwh = Some(vec![0.3, 0.3, 0.3, 0.3, 1.0, 0.3]);
    // Lossless, fast and nearly free storage so the economics are unambiguous
    config.storage.charge_efficiency = 1.0.into();
    config.storage.discharge_efficiency = 1.0.into();
    config.storage.cost_per_kwh = MoneyPerEnergy(1.0);
    config.storage.opex_per_kwh = MoneyPerEnergy(0.0);
    config.storage.inverter_cost_per_kw = MoneyPerPower(0.0);
    config
}

#[test]
fn storage_shaves_a_price_spike() {
    let without = solve_optimal(&price_spike_config(false));
    let with = solve_optimal(&price_spike_config(true));
    let config = price_spike_config(true);

    // Import moves out of the expensive step into the four cheap steps before it
    let imports = &with.timeseries.grid_import_kw;
    assert_approx_eq!(f64, imports[4], 0.0, epsilon = TOLERANCE);
    for import in &imports[0..4] {
        assert!(*import > 1.0 + TOLERANCE, "import should exceed demand, got {import}");
    }

    // One kWh must be banked before the spike
    assert_approx_eq!(f64, with.storage_capacity_kwh, 1.0, epsilon = 1e-4);
    assert_approx_eq!(
        f64,
        with.inverter_capacity_kw,
        with.storage_capacity_kwh,
        epsilon = TOLERANCE
    );

    assert!(with.total_yearly_costs_eur <= without.total_yearly_costs_eur + TOLERANCE);
    assert_energy_balance(&config, &with);
    assert_cost_decomposition(&with);
}

fn pv_config(add_solar: bool) -> Config {
    let mut config = Config::new("pv", vec![1.0; 24], Hours(1.0));
    config.prices.producer_energy_price = Some(MoneyPerEnergy(0.3));
    config.add_solar = add_solar;
    // Daytime bell profile
    let mut availability = vec![0.0; 24];
    for (hour, fraction) in [
        (8, 0.2),
        (9, 0.4),
        (10, 0.6),
        (11, 0.8),
        (12, 0.8),
        (13, 0.8),
        (14, 0.6),
        (15, 0.4),
        (16, 0.2),
    ] {
        availability[hour] = fraction;
    }
    config.pv.availability = Some(availability);
    config.pv.cost_per_kwp = MoneyPerPower(10.0);
    config
}

#[test]
fn pv_reduces_energy_costs() {
    let without = solve_optimal(&pv_config(false));
    let with = solve_optimal(&pv_config(true));
    let config = pv_config(true);

    assert!(
        with.energy_costs_eur < without.energy_costs_eur,
        "PV should strictly reduce producer energy costs ({} vs {})",
        with.energy_costs_eur,
        without.energy_costs_eur
    );
    assert!(with.pv_capacity_kwp > 0.0);
    assert!(with.storage_capacity_kwh >= 0.0);
    assert!(with.inverter_capacity_kw >= 0.0);
    // Linked capacity sizing: the conversion paths share the reservoir's size
    assert_approx_eq!(
        f64,
        with.inverter_capacity_kw,
        with.storage_capacity_kwh,
        epsilon = TOLERANCE
    );

    assert_energy_balance(&config, &with);
    assert_cost_decomposition(&with);
}

#[test]
fn existing_pv_offsets_grid_import() {
    let mut config = Config::new("existing-pv", vec![1.0; 4], Hours(1.0));
    config.add_storage = false;
    config.prices.producer_energy_price = Some(MoneyPerEnergy(0.3));
    config.pv.existing_generation_kw = Some(vec![0.0, 0.5, 0.5, 0.0]);

    let results = solve_optimal(&config);
    let expected_imports = [1.0, 0.5, 0.5, 1.0];
    for (import, expected) in results.timeseries.grid_import_kw.iter().zip(expected_imports) {
        assert_approx_eq!(f64, *import, expected, epsilon = TOLERANCE);
    }
    // Sunk assets cost nothing
    assert_approx_eq!(f64, results.pv_investment_eur, 0.0);
    assert_approx_eq!(f64, results.pv_annuity_eur, 0.0);

    assert_energy_balance(&config, &results);
    assert_cost_decomposition(&results);
}

#[test]
fn negative_consumption_without_flexibility_is_infeasible() {
    let mut config = Config::new("infeasible", vec![-1.0], Hours(1.0));
    config.add_storage = false;

    let outcome = optimize(&config, &SolverOptions::default()).unwrap();
    assert!(matches!(outcome, RunOutcome::Infeasible));
}

#[test]
fn solving_twice_is_deterministic() {
    let config = price_spike_config(true);
    let first = solve_optimal(&config);
    let second = solve_optimal(&config);
    assert_approx_eq!(
        f64,
        first.objective_value_eur,
        second.objective_value_eur,
        epsilon = 1e-9
    );
    assert_eq!(
        first.timeseries.grid_import_kw,
        second.timeseries.grid_import_kw
    );
}

#[test]
fn storage_capacity_cap_is_respected() {
    let mut config = price_spike_config(true);
    config.storage.max_capacity_kwh = Some(peakshaver::units::Energy(0.5));

    let results = solve_optimal(&config);
    assert!(results.storage_capacity_kwh <= 0.5 + TOLERANCE);
    // Only half the spike can be banked now
    assert!(results.timeseries.grid_import_kw[4] > 0.4);
}

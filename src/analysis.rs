//! Top-level orchestration of a single optimisation run.
//!
//! The path is synchronous and single-shot: validate the configuration, build the full
//! problem, invoke the solver once and extract results. Batch harnesses run many
//! configurations as independent invocations of this function; no state is shared
//! between runs.
use crate::config::Config;
use crate::horizon::TimeHorizon;
use crate::optimisation::EnergyBalanceModel;
use crate::results::{extract_results, OptimizationResults};
use crate::solver::{self, SolveStatus, SolverOptions};
use anyhow::{bail, Result};
use log::{info, warn};

/// The typed outcome of a run.
///
/// Infeasibility and unboundedness are legitimate outcomes the caller must react to,
/// not errors; a batch harness can continue with its remaining scenarios.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run solved to optimality
    Optimal(OptimizationResults),
    /// No feasible dispatch exists for the given configuration
    Infeasible,
    /// The problem is unbounded
    Unbounded,
}

/// Validate, build, solve and extract one configuration.
///
/// Validation failures and solver-process failures are errors; non-optimal solver
/// statuses are returned as [`RunOutcome`] variants.
pub fn optimize(config: &Config, options: &SolverOptions) -> Result<RunOutcome> {
    config.validate()?;
    let horizon = TimeHorizon::from_series(
        config.n_timesteps(),
        config.timestamps.as_deref(),
        config.hours_per_timestep,
    )?;
    let producer_prices = config.resolved_price_series()?;

    info!(
        "Optimising run '{}': {} timesteps of {} h (storage: {}, solar: {})",
        config.name,
        horizon.n_timesteps,
        horizon.hours_per_timestep.value(),
        config.add_storage,
        config.add_solar
    );

    let model = EnergyBalanceModel::build(config, &horizon, &producer_prices);
    let EnergyBalanceModel {
        problem, variables, ..
    } = model;
    info!("Problem has {} variables", variables.n_variables());

    let solution = solver::solve(problem, variables.cost_coefficients(), options);
    match &solution.status {
        SolveStatus::Optimal => {
            let results =
                extract_results(config, &horizon, &producer_prices, &variables, &solution);
            info!(
                "Run '{}' solved: total yearly costs {:.2} €, peak import {:.2} kW",
                results.name, results.total_yearly_costs_eur, results.grid_capacity_kw
            );
            Ok(RunOutcome::Optimal(results))
        }
        SolveStatus::Infeasible => {
            warn!("Run '{}' has no feasible dispatch", config.name);
            Ok(RunOutcome::Infeasible)
        }
        SolveStatus::Unbounded => {
            warn!("Run '{}' is unbounded", config.name);
            Ok(RunOutcome::Unbounded)
        }
        SolveStatus::SolverError(message) => {
            bail!("Solver failed for run '{}': {message}", config.name)
        }
    }
}

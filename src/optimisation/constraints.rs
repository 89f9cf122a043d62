//! The constraint rows of the peak-shaving problem.
use super::{PvVariables, StorageVariables, VariableMap};
use crate::config::StorageParameters;
use crate::units::Hours;
use highs::RowProblem as Problem;
use itertools::izip;

/// Add the per-timestep energy conservation equality.
///
/// `consumption_t = grid_t + discharge_t + pv_t + existing_pv_t - charge_t`
///
/// This is the single hard coupling constraint; every subsystem's dispatch variable
/// appears in exactly one balance equation per timestep.
pub fn add_energy_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    consumption: &[f64],
) {
    let mut terms = Vec::new();
    for (t, demand) in consumption.iter().enumerate() {
        terms.push((variables.grid_import[t], 1.0));

        if let Some(storage) = &variables.storage {
            terms.push((storage.discharge[t], 1.0));
            terms.push((storage.charge[t], -1.0));
        }
        if let Some(pv) = &variables.pv {
            terms.push((pv.generation[t], 1.0));
        }
        if let Some(existing_pv) = &variables.existing_pv {
            terms.push((existing_pv[t], 1.0));
        }

        problem.add_row(*demand..=*demand, terms.drain(0..));
    }
}

/// Constrain the grid capacity variable to cover the import of every timestep.
///
/// Expressing the peak this way, rather than as a post-hoc maximum, lets the solver
/// co-optimise capacity with dispatch.
pub fn add_grid_capacity_constraints(problem: &mut Problem, variables: &VariableMap) {
    for import in &variables.grid_import {
        problem.add_row(..=0.0, [(*import, 1.0), (variables.grid_capacity, -1.0)]);
    }
}

/// Add the storage state transition, reservoir bounds and conversion rate limits.
///
/// The reservoir starts empty and no wraparound is assumed. Charge and discharge are
/// powers, so the state transition scales them by the timestep length.
pub fn add_storage_constraints(
    problem: &mut Problem,
    storage: &StorageVariables,
    params: &StorageParameters,
    hours: Hours,
) {
    let h = hours.value();
    let charge_gain = params.charge_efficiency.value() * h;
    let discharge_loss = h / params.discharge_efficiency.value();

    // soc_t - soc_{t-1} - gain * charge_t + loss * discharge_t = 0, with soc_{-1} = 0
    for (t, (soc, charge, discharge)) in
        izip!(&storage.state_of_charge, &storage.charge, &storage.discharge).enumerate()
    {
        let mut terms = vec![
            (*soc, 1.0),
            (*charge, -charge_gain),
            (*discharge, discharge_loss),
        ];
        if t > 0 {
            terms.push((storage.state_of_charge[t - 1], -1.0));
        }
        problem.add_row(0.0..=0.0, terms);
    }

    for soc in &storage.state_of_charge {
        problem.add_row(..=0.0, [(*soc, 1.0), (storage.capacity, -1.0)]);
    }

    // Conversion limits are multiples of the reservoir size (per hour)
    let charge_rate = params.charge_rate.value();
    let discharge_rate = params.discharge_rate.value();
    for (charge, discharge) in izip!(&storage.charge, &storage.discharge) {
        problem.add_row(..=0.0, [(*charge, 1.0), (storage.capacity, -charge_rate)]);
        problem.add_row(
            ..=0.0,
            [(*discharge, 1.0), (storage.capacity, -discharge_rate)],
        );
    }
}

/// Cap new-PV generation by the weather profile times the installed capacity.
pub fn add_pv_availability_constraints(
    problem: &mut Problem,
    pv: &PvVariables,
    availability: &[f64],
) {
    for (generation, fraction) in izip!(&pv.generation, availability) {
        problem.add_row(..=0.0, [(*generation, 1.0), (pv.capacity, -fraction)]);
    }
}

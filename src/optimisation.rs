//! Code for assembling the peak-shaving optimisation problem.
//!
//! The problem couples investment sizing (storage reservoir, conversion paths, PV
//! modules, grid connection) with per-timestep dispatch through a single linear
//! program: the grid peak is a capacity variable constrained by every timestep rather
//! than a post-hoc maximum, so the solver can trade a few kW of peak against battery
//! or PV investment.
use crate::config::Config;
use crate::finance::annuity_per_unit;
use crate::horizon::TimeHorizon;
use crate::units::{Dimensionless, Hours, MoneyPerEnergy, Power};
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use std::ops::RangeBounds;

pub mod constraints;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers
/// to a particular column of the problem.
pub type Variable = highs::Col;

/// Bookkeeping for the problem's columns.
///
/// Tracks, in insertion order, the index of each column in the solution array and its
/// objective coefficient; the latter is what the solver adapter uses to report the
/// objective value.
#[derive(Default)]
struct VariableRegistry {
    variable_to_index: IndexMap<Variable, usize>,
    cost_coefficients: Vec<f64>,
}

impl VariableRegistry {
    /// Add a column to the problem and register it
    fn add<B: RangeBounds<f64>>(
        &mut self,
        problem: &mut Problem,
        coefficient: f64,
        bounds: B,
    ) -> Variable {
        let var = problem.add_column(coefficient, bounds);
        let index = self.variable_to_index.len();
        let existing = self.variable_to_index.insert(var, index).is_some();
        assert!(!existing, "Duplicate entry for var");
        self.cost_coefficients.push(coefficient);
        var
    }

    /// Add a non-negative column with an optional upper bound
    fn add_non_negative(
        &mut self,
        problem: &mut Problem,
        coefficient: f64,
        upper: Option<f64>,
    ) -> Variable {
        match upper {
            Some(upper) => self.add(problem, coefficient, 0.0..=upper),
            None => self.add(problem, coefficient, 0.0..),
        }
    }
}

/// The storage subsystem's decision variables: a charge path, a reservoir and a
/// discharge path, plus one capacity per component.
pub struct StorageVariables {
    /// Charge power per timestep, kW
    pub charge: Vec<Variable>,
    /// Discharge power per timestep, kW
    pub discharge: Vec<Variable>,
    /// State of charge per timestep, kWh
    pub state_of_charge: Vec<Variable>,
    /// Reservoir capacity, kWh
    pub capacity: Variable,
    /// Charge conversion capacity, kW
    pub charge_capacity: Variable,
    /// Discharge conversion (inverter) capacity, kW
    pub discharge_capacity: Variable,
}

/// The PV subsystem's decision variables
pub struct PvVariables {
    /// Generation delivered to the load per timestep, kW
    pub generation: Vec<Variable>,
    /// Installed module capacity, kWp
    pub capacity: Variable,
}

/// A map for easy lookup of the problem's variables.
///
/// Optional subsystems that are disabled in the configuration are simply absent.
pub struct VariableMap {
    /// Grid import per timestep, kW
    pub grid_import: Vec<Variable>,
    /// Grid connection capacity, kW; constrained to be >= every import value
    pub grid_capacity: Variable,
    /// Storage variables, when storage investment is allowed
    pub storage: Option<StorageVariables>,
    /// New-PV variables, when PV investment is allowed
    pub pv: Option<PvVariables>,
    /// Utilised generation of an already-installed PV system per timestep, kW
    pub existing_pv: Option<Vec<Variable>>,
    registry: VariableRegistry,
}

impl VariableMap {
    /// The index of the given variable in the solution array
    pub fn index(&self, var: Variable) -> usize {
        *self
            .registry
            .variable_to_index
            .get(&var)
            .expect("No index found for given variable")
    }

    /// The objective coefficient of each column, in solution order
    pub fn cost_coefficients(&self) -> &[f64] {
        &self.registry.cost_coefficients
    }

    /// Total number of columns in the problem
    pub fn n_variables(&self) -> usize {
        self.registry.variable_to_index.len()
    }
}

/// A named relation forcing two or more capacity variables to resolve to one shared
/// size, e.g. the charge converter, discharge converter and reservoir of one battery.
///
/// The group is declared explicitly and enforced with equality rows, so the invariant
/// is structural rather than an accident of identical cost coefficients.
pub struct LinkedCapacityGroup {
    name: String,
    members: Vec<Variable>,
}

impl LinkedCapacityGroup {
    /// Create an empty group with the given name
    pub fn new(name: impl Into<String>) -> Self {
        LinkedCapacityGroup {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Add a capacity variable to the group
    pub fn add_member(&mut self, var: Variable) {
        self.members.push(var);
    }

    /// The group's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group's member variables
    pub fn members(&self) -> &[Variable] {
        &self.members
    }

    /// Pin every member to the first one with equality rows
    fn apply(&self, problem: &mut Problem) {
        let Some((first, rest)) = self.members.split_first() else {
            return;
        };
        for member in rest {
            problem.add_row(0.0..=0.0, [(*member, 1.0), (*first, -1.0)]);
        }
    }
}

/// The assembled optimisation problem, ready to hand to the solver adapter.
pub struct EnergyBalanceModel {
    /// The underlying linear program
    pub problem: Problem,
    /// Lookup from model entities to problem columns
    pub variables: VariableMap,
    /// Capacity variables constrained to share one size
    pub linked_capacity_groups: Vec<LinkedCapacityGroup>,
}

impl EnergyBalanceModel {
    /// Assemble the full problem from a validated configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated run configuration
    /// * `horizon` - The normalised time horizon
    /// * `producer_prices` - Resolved producer energy price per timestep
    pub fn build(
        config: &Config,
        horizon: &TimeHorizon,
        producer_prices: &[MoneyPerEnergy],
    ) -> EnergyBalanceModel {
        assert_eq!(
            producer_prices.len(),
            horizon.n_timesteps,
            "price series not aligned to horizon"
        );

        let mut problem = Problem::default();
        let mut registry = VariableRegistry::default();
        let mut groups = Vec::new();

        let hours = horizon.hours_per_timestep;
        let annualise = horizon.annualisation_factor();

        // Grid interconnect: unlimited import at a per-kWh price, plus a capacity
        // charge on the peak
        let grid_import = producer_prices
            .iter()
            .map(|price| {
                let coeff = grid_import_cost_coefficient(
                    *price,
                    config.prices.grid_energy_price,
                    hours,
                    annualise,
                );
                registry.add(&mut problem, coeff, 0.0..)
            })
            .collect();

        // The capacity charge is a yearly tariff, not an investment, so its cost
        // coefficient is the raw per-kW price
        let grid_capacity =
            registry.add(&mut problem, config.prices.grid_capacity_price.value(), 0.0..);

        let storage = config
            .add_storage
            .then(|| add_storage_variables(&mut problem, &mut registry, &mut groups, config));

        let pv = config
            .add_solar
            .then(|| add_pv_variables(&mut problem, &mut registry, config));

        let existing_pv = config.pv.existing_generation_kw.as_ref().map(|generation| {
            // Curtailable and free: bounded above by what the existing modules produce
            generation
                .iter()
                .map(|max| registry.add(&mut problem, 0.0, 0.0..=*max))
                .collect()
        });

        let variables = VariableMap {
            grid_import,
            grid_capacity,
            storage,
            pv,
            existing_pv,
            registry,
        };

        constraints::add_energy_balance_constraints(
            &mut problem,
            &variables,
            &config.consumption_kw,
        );
        constraints::add_grid_capacity_constraints(&mut problem, &variables);
        if let Some(storage) = &variables.storage {
            constraints::add_storage_constraints(&mut problem, storage, &config.storage, hours);
        }
        if let Some(pv) = &variables.pv {
            let availability = config
                .pv
                .availability
                .as_ref()
                .expect("validated config has availability when solar is enabled");
            constraints::add_pv_availability_constraints(&mut problem, pv, availability);
        }
        for group in &groups {
            group.apply(&mut problem);
        }

        EnergyBalanceModel {
            problem,
            variables,
            linked_capacity_groups: groups,
        }
    }
}

/// Yearly cost of importing one kW from the grid during one timestep.
///
/// Per-timestep operational costs are scaled to full-year costs so that sub-year
/// horizons stay comparable with the yearly annuities and capacity charge.
fn grid_import_cost_coefficient(
    producer_price: MoneyPerEnergy,
    grid_energy_price: MoneyPerEnergy,
    hours: Hours,
    annualise: Dimensionless,
) -> f64 {
    let energy_per_kw = Power(1.0) * hours;
    (((producer_price + grid_energy_price) * energy_per_kw) * annualise).value()
}

/// Add the storage subsystem's columns and declare its linked capacity group
fn add_storage_variables(
    problem: &mut Problem,
    registry: &mut VariableRegistry,
    groups: &mut Vec<LinkedCapacityGroup>,
    config: &Config,
) -> StorageVariables {
    let n = config.n_timesteps();
    let params = &config.storage;

    let charge = (0..n).map(|_| registry.add(problem, 0.0, 0.0..)).collect();
    let discharge = (0..n).map(|_| registry.add(problem, 0.0, 0.0..)).collect();
    let state_of_charge = (0..n).map(|_| registry.add(problem, 0.0, 0.0..)).collect();

    let capacity_coeff = (annuity_per_unit(
        params.effective_cost_per_kwh(),
        params.lifetime,
        config.interest_rate,
    ) + params.opex_per_kwh)
        .value();
    let capacity = registry.add_non_negative(
        problem,
        capacity_coeff,
        params.max_capacity_kwh.map(|max| max.value()),
    );

    // The charge path itself carries no investment cost; the inverter cost sits on the
    // discharge path, as in the source system
    let charge_capacity = registry.add_non_negative(
        problem,
        0.0,
        params.max_charge_kw.map(|max| max.value()),
    );
    let discharge_coeff = annuity_per_unit(
        params.inverter_cost_per_kw,
        params.inverter_lifetime,
        config.interest_rate,
    )
    .value();
    let discharge_capacity = registry.add_non_negative(
        problem,
        discharge_coeff,
        params.max_discharge_kw.map(|max| max.value()),
    );

    let mut group = LinkedCapacityGroup::new("storage");
    group.add_member(capacity);
    group.add_member(charge_capacity);
    group.add_member(discharge_capacity);
    groups.push(group);

    StorageVariables {
        charge,
        discharge,
        state_of_charge,
        capacity,
        charge_capacity,
        discharge_capacity,
    }
}

/// Add the new-PV subsystem's columns
fn add_pv_variables(
    problem: &mut Problem,
    registry: &mut VariableRegistry,
    config: &Config,
) -> PvVariables {
    let n = config.n_timesteps();
    let params = &config.pv;

    let generation = (0..n).map(|_| registry.add(problem, 0.0, 0.0..)).collect();

    let capacity_coeff =
        annuity_per_unit(params.cost_per_kwp, params.lifetime, config.interest_rate).value();
    let capacity = registry.add_non_negative(
        problem,
        capacity_coeff,
        params.max_capacity_kwp.map(|max| max.value()),
    );

    PvVariables {
        generation,
        capacity,
    }
}

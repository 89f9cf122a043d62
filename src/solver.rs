//! The adapter around the HiGHS solver.
//!
//! Solving is a single blocking call. Infeasibility and unboundedness are legitimate
//! outcomes reported as statuses; only a failure of the solver itself is an error
//! status, and the caller decides whether to treat it as fatal.
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use itertools::izip;
use log::debug;
use std::time::Duration;

/// The outcome category of a solve
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SolveStatus {
    /// An optimal solution was found
    #[display("optimal")]
    Optimal,
    /// No feasible dispatch exists
    #[display("infeasible")]
    Infeasible,
    /// The problem is unbounded (or could not be separated from infeasible)
    #[display("unbounded")]
    Unbounded,
    /// The solver itself failed or gave up; the payload is diagnostic text
    #[display("solver error: {_0}")]
    SolverError(String),
}

/// Options forwarded to the solver process
#[derive(Debug, Clone, Default)]
pub struct SolverOptions {
    /// Abort the solve after this wall-clock duration and report a solver error
    pub time_limit: Option<Duration>,
    /// Let HiGHS write its own log to the console
    pub verbose: bool,
}

/// The primal outcome of one optimisation call.
///
/// Produced once per solve and immutable afterwards; variable values are empty unless
/// the status is [`SolveStatus::Optimal`].
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// The outcome category
    pub status: SolveStatus,
    variable_values: Vec<f64>,
    /// The objective value of the solution (zero when not optimal)
    pub objective_value: f64,
}

impl SolveResult {
    /// Whether an optimal solution is available
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// The value of the column with the given index
    pub fn value(&self, index: usize) -> f64 {
        self.variable_values[index]
    }

    /// All column values, in problem order
    pub fn variable_values(&self) -> &[f64] {
        &self.variable_values
    }

    fn non_optimal(status: SolveStatus) -> SolveResult {
        SolveResult {
            status,
            variable_values: Vec::new(),
            objective_value: 0.0,
        }
    }
}

/// Solve the assembled problem, blocking until the solver returns.
///
/// # Arguments
///
/// * `problem` - The assembled linear program
/// * `cost_coefficients` - Objective coefficient per column, in problem order
/// * `options` - Solver options
pub fn solve(problem: Problem, cost_coefficients: &[f64], options: &SolverOptions) -> SolveResult {
    let mut model = problem.optimise(Sense::Minimise);

    if options.verbose {
        model.set_option("log_to_console", true);
        model.set_option("output_flag", true);
    } else {
        model.set_option("output_flag", false);
    }
    if let Some(limit) = options.time_limit {
        model.set_option("time_limit", limit.as_secs_f64());
    }

    let solved = model.solve();
    match solved.status() {
        HighsModelStatus::Optimal => {
            let variable_values = solved.get_solution().columns().to_vec();
            assert_eq!(
                variable_values.len(),
                cost_coefficients.len(),
                "solution does not match problem columns"
            );
            let objective_value = izip!(cost_coefficients, &variable_values)
                .map(|(coeff, value)| coeff * value)
                .sum();
            debug!("Solver returned an optimal solution, objective {objective_value}");
            SolveResult {
                status: SolveStatus::Optimal,
                variable_values,
                objective_value,
            }
        }
        HighsModelStatus::Infeasible => SolveResult::non_optimal(SolveStatus::Infeasible),
        HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
            SolveResult::non_optimal(SolveStatus::Unbounded)
        }
        status => SolveResult::non_optimal(SolveStatus::SolverError(format!(
            "solver terminated with status {status:?}"
        ))),
    }
}

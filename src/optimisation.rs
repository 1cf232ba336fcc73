//! Code for performing the allocation optimisation.
//!
//! The model has three variables for every (region, period) pair: the number of units allocated
//! (integer), the shortage relative to forecast demand and the overage relative to forecast
//! demand. The objective is to minimise the weighted sum of shortage and overage.
use crate::id::{PeriodIdx, RegionIdx};
use crate::index::{DemandMap, PlanningIndex, RegionPeriodMap};
use crate::parameters::AllocationParameters;
use crate::solver::{Problem, Solver, SolverOutcome, Variable};
use crate::supply::SupplyPlan;
use log::{debug, info};
use std::time::Duration;

mod constraints;
use constraints::add_allocation_constraints;

/// Absolute tolerance used when checking feasibility before solving
const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// The decision variables for a single (region, period) pair
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VariableTriple {
    /// Units shipped (integer)
    pub alloc: Variable,
    /// Shortage relative to demand
    pub unmet: Variable,
    /// Overage relative to demand
    pub extra: Variable,
}

/// A map for easy lookup of variables in the problem
pub type VariableMap = RegionPeriodMap<VariableTriple>;

/// The ways in which the optimisation can fail once the inputs have been validated
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum PlanError {
    /// The model is well formed but over-constrained
    #[display("Allocation problem is infeasible: {_0}")]
    Infeasible(String),
    /// The solver did not finish within the time limit
    #[display("Solver did not finish within the time limit of {}s", _0.as_secs_f64())]
    TimedOut(Duration),
    /// The solver failed for another reason
    #[display("Solver failed: {_0}")]
    SolverFailure(String),
}

impl std::error::Error for PlanError {}

impl PlanError {
    /// Whether retrying (e.g. with relaxed parameters or a longer time limit) might succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Infeasible(_))
    }
}

/// The solution to the allocation optimisation problem
#[derive(Debug, Clone)]
pub struct Solution {
    variables: VariableMap,
    values: Vec<f64>,
    objective: f64,
}

impl Solution {
    /// Units allocated to the region in the period, as returned by the solver
    pub fn alloc(&self, region: RegionIdx, period: PeriodIdx) -> f64 {
        self.values[self.variables.get(region, period).alloc.index()]
    }

    /// Shortage for the region in the period
    pub fn unmet(&self, region: RegionIdx, period: PeriodIdx) -> f64 {
        self.values[self.variables.get(region, period).unmet.index()]
    }

    /// Overage for the region in the period
    pub fn extra(&self, region: RegionIdx, period: PeriodIdx) -> f64 {
        self.values[self.variables.get(region, period).extra.index()]
    }

    /// The value of the objective function at the solution
    pub fn objective_value(&self) -> f64 {
        self.objective
    }
}

/// Check for infeasibility which is evident without invoking the solver.
///
/// The model cannot be satisfied if the service floors together need more units than there is
/// capacity over the whole horizon, or if a region's share caps add up to less than its floor.
pub fn check_feasibility(
    index: &PlanningIndex,
    demand: &DemandMap,
    supply: &SupplyPlan,
    params: &AllocationParameters,
) -> Result<(), PlanError> {
    let required = params.min_service * demand.total();
    let available = supply.total();
    if required > available + FEASIBILITY_TOLERANCE {
        return Err(PlanError::Infeasible(format!(
            "a minimum service level of {} needs {required} units over the horizon, but total \
            capacity is {available}",
            params.min_service
        )));
    }

    if params.has_share_cap() {
        let max_for_region = params.max_share * available;
        for region in index.iter_regions() {
            let required = params.min_service * demand.region_total(region);
            if required > max_for_region + FEASIBILITY_TOLERANCE {
                return Err(PlanError::Infeasible(format!(
                    "region {} needs {required} units to meet the minimum service level, but the \
                    share cap allows at most {max_for_region}",
                    index.region(region)
                )));
            }
        }
    }

    Ok(())
}

/// Build the allocation problem.
///
/// # Returns
///
/// The problem to solve along with a map of its variables.
pub fn build_problem(
    index: &PlanningIndex,
    demand: &DemandMap,
    supply: &SupplyPlan,
    params: &AllocationParameters,
) -> (Problem, VariableMap) {
    let mut problem = Problem::default();
    let variables = add_variables(&mut problem, index, params);
    add_allocation_constraints(&mut problem, &variables, index, demand, supply, params);
    problem.set_time_limit(params.time_limit());

    (problem, variables)
}

/// Add variables to the optimisation problem.
///
/// Only shortage and overage carry a cost in the objective.
fn add_variables(
    problem: &mut Problem,
    index: &PlanningIndex,
    params: &AllocationParameters,
) -> VariableMap {
    RegionPeriodMap::from_fn(index, |_, _| VariableTriple {
        alloc: problem.add_integer_column(0.0, 0.0..),
        unmet: problem.add_column(params.unmet_cost, 0.0..),
        extra: problem.add_column(params.extra_cost, 0.0..),
    })
}

/// Perform the allocation optimisation.
///
/// # Arguments
///
/// * `index` - The regions and periods to plan
/// * `demand` - Forecast demand for every region and period
/// * `supply` - Capacity for every period
/// * `params` - Parameters for the run
/// * `solver` - The solver to use
///
/// # Returns
///
/// The solved values of every variable, or a [`PlanError`] if no optimal solution was found.
pub fn perform_allocation_optimisation<S: Solver + ?Sized>(
    index: &PlanningIndex,
    demand: &DemandMap,
    supply: &SupplyPlan,
    params: &AllocationParameters,
    solver: &S,
) -> Result<Solution, PlanError> {
    check_feasibility(index, demand, supply, params)?;

    let (problem, variables) = build_problem(index, demand, supply, params);
    debug!(
        "Built allocation problem with {} variables and {} constraints",
        problem.num_cols(),
        problem.num_rows()
    );

    match solver.solve(&problem) {
        SolverOutcome::Optimal(values) => {
            if values.len() != problem.num_cols() {
                return Err(PlanError::SolverFailure(format!(
                    "expected {} values, got {}",
                    problem.num_cols(),
                    values.len()
                )));
            }

            let objective = problem.objective_value(&values);
            info!("Found optimal allocation with objective value {objective:.2}");
            Ok(Solution {
                variables,
                values,
                objective,
            })
        }
        SolverOutcome::Infeasible => Err(PlanError::Infeasible(
            "the solver found no allocation satisfying all constraints".into(),
        )),
        SolverOutcome::TimedOut => Err(PlanError::TimedOut(
            problem.time_limit().unwrap_or_default(),
        )),
        SolverOutcome::Unbounded => Err(PlanError::SolverFailure("problem is unbounded".into())),
        SolverOutcome::Failed(reason) => Err(PlanError::SolverFailure(reason)),
    }
}

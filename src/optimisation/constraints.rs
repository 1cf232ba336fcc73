//! Code for adding constraints to the allocation optimisation problem.
use super::VariableMap;
use crate::index::{DemandMap, PlanningIndex};
use crate::parameters::AllocationParameters;
use crate::solver::Problem;
use crate::supply::SupplyPlan;

/// Add all constraints for the allocation problem.
///
/// # Arguments:
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `index` - The regions and periods being planned
/// * `demand` - Forecast demand for every region and period
/// * `supply` - Capacity for every period
/// * `params` - Parameters for the run
pub fn add_allocation_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    index: &PlanningIndex,
    demand: &DemandMap,
    supply: &SupplyPlan,
    params: &AllocationParameters,
) {
    add_capacity_constraints(problem, variables, index, supply);
    add_shortage_and_overage_constraints(problem, variables, index, demand);
    add_min_service_constraints(problem, variables, index, demand, params.min_service);

    if params.has_share_cap() {
        add_share_cap_constraints(problem, variables, index, supply, params.max_share);
    }
}

/// Add capacity constraints.
///
/// The total allocated across regions in each period cannot exceed that period's capacity.
fn add_capacity_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    index: &PlanningIndex,
    supply: &SupplyPlan,
) {
    for period in index.iter_periods() {
        let terms = variables.iter_period(period).map(|vars| (vars.alloc, 1.0));
        problem.add_row(..=supply.get(period), terms);
    }
}

/// Add constraints relating shortage and overage to allocation and demand.
///
/// These only give lower bounds: `unmet >= demand - alloc` and `extra >= alloc - demand`. As both
/// carry a positive cost, an optimal solution sets each to exactly its lower bound (or zero).
fn add_shortage_and_overage_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    index: &PlanningIndex,
    demand: &DemandMap,
) {
    for (region, period) in index.iter_pairs() {
        let vars = variables.get(region, period);
        let demand = *demand.get(region, period);

        // unmet + alloc >= demand
        problem.add_row(demand.., [(vars.unmet, 1.0), (vars.alloc, 1.0)]);

        // extra - alloc >= -demand
        problem.add_row(-demand.., [(vars.extra, 1.0), (vars.alloc, -1.0)]);
    }
}

/// Add minimum service constraints.
///
/// Over the whole horizon, each region must receive at least `min_service` times its total
/// demand.
fn add_min_service_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    index: &PlanningIndex,
    demand: &DemandMap,
    min_service: f64,
) {
    for region in index.iter_regions() {
        let terms = variables.iter_region(region).map(|vars| (vars.alloc, 1.0));
        problem.add_row(min_service * demand.region_total(region).., terms);
    }
}

/// Add share cap constraints.
///
/// No region may receive more than `max_share` of a period's capacity.
fn add_share_cap_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    index: &PlanningIndex,
    supply: &SupplyPlan,
    max_share: f64,
) {
    for (region, period) in index.iter_pairs() {
        let vars = variables.get(region, period);
        problem.add_row(..=max_share * supply.get(period), [(vars.alloc, 1.0)]);
    }
}

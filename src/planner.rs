//! Functionality for running an allocation plan from start to finish.
use crate::index::{DemandMap, PlanningIndex};
use crate::input::{ForecastRow, read_forecast};
use crate::optimisation::{check_feasibility, perform_allocation_optimisation};
use crate::output::{DataWriter, write_metadata};
use crate::parameters::{AllocationParameters, ParameterOverrides};
use crate::plan::Plan;
use crate::solver::Solver;
use crate::supply::{SupplyMode, SupplyPlan};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info};
use std::path::Path;

/// The number of periods whose supply is shown in the log
const NUM_SUPPLY_PERIODS_TO_LOG: usize = 3;

/// Plan allocations for the given forecast.
///
/// This validates the parameters, builds the planning index, works out supply, solves the
/// allocation problem and aggregates the result.
///
/// # Arguments
///
/// * `rows` - The forecast table
/// * `params` - Parameters for the run
/// * `solver` - The solver to use
///
/// # Returns
///
/// The plan, or an error. Solve-stage failures are [`crate::optimisation::PlanError`]s.
pub fn plan_allocation<S: Solver + ?Sized>(
    rows: &[ForecastRow],
    params: &AllocationParameters,
    solver: &S,
) -> Result<Plan> {
    params.validate().context("Invalid parameters")?;

    let index = PlanningIndex::new(rows, params.horizon)?;
    info!(
        "Planning {} regions over {} periods",
        index.num_regions(),
        index.num_periods()
    );
    debug!("Regions: {}", index.regions().iter().join(", "));

    let demand = DemandMap::from_rows(&index, rows)?;

    let mode = SupplyMode::from_parameters(params);
    let supply = SupplyPlan::new(&index, &demand, mode)?;
    info!(
        "Weekly supply plan (first {NUM_SUPPLY_PERIODS_TO_LOG}): {}",
        supply
            .iter(&index)
            .take(NUM_SUPPLY_PERIODS_TO_LOG)
            .map(|(period, capacity)| format!("{period}: {capacity:.1}"))
            .join(", ")
    );

    let solution = perform_allocation_optimisation(&index, &demand, &supply, params, solver)?;
    let plan = Plan::from_solution(&index, &demand, &supply, &solution);

    for summary in plan.summary() {
        info!("Fill rate for {}: {:.2}%", summary.region, summary.fill_rate);
    }
    info!("Overall fill rate: {:.2}%", plan.overall_fill_rate());

    Ok(plan)
}

/// Load the inputs from a planning directory, run the plan and write the outputs.
///
/// # Arguments
///
/// * `planning_dir` - Folder containing the planning input files
/// * `overrides` - Parameter values which take precedence over the parameters file
/// * `output_path` - Folder where output files will be saved
/// * `solver` - The solver to use
pub fn run<S: Solver + ?Sized>(
    planning_dir: &Path,
    overrides: &ParameterOverrides,
    output_path: &Path,
    solver: &S,
) -> Result<Plan> {
    let (rows, params) = load_inputs(planning_dir, overrides)?;
    info!("Loaded {} forecast rows", rows.len());

    let plan = plan_allocation(&rows, &params, solver)?;

    let mut writer = DataWriter::create(output_path)?;
    writer.write_plan(&plan)?;
    writer.flush()?;
    write_metadata(output_path, planning_dir, &params)
        .context("Failed to save metadata")?;
    info!("Results written to {}", output_path.display());

    Ok(plan)
}

/// Check that a forecast and parameters could be planned, without invoking the solver.
///
/// Infeasibility which is evident before solving is reported as a
/// [`crate::optimisation::PlanError`].
pub fn validate_inputs(rows: &[ForecastRow], params: &AllocationParameters) -> Result<()> {
    params.validate().context("Invalid parameters")?;
    let index = PlanningIndex::new(rows, params.horizon)?;
    let demand = DemandMap::from_rows(&index, rows)?;
    let supply = SupplyPlan::new(&index, &demand, SupplyMode::from_parameters(params))?;
    check_feasibility(&index, &demand, &supply, params)?;

    Ok(())
}

/// Read the forecast and parameters from a planning directory.
///
/// Parameters from `allocation.toml` are checked before `overrides` are applied. The combined
/// parameters are checked when planning.
pub fn load_inputs(
    planning_dir: &Path,
    overrides: &ParameterOverrides,
) -> Result<(Vec<ForecastRow>, AllocationParameters)> {
    let params = AllocationParameters::from_path(planning_dir)?.with_overrides(overrides);
    let rows = read_forecast(planning_dir)?;

    Ok((rows, params))
}

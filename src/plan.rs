//! The allocation plan produced by a run, along with per-region KPIs.
use crate::id::RegionID;
use crate::index::{DemandMap, PlanningIndex};
use crate::optimisation::Solution;
use crate::supply::SupplyPlan;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The allocation for one region in one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRow {
    /// The region
    pub region: RegionID,
    /// The start date of the period
    #[serde(rename = "date")]
    pub period: NaiveDate,
    /// Forecast demand
    pub demand: f64,
    /// Units allocated
    pub alloc: u64,
    /// Shortage relative to demand
    pub unmet: f64,
    /// Overage relative to demand
    pub extra: f64,
}

/// Totals for one region over the whole horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    /// The region
    pub region: RegionID,
    /// Total forecast demand
    pub demand_total: f64,
    /// Total units allocated
    pub alloc_total: u64,
    /// Total shortage
    pub unmet_total: f64,
    /// Total overage
    pub extra_total: f64,
    /// Units allocated as a percentage of demand (NaN if there was no demand)
    #[serde(rename = "fill_rate_%")]
    pub fill_rate: f64,
}

/// The result of an allocation run.
///
/// Rows are sorted by period and then region; the summary is sorted by region.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    rows: Vec<PlanRow>,
    summary: Vec<RegionSummary>,
    supply: Vec<(NaiveDate, f64)>,
    objective: f64,
}

/// Convert a solver value for an integer variable into a number of units
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_units(value: f64) -> u64 {
    value.round().max(0.0) as u64
}

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Allocation as a percentage of demand, rounded to two decimal places.
///
/// Returns NaN if demand is zero.
pub fn fill_rate(alloc: f64, demand: f64) -> f64 {
    if demand == 0.0 {
        return f64::NAN;
    }

    round2(alloc / demand * 100.0)
}

impl Plan {
    /// Read the solution into a plan and aggregate it per region.
    ///
    /// # Arguments
    ///
    /// * `index` - The regions and periods which were planned
    /// * `demand` - Forecast demand for every region and period
    /// * `supply` - Capacity for every period
    /// * `solution` - An optimal solution to the allocation problem
    pub fn from_solution(
        index: &PlanningIndex,
        demand: &DemandMap,
        supply: &SupplyPlan,
        solution: &Solution,
    ) -> Self {
        let mut rows = Vec::with_capacity(index.num_regions() * index.num_periods());
        for period in index.iter_periods() {
            for region in index.iter_regions() {
                rows.push(PlanRow {
                    region: index.region(region).clone(),
                    period: index.period(period),
                    demand: *demand.get(region, period),
                    alloc: to_units(solution.alloc(region, period)),
                    unmet: solution.unmet(region, period).max(0.0),
                    extra: solution.extra(region, period).max(0.0),
                });
            }
        }

        let summary = summarise(index, &rows);

        Self {
            rows,
            summary,
            supply: supply.iter(index).collect(),
            objective: solution.objective_value(),
        }
    }

    /// Per-(region, period) allocations, sorted by period then region
    pub fn rows(&self) -> &[PlanRow] {
        &self.rows
    }

    /// Per-region totals, sorted by region
    pub fn summary(&self) -> &[RegionSummary] {
        &self.summary
    }

    /// Capacity for each period
    pub fn supply(&self) -> &[(NaiveDate, f64)] {
        &self.supply
    }

    /// The objective value (weighted shortage and overage)
    pub fn objective_value(&self) -> f64 {
        self.objective
    }

    /// Total units allocated over all regions and periods
    pub fn total_alloc(&self) -> u64 {
        self.summary.iter().map(|s| s.alloc_total).sum()
    }

    /// Total forecast demand over all regions and periods
    pub fn total_demand(&self) -> f64 {
        self.summary.iter().map(|s| s.demand_total).sum()
    }

    /// Fill rate across all regions (NaN if there was no demand)
    pub fn overall_fill_rate(&self) -> f64 {
        fill_rate(self.total_alloc() as f64, self.total_demand())
    }

    /// Get the summary for a region
    pub fn region_summary(&self, region: &str) -> Option<&RegionSummary> {
        self.summary.iter().find(|s| &*s.region.0 == region)
    }
}

/// Aggregate plan rows per region
fn summarise(index: &PlanningIndex, rows: &[PlanRow]) -> Vec<RegionSummary> {
    let mut summary: Vec<_> = index
        .regions()
        .iter()
        .map(|region| RegionSummary {
            region: region.clone(),
            demand_total: 0.0,
            alloc_total: 0,
            unmet_total: 0.0,
            extra_total: 0.0,
            fill_rate: f64::NAN,
        })
        .collect();

    // Rows are ordered by period then region, so the region position repeats with each period
    let num_regions = index.num_regions();
    for (i, row) in rows.iter().enumerate() {
        let entry = &mut summary[i % num_regions];
        entry.demand_total += row.demand;
        entry.alloc_total += row.alloc;
        entry.unmet_total += row.unmet;
        entry.extra_total += row.extra;
    }

    for entry in &mut summary {
        entry.fill_rate = fill_rate(entry.alloc_total as f64, entry.demand_total);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixedOutcomeSolver, demand, parameters, planning_index, week};
    use crate::optimisation::perform_allocation_optimisation;
    use crate::parameters::AllocationParameters;
    use crate::solver::SolverOutcome;
    use crate::supply::SupplyMode;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// Solve with a stub solver returning the given (alloc, unmet, extra) triples, which are given
    /// in region-major order
    fn plan_from_values(
        index: &PlanningIndex,
        demand: &DemandMap,
        params: &AllocationParameters,
        triples: &[(f64, f64, f64)],
    ) -> Plan {
        let supply = SupplyPlan::new(index, demand, SupplyMode::Fixed(200.0)).unwrap();
        let values = triples.iter().flat_map(|&(a, u, e)| [a, u, e]).collect();
        let solver = FixedOutcomeSolver(SolverOutcome::Optimal(values));
        let solution =
            perform_allocation_optimisation(index, demand, &supply, params, &solver).unwrap();
        Plan::from_solution(index, demand, &supply, &solution)
    }

    #[rstest]
    #[case(50.0, 100.0, 50.0)]
    #[case(100.0, 100.0, 100.0)]
    #[case(1.0, 3.0, 33.33)]
    #[case(2.0, 3.0, 66.67)]
    #[case(150.0, 100.0, 150.0)]
    fn test_fill_rate(#[case] alloc: f64, #[case] demand: f64, #[case] expected: f64) {
        assert_approx_eq!(f64, fill_rate(alloc, demand), expected);
    }

    #[test]
    fn test_fill_rate_zero_demand() {
        assert!(fill_rate(0.0, 0.0).is_nan());
        assert!(fill_rate(5.0, 0.0).is_nan());
    }

    #[test]
    fn test_to_units() {
        assert_eq!(to_units(6.999_999_9), 7);
        assert_eq!(to_units(-1e-9), 0);
        assert_eq!(to_units(12.0), 12);
    }

    #[rstest]
    fn test_plan_from_solution(
        planning_index: PlanningIndex,
        demand: DemandMap,
        parameters: AllocationParameters,
    ) {
        // MY: demand 50, 60, 70; SG: demand 100, 110, 120
        let triples = [
            (50.0, 0.0, 0.0),
            (55.0, 5.0, 0.0),
            (72.0, 0.0, 2.0),
            (80.0, 20.0, 0.0),
            (110.0, 0.0, 0.0),
            (99.999_999_9, 20.0, 0.0),
        ];
        let plan = plan_from_values(&planning_index, &demand, &parameters, &triples);

        // Sorted by period then region
        let keys: Vec<_> = plan
            .rows()
            .iter()
            .map(|row| (row.period, row.region.to_string()))
            .collect();
        assert_eq!(
            keys,
            [
                (week(0), "MY".to_string()),
                (week(0), "SG".to_string()),
                (week(1), "MY".to_string()),
                (week(1), "SG".to_string()),
                (week(2), "MY".to_string()),
                (week(2), "SG".to_string()),
            ]
        );
        assert_eq!(plan.rows()[5].alloc, 100);
        assert_approx_eq!(f64, plan.rows()[5].demand, 120.0);

        let my = plan.region_summary("MY").unwrap();
        assert_approx_eq!(f64, my.demand_total, 180.0);
        assert_eq!(my.alloc_total, 177);
        assert_approx_eq!(f64, my.unmet_total, 5.0);
        assert_approx_eq!(f64, my.extra_total, 2.0);
        assert_approx_eq!(f64, my.fill_rate, 98.33);

        let sg = plan.region_summary("SG").unwrap();
        assert_eq!(sg.alloc_total, 290);
        assert_approx_eq!(f64, sg.unmet_total, 40.0);
        assert_approx_eq!(f64, sg.fill_rate, 87.88);

        assert_eq!(plan.total_alloc(), 467);
        assert_approx_eq!(f64, plan.overall_fill_rate(), 91.57);
        assert_approx_eq!(f64, plan.objective_value(), 3.0 * 45.0 + 2.0);
        assert_eq!(plan.supply().len(), 3);
    }

    #[test]
    fn test_plan_zero_demand_region() {
        let rows = [
            crate::input::ForecastRow::new("ID", week(0), 0.0),
            crate::input::ForecastRow::new("PH", week(0), 10.0),
        ];
        let index = PlanningIndex::new(&rows, 8).unwrap();
        let demand = DemandMap::from_rows(&index, &rows).unwrap();
        let params = AllocationParameters {
            max_share: 1.0,
            ..Default::default()
        };
        let plan = plan_from_values(&index, &demand, &params, &[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)]);

        assert!(plan.region_summary("ID").unwrap().fill_rate.is_nan());
        assert_approx_eq!(f64, plan.region_summary("PH").unwrap().fill_rate, 100.0);
    }
}

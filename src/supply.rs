//! Code for working out how much supply is available to allocate in each period.
use crate::id::PeriodIdx;
use crate::index::{DemandMap, PlanningIndex};
use crate::parameters::AllocationParameters;
use anyhow::{Result, ensure};
use chrono::NaiveDate;

/// How per-period capacity is determined
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupplyMode {
    /// Every period has the same capacity
    Fixed(f64),
    /// Capacity is this fraction of the total demand across regions in each period
    Ratio(f64),
}

impl SupplyMode {
    /// Get the supply mode from the run parameters.
    ///
    /// A fixed `supply` takes precedence over `supply_ratio`.
    pub fn from_parameters(params: &AllocationParameters) -> Self {
        match params.supply {
            Some(supply) => Self::Fixed(supply),
            None => Self::Ratio(params.supply_ratio),
        }
    }
}

/// Capacity available in each period of the horizon
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyPlan(Vec<f64>);

impl SupplyPlan {
    /// Compute the capacity for every period in the index.
    ///
    /// # Arguments
    ///
    /// * `index` - The regions and periods being planned
    /// * `demand` - Forecast demand for every region and period
    /// * `mode` - How to derive capacity
    pub fn new(index: &PlanningIndex, demand: &DemandMap, mode: SupplyMode) -> Result<Self> {
        let capacities: Vec<f64> = index
            .iter_periods()
            .map(|period| match mode {
                SupplyMode::Fixed(supply) => supply,
                SupplyMode::Ratio(ratio) => ratio * demand.period_total(period),
            })
            .collect();

        for (period, capacity) in index.periods().iter().zip(&capacities) {
            ensure!(
                capacity.is_finite() && *capacity >= 0.0,
                "Capacity for period {period} must be a finite number greater than or equal to \
                zero (got {capacity})"
            );
        }

        Ok(Self(capacities))
    }

    /// Capacity for the given period
    pub fn get(&self, period: PeriodIdx) -> f64 {
        self.0[period.get()]
    }

    /// Total capacity over the horizon
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Iterate over periods and their capacities
    pub fn iter<'a>(
        &'a self,
        index: &'a PlanningIndex,
    ) -> impl Iterator<Item = (NaiveDate, f64)> + 'a {
        index.periods().iter().copied().zip(self.0.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{demand, parameters, planning_index};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_supply_mode_from_parameters(parameters: AllocationParameters) {
        assert_eq!(
            SupplyMode::from_parameters(&parameters),
            SupplyMode::Ratio(0.9)
        );

        let params = AllocationParameters {
            supply: Some(250.0),
            ..parameters
        };
        assert_eq!(SupplyMode::from_parameters(&params), SupplyMode::Fixed(250.0));
    }

    #[rstest]
    fn test_supply_plan_fixed(planning_index: PlanningIndex, demand: DemandMap) {
        let supply = SupplyPlan::new(&planning_index, &demand, SupplyMode::Fixed(100.0)).unwrap();
        for period in planning_index.iter_periods() {
            assert_approx_eq!(f64, supply.get(period), 100.0);
        }
        assert_approx_eq!(f64, supply.total(), 300.0);
    }

    #[rstest]
    fn test_supply_plan_ratio(planning_index: PlanningIndex, demand: DemandMap) {
        let supply = SupplyPlan::new(&planning_index, &demand, SupplyMode::Ratio(0.5)).unwrap();
        let capacities: Vec<_> = supply.iter(&planning_index).map(|(_, c)| c).collect();
        assert_eq!(capacities.len(), 3);
        assert_approx_eq!(f64, capacities[0], 75.0);
        assert_approx_eq!(f64, capacities[1], 85.0);
        assert_approx_eq!(f64, capacities[2], 95.0);
    }

    #[rstest]
    #[case(SupplyMode::Fixed(-1.0))]
    #[case(SupplyMode::Ratio(-0.1))]
    #[case(SupplyMode::Fixed(f64::NAN))]
    fn test_supply_plan_invalid(
        planning_index: PlanningIndex,
        demand: DemandMap,
        #[case] mode: SupplyMode,
    ) {
        assert!(SupplyPlan::new(&planning_index, &demand, mode).is_err());
    }
}

//! Fixtures for tests
use crate::index::{DemandMap, PlanningIndex};
use crate::input::ForecastRow;
use crate::parameters::AllocationParameters;
use crate::solver::{Problem, Solver, SolverOutcome};
use chrono::{Days, NaiveDate};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// The start date of the `n`th week, counting from 2024-01-01
pub fn week(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(7 * n)
}

/// Two regions over three weeks
#[fixture]
pub fn forecast_rows() -> Vec<ForecastRow> {
    vec![
        ForecastRow::new("SG", week(0), 100.0),
        ForecastRow::new("SG", week(1), 110.0),
        ForecastRow::new("SG", week(2), 120.0),
        ForecastRow::new("MY", week(0), 50.0),
        ForecastRow::new("MY", week(1), 60.0),
        ForecastRow::new("MY", week(2), 70.0),
    ]
}

#[fixture]
pub fn planning_index(forecast_rows: Vec<ForecastRow>) -> PlanningIndex {
    PlanningIndex::new(&forecast_rows, 8).unwrap()
}

#[fixture]
pub fn demand(forecast_rows: Vec<ForecastRow>, planning_index: PlanningIndex) -> DemandMap {
    DemandMap::from_rows(&planning_index, &forecast_rows).unwrap()
}

#[fixture]
pub fn parameters() -> AllocationParameters {
    AllocationParameters::default()
}

/// A solver which always returns the same outcome
pub struct FixedOutcomeSolver(pub SolverOutcome);

impl Solver for FixedOutcomeSolver {
    fn solve(&self, _problem: &Problem) -> SolverOutcome {
        self.0.clone()
    }
}

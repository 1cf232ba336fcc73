//! Code for reading the demand forecast table produced by the forecasting step.
use super::{input_err_msg, read_csv};
use crate::id::RegionID;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const FORECAST_FILE_NAME: &str = "forecast.csv";

/// A single row of the forecast table: the forecast demand for a region in one week.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ForecastRow {
    /// The region the forecast applies to
    pub region: RegionID,
    /// The week, identified by its start date
    #[serde(rename = "date")]
    pub period: NaiveDate,
    /// The forecast demand (units)
    #[serde(alias = "yhat")]
    pub forecast_demand: f64,
}

impl ForecastRow {
    /// Create a new [`ForecastRow`]
    pub fn new(region: &str, period: NaiveDate, forecast_demand: f64) -> Self {
        Self {
            region: region.into(),
            period,
            forecast_demand,
        }
    }
}

/// Read the forecast table from a planning directory.
///
/// # Arguments
///
/// * `planning_dir` - Folder containing the planning input files
///
/// # Returns
///
/// All rows of the forecast file, in file order.
pub fn read_forecast(planning_dir: &Path) -> Result<Vec<ForecastRow>> {
    let file_path = planning_dir.join(FORECAST_FILE_NAME);
    let rows = read_csv(&file_path)?;
    read_forecast_from_iter(rows).with_context(|| input_err_msg(&file_path))
}

/// Check forecast rows, returning them as a `Vec`.
fn read_forecast_from_iter<I>(iter: I) -> Result<Vec<ForecastRow>>
where
    I: Iterator<Item = ForecastRow>,
{
    let rows: Vec<_> = iter.collect();
    check_forecast_rows(&rows)?;

    Ok(rows)
}

/// Check that forecast rows have non-empty regions, valid demand and no duplicates.
pub fn check_forecast_rows(rows: &[ForecastRow]) -> Result<()> {
    let mut seen = HashSet::new();
    for row in rows {
        ensure!(
            !row.region.0.trim().is_empty(),
            "Region label cannot be empty (date: {})",
            row.period
        );
        ensure!(
            row.forecast_demand.is_finite() && row.forecast_demand >= 0.0,
            "forecast_demand must be a finite, non-negative number (region: {}, date: {}, \
            value: {})",
            row.region,
            row.period,
            row.forecast_demand
        );
        ensure!(
            seen.insert((&row.region, row.period)),
            "Duplicate forecast entries (region: {}, date: {})",
            row.region,
            row.period
        );
    }

    Ok(())
}

//! The planning index: the ordered regions and periods that a plan covers.
//!
//! Every per-(region, period) quantity is stored in a [`RegionPeriodMap`], which is a dense table
//! addressed by [`RegionIdx`] and [`PeriodIdx`] rather than by strings.
use crate::id::{PeriodIdx, RegionID, RegionIdx};
use crate::input::{ForecastRow, check_forecast_rows};
use anyhow::{Result, ensure};
use chrono::NaiveDate;
use itertools::Itertools;
use std::collections::HashMap;

/// The regions and periods covered by a plan.
///
/// Regions are sorted lexicographically and periods chronologically.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningIndex {
    regions: Vec<RegionID>,
    periods: Vec<NaiveDate>,
}

impl PlanningIndex {
    /// Build the index from the rows of the forecast table.
    ///
    /// All regions present in the table are included. Periods are truncated to the first
    /// `horizon` in chronological order; if there are fewer, all periods are used.
    pub fn new(rows: &[ForecastRow], horizon: u32) -> Result<Self> {
        ensure!(horizon >= 1, "horizon must be at least 1");
        ensure!(!rows.is_empty(), "No forecast data provided");

        let regions = rows
            .iter()
            .map(|row| row.region.clone())
            .sorted()
            .dedup()
            .collect();
        let periods = rows
            .iter()
            .map(|row| row.period)
            .sorted()
            .dedup()
            .take(horizon as usize)
            .collect();

        Ok(Self { regions, periods })
    }

    /// The number of regions
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// The number of periods in the horizon
    pub fn num_periods(&self) -> usize {
        self.periods.len()
    }

    /// Get the region at the given index
    pub fn region(&self, idx: RegionIdx) -> &RegionID {
        &self.regions[idx.get()]
    }

    /// Get the period at the given index
    pub fn period(&self, idx: PeriodIdx) -> NaiveDate {
        self.periods[idx.get()]
    }

    /// Iterate over region indices in order
    pub fn iter_regions(&self) -> impl Iterator<Item = RegionIdx> + use<> {
        (0..self.regions.len()).map(RegionIdx)
    }

    /// Iterate over period indices in order
    pub fn iter_periods(&self) -> impl Iterator<Item = PeriodIdx> + use<> {
        (0..self.periods.len()).map(PeriodIdx)
    }

    /// Iterate over every (region, period) pair, region-major
    pub fn iter_pairs(&self) -> impl Iterator<Item = (RegionIdx, PeriodIdx)> + use<> {
        let periods = (0..self.periods.len()).map(PeriodIdx);
        self.iter_regions().cartesian_product(periods)
    }

    /// The region IDs in order
    pub fn regions(&self) -> &[RegionID] {
        &self.regions
    }

    /// The periods in order
    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }
}

/// A dense table holding one value per (region, period) pair of a [`PlanningIndex`]
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPeriodMap<T> {
    num_periods: usize,
    values: Vec<T>,
}

impl<T> RegionPeriodMap<T> {
    /// Build a map by calling `f` for every (region, period) pair of the index
    pub fn from_fn<F>(index: &PlanningIndex, mut f: F) -> Self
    where
        F: FnMut(RegionIdx, PeriodIdx) -> T,
    {
        Self {
            num_periods: index.num_periods(),
            values: index.iter_pairs().map(|(r, p)| f(r, p)).collect(),
        }
    }

    /// Get the value for the given region and period
    pub fn get(&self, region: RegionIdx, period: PeriodIdx) -> &T {
        &self.values[region.get() * self.num_periods + period.get()]
    }

    /// Iterate over the values for a single region, in period order
    pub fn iter_region(&self, region: RegionIdx) -> impl Iterator<Item = &T> {
        let start = region.get() * self.num_periods;
        self.values[start..start + self.num_periods].iter()
    }

    /// Iterate over the values for a single period, in region order
    pub fn iter_period(&self, period: PeriodIdx) -> impl Iterator<Item = &T> {
        self.values
            .iter()
            .skip(period.get())
            .step_by(self.num_periods.max(1))
    }

    /// Iterate over all values, region-major
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}

/// Forecast demand for every (region, period) pair of the horizon
pub type DemandMap = RegionPeriodMap<f64>;

impl DemandMap {
    /// Look up the demand for every (region, period) pair of the index.
    ///
    /// Rows for periods outside the horizon are ignored. It is an error for any pair in the index
    /// to be missing from `rows`, or for `rows` to fail [`check_forecast_rows`].
    pub fn from_rows(index: &PlanningIndex, rows: &[ForecastRow]) -> Result<Self> {
        check_forecast_rows(rows)?;

        let lookup: HashMap<(&str, NaiveDate), f64> = rows
            .iter()
            .map(|row| ((&*row.region.0, row.period), row.forecast_demand))
            .collect();

        let mut missing = Vec::new();
        let map = RegionPeriodMap::from_fn(index, |r, p| {
            let key = (&*index.region(r).0, index.period(p));
            lookup.get(&key).copied().unwrap_or_else(|| {
                missing.push(format!("({}, {})", key.0, key.1));
                0.0
            })
        });
        ensure!(
            missing.is_empty(),
            "Forecast is missing demand for: {}",
            missing.join(", ")
        );

        Ok(map)
    }

    /// Total demand for a region over the horizon
    pub fn region_total(&self, region: RegionIdx) -> f64 {
        self.iter_region(region).sum()
    }

    /// Total demand across all regions in a period
    pub fn period_total(&self, period: PeriodIdx) -> f64 {
        self.iter_period(period).sum()
    }

    /// Total demand across the whole horizon
    pub fn total(&self) -> f64 {
        self.values().sum()
    }
}

//! Defines the `AllocationParameters` struct, which represents the contents of `allocation.toml`.
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result, ensure};
use clap::Args;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const PARAMETERS_FILE_NAME: &str = "allocation.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_horizon, u32, 8);
define_param_default!(default_supply_ratio, f64, 0.9);
define_param_default!(default_unmet_cost, f64, 3.0);
define_param_default!(default_extra_cost, f64, 1.0);
define_param_default!(default_min_service, f64, 0.85);
define_param_default!(default_max_share, f64, 0.6);

/// The parameters for a single allocation run.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AllocationParameters {
    /// Number of leading periods to plan over
    #[serde(default = "default_horizon")]
    pub horizon: u32,
    /// Fixed per-period capacity. If unset, capacity is derived from `supply_ratio`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply: Option<f64>,
    /// Fraction of each period's total demand used as that period's capacity
    #[serde(default = "default_supply_ratio")]
    pub supply_ratio: f64,
    /// Objective weight on each unit of shortage
    #[serde(default = "default_unmet_cost")]
    pub unmet_cost: f64,
    /// Objective weight on each unit of overage
    #[serde(default = "default_extra_cost")]
    pub extra_cost: f64,
    /// Minimum fraction of its total horizon demand that each region must receive
    #[serde(default = "default_min_service")]
    pub min_service: f64,
    /// Maximum fraction of a period's capacity that one region may receive.
    ///
    /// Values of 1 or more disable the cap.
    #[serde(default = "default_max_share")]
    pub max_share: f64,
    /// Time limit for the solver, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
}

impl Default for AllocationParameters {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            supply: None,
            supply_ratio: default_supply_ratio(),
            unmet_cost: default_unmet_cost(),
            extra_cost: default_extra_cost(),
            min_service: default_min_service(),
            max_share: default_max_share(),
            time_limit: None,
        }
    }
}

/// Values given on the command line which take precedence over `allocation.toml`
#[derive(Args, Debug, Default, Clone)]
pub struct ParameterOverrides {
    /// Number of leading periods to plan over
    #[arg(long)]
    pub horizon: Option<u32>,
    /// Fixed per-period capacity (overrides --supply-ratio)
    #[arg(long)]
    pub supply: Option<f64>,
    /// Fraction of each period's total demand to use as capacity
    #[arg(long)]
    pub supply_ratio: Option<f64>,
    /// Objective weight on shortage
    #[arg(long)]
    pub unmet_cost: Option<f64>,
    /// Objective weight on overage
    #[arg(long)]
    pub extra_cost: Option<f64>,
    /// Minimum fraction of horizon demand each region must receive
    #[arg(long)]
    pub min_service: Option<f64>,
    /// Maximum share of a period's capacity for any one region
    #[arg(long)]
    pub max_share: Option<f64>,
    /// Solver time limit in seconds
    #[arg(long)]
    pub time_limit: Option<f64>,
}

/// Check that a parameter is a finite number which is not negative
fn check_non_negative(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that an objective weight is valid.
///
/// Shortage and overage are only pulled down to their true values by the objective if their
/// weights are strictly positive.
fn check_cost_weight(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `horizon` parameter is valid
fn check_horizon(value: u32) -> Result<()> {
    ensure!(value >= 1, "horizon must be at least 1");

    Ok(())
}

/// Check that the `time_limit` parameter is valid
fn check_time_limit(value: Option<f64>) -> Result<()> {
    if let Some(value) = value {
        ensure!(
            value.is_finite() && value > 0.0,
            "time_limit must be a finite number of seconds greater than zero"
        );
        ensure!(
            Duration::try_from_secs_f64(value).is_ok(),
            "time_limit is too large ({value} seconds)"
        );
    }

    Ok(())
}

impl AllocationParameters {
    /// Read the parameters file from the specified planning directory.
    ///
    /// If the file is not present, default values are used.
    ///
    /// # Arguments
    ///
    /// * `planning_dir` - Folder containing the planning input files
    pub fn from_path<P: AsRef<Path>>(planning_dir: P) -> Result<AllocationParameters> {
        let file_path = planning_dir.as_ref().join(PARAMETERS_FILE_NAME);
        if !file_path.is_file() {
            return Ok(AllocationParameters::default());
        }

        let params: AllocationParameters = read_toml(&file_path)?;
        params
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(params)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, overrides: &ParameterOverrides) -> Self {
        self.horizon = overrides.horizon.unwrap_or(self.horizon);
        self.supply = overrides.supply.or(self.supply);
        self.supply_ratio = overrides.supply_ratio.unwrap_or(self.supply_ratio);
        self.unmet_cost = overrides.unmet_cost.unwrap_or(self.unmet_cost);
        self.extra_cost = overrides.extra_cost.unwrap_or(self.extra_cost);
        self.min_service = overrides.min_service.unwrap_or(self.min_service);
        self.max_share = overrides.max_share.unwrap_or(self.max_share);
        self.time_limit = overrides.time_limit.or(self.time_limit);

        self
    }

    /// Whether the per-period share cap applies
    pub fn has_share_cap(&self) -> bool {
        self.max_share < 1.0
    }

    /// The solver time limit, if any.
    ///
    /// A limit too large to represent is treated as no limit.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit.and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Check that the parameters are valid
    pub fn validate(&self) -> Result<()> {
        check_horizon(self.horizon)?;

        if let Some(supply) = self.supply {
            check_non_negative("supply", supply)?;
        }
        check_non_negative("supply_ratio", self.supply_ratio)?;

        check_cost_weight("unmet_cost", self.unmet_cost)?;
        check_cost_weight("extra_cost", self.extra_cost)?;

        check_non_negative("min_service", self.min_service)?;
        if self.min_service > 1.0 {
            warn!(
                "min_service is greater than 1 ({}): regions must be over-supplied",
                self.min_service
            );
        }

        check_non_negative("max_share", self.max_share)?;
        if !self.has_share_cap() {
            warn!("max_share is at least 1; the per-period share cap is disabled");
        }

        check_time_limit(self.time_limit)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fmt::Display;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Helper function to assert validation result based on expected validity
    fn assert_validation_result<T, U: Display>(
        result: Result<T>,
        expected_valid: bool,
        value: U,
        expected_error_fragment: &str,
    ) {
        if expected_valid {
            assert!(
                result.is_ok(),
                "Expected value {} to be valid, but got error: {:?}",
                value,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Expected value {value} to be invalid, but it was accepted",
            );
            let error_message = result.err().unwrap().to_string();
            assert!(
                error_message.contains(expected_error_fragment),
                "Error message should mention the validation constraint, got: {error_message}",
            );
        }
    }

    #[test]
    fn test_defaults() {
        let params: AllocationParameters = toml::from_str("").unwrap();
        assert_eq!(params, AllocationParameters::default());
        assert!(params.validate().is_ok());
        assert!(params.has_share_cap());
    }

    #[rstest]
    #[case(1, true)]
    #[case(8, true)]
    #[case(0, false)]
    fn test_check_horizon(#[case] value: u32, #[case] expected_valid: bool) {
        assert_validation_result(
            check_horizon(value),
            expected_valid,
            value,
            "horizon must be at least 1",
        );
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.85, true)]
    #[case(2.0, true)]
    #[case(-1e-10, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn test_check_non_negative(#[case] value: f64, #[case] expected_valid: bool) {
        assert_validation_result(
            check_non_negative("min_service", value),
            expected_valid,
            value,
            "min_service must be a finite number greater than or equal to zero",
        );
    }

    #[rstest]
    #[case(1.0, true)]
    #[case(1e-10, true)]
    #[case(0.0, false)]
    #[case(-3.0, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn test_check_cost_weight(#[case] value: f64, #[case] expected_valid: bool) {
        assert_validation_result(
            check_cost_weight("unmet_cost", value),
            expected_valid,
            value,
            "unmet_cost must be a finite number greater than zero",
        );
    }

    #[rstest]
    #[case(Some(10.0), true)]
    #[case(None, true)]
    #[case(Some(0.0), false)]
    #[case(Some(-1.0), false)]
    #[case(Some(f64::INFINITY), false)]
    fn test_check_time_limit(#[case] value: Option<f64>, #[case] expected_valid: bool) {
        assert_validation_result(
            check_time_limit(value),
            expected_valid,
            format!("{value:?}"),
            "time_limit must be a finite number of seconds greater than zero",
        );
    }

    #[test]
    fn test_check_time_limit_too_large() {
        assert_validation_result(
            check_time_limit(Some(1e20)),
            false,
            "1e20",
            "time_limit is too large",
        );
    }

    #[test]
    fn test_time_limit() {
        let params = AllocationParameters {
            time_limit: Some(1.5),
            ..Default::default()
        };
        assert_eq!(params.time_limit(), Some(Duration::from_millis(1500)));
        assert_eq!(AllocationParameters::default().time_limit(), None);
    }

    #[test]
    fn test_validate_negative_supply() {
        let params = AllocationParameters {
            supply: Some(-5.0),
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().starts_with("supply must be"));
    }

    #[test]
    fn test_with_overrides() {
        let overrides = ParameterOverrides {
            horizon: Some(4),
            supply: Some(500.0),
            max_share: Some(1.0),
            ..Default::default()
        };
        let params = AllocationParameters::default().with_overrides(&overrides);
        assert_eq!(
            params,
            AllocationParameters {
                horizon: 4,
                supply: Some(500.0),
                max_share: 1.0,
                ..Default::default()
            }
        );
        assert!(!params.has_share_cap());
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(PARAMETERS_FILE_NAME)).unwrap();
            writeln!(file, "horizon = 4\nsupply = 1000.0\nmin_service = 0.5").unwrap();
        }

        let params = AllocationParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.horizon, 4);
        assert_eq!(params.supply, Some(1000.0));
        assert_eq!(params.max_share, default_max_share());
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempdir().unwrap();
        assert_eq!(
            AllocationParameters::from_path(dir.path()).unwrap(),
            AllocationParameters::default()
        );
    }

    #[test]
    fn test_from_path_invalid() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(PARAMETERS_FILE_NAME)).unwrap();
            writeln!(file, "extra_cost = 0.0").unwrap();
        }

        assert!(AllocationParameters::from_path(dir.path()).is_err());
    }

    #[test]
    fn test_from_path_unknown_field() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(PARAMETERS_FILE_NAME)).unwrap();
            writeln!(file, "horizn = 4").unwrap();
        }

        assert!(AllocationParameters::from_path(dir.path()).is_err());
    }
}

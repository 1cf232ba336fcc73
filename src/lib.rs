//! Common functionality for allocplan.
//!
//! allocplan decides how many units of a supply-constrained product to ship to each region over a
//! rolling horizon of weekly periods, given per-region demand forecasts.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod id;
pub mod index;
pub mod input;
pub mod log;
pub mod optimisation;
pub mod output;
pub mod parameters;
pub mod plan;
pub mod planner;
pub mod settings;
pub mod solver;
pub mod supply;

#[cfg(test)]
mod fixture;

/// Get the path to the folder holding allocplan's configuration files
pub fn get_allocplan_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform; fall back to the current directory
        return PathBuf::default();
    };
    config_dir.push("allocplan");

    config_dir
}

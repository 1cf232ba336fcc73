//! The module responsible for writing output data to disk.
use crate::plan::Plan;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;
pub use metadata::write_metadata;

/// The root folder in which planning-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "allocplan_results";

/// The output file name for the per-(region, period) allocation
const ALLOCATION_FILE_NAME: &str = "allocation.csv";

/// The output file name for the per-region summary
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The output file name for per-period capacity
const SUPPLY_FILE_NAME: &str = "supply.csv";

/// Get the default output directory for the specified planning directory
pub fn get_output_dir(planning_dir: &Path) -> Result<PathBuf> {
    // Get the name from the dir path. This ends up being convoluted because we need to check for
    // all possible errors.
    let planning_dir = planning_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to planning directory")?;

    let name = planning_dir
        .file_name()
        .context("Planning directory cannot be in root folder")?
        .to_str()
        .context("Invalid chars in planning directory name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, name].iter().collect())
}

/// Create a new output directory.
///
/// If the directory already exists and is not empty, it is only reused if `allow_overwrite` is
/// set.
///
/// # Returns
///
/// Whether existing output will be overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = output_dir.read_dir()?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        fs::create_dir_all(output_dir)?;
        return Ok(true);
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the supply CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SupplyRow {
    date: NaiveDate,
    supply: f64,
}

/// An object for writing a plan to file
pub struct DataWriter {
    allocation_writer: csv::Writer<File>,
    summary_writer: csv::Writer<File>,
    supply_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(&file_path)
                .with_context(|| format!("Could not create {}", file_path.display()))
        };

        Ok(Self {
            allocation_writer: new_writer(ALLOCATION_FILE_NAME)?,
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
            supply_writer: new_writer(SUPPLY_FILE_NAME)?,
        })
    }

    /// Write the plan rows, summary and supply to CSV files
    pub fn write_plan(&mut self, plan: &Plan) -> Result<()> {
        for row in plan.rows() {
            self.allocation_writer.serialize(row)?;
        }

        for summary in plan.summary() {
            self.summary_writer.serialize(summary)?;
        }

        for &(date, supply) in plan.supply() {
            self.supply_writer.serialize(SupplyRow { date, supply })?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.allocation_writer.flush()?;
        self.summary_writer.flush()?;
        self.supply_writer.flush()?;

        Ok(())
    }
}

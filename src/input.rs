//! Common routines for handling input data.
use anyhow::{Context, Result, ensure};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod forecast;
pub use forecast::{ForecastRow, check_forecast_rows, read_forecast};

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    ensure!(!vec.is_empty(), input_err_msg_str(file_path, "CSV file cannot be empty"));

    Ok(vec.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::Reader::from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .enumerate()
        .map(|(i, record)| {
            // Row 1 is the header
            record.with_context(|| format!("{} (row {})", input_err_msg(file_path), i + 2))
        })
        .collect::<Result<Vec<T>>>()?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

fn input_err_msg_str(file_path: &Path, message: &str) -> String {
    format!("{}: {message}", input_err_msg(file_path))
}

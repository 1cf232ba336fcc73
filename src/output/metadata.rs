//! Code for writing metadata to file
use crate::parameters::AllocationParameters;
use anyhow::Result;
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    parameters: &'a AllocationParameters,
    program: ProgramMetadata<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<PlatformMetadata>,
}

/// Information about the planning run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the planning directory which was used
    planning_path: &'a Path,
    /// The date and time at which the output was written
    datetime: String,
}

impl<'a> RunMetadata<'a> {
    fn new(planning_path: &'a Path) -> Self {
        Self {
            planning_path,
            datetime: Local::now().to_rfc2822(),
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
    /// The version of rustc used for the build
    rustc_version: &'a str,
    /// When the program was built
    build_time_utc: &'a str,
    /// The git commit hash of the build (if known)
    git_commit_hash: String,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Information about the platform the planner is running on.
///
/// The fields correspond to different data available from the [`PlatformInfo`] struct.
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    /// Query the platform, returning `None` if it can't be determined
    fn query() -> Option<Self> {
        let info = PlatformInfo::new().ok()?;
        Some(Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write metadata for a run to the specified output path in TOML format
///
/// # Arguments
///
/// * `output_path` - Folder where the file will be saved
/// * `planning_path` - The planning directory the inputs were read from
/// * `params` - The parameters the plan was computed with
pub fn write_metadata(
    output_path: &Path,
    planning_path: &Path,
    params: &AllocationParameters,
) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(planning_path),
        parameters: params,
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::query(),
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

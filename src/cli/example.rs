//! Code related to the demo planning directories and the CLI commands for interacting with them.
use super::{RunOpts, handle_run_command};
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the demo planning directories.
static DEMOS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// The available subcommands for managing demos.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List available demos.
    List,
    /// Provide information about the specified demo.
    Info {
        /// The name of the demo.
        name: String,
    },
    /// Extract a demo planning directory to a new directory.
    Extract {
        /// The name of the demo to extract.
        name: String,
        /// The destination folder for the demo.
        new_path: Option<PathBuf>,
    },
    /// Run a demo.
    Run {
        /// The name of the demo to run.
        name: String,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_example_list_command(),
            Self::Info { name } => handle_example_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_example_extract_command(&name, dest.as_deref())?,
            Self::Run { name, opts } => handle_example_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

/// The names of the available demos
pub fn demo_names() -> impl Iterator<Item = &'static str> {
    DEMOS_DIR
        .dirs()
        .filter_map(|dir| dir.path().file_name()?.to_str())
}

/// Handle the `example list` command.
fn handle_example_list_command() {
    for name in demo_names() {
        println!("{name}");
    }
}

/// Get the contents of a demo's README file
fn get_readme(name: &str) -> Result<&'static str> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    DEMOS_DIR
        .get_file(path)
        .context("Example not found.")?
        .contents_utf8()
        .context("README.txt is not UTF-8 encoded")
}

/// Handle the `example info` command.
fn handle_example_info_command(name: &str) -> Result<()> {
    println!("{}", get_readme(name)?);

    Ok(())
}

/// Handle the `example extract` command
fn handle_example_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    extract_example(name, dest)
}

/// Extract the specified demo to a new directory
fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    let sub_dir = DEMOS_DIR.get_dir(name).context("Example not found.")?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    // Copy the contents of the subdirectory to the destination
    fs::create_dir(new_path)?;
    for entry in sub_dir.entries() {
        match entry {
            DirEntry::Dir(_) => bail!("Subdirectories in demos are not supported"),
            DirEntry::File(f) => {
                let file_name = f.path().file_name().context("Demo file has no name")?;
                fs::write(new_path.join(file_name), f.contents())?;
            }
        }
    }

    Ok(())
}

/// Handle the `example run` command.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let planning_path = temp_dir.path().join(name);
    extract_example(name, &planning_path)?;
    handle_run_command(&planning_path, opts, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::load_inputs;
    use tempfile::tempdir;

    #[test]
    fn test_demos_have_readme() {
        let names: Vec<_> = demo_names().collect();
        assert!(names.contains(&"sea_launch"));
        for name in names {
            assert!(!get_readme(name).unwrap().is_empty());
        }
    }

    #[test]
    fn test_extract_example() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("sea_launch");
        extract_example("sea_launch", &dest).unwrap();
        assert!(dest.join("forecast.csv").is_file());
        assert!(dest.join("allocation.toml").is_file());

        // Extracted demos are valid planning directories
        assert!(load_inputs(&dest, &Default::default()).is_ok());

        // Can't extract over an existing directory
        assert!(extract_example("sea_launch", &dest).is_err());
    }

    #[test]
    fn test_extract_example_unknown() {
        let dir = tempdir().unwrap();
        assert_eq!(
            extract_example("no_such_demo", &dir.path().join("x"))
                .unwrap_err()
                .to_string(),
            "Example not found."
        );
    }
}

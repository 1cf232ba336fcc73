//! The command line interface for the planner.
use crate::log;
use crate::output::{create_output_directory, get_output_dir};
use crate::parameters::ParameterOverrides;
use crate::planner::{load_inputs, validate_inputs};
use crate::settings::Settings;
use crate::solver::HighsSolver;
use ::log::{LevelFilter, info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Parameters which take precedence over those in allocation.toml
    #[command(flatten)]
    pub overrides: ParameterOverrides,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Plan allocations for a planning directory.
    Run {
        /// Path to the planning directory.
        planning_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage demo planning directories.
    Example {
        /// The available subcommands for managing demos.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a planning directory without solving.
    Validate {
        /// The path to the planning directory.
        planning_dir: PathBuf,
        /// Parameters which take precedence over those in allocation.toml
        #[command(flatten)]
        overrides: ParameterOverrides,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing the settings file
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { planning_dir, opts } => handle_run_command(&planning_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate {
                planning_dir,
                overrides,
            } => handle_validate_command(&planning_dir, &overrides, None),
            Self::Settings { subcommand } => {
                subcommand.execute();
                Ok(())
            }
        }
    }
}

/// Parse CLI arguments and start the planner
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ allocplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Handle the `run` command.
pub fn handle_run_command(
    planning_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(planning_path)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(settings.log_level.as_str()), Some(output_path))
        .context("Failed to initialise logging.")?;
    info!("Planning directory: {}", planning_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    // Solver output is only wanted when debugging
    let verbose = ::log::max_level() >= LevelFilter::Debug;
    let solver = HighsSolver::new(verbose);

    crate::planner::run(planning_path, &opts.overrides, output_path, &solver)
        .context("Failed to plan allocations.")?;
    info!("Planning complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    planning_path: &Path,
    overrides: &ParameterOverrides,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    let (rows, params) =
        load_inputs(planning_path, overrides).context("Failed to validate planning inputs.")?;
    validate_inputs(&rows, &params).context("Failed to validate planning inputs.")?;
    info!("Validation successful!");

    Ok(())
}

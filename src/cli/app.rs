//! Main CLI application structure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser, Subcommand};
use log::{debug, error};

use super::object::{self, DEFAULT_TITLE};
use super::output::{Output, OutputFormat};
use crate::color::ColorChoice;
use crate::logging::{self, LogSettings};
use crate::storage::{Config, DataDir};

#[derive(Parser)]
#[command(name = "dstasky")]
#[command(version, about = "A simple task manager")]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Use colored output [default: auto]
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Output format for printed objects
    #[arg(long, short = 'f', global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also append log lines to this file
    #[arg(long, global = true, value_name = "PATH", env = "DSTASKY_LOGFILE")]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Init tasks repository
    Init,

    /// Show tasks
    Show,

    /// Create a dstasky object
    Create {
        /// Task title
        #[arg(default_value = DEFAULT_TITLE)]
        title: String,

        /// Longer description
        #[arg(long, short)]
        description: Option<String>,

        /// Project label
        #[arg(long, short)]
        project: Option<String>,
    },

    /// Show help for a specific subcommand
    Help {
        /// Command to show help for
        command: Option<String>,
    },
}

/// Main entry point for the CLI
///
/// Setup failures are returned; command failures are logged and turned
/// into a failing exit code.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let settings = LogSettings {
        use_color: cli.color.or(config.color).unwrap_or_default().use_color(),
        verbose: cli.verbose || config.verbose,
        log_file: cli.log_file.clone().or(config.log_file),
    };
    let _guard = logging::install(&settings)?;

    let output = Output::new(cli.format);
    let command = cli.command.unwrap_or(Commands::Show);

    match execute(command, &output) {
        Ok(()) => {
            debug!("Command completed successfully");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn execute(command: Commands, output: &Output) -> Result<()> {
    if let Commands::Help { command } = command {
        return print_help(command.as_deref());
    }

    let data_dir = DataDir::from_env();
    debug!("Data directory: {}", data_dir.root().display());

    match command {
        Commands::Init => {
            data_dir.init()?;
        }
        Commands::Show => object::show(&data_dir, output)?,
        Commands::Create {
            title,
            description,
            project,
        } => object::create(&data_dir, output, &title, description, project)?,
        Commands::Help { .. } => {}
    }

    Ok(())
}

/// Prints usage for the whole tool or one subcommand
fn print_help(name: Option<&str>) -> Result<()> {
    let mut cli = Cli::command();
    cli.build();

    match name {
        None => cli.print_help()?,
        Some(name) => cli
            .find_subcommand_mut(name)
            .ok_or_else(|| anyhow!("Unknown command: {}", name))?
            .print_help()?,
    }

    Ok(())
}

//! CLI argument parsing using clap derive macros

use clap::{CommandFactory, Parser};
use tracing::debug;

use crate::commands::run::RunCommand;
use crate::error::{ArchitectError, Exit};
use crate::logging;

/// Architect - run workspace targets
///
/// Finds the workspace file (angular.json, .angular.json, workspace.json or
/// .workspace.json) in the current directory or a parent, runs the target
/// and shows a progress bar for every job it starts.
#[derive(Parser, Debug)]
#[command(name = "architect")]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "architect [project][:target][:configuration] [--option=value ...]")]
#[command(after_help = "\
Run a project target.
If project/target/configuration are not specified, the workspace defaults will be used.

Options after the target are passed to the builder and override the workspace file:
  --name=value, --name value, --flag, --no-flag, -f, -abc

Exit codes:
  0  the target succeeded
  1  the target reported a failure
  2  an error happened while running the target
  3  no workspace file was found")]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub run: RunCommand,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Exit {
        // Set up terminal colors
        if self.no_color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        logging::init(self.verbose);

        if self.run.target.is_none() || self.run.options.iter().any(|o| o == "--help") {
            let mut command = Cli::command();
            if let Err(err) = command.print_help() {
                debug!(error = %err, "failed to print help");
            }
            return Exit::Success;
        }

        match self.run.execute().await {
            Ok(exit) => exit,
            Err(err) => match err.downcast_ref::<ArchitectError>() {
                Some(architect_err) => {
                    architect_err.display_with_hints();
                    architect_err.exit()
                }
                None => {
                    crate::utils::terminal::print_error(&format!("{:#}", err));
                    Exit::Error
                }
            },
        }
    }
}

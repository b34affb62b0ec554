//! Architect CLI - run workspace targets with live progress bars
//!
//! Looks up the workspace file, schedules `project:target[:configuration]`
//! on the built-in engine and draws one progress bar per job until the
//! target finishes.
//!
//! ## Architecture
//!
//! ```text
//! Rust CLI → engine (builders as tokio tasks) → progress events → progress bars
//! ```

mod cli;
mod commands;
mod config;
mod engine;
mod error;
mod exec;
mod logging;
mod progress;
mod utils;

use std::process::ExitCode;

use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.execute().await.into()
}

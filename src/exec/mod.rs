//! Process execution

pub mod subprocess;

pub use subprocess::{run_shell, CommandResult};

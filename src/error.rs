//! Error types and helpers for user-friendly error messages
//!
//! Every error a user can cause (missing workspace file, unknown project,
//! malformed option override, ...) is an [`ArchitectError`] carrying enough
//! context to print an actionable hint.

use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

/// Process exit status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The target ran and reported success
    Success,
    /// The target ran and reported failure
    Failure,
    /// An unexpected error happened while orchestrating the run
    Error,
    /// No workspace configuration file was found
    NoWorkspace,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::Failure => 1,
            Exit::Error => 2,
            Exit::NoWorkspace => 3,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Custom error types with helpful context and suggestions
#[derive(Error, Debug)]
pub enum ArchitectError {
    /// No workspace file in the current directory or its ancestors
    #[error("Workspace configuration file ({names}) cannot be found in '{}' or in parent directories", .searched.display())]
    WorkspaceNotFound { searched: PathBuf, names: String },

    /// Workspace file exists but cannot be used
    #[error("Invalid workspace configuration in {}: {message}", .path.display())]
    InvalidWorkspace {
        path: PathBuf,
        message: String,
        hint: Option<String>,
    },

    /// Malformed `project:target:configuration` string
    #[error("Invalid target '{target}': {message}")]
    InvalidTarget { target: String, message: String },

    #[error("Project '{project}' does not exist in the workspace")]
    UnknownProject {
        project: String,
        available: Vec<String>,
    },

    #[error("Project '{project}' has no target named '{target}'")]
    UnknownTarget {
        project: String,
        target: String,
        available: Vec<String>,
    },

    #[error("Target '{target}' has no configuration named '{configuration}'")]
    UnknownConfiguration {
        target: String,
        configuration: String,
        available: Vec<String>,
    },

    #[error("No builder named '{builder}' is registered")]
    UnknownBuilder {
        builder: String,
        available: Vec<String>,
    },

    /// Builder rejected its merged options
    #[error("Invalid options for builder '{builder}': {message}")]
    InvalidOptions { builder: String, message: String },

    /// Command-line option override could not be parsed
    #[error("Invalid option '{argument}': {message}")]
    InvalidOverride { argument: String, message: String },

    /// A target schedules itself through a chain of batch targets
    #[error("Target '{target}' depends on itself ({})", .chain.join(" -> "))]
    CyclicTarget { target: String, chain: Vec<String> },
}

impl ArchitectError {
    /// Create a workspace error with a hint
    pub fn invalid_workspace(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self::InvalidWorkspace {
            path: path.into(),
            message: message.into(),
            hint,
        }
    }

    pub fn invalid_target(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn invalid_options(builder: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            builder: builder.into(),
            message: message.into(),
        }
    }

    pub fn invalid_override(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Exit status this error maps to when it aborts the CLI
    pub fn exit(&self) -> Exit {
        match self {
            ArchitectError::WorkspaceNotFound { .. } => Exit::NoWorkspace,
            _ => Exit::Error,
        }
    }

    /// Actionable suggestion for the user, if there is one
    pub fn hint(&self) -> Option<String> {
        match self {
            ArchitectError::WorkspaceNotFound { .. } => Some(hints::workspace_not_found().to_string()),
            ArchitectError::InvalidWorkspace { hint, .. } => hint.clone(),
            ArchitectError::InvalidTarget { .. } => Some(hints::target_syntax().to_string()),
            ArchitectError::UnknownProject { available, .. } => {
                hints::available("projects", available)
            }
            ArchitectError::UnknownTarget { available, .. } => {
                hints::available("targets", available)
            }
            ArchitectError::UnknownConfiguration { available, .. } => {
                hints::available("configurations", available)
            }
            ArchitectError::UnknownBuilder { available, .. } => {
                hints::available("builders", available)
            }
            ArchitectError::InvalidOverride { .. } => Some(hints::override_syntax().to_string()),
            ArchitectError::InvalidOptions { .. } | ArchitectError::CyclicTarget { .. } => None,
        }
    }

    /// Display error with formatting and hints
    pub fn display_with_hints(&self) {
        use console::style;

        eprintln!("\n{} {}", style("ERROR:").red().bold(), self);

        if let Some(hint) = self.hint() {
            eprintln!("\n{} {}", style("HINT:").yellow().bold(), hint);
        }

        eprintln!();
    }
}

/// Common error hints
pub mod hints {
    /// Hint listing the names a lookup could have matched
    pub fn available(kind: &str, names: &[String]) -> Option<String> {
        if names.is_empty() {
            None
        } else {
            Some(format!("Available {}: {}", kind, names.join(", ")))
        }
    }

    pub fn workspace_not_found() -> &'static str {
        "Run architect from a directory containing angular.json, .angular.json,\n\
         workspace.json or .workspace.json, or from one of its subdirectories."
    }

    pub fn invalid_json() -> &'static str {
        "The workspace file must be valid JSON with a top-level \"projects\" object:\n\
         • Check for trailing commas and unquoted keys\n\
         • Each target needs a \"builder\" such as \"architect:run-commands\""
    }

    pub fn target_syntax() -> &'static str {
        "Targets are written as project:target[:configuration], e.g.:\n\
         • app:build\n\
         • app:build:production\n\
         • :build (uses the workspace defaultProject)"
    }

    pub fn override_syntax() -> &'static str {
        "Options after the target are written as:\n\
         • --name=value\n\
         • --name value\n\
         • --flag or --no-flag\n\
         • -f, or -abc for several one-letter flags"
    }
}

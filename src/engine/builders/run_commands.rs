//! `architect:run-commands`, runs shell commands
//!
//! ```json
//! {
//!   "builder": "architect:run-commands",
//!   "options": {
//!     "commands": ["npm run lint", { "command": "npm test" }],
//!     "cwd": "apps/web",
//!     "parallel": false,
//!     "env": { "CI": "1" }
//!   }
//! }
//! ```
//!
//! Commands run one after another and stop at the first failure, or all at
//! once with `parallel`. Their output ends up in the job logs.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinSet;

use super::{parse_options, Builder, BuilderFuture};
use crate::engine::{BuilderContext, BuilderOutput, JobLogger};
use crate::error::ArchitectError;
use crate::exec::{run_shell, CommandResult};

pub const NAME: &str = "architect:run-commands";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandSpec {
    Plain(String),
    Detailed { command: String },
}

impl CommandSpec {
    fn into_command(self) -> String {
        match self {
            CommandSpec::Plain(command) | CommandSpec::Detailed { command } => command,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunCommandsOptions {
    commands: OneOrMany<CommandSpec>,

    /// Working directory, relative to the workspace root
    cwd: Option<String>,

    #[serde(default)]
    parallel: bool,

    #[serde(default)]
    env: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunCommands;

impl Builder for RunCommands {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Run shell commands"
    }

    fn run(&self, ctx: BuilderContext, options: Value) -> BuilderFuture {
        Box::pin(run(ctx, options))
    }
}

async fn run(ctx: BuilderContext, options: Value) -> Result<BuilderOutput> {
    let options: RunCommandsOptions = parse_options(NAME, options)?;
    let commands: Vec<String> = Vec::from(options.commands)
        .into_iter()
        .map(CommandSpec::into_command)
        .collect();
    if commands.is_empty() {
        return Err(ArchitectError::invalid_options(NAME, "at least one command is required").into());
    }

    let cwd = match &options.cwd {
        Some(cwd) => ctx.workspace_root.join(cwd),
        None => ctx.workspace_root.clone(),
    };

    ctx.progress.running(0, commands.len() as u64, None);
    let failures = if options.parallel {
        run_parallel(&ctx, &commands, &cwd, &options.env).await?
    } else {
        run_sequential(&ctx, &commands, &cwd, &options.env).await?
    };

    let output = if failures.is_empty() {
        BuilderOutput::success()
    } else {
        BuilderOutput::failure(failures.join("; "))
    };
    Ok(output.with_field("commands", commands.len()))
}

async fn run_sequential(
    ctx: &BuilderContext,
    commands: &[String],
    cwd: &Path,
    env: &IndexMap<String, String>,
) -> Result<Vec<String>> {
    let total = commands.len() as u64;

    for (index, command) in commands.iter().enumerate() {
        ctx.progress.running(index as u64, total, Some(command.clone()));
        let result = run_shell(command, cwd, env).await?;
        log_result(&ctx.logger, command, &result);
        ctx.progress.running(index as u64 + 1, total, None);

        if !result.success {
            return Ok(vec![failure_message(command, &result)]);
        }
    }

    Ok(Vec::new())
}

async fn run_parallel(
    ctx: &BuilderContext,
    commands: &[String],
    cwd: &Path,
    env: &IndexMap<String, String>,
) -> Result<Vec<String>> {
    let total = commands.len() as u64;
    let mut set = JoinSet::new();

    for command in commands {
        let command = command.clone();
        let cwd = cwd.to_path_buf();
        let env = env.clone();
        set.spawn(async move {
            let result = run_shell(&command, &cwd, &env).await;
            (command, result)
        });
    }

    let mut finished = 0;
    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (command, result) = joined.context("command task panicked")?;
        let result = result?;
        log_result(&ctx.logger, &command, &result);

        finished += 1;
        ctx.progress.running(finished, total, Some(command.clone()));
        if !result.success {
            failures.push(failure_message(&command, &result));
        }
    }

    Ok(failures)
}

fn log_result(logger: &JobLogger, command: &str, result: &CommandResult) {
    for line in result.stdout.lines() {
        logger.info(line);
    }
    for line in result.stderr.lines() {
        logger.warn(line);
    }
    if result.success {
        logger.debug(format!(
            "`{}` exited with code {} after {:.2?}",
            command, result.exit_code, result.duration
        ));
    } else {
        logger.error(failure_message(command, result));
    }
}

fn failure_message(command: &str, result: &CommandResult) -> String {
    format!("command `{}` exited with code {}", command, result.exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scheduler::testing::{architect, run_target};
    use crate::engine::{LogLevel, ProgressState};
    use serde_json::json;
    use tempfile::TempDir;

    fn workspace(options: Value) -> Value {
        json!({
            "projects": {
                "app": {
                    "targets": {
                        "run": { "builder": NAME, "options": options }
                    }
                }
            }
        })
    }

    #[test]
    fn test_options_accept_strings_and_objects() {
        let options: RunCommandsOptions = parse_options(
            NAME,
            json!({ "commands": ["make", { "command": "make test" }] }),
        )
        .unwrap();
        let commands: Vec<String> = Vec::from(options.commands)
            .into_iter()
            .map(CommandSpec::into_command)
            .collect();
        assert_eq!(commands, vec!["make", "make test"]);
        assert!(!options.parallel);
    }

    #[test]
    fn test_options_accept_single_command() {
        let options: RunCommandsOptions =
            parse_options(NAME, json!({ "commands": "make" })).unwrap();
        assert_eq!(Vec::from(options.commands).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_commands_is_error() {
        let dir = TempDir::new().unwrap();
        let architect = architect(dir.path(), workspace(json!({})));
        let (events, output, _) = run_target(&architect, "app:run", json!({})).await;

        let err = output.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArchitectError>(),
            Some(ArchitectError::InvalidOptions { .. })
        ));
        assert_eq!(events.last().unwrap().state, ProgressState::Error);
    }

    #[tokio::test]
    async fn test_empty_commands_is_error() {
        let dir = TempDir::new().unwrap();
        let architect = architect(dir.path(), workspace(json!({ "commands": [] })));
        let (_, output, _) = run_target(&architect, "app:run", json!({})).await;
        assert!(output.unwrap_err().to_string().contains("at least one command"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sequential_success() {
        let dir = TempDir::new().unwrap();
        let architect = architect(
            dir.path(),
            workspace(json!({ "commands": ["echo one", "echo two"] })),
        );
        let (events, output, logs) = run_target(&architect, "app:run", json!({})).await;

        let output = output.unwrap();
        assert!(output.success);
        assert_eq!(output.extra["commands"], json!(2));

        let running: Vec<(Option<u64>, Option<String>)> = events
            .iter()
            .filter(|e| e.state == ProgressState::Running)
            .map(|e| (e.current, e.status.clone()))
            .collect();
        assert_eq!(
            running,
            vec![
                (Some(0), None),
                (Some(0), Some("echo one".to_string())),
                (Some(1), None),
                (Some(1), Some("echo two".to_string())),
                (Some(2), None),
            ]
        );
        assert_eq!(events.last().unwrap().state, ProgressState::Stopped);

        let info: Vec<String> = logs
            .drain()
            .into_iter()
            .filter(|e| e.level == LogLevel::Info)
            .map(|e| e.message)
            .collect();
        assert_eq!(info, vec!["one", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let architect = architect(
            dir.path(),
            workspace(json!({ "commands": ["exit 3", "echo never"] })),
        );
        let (events, output, logs) = run_target(&architect, "app:run", json!({})).await;

        let output = output.unwrap();
        assert!(!output.success);
        assert_eq!(
            output.error.as_deref(),
            Some("command `exit 3` exited with code 3")
        );
        let entries = logs.drain();
        assert!(entries.iter().all(|e| e.message != "never"));
        let errors: Vec<&str> = entries
            .iter()
            .filter(|e| e.level == LogLevel::Error)
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(errors, vec!["command `exit 3` exited with code 3"]);

        let last = events.last().unwrap();
        assert_eq!(last.state, ProgressState::Error);
        assert_eq!(last.error, output.error);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_parallel_runs_every_command() {
        let dir = TempDir::new().unwrap();
        let architect = architect(
            dir.path(),
            workspace(json!({ "commands": ["echo a", "exit 1", "echo c"], "parallel": true })),
        );
        let (events, output, logs) = run_target(&architect, "app:run", json!({})).await;

        let output = output.unwrap();
        assert!(!output.success);
        assert!(output.error.unwrap().contains("`exit 1`"));

        let last_running = events
            .iter()
            .filter(|e| e.state == ProgressState::Running)
            .last()
            .unwrap();
        assert_eq!((last_running.current, last_running.total), (Some(3), Some(3)));

        let mut info: Vec<String> = logs
            .drain()
            .into_iter()
            .filter(|e| e.level == LogLevel::Info)
            .map(|e| e.message)
            .collect();
        info.sort();
        assert_eq!(info, vec!["a", "c"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cwd_env_and_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("marker.txt"), "").unwrap();
        let architect = architect(
            dir.path(),
            workspace(json!({
                "commands": ["ls", "echo $GREETING"],
                "env": { "GREETING": "hello" }
            })),
        );
        let (_, output, logs) =
            run_target(&architect, "app:run", json!({ "cwd": "sub" })).await;

        assert!(output.unwrap().success);
        let messages: Vec<String> = logs.drain().into_iter().map(|e| e.message).collect();
        assert!(messages.contains(&"marker.txt".to_string()));
        assert!(messages.contains(&"hello".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_is_logged_as_warning() {
        let dir = TempDir::new().unwrap();
        let architect = architect(
            dir.path(),
            workspace(json!({ "commands": ["echo oops >&2"] })),
        );
        let (_, _, logs) = run_target(&architect, "app:run", json!({})).await;

        let warning = logs
            .drain()
            .into_iter()
            .find(|e| e.level == LogLevel::Warn)
            .unwrap();
        assert_eq!(warning.message, "oops");
        assert_eq!(warning.name, "app:run");
    }
}

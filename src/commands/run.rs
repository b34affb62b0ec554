//! Run command implementation
//!
//! Runs one workspace target and shows a live progress bar per job while it
//! executes. Job logs are held back until the display is torn down and are
//! printed after the result.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{parse_overrides, Target, Workspace};
use crate::engine::{
    Architect, BuilderOutput, BuilderProgress, Engine, LogBuffer, LogEntry, LogLevel,
    ProgressState, Run,
};
use crate::error::{ArchitectError, Exit};
use crate::progress::{MultiProgressBar, ProgressEntry, Screen, DEFAULT_TEMPLATE, REFRESH_INTERVAL};
use crate::utils::paths::find_workspace_file;
use crate::utils::terminal::{
    clear_screen, print_error_banner, print_failure_banner, print_success_banner,
};

/// Run a target of the workspace
#[derive(Args, Debug, Default)]
pub struct RunCommand {
    /// Target to run, as project[:target[:configuration]]
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Builder options overriding the workspace file (--name=value, --flag, --no-flag, -f)
    #[arg(
        value_name = "OPTIONS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub options: Vec<String>,
}

impl RunCommand {
    /// Execute the run command
    pub async fn execute(self) -> Result<Exit> {
        let target = self.target.as_deref().context("No target given")?;
        let overrides = parse_overrides(&self.options)?;

        let cwd = std::env::current_dir().context("Failed to read the current directory")?;
        let config_path = find_workspace_file(&cwd)?;
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        debug!(path = %config_path.display(), "using workspace file");

        let workspace = Workspace::load(&config_path)?;
        let target: Target = target.parse()?;
        let architect = Architect::new(workspace, root);

        clear_screen();
        let mut bars = MultiProgressBar::new(DEFAULT_TEMPLATE);
        Ok(execute_target(&architect, &target, overrides, &mut bars).await)
    }
}

/// Run `target` on `engine`, drawing its progress on `bars`, and report the outcome
///
/// The display is terminated before anything else is printed.
pub async fn execute_target<E, S>(
    engine: &E,
    target: &Target,
    overrides: Map<String, Value>,
    bars: &mut MultiProgressBar<u64, S>,
) -> Exit
where
    E: Engine,
    S: Screen,
{
    let logs = LogBuffer::new();
    let outcome = match engine.schedule_target(target, overrides, logs.logger("jobs")) {
        Ok(run) => {
            debug!(job = run.id, target = %target, "scheduled target");
            drive(run, bars).await
        }
        Err(err) => Err(err),
    };
    bars.terminate();

    match outcome {
        Ok(output) => {
            if output.success {
                print_success_banner();
            } else {
                print_failure_banner();
            }
            match to_pretty_json(&output) {
                Ok(json) => println!("Result: {}", json),
                Err(err) => debug!(error = %err, "failed to serialize result"),
            }
            replay(logs.drain());

            if output.success {
                Exit::Success
            } else {
                Exit::Failure
            }
        }
        Err(err) => {
            print_error_banner();
            replay(logs.drain());
            error!("Exception:\n{:?}", err);
            if let Some(hint) = err.downcast_ref::<ArchitectError>().and_then(ArchitectError::hint) {
                error!("{}", hint);
            }
            Exit::Error
        }
    }
}

/// Feed progress events into `bars` until the run reports its output
async fn drive<S: Screen>(mut run: Run, bars: &mut MultiProgressBar<u64, S>) -> Result<BuilderOutput> {
    let mut tick = tokio::time::interval(REFRESH_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut listening = true;
    let mut progress_open = true;

    let output = loop {
        tokio::select! {
            event = run.progress.recv(), if progress_open => match event {
                Some(event) => apply_progress(bars, event),
                None => progress_open = false,
            },
            output = &mut run.output => {
                break output.unwrap_or_else(|_| Err(anyhow!("engine stopped without reporting a result")));
            }
            _ = tick.tick() => bars.render(),
            signal = &mut ctrl_c, if listening => match signal {
                Ok(()) => {
                    run.stop().await;
                    bail!("interrupted");
                }
                Err(err) => {
                    debug!(error = %err, "cannot listen for ctrl-c");
                    listening = false;
                }
            },
        }
    };

    while let Ok(event) = run.progress.try_recv() {
        apply_progress(bars, event);
    }
    run.stop().await;
    output
}

/// Apply one progress event to the bar of its job
///
/// A bar is labelled from the first event seen for its job and keeps that label.
pub fn apply_progress<S: Screen>(bars: &mut MultiProgressBar<u64, S>, event: BuilderProgress) {
    let previous = bars.get(&event.id).map(|bar| bar.entry().clone());
    let label = match (&previous, &event.target) {
        (Some(entry), _) => entry.label.clone(),
        (None, Some(target)) => target.to_string(),
        (None, None) => event.builder.name.clone(),
    };
    let status = match event.status {
        Some(status) => status,
        None => previous.map(|entry| entry.status).unwrap_or_default(),
    };

    match event.state {
        ProgressState::Waiting => {
            bars.update(event.id, ProgressEntry::new(&label, status), None, None);
        }
        ProgressState::Running => {
            bars.update(
                event.id,
                ProgressEntry::new(&label, status),
                event.current,
                event.total,
            );
        }
        ProgressState::Error => {
            let message = event.error.as_deref().unwrap_or("unknown error");
            bars.fail(event.id, ProgressEntry::new(&label, format!("Error: {}", message)));
        }
        ProgressState::Stopped => {
            let total = event
                .total
                .or_else(|| bars.get(&event.id).map(|bar| bar.total()));
            bars.update(event.id, ProgressEntry::new(&label, "Done."), total, total);
            bars.complete(&event.id);
        }
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

/// Print buffered job logs through the process logger, under a `Logs:` header
fn replay(entries: Vec<LogEntry>) {
    info!("Logs:");
    for entry in entries {
        match entry.level {
            LogLevel::Debug => debug!("{}", entry),
            LogLevel::Info => info!("{}", entry),
            LogLevel::Warn => warn!("{}", entry),
            LogLevel::Error => error!("{}", entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scheduler::testing::architect;
    use crate::engine::protocol::BuilderInfo;
    use crate::engine::JobLogger;
    use crate::progress::multi::BarState;
    use crate::progress::screen::testing::VirtualTerm;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    fn bars(term: &VirtualTerm) -> MultiProgressBar<u64, VirtualTerm> {
        MultiProgressBar::with_screen(DEFAULT_TEMPLATE, term.clone())
            .with_refresh_interval(Duration::ZERO)
    }

    fn event(id: u64, state: ProgressState) -> BuilderProgress {
        BuilderProgress {
            id,
            builder: BuilderInfo {
                name: "architect:run-commands".to_string(),
                description: String::new(),
            },
            target: Some(Target::new("app", "build")),
            status: None,
            current: None,
            total: None,
            state,
            error: None,
        }
    }

    fn running(id: u64, current: u64, total: u64) -> BuilderProgress {
        BuilderProgress {
            current: Some(current),
            total: Some(total),
            ..event(id, ProgressState::Running)
        }
    }

    /// Engine replaying a fixed list of events
    struct ScriptedEngine {
        events: Vec<BuilderProgress>,
        success: Option<bool>,
    }

    impl Engine for ScriptedEngine {
        fn schedule_target(
            &self,
            _target: &Target,
            _overrides: Map<String, Value>,
            logger: JobLogger,
        ) -> Result<Run> {
            let (events_tx, events_rx) = mpsc::unbounded_channel();
            for event in &self.events {
                events_tx.send(event.clone()).unwrap();
            }
            logger.info("scripted");

            let (output_tx, output_rx) = oneshot::channel();
            let output = match self.success {
                Some(true) => Ok(BuilderOutput::success()),
                Some(false) => Ok(BuilderOutput::failure("1 command failed")),
                None => Err(anyhow!("builder crashed")),
            };
            output_tx.send(output).ok();

            Ok(Run::new(1, events_rx, output_rx, tokio::spawn(async {})))
        }
    }

    #[test]
    fn test_running_then_stopped_completes_bar() {
        let term = VirtualTerm::plain();
        let mut bars = bars(&term);

        apply_progress(&mut bars, running(1, 1, 4));
        let bar = bars.get(&1).unwrap();
        assert_eq!((bar.current(), bar.total()), (1, 4));
        assert_eq!(bar.state(), BarState::Running);
        assert!(bars.lines()[0].contains("[=====---------------] (1/4)"));

        apply_progress(&mut bars, running(1, 4, 4));
        assert!(bars.lines()[0].contains("[====================] (4/4)"));

        apply_progress(&mut bars, event(1, ProgressState::Stopped));
        let bar = bars.get(&1).unwrap();
        assert_eq!(bar.entry().status, "Done.");
        assert_eq!(bar.state(), BarState::Done);
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn test_error_without_prior_state() {
        let term = VirtualTerm::plain();
        let mut bars = bars(&term);

        apply_progress(
            &mut bars,
            BuilderProgress {
                error: Some("build failed".to_string()),
                ..event(2, ProgressState::Error)
            },
        );

        let bar = bars.get(&2).unwrap();
        assert_eq!(bar.entry().status, "Error: build failed");
        assert_eq!(bar.state(), BarState::Errored);

        apply_progress(&mut bars, running(2, 3, 4));
        assert_eq!(bars.get(&2).unwrap().current(), 0);
        assert_eq!(bars.get(&2).unwrap().entry().status, "Error: build failed");
    }

    #[test]
    fn test_interleaved_jobs_keep_their_own_state() {
        let term = VirtualTerm::plain();
        let mut bars = bars(&term);

        apply_progress(&mut bars, running(1, 1, 4));
        apply_progress(
            &mut bars,
            BuilderProgress {
                target: Some(Target::new("app", "test")),
                ..running(2, 1, 2)
            },
        );
        apply_progress(&mut bars, running(1, 2, 4));
        apply_progress(&mut bars, event(2, ProgressState::Stopped));

        assert_eq!(bars.get(&1).unwrap().current(), 2);
        assert_eq!(bars.get(&1).unwrap().state(), BarState::Running);
        assert_eq!(bars.get(&2).unwrap().state(), BarState::Done);

        let lines = bars.lines();
        assert!(lines[0].starts_with("app:build"));
        assert!(lines[1].starts_with("app:test"));
    }

    #[test]
    fn test_status_is_kept_when_event_has_none() {
        let term = VirtualTerm::plain();
        let mut bars = bars(&term);

        apply_progress(
            &mut bars,
            BuilderProgress {
                status: Some("compiling".to_string()),
                ..running(1, 1, 3)
            },
        );
        apply_progress(&mut bars, running(1, 2, 3));
        assert_eq!(bars.get(&1).unwrap().entry().status, "compiling");
    }

    #[test]
    fn test_label_falls_back_to_builder_name() {
        let term = VirtualTerm::plain();
        let mut bars = bars(&term);

        apply_progress(
            &mut bars,
            BuilderProgress {
                target: None,
                ..event(1, ProgressState::Waiting)
            },
        );
        assert_eq!(
            bars.get(&1).unwrap().entry().label.trim_end(),
            "architect:run-commands"
        );
    }

    #[test]
    fn test_pretty_json_uses_four_spaces() {
        let json = to_pretty_json(&json!({ "success": true })).unwrap();
        assert_eq!(json, "{\n    \"success\": true\n}");
    }

    #[tokio::test]
    async fn test_execute_success() {
        let term = VirtualTerm::live();
        let mut bars = bars(&term);
        let engine = ScriptedEngine {
            events: vec![running(1, 1, 1), event(1, ProgressState::Stopped)],
            success: Some(true),
        };

        let exit = execute_target(&engine, &Target::new("app", "build"), Map::new(), &mut bars).await;

        assert_eq!(exit, Exit::Success);
        assert!(!term.cursor_hidden());
        assert!(term.rows()[0].ends_with("Done."));
    }

    #[tokio::test]
    async fn test_execute_failure() {
        let term = VirtualTerm::live();
        let mut bars = bars(&term);
        let engine = ScriptedEngine {
            events: vec![BuilderProgress {
                error: Some("1 command failed".to_string()),
                ..event(1, ProgressState::Error)
            }],
            success: Some(false),
        };

        let exit = execute_target(&engine, &Target::new("app", "build"), Map::new(), &mut bars).await;

        assert_eq!(exit, Exit::Failure);
        assert!(term.rows()[0].ends_with("Error: 1 command failed"));
    }

    #[tokio::test]
    async fn test_execute_exception_restores_terminal() {
        let term = VirtualTerm::live();
        let mut bars = bars(&term);
        let engine = ScriptedEngine {
            events: vec![running(1, 1, 2)],
            success: None,
        };

        let exit = execute_target(&engine, &Target::new("app", "build"), Map::new(), &mut bars).await;

        assert_eq!(exit, Exit::Error);
        assert!(!term.cursor_hidden());
        assert_eq!(term.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_schedule_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let architect = architect(dir.path(), json!({ "projects": {} }));
        let term = VirtualTerm::live();
        let mut bars = bars(&term);

        let exit =
            execute_target(&architect, &Target::new("web", "build"), Map::new(), &mut bars).await;

        assert_eq!(exit, Exit::Error);
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_execute_with_architect() {
        let dir = tempfile::TempDir::new().unwrap();
        let architect = architect(
            dir.path(),
            json!({
                "projects": {
                    "app": {
                        "targets": {
                            "all": {
                                "builder": "architect:batch",
                                "options": { "targets": ["app:a", "app:b"] }
                            },
                            "a": { "builder": "architect:noop" },
                            "b": { "builder": "architect:noop" }
                        }
                    }
                }
            }),
        );
        let term = VirtualTerm::plain();
        let mut bars = bars(&term);

        let exit = execute_target(&architect, &Target::new("app", "all"), Map::new(), &mut bars).await;

        assert_eq!(exit, Exit::Success);
        assert_eq!(bars.len(), 3);
        let rows = term.rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.ends_with("Done.")));
        assert!(rows[0].starts_with("app:all"));
    }
}

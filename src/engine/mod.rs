//! Build orchestration engine
//!
//! The CLI only depends on the [`Engine`] contract: schedule a target, then
//! consume a stream of [`BuilderProgress`] events and a single final
//! [`BuilderOutput`]. [`Architect`] implements it in-process on top of the
//! workspace file and the built-in builders.
//!
//! ## Architecture
//!
//! ```text
//! Engine::schedule_target → Architect (resolve target, merge options)
//!                         → Builder::run (one tokio task per job)
//!                         → ProgressReporter → mpsc channel → CLI
//! ```
//!
//! ## Modules
//!
//! - `protocol` - progress events, outputs and the per-job reporter
//! - `scheduler` - target resolution and job spawning
//! - `builders` - `architect:run-commands`, `architect:batch`, `architect:noop`
//! - `logger` - buffered job logs

pub mod builders;
pub mod logger;
pub mod protocol;
pub mod scheduler;

pub use logger::{JobLogger, LogBuffer, LogEntry, LogLevel};
pub use protocol::{BuilderOutput, BuilderProgress, ProgressState};
pub use scheduler::{Architect, BuilderContext};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::Target;

/// Something that can run workspace targets
pub trait Engine {
    /// Start running `target` with `overrides` applied on top of its options
    ///
    /// Must be called from within a tokio runtime.
    fn schedule_target(
        &self,
        target: &Target,
        overrides: Map<String, Value>,
        logger: JobLogger,
    ) -> Result<Run>;
}

/// Handle on a scheduled target
#[derive(Debug)]
pub struct Run {
    /// Id of the top-level job
    pub id: u64,
    /// Progress of the top-level job and every job it schedules
    pub progress: mpsc::UnboundedReceiver<BuilderProgress>,
    /// Final result, sent exactly once
    pub output: oneshot::Receiver<Result<BuilderOutput>>,
    task: JoinHandle<()>,
}

impl Run {
    pub fn new(
        id: u64,
        progress: mpsc::UnboundedReceiver<BuilderProgress>,
        output: oneshot::Receiver<Result<BuilderOutput>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            progress,
            output,
            task,
        }
    }

    /// Stop every job of the run and wait until they are gone
    ///
    /// Child processes of aborted jobs are killed.
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// A running job
///
/// Dropping the handle aborts the job.
#[derive(Debug)]
pub struct Job {
    pub id: u64,
    handle: JoinHandle<Result<BuilderOutput>>,
}

impl Job {
    pub(crate) fn new(id: u64, handle: JoinHandle<Result<BuilderOutput>>) -> Self {
        Self { id, handle }
    }

    /// Wait for the job's output
    pub async fn wait(mut self) -> Result<BuilderOutput> {
        (&mut self.handle)
            .await
            .with_context(|| format!("job {} did not finish", self.id))?
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

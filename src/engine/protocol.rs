//! Messages exchanged between the engine and the CLI

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::config::Target;

/// Identity of the builder running a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuilderInfo {
    /// Builder name in `package:name` form
    pub name: String,
    pub description: String,
}

/// Lifecycle state carried by a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    Waiting,
    Running,
    Error,
    Stopped,
}

/// Progress notification for one job
#[derive(Debug, Clone)]
pub struct BuilderProgress {
    /// Job id, unique within a run
    pub id: u64,
    pub builder: BuilderInfo,
    pub target: Option<Target>,
    pub status: Option<String>,
    pub current: Option<u64>,
    pub total: Option<u64>,
    pub state: ProgressState,
    pub error: Option<String>,
}

/// Final result of a job
#[derive(Debug, Clone, Serialize)]
pub struct BuilderOutput {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    /// Builder that produced the output; not part of the printed result
    #[serde(skip)]
    pub info: Option<BuilderInfo>,

    /// Builder-specific result fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuilderOutput {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
            target: None,
            info: None,
            extra: Map::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success()
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Sends progress events on behalf of one job
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    id: u64,
    builder: BuilderInfo,
    target: Option<Target>,
    events: mpsc::UnboundedSender<BuilderProgress>,
}

impl ProgressReporter {
    pub fn new(
        id: u64,
        builder: BuilderInfo,
        target: Option<Target>,
        events: mpsc::UnboundedSender<BuilderProgress>,
    ) -> Self {
        Self {
            id,
            builder,
            target,
            events,
        }
    }

    /// Channel the events of this run go to, for scheduling nested jobs
    pub(crate) fn events(&self) -> mpsc::UnboundedSender<BuilderProgress> {
        self.events.clone()
    }

    fn send(
        &self,
        state: ProgressState,
        status: Option<String>,
        counts: Option<(u64, u64)>,
        error: Option<String>,
    ) {
        let event = BuilderProgress {
            id: self.id,
            builder: self.builder.clone(),
            target: self.target.clone(),
            status,
            current: counts.map(|(current, _)| current),
            total: counts.map(|(_, total)| total),
            state,
            error,
        };
        // The receiver is gone once the CLI stopped listening; nothing left to tell.
        let _ = self.events.send(event);
    }

    pub fn waiting(&self) {
        self.send(ProgressState::Waiting, None, None, None);
    }

    pub fn running(&self, current: u64, total: u64, status: Option<String>) {
        self.send(ProgressState::Running, status, Some((current, total)), None);
    }

    pub fn error(&self, error: impl Into<String>) {
        self.send(ProgressState::Error, None, None, Some(error.into()));
    }

    pub fn stopped(&self) {
        self.send(ProgressState::Stopped, None, None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_serialization_skips_info() {
        let mut output = BuilderOutput::failure("2 commands failed").with_field("commands", 3);
        output.target = Some(Target::new("app", "build"));
        output.info = Some(BuilderInfo {
            name: "architect:noop".to_string(),
            description: String::new(),
        });

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "success": false,
                "error": "2 commands failed",
                "target": {"project": "app", "target": "build"},
                "commands": 3
            })
        );
    }

    #[test]
    fn test_reporter_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let info = BuilderInfo {
            name: "architect:noop".to_string(),
            description: String::new(),
        };
        let reporter = ProgressReporter::new(4, info, None, tx);

        reporter.running(1, 3, Some("step".to_string()));
        reporter.error("boom");

        let running = rx.try_recv().unwrap();
        assert_eq!(running.id, 4);
        assert_eq!(running.state, ProgressState::Running);
        assert_eq!((running.current, running.total), (Some(1), Some(3)));
        assert_eq!(running.status.as_deref(), Some("step"));

        let error = rx.try_recv().unwrap();
        assert_eq!(error.state, ProgressState::Error);
        assert_eq!(error.error.as_deref(), Some("boom"));
        assert_eq!(error.current, None);
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let info = BuilderInfo {
            name: "architect:noop".to_string(),
            description: String::new(),
        };
        ProgressReporter::new(1, info, None, tx).stopped();
    }
}

//! Target resolution and job spawning

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use super::builders::{Builder, BuilderRegistry};
use super::logger::JobLogger;
use super::protocol::{BuilderInfo, BuilderProgress, ProgressReporter};
use super::{Engine, Job, Run};
use crate::config::{Target, Workspace};
use crate::error::ArchitectError;

/// In-process engine running workspace targets with the registered builders
#[derive(Debug, Clone)]
pub struct Architect {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    workspace: Workspace,
    root: PathBuf,
    registry: BuilderRegistry,
    next_id: AtomicU64,
}

/// A target with everything needed to start its builder
struct Resolved {
    target: Target,
    builder: Arc<dyn Builder>,
    options: Map<String, Value>,
}

impl Architect {
    /// Engine with the built-in builders
    pub fn new(workspace: Workspace, root: impl Into<PathBuf>) -> Self {
        Self::with_registry(workspace, root, BuilderRegistry::builtin())
    }

    pub fn with_registry(
        workspace: Workspace,
        root: impl Into<PathBuf>,
        registry: BuilderRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                workspace,
                root: root.into(),
                registry,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn resolve(&self, target: &Target, overrides: &Map<String, Value>) -> Result<Resolved, ArchitectError> {
        let workspace = &self.inner.workspace;
        let project_name = workspace.resolve_project_name(&target.project)?;
        let project = workspace.project(project_name)?;
        let config = project.target(project_name, &target.target)?;

        let resolved = Target {
            project: project_name.to_string(),
            target: target.target.clone(),
            configuration: target.configuration.clone(),
        };
        let options = config.resolve_options(
            &resolved.to_string(),
            target.configuration.as_deref(),
            overrides,
        )?;

        let builder = self
            .inner
            .registry
            .get(&config.builder)
            .ok_or_else(|| ArchitectError::UnknownBuilder {
                builder: config.builder.clone(),
                available: self.inner.registry.names(),
            })?;

        Ok(Resolved {
            target: resolved,
            builder,
            options,
        })
    }

    /// Resolve `target` and spawn its builder
    ///
    /// `ancestors` are the targets whose builders scheduled this one; a target
    /// appearing among its own ancestors is rejected.
    pub(crate) fn start(
        &self,
        target: &Target,
        overrides: &Map<String, Value>,
        events: mpsc::UnboundedSender<BuilderProgress>,
        logger: &JobLogger,
        ancestors: &[Target],
    ) -> Result<Job, ArchitectError> {
        let resolved = self.resolve(target, overrides)?;

        let is_ancestor = ancestors
            .iter()
            .any(|a| a.project == resolved.target.project && a.target == resolved.target.target);
        if is_ancestor {
            let chain = ancestors
                .iter()
                .chain(std::iter::once(&resolved.target))
                .map(Target::to_string)
                .collect();
            return Err(ArchitectError::CyclicTarget {
                target: resolved.target.to_string(),
                chain,
            });
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let info = BuilderInfo {
            name: resolved.builder.name().to_string(),
            description: resolved.builder.description().to_string(),
        };
        let progress = ProgressReporter::new(id, info.clone(), Some(resolved.target.clone()), events);

        let mut chain = ancestors.to_vec();
        chain.push(resolved.target.clone());

        let ctx = BuilderContext {
            architect: self.clone(),
            workspace_root: self.inner.root.clone(),
            logger: logger.child(resolved.target.to_string()),
            progress: progress.clone(),
            chain,
        };
        ctx.logger.debug(format!("starting job {} with builder {}", id, info.name));

        progress.waiting();
        let future = resolved.builder.run(ctx, Value::Object(resolved.options));
        let target = resolved.target;

        let handle = tokio::spawn(async move {
            let result = future.await.map(|mut output| {
                if output.target.is_none() {
                    output.target = Some(target);
                }
                output.info = Some(info);
                output
            });

            match &result {
                Ok(output) if output.success => progress.stopped(),
                Ok(output) => progress.error(
                    output
                        .error
                        .clone()
                        .unwrap_or_else(|| "builder reported failure".to_string()),
                ),
                Err(err) => progress.error(format!("{:#}", err)),
            }
            result
        });

        Ok(Job::new(id, handle))
    }
}

impl Engine for Architect {
    fn schedule_target(
        &self,
        target: &Target,
        overrides: Map<String, Value>,
        logger: JobLogger,
    ) -> Result<Run> {
        let (events, progress) = mpsc::unbounded_channel();
        let (output_tx, output) = oneshot::channel();

        let job = self.start(target, &overrides, events, &logger, &[])?;
        let id = job.id;

        let task = tokio::spawn(async move {
            let _ = output_tx.send(job.wait().await);
        });

        Ok(Run::new(id, progress, output, task))
    }
}

/// Everything a builder gets to run one job
#[derive(Debug, Clone)]
pub struct BuilderContext {
    architect: Architect,
    pub workspace_root: PathBuf,
    pub logger: JobLogger,
    pub progress: ProgressReporter,
    chain: Vec<Target>,
}

impl BuilderContext {
    /// Schedule another target as a job of its own
    ///
    /// The new job reports progress on the same run under a fresh id.
    pub fn schedule(&self, target: &Target, overrides: &Map<String, Value>) -> Result<Job, ArchitectError> {
        self.architect
            .start(target, overrides, self.progress.events(), &self.logger, &self.chain)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use anyhow::Result;
    use serde_json::Value;

    use crate::config::Workspace;
    use crate::engine::{Architect, BuilderOutput, BuilderProgress, Engine, LogBuffer};

    pub fn architect(root: &Path, workspace: Value) -> Architect {
        let workspace =
            Workspace::from_json(&root.join("workspace.json"), &workspace.to_string()).unwrap();
        Architect::new(workspace, root)
    }

    /// Run `target` to completion, collecting every progress event
    pub async fn run_target(
        architect: &Architect,
        target: &str,
        overrides: Value,
    ) -> (Vec<BuilderProgress>, Result<BuilderOutput>, LogBuffer) {
        let logs = LogBuffer::new();
        let overrides = overrides.as_object().cloned().unwrap_or_default();
        let mut run = architect
            .schedule_target(&target.parse().unwrap(), overrides, logs.logger("jobs"))
            .unwrap();

        let output = (&mut run.output).await.unwrap();
        let mut events = Vec::new();
        while let Some(event) = run.progress.recv().await {
            events.push(event);
        }
        run.stop().await;
        (events, output, logs)
    }
}

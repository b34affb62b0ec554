//! `architect:batch`, runs other targets as jobs of their own
//!
//! ```json
//! {
//!   "builder": "architect:batch",
//!   "options": { "targets": ["app:lint", "app:test"], "parallel": true }
//! }
//! ```
//!
//! Each scheduled target gets its own progress bar. Sequential batches stop at
//! the first failing target.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{parse_options, Builder, BuilderFuture};
use crate::config::Target;
use crate::engine::{BuilderContext, BuilderOutput};
use crate::error::ArchitectError;

pub const NAME: &str = "architect:batch";

fn default_parallel() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchOptions {
    targets: Vec<String>,

    #[serde(default = "default_parallel")]
    parallel: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Batch;

impl Builder for Batch {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Run several targets"
    }

    fn run(&self, ctx: BuilderContext, options: Value) -> BuilderFuture {
        Box::pin(run(ctx, options))
    }
}

async fn run(ctx: BuilderContext, options: Value) -> Result<BuilderOutput> {
    let options: BatchOptions = parse_options(NAME, options)?;
    let targets = options
        .targets
        .iter()
        .map(|t| {
            t.parse::<Target>()
                .map_err(|e| ArchitectError::invalid_options(NAME, e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total = targets.len() as u64;
    let overrides = Map::new();
    let mut results: Vec<(String, bool)> = Vec::with_capacity(targets.len());
    ctx.progress.running(0, total, None);

    if options.parallel {
        let jobs = targets
            .iter()
            .map(|target| ctx.schedule(target, &overrides))
            .collect::<Result<Vec<_>, _>>()?;

        for (target, job) in targets.iter().zip(jobs) {
            let output = job.wait().await?;
            let label = label(target, &output);
            ctx.progress
                .running(results.len() as u64 + 1, total, Some(format!("{} finished", label)));
            results.push((label, output.success));
        }
    } else {
        for target in &targets {
            ctx.progress.running(results.len() as u64, total, Some(target.to_string()));
            let output = ctx.schedule(target, &overrides)?.wait().await?;
            let label = label(target, &output);
            ctx.progress.running(results.len() as u64 + 1, total, None);

            if !output.success {
                ctx.logger.warn(format!("{} failed, skipping remaining targets", label));
                results.push((label, false));
                break;
            }
            results.push((label, true));
        }
    }

    let failed: Vec<&str> = results
        .iter()
        .filter(|(_, success)| !success)
        .map(|(target, _)| target.as_str())
        .collect();

    let output = if failed.is_empty() {
        BuilderOutput::success()
    } else {
        BuilderOutput::failure(format!("failed targets: {}", failed.join(", ")))
    };

    let summary: Vec<Value> = results
        .iter()
        .map(|(target, success)| json!({ "target": target, "success": success }))
        .collect();
    Ok(output.with_field("targets", summary))
}

/// Target string as resolved by the scheduler
fn label(target: &Target, output: &BuilderOutput) -> String {
    output.target.as_ref().unwrap_or(target).to_string()
}

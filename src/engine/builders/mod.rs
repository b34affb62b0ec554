//! Built-in builders
//!
//! A builder turns the merged options of a target into a [`BuilderOutput`],
//! reporting progress through its [`BuilderContext`] on the way.

pub mod batch;
pub mod noop;
pub mod run_commands;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::protocol::BuilderOutput;
use super::scheduler::BuilderContext;
use crate::error::ArchitectError;

pub use batch::Batch;
pub use noop::Noop;
pub use run_commands::RunCommands;

pub type BuilderFuture = Pin<Box<dyn Future<Output = Result<BuilderOutput>> + Send + 'static>>;

/// Something that can run a target
///
/// Returning `Ok` with `success: false` is a regular failure; returning `Err`
/// means the builder could not run at all.
pub trait Builder: Send + Sync + fmt::Debug {
    /// Name in `package:name` form, as referenced by workspace targets
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn run(&self, ctx: BuilderContext, options: Value) -> BuilderFuture;
}

/// Builders by name
#[derive(Debug, Clone, Default)]
pub struct BuilderRegistry {
    builders: IndexMap<String, Arc<dyn Builder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `architect:run-commands`, `architect:batch` and `architect:noop`
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(RunCommands);
        registry.register(Batch);
        registry.register(Noop);
        registry
    }

    /// Add a builder, replacing any other registered under the same name
    pub fn register(&mut self, builder: impl Builder + 'static) {
        self.builders
            .insert(builder.name().to_string(), Arc::new(builder));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Builder>> {
        self.builders.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }
}

/// Deserialize merged target options into a builder's option struct
pub(crate) fn parse_options<T: DeserializeOwned>(
    builder: &str,
    options: Value,
) -> Result<T, ArchitectError> {
    serde_json::from_value(options)
        .map_err(|e| ArchitectError::invalid_options(builder, e.to_string()))
}

//! `architect:noop`, succeeds without doing anything

use serde_json::Value;

use super::{Builder, BuilderFuture};
use crate::engine::{BuilderContext, BuilderOutput};

pub const NAME: &str = "architect:noop";

#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Builder for Noop {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Do nothing and succeed"
    }

    fn run(&self, ctx: BuilderContext, _options: Value) -> BuilderFuture {
        Box::pin(async move {
            ctx.logger.debug("nothing to do");
            Ok(BuilderOutput::success())
        })
    }
}

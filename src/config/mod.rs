//! Workspace configuration
//!
//! - `workspace` - the JSON workspace file (projects, targets, configurations)
//! - `validation` - checks applied when the workspace file is loaded
//! - `target` - `project:target:configuration` strings
//! - `overrides` - option overrides given after the target on the command line

pub mod overrides;
pub mod target;
pub mod validation;
pub mod workspace;

pub use overrides::parse_overrides;
pub use target::Target;
pub use workspace::{Workspace, CONFIG_FILE_NAMES};

//! Live progress display
//!
//! ## Modules
//!
//! - `bar` - line template (`:name :bar (:current/:total) :status`) and bar graphic
//! - `multi` - [`MultiProgressBar`], the set of bars drawn together
//! - `screen` - terminal surface the bars are drawn on

pub mod bar;
pub mod multi;
pub mod screen;

pub use bar::DEFAULT_TEMPLATE;
pub use multi::{MultiProgressBar, ProgressEntry, REFRESH_INTERVAL};
pub use screen::Screen;

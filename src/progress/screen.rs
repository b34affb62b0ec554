//! Drawing surface used by the progress renderer

use std::io;

use console::Term;
use indicatif::TermLike;

/// A terminal the renderer can draw frames on
pub trait Screen: TermLike {
    /// Whether frames should be redrawn in place while jobs run
    ///
    /// When this is false only the final frame is printed.
    fn is_live(&self) -> bool;

    fn hide_cursor(&self) -> io::Result<()>;

    fn show_cursor(&self) -> io::Result<()>;
}

impl Screen for Term {
    fn is_live(&self) -> bool {
        self.features().is_attended()
    }

    fn hide_cursor(&self) -> io::Result<()> {
        Term::hide_cursor(self)
    }

    fn show_cursor(&self) -> io::Result<()> {
        Term::show_cursor(self)
    }
}

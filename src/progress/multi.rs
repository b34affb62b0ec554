//! Multi-line progress display for concurrently running jobs

use std::hash::Hash;
use std::io;
use std::time::{Duration, Instant};

use console::{truncate_str, Term};
use indexmap::IndexMap;
use tracing::debug;

use super::bar::{fit_label, Template};
use super::screen::Screen;

/// Minimum time between two repaints of the live display
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(66);

/// Lifecycle of a single bar
///
/// Transitions only move forward: `Pending -> Running -> Done | Errored`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BarState {
    #[default]
    Pending,
    Running,
    Done,
    Errored,
}

impl BarState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BarState::Done | BarState::Errored)
    }
}

/// Display data supplied by the caller for one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressEntry {
    /// Fixed-width name column
    pub label: String,
    pub status: String,
}

impl ProgressEntry {
    pub fn new(label: &str, status: impl Into<String>) -> Self {
        Self {
            label: fit_label(label),
            status: status.into(),
        }
    }
}

/// Stored state of one bar
#[derive(Debug, Clone, Default)]
pub struct Bar {
    entry: ProgressEntry,
    current: u64,
    total: u64,
    state: BarState,
}

impl Bar {
    pub fn entry(&self) -> &ProgressEntry {
        &self.entry
    }

    #[cfg(test)]
    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    #[cfg(test)]
    pub fn state(&self) -> BarState {
        self.state
    }

    fn advance(&mut self, current: Option<u64>, total: Option<u64>) {
        if self.state == BarState::Errored {
            return;
        }
        if let Some(total) = total {
            self.total = total;
        }
        if let Some(current) = current {
            self.current = current;
            if self.state == BarState::Pending {
                self.state = BarState::Running;
            }
        }
    }
}

/// A set of progress bars drawn together, one line per job
///
/// Lines appear in the order their ids were first seen and keep that order
/// for the lifetime of the renderer. Updates only mark the display dirty;
/// [`render`](Self::render) repaints at most once per refresh interval by
/// moving the cursor back over the previous frame.
///
/// The renderer owns the terminal while it is alive. Dropping it runs
/// [`terminate`](Self::terminate), so the cursor is restored on every exit
/// path.
#[derive(Debug)]
pub struct MultiProgressBar<K, S = Term>
where
    K: Eq + Hash,
    S: Screen,
{
    template: Template,
    bars: IndexMap<K, Bar>,
    screen: S,
    live: bool,
    drawn_lines: usize,
    dirty: bool,
    last_draw: Option<Instant>,
    refresh_interval: Duration,
    cursor_hidden: bool,
    terminated: bool,
}

impl<K: Eq + Hash> MultiProgressBar<K> {
    /// Renderer drawing on standard output
    pub fn new(template: &str) -> Self {
        Self::with_screen(template, Term::stdout())
    }
}

impl<K, S> MultiProgressBar<K, S>
where
    K: Eq + Hash,
    S: Screen,
{
    pub fn with_screen(template: &str, screen: S) -> Self {
        let live = screen.is_live();
        Self {
            template: Template::parse(template),
            bars: IndexMap::new(),
            screen,
            live,
            drawn_lines: 0,
            dirty: false,
            last_draw: None,
            refresh_interval: REFRESH_INTERVAL,
            cursor_hidden: false,
            terminated: false,
        }
    }

    #[cfg(test)]
    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn get(&self, id: &K) -> Option<&Bar> {
        self.bars.get(id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Insert or replace the entry for `id`
    ///
    /// Counters that are not supplied keep their stored values.
    pub fn update(&mut self, id: K, entry: ProgressEntry, current: Option<u64>, total: Option<u64>) {
        let bar = self.bars.entry(id).or_default();
        bar.entry = entry;
        bar.advance(current, total);
        self.dirty = true;
    }

    /// Mark the job for `id` as finished
    ///
    /// Unknown ids are ignored.
    pub fn complete(&mut self, id: &K) {
        if let Some(bar) = self.bars.get_mut(id) {
            if !bar.state.is_terminal() {
                bar.state = BarState::Done;
                self.dirty = true;
            }
        }
    }

    /// Replace the entry for `id` and stop its bar in the errored state
    pub fn fail(&mut self, id: K, entry: ProgressEntry) {
        let bar = self.bars.entry(id).or_default();
        bar.entry = entry;
        if !bar.state.is_terminal() {
            bar.state = BarState::Errored;
        }
        self.dirty = true;
    }

    /// Lines of the current frame, in display order
    pub fn lines(&self) -> Vec<String> {
        self.bars
            .values()
            .map(|bar| {
                self.template
                    .render(&bar.entry.label, bar.current, bar.total, &bar.entry.status)
            })
            .collect()
    }

    /// Repaint the display if something changed and the refresh interval elapsed
    pub fn render(&mut self) {
        if self.terminated || !self.live || !self.dirty {
            return;
        }
        if let Some(last_draw) = self.last_draw {
            if last_draw.elapsed() < self.refresh_interval {
                return;
            }
        }
        self.draw();
    }

    /// Draw the final frame and give the terminal back
    ///
    /// Calling this more than once has no further effect.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        if self.dirty && !self.bars.is_empty() {
            self.draw();
        }
        if self.cursor_hidden {
            if let Err(err) = self.screen.show_cursor() {
                debug!(error = %err, "failed to restore cursor");
            }
            self.cursor_hidden = false;
        }
        self.terminated = true;
    }

    fn draw(&mut self) {
        if let Err(err) = self.try_draw() {
            debug!(error = %err, "failed to draw progress bars");
        }
    }

    fn try_draw(&mut self) -> io::Result<()> {
        let width = usize::from(self.screen.width());
        let lines = self.lines();

        if self.live {
            if !self.cursor_hidden {
                self.screen.hide_cursor()?;
                self.cursor_hidden = true;
            }
            if self.drawn_lines > 0 {
                self.screen.move_cursor_up(self.drawn_lines)?;
            }
        }

        for line in &lines {
            self.screen.clear_line()?;
            if width > 0 {
                self.screen.write_line(&truncate_str(line, width, ""))?;
            } else {
                self.screen.write_line(line)?;
            }
        }
        self.screen.flush()?;

        self.drawn_lines = lines.len();
        self.dirty = false;
        self.last_draw = Some(Instant::now());
        Ok(())
    }
}

impl<K, S> Drop for MultiProgressBar<K, S>
where
    K: Eq + Hash,
    S: Screen,
{
    fn drop(&mut self) {
        self.terminate();
    }
}

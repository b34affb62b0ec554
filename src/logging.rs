//! Process logger setup
//!
//! Everything goes to stderr so stdout only carries the progress display and
//! the result. `ARCHITECT_LOG` takes an `EnvFilter` directive and wins over
//! `--verbose`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "ARCHITECT_LOG";

/// Install the global subscriber
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(console::colors_enabled_stderr())
        .without_time()
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

//! Tracing setup for host-embedded use.
//!
//! The bridge runs inside someone else's process, so the subscriber is
//! installed with `try_init`: an embedder that configured tracing before
//! calling [`crate::Bridge::install`] keeps its own subscriber.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global tracing subscriber once.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Output goes to
/// stderr, which hosts surface in their script consoles. Safe to call any
/// number of times.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init();
    });
}

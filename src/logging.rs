//! Log output setup.
//!
//! Lines go to stdout prefixed with a local `YYYY-MM-DD HH:MM:SS` timestamp.
//! Detailed lines (record dumps, interface scans) are logged at `debug` and
//! only shown in verbose mode.

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logger settings, taken from the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub verbose: bool,
}

impl LogConfig {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> &'static str {
        if self.verbose {
            "info,glesys_ddns=debug"
        } else {
            "info"
        }
    }

    /// Install the global subscriber. `RUST_LOG` takes precedence.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_timer(LocalDateTime)
                    .with_target(false)
                    .with_level(false),
            )
            .init();
    }
}

/// Timestamp in local time, second precision.
#[derive(Debug, Clone, Copy)]
struct LocalDateTime;

impl FormatTime for LocalDateTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

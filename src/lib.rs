//! # glesys-ddns
//!
//! Keeps a set of GleSYS DNS A records pointed at this host's current IP.
//!
//! ## Features
//!
//! - Public IP lookup through an echo service, or local interface scanning
//!   with an address prefix filter
//! - Any number of `domain#host` records, updated only when they differ
//! - Optional TTL override on updated records
//! - YAML configuration with environment variable overrides
//!
//! ## Usage
//!
//! ```bash
//! # Run forever, reading ./config.yml
//! glesys-ddns
//!
//! # Single run with an explicit config file
//! glesys-ddns --config /etc/glesys-ddns/config.yml --once
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod logging;
pub mod providers;
pub mod reconciler;
pub mod records;
pub mod scheduler;

pub use config::Config;
pub use detector::IpResolver;
pub use error::{DdnsError, Result};
pub use reconciler::{Reconciler, RunReport};
pub use records::DesiredState;
pub use scheduler::Scheduler;

/// User-Agent header value for HTTP requests.
pub const USER_AGENT: &str = concat!("glesys-ddns/", env!("CARGO_PKG_VERSION"));

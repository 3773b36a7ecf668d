//! Logging setup for fieldpin.
//!
//! The library only emits `tracing` events. The binary installs a subscriber
//! with [`init_logging`]; events go to stderr so that command output on stdout
//! (JSON exports, rendered fields) stays machine-readable.

use std::io;

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level applied to every target outside this crate.
const DEPENDENCY_LEVEL: Level = Level::WARN;

/// How much the binary logs, as chosen by `-q` / `-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Pin writes, catalog changes and warnings.
    #[default]
    Normal,
    /// Reconciliation decisions and store traffic.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Pick a verbosity from the command-line flags. `quiet` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Level for the `fieldpin` target.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    ///
    /// Quiet mode also lowers dependencies to errors.
    #[must_use]
    pub fn directive(self) -> String {
        let dependencies = self.level().min(DEPENDENCY_LEVEL);
        format!("{dependencies},fieldpin={}", self.level())
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `verbosity`.
///
/// ```no_run
/// use fieldpin::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init();
}

/// Route warnings and errors from a test through the test harness.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fieldpin=warn")
        .with_test_writer()
        .try_init();
}

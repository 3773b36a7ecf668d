//! User-visible feedback.
//!
//! Every success, warning, and error the engine wants a person to see goes
//! through a single [`NotificationSink`]. Sinks are fire-and-forget.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::{error, info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// An operation completed.
    Success,
    /// Neutral information.
    Info,
    /// A disallowed action was ignored.
    Warning,
    /// An operation failed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity of the notification.
    pub severity: Severity,
    /// Message shown to the user.
    pub message: String,
}

/// Destination for user-visible feedback.
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification.
    fn notify(&self, severity: Severity, message: &str);
}

/// Sink that forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Success | Severity::Info => info!(%severity, "{message}"),
            Severity::Warning => warn!(%severity, "{message}"),
            Severity::Error => error!(%severity, "{message}"),
        }
    }
}

/// Sink that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    notifications: Mutex<Vec<Notification>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of notifications with the given severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    /// Drop every recorded notification.
    pub fn clear(&self) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, severity: Severity, message: &str) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification {
                severity,
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Success.to_string(), "success");
        assert_eq!(Severity::Info.to_string(), "info");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[test]
    fn test_memory_sink_records() {
        let sink = MemorySink::new();
        sink.notify(Severity::Warning, "already selected");
        sink.notify(Severity::Error, "creation failed");
        sink.notify(Severity::Warning, "again");

        assert_eq!(sink.count(Severity::Warning), 2);
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.notifications()[0].message, "already selected");

        sink.clear();
        assert!(sink.notifications().is_empty());
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        crate::logging::init_test_logging();
        let sink = TracingSink;
        sink.notify(Severity::Success, "ok");
        sink.notify(Severity::Error, "bad");
    }
}

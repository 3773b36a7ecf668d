//! Session lifetime handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable handle that marks an editing session as closed.
///
/// Async collaborator calls check the handle once they complete and drop their
/// result if the session was closed in the meantime.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    closed: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Create a handle for an open session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the session.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Check whether the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_starts_open() {
        assert!(!SessionHandle::new().is_closed());
    }

    #[test]
    fn test_close_is_shared_between_clones() {
        let handle = SessionHandle::new();
        let clone = handle.clone();

        clone.close();
        assert!(handle.is_closed());
        assert!(clone.is_closed());
    }
}

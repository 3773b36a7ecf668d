//! Value suggestions for field inputs.
//!
//! [`SuggestionService`] sits between an autocomplete input and a
//! [`SuggestionLookup`]. Lookups that fail, time out, or are overtaken by a
//! newer request yield an empty list. They are logged, never shown to the user.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::collab::SuggestionLookup;
use crate::config::SuggestionConfig;
use crate::engine::SessionHandle;
use crate::field::FieldId;

/// Autocomplete front for a [`SuggestionLookup`].
pub struct SuggestionService {
    lookup: Arc<dyn SuggestionLookup>,
    config: SuggestionConfig,
    generation: AtomicU64,
    handle: SessionHandle,
}

impl fmt::Debug for SuggestionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuggestionService")
            .field("config", &self.config)
            .field("generation", &self.generation)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl SuggestionService {
    /// Create a service over a lookup.
    #[must_use]
    pub fn new(lookup: Arc<dyn SuggestionLookup>, config: SuggestionConfig) -> Self {
        Self {
            lookup,
            config,
            generation: AtomicU64::new(0),
            handle: SessionHandle::new(),
        }
    }

    /// Tie the service to a session; results arriving after it closes are dropped.
    #[must_use]
    pub fn with_handle(mut self, handle: SessionHandle) -> Self {
        self.handle = handle;
        self
    }

    /// Suggest values for `field_id` matching `query`.
    ///
    /// Only the most recent call returns results. An older call that finishes
    /// after a newer one has started returns an empty list.
    pub async fn suggest(&self, query: &str, field_id: &FieldId) -> Vec<String> {
        let query = query.trim();
        if query.chars().count() < self.config.min_query_length {
            return Vec::new();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = tokio::time::timeout(
            self.config.timeout(),
            self.lookup.lookup(query, field_id),
        )
        .await;

        if self.handle.is_closed() {
            debug!(%field_id, "Session closed during lookup, dropping suggestions");
            return Vec::new();
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(%field_id, query, "Dropping stale suggestions");
            return Vec::new();
        }

        match result {
            Ok(Ok(values)) => self.tidy(values),
            Ok(Err(err)) => {
                warn!(%field_id, query, error = %err, "Suggestion lookup failed");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    %field_id,
                    query,
                    timeout_ms = self.config.timeout_ms,
                    "Suggestion lookup timed out"
                );
                Vec::new()
            }
        }
    }

    /// Drop blanks and repeats, then cap the count.
    fn tidy(&self, values: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        values
            .into_iter()
            .filter(|value| !value.is_empty() && seen.insert(value.clone()))
            .take(self.config.max_results)
            .collect()
    }
}

//! Contracts with the collaborators around the engine.
//!
//! The engine never talks to a backend directly. Catalog field creation,
//! value suggestions, and pin persistence are all reached through the traits
//! in this module.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::field::{FieldCatalogEntry, FieldId, SelectedField};
use crate::pins::{ListPinEntry, PinChange, PinKey, PinSet};

/// Response of a field creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedField {
    /// Id assigned by the backend. A response without one is a failure.
    #[serde(default)]
    pub id: Option<FieldId>,
    /// Name the field was created with.
    pub name: String,
}

impl CreatedField {
    /// Turn the response into a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldCreation`] if the backend did not assign an id.
    pub fn into_entry(self) -> Result<FieldCatalogEntry> {
        match self.id {
            Some(id) => Ok(FieldCatalogEntry { id, name: self.name }),
            None => Err(Error::field_creation(self.name, "response carried no id")),
        }
    }
}

/// Creates new catalog fields.
#[async_trait]
pub trait FieldCreator: Send + Sync {
    /// Create a field with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects or fails the request.
    async fn create_field(&self, name: &str) -> Result<CreatedField>;
}

/// Looks up previously used values for a field.
#[async_trait]
pub trait SuggestionLookup: Send + Sync {
    /// Return values for `field_id` that match `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn lookup(&self, query: &str, field_id: &FieldId) -> Result<Vec<String>>;
}

/// Persists pins.
///
/// Where pins live is up to the implementor.
pub trait PinStore: Send + Sync {
    /// Load the current pin set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self) -> Result<PinSet>;

    /// Create or replace the list pin.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn pin_list(&self, entries: &[ListPinEntry]) -> Result<()>;

    /// Create or replace an individual pin.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn pin_field(&self, entry: &SelectedField) -> Result<()>;

    /// Remove a pin. Removing an absent pin is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn unpin(&self, key: &PinKey) -> Result<()>;

    /// Persist one change.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn apply(&self, change: &PinChange) -> Result<()> {
        match change {
            PinChange::PinList(entries) => self.pin_list(entries),
            PinChange::PinField(entry) => self.pin_field(entry),
            PinChange::Unpin(key) => self.unpin(key),
        }
    }

    /// Persist several changes as one unit: all of them or none.
    ///
    /// The provided implementation writes them in order. When a write fails
    /// it restores every key already written from a snapshot taken up front.
    /// Stores with native transactions should override it.
    ///
    /// # Errors
    ///
    /// Returns the error of the first write that failed.
    fn apply_all(&self, changes: &[PinChange]) -> Result<()> {
        match changes {
            [] => return Ok(()),
            [change] => return self.apply(change),
            _ => {}
        }

        let before = self.load()?;
        for (written, change) in changes.iter().enumerate() {
            if let Err(err) = self.apply(change) {
                for done in changes[..written].iter().rev() {
                    let key = done.key();
                    if let Err(undo) = self.apply(&before.restore(&key)) {
                        warn!(%key, error = %undo, "Could not restore pin");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Pin store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryPinStore {
    pins: Mutex<PinSet>,
}

impl MemoryPinStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with pins.
    #[must_use]
    pub fn with_pins(pins: PinSet) -> Self {
        Self {
            pins: Mutex::new(pins),
        }
    }

    fn update(&self, change: &PinChange) {
        self.pins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(change);
    }
}

impl PinStore for MemoryPinStore {
    fn load(&self) -> Result<PinSet> {
        Ok(self
            .pins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn pin_list(&self, entries: &[ListPinEntry]) -> Result<()> {
        self.update(&PinChange::PinList(entries.to_vec()));
        Ok(())
    }

    fn pin_field(&self, entry: &SelectedField) -> Result<()> {
        self.update(&PinChange::PinField(entry.clone()));
        Ok(())
    }

    fn unpin(&self, key: &PinKey) -> Result<()> {
        self.update(&PinChange::Unpin(key.clone()));
        Ok(())
    }

    fn apply_all(&self, changes: &[PinChange]) -> Result<()> {
        let mut pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        for change in changes {
            pins.apply(change);
        }
        Ok(())
    }
}

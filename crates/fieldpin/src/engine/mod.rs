//! Pin reconciliation engine.
//!
//! [`reconcile`] derives the list of fields to render from the catalog, the
//! saved record, the pins, and the live form. [`ops`] holds the pure edit
//! operations, and [`FieldManager`] drives both against real collaborators.

mod handle;
mod manager;
pub mod ops;
pub mod reconcile;

pub use handle::SessionHandle;
pub use manager::{FieldManager, SelectOutcome};
pub use ops::{Edit, Selection};
pub use reconcile::{recompute, ReconcileInput, Reconciler};

use crate::field::{FieldCatalogEntry, FieldId};

/// What the user picked in the field selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChoice {
    /// A field that already exists in the catalog.
    Existing(FieldCatalogEntry),
    /// A new field to create in the catalog first.
    Create {
        /// Name for the new field.
        name: String,
    },
}

/// Which pin to toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinToggle {
    /// The list pin.
    List,
    /// The individual pin of one field.
    Field(FieldId),
}

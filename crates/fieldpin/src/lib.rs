//! `fieldpin` - Pinned custom field values for record editors
//!
//! This library decides which custom fields an editing session shows and with
//! which values, merging the record's saved fields, the live form, and the
//! user's pins. It also provides `SQLite` storage for the catalog and pins.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod collab;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod logging;
pub mod notify;
pub mod pins;
pub mod storage;
pub mod suggest;

pub use collab::{CreatedField, FieldCreator, MemoryPinStore, PinStore, SuggestionLookup};
pub use config::Config;
pub use engine::{FieldChoice, FieldManager, PinToggle, SelectOutcome, SessionHandle};
pub use error::{Error, Result};
pub use field::{
    Catalog, CurrentField, FieldCatalogEntry, FieldId, FormValue, RecordSnapshot, SelectedField,
};
pub use logging::init_logging;
pub use notify::{MemorySink, NotificationSink, Severity, TracingSink};
pub use pins::{ListPinEntry, PinChange, PinKey, PinSet};
pub use storage::{Storage, StorageStats};
pub use suggest::SuggestionService;

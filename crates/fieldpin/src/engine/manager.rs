//! Stateful editing session over the pure engine.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::ops::{self, Edit, Selection};
use super::reconcile::{ReconcileInput, Reconciler};
use super::{FieldChoice, PinToggle, SessionHandle};
use crate::collab::{CreatedField, FieldCreator, PinStore};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::field::{Catalog, CurrentField, FieldCatalogEntry, FieldId, FormValue, SelectedField};
use crate::notify::{NotificationSink, Severity};
use crate::pins::{PinChange, PinSet};

/// Outcome of [`FieldManager::select_field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The field was attached.
    Added(FieldId),
    /// The field was already attached; a warning was shown.
    Duplicate,
}

/// Editing session for the custom fields of one record.
///
/// Owns the catalog, the saved fields, the live form rows, and a copy of the
/// pins, and keeps the derived selected field list in step with them. Pin
/// changes are written to the [`PinStore`] before the in-memory state moves,
/// so a failed write leaves the session as it was.
pub struct FieldManager {
    catalog: Catalog,
    current_fields: Vec<CurrentField>,
    form_values: Vec<FormValue>,
    pins: PinSet,
    pin_mode: bool,
    unknown_label: String,
    reconciler: Reconciler,
    store: Arc<dyn PinStore>,
    creator: Arc<dyn FieldCreator>,
    notifier: Arc<dyn NotificationSink>,
    handle: SessionHandle,
}

impl fmt::Debug for FieldManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldManager")
            .field("catalog", &self.catalog)
            .field("current_fields", &self.current_fields)
            .field("form_values", &self.form_values)
            .field("pins", &self.pins)
            .field("pin_mode", &self.pin_mode)
            .field("selected", &self.reconciler.fields())
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl FieldManager {
    /// Open a session, loading pins from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the pins cannot be loaded.
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn PinStore>,
        creator: Arc<dyn FieldCreator>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let pins = store.load()?;
        let mut manager = Self {
            catalog: Catalog::default(),
            current_fields: Vec::new(),
            form_values: Vec::new(),
            pins,
            pin_mode: config.pin_mode,
            unknown_label: config.unknown_label.clone(),
            reconciler: Reconciler::new(),
            store,
            creator,
            notifier,
            handle: SessionHandle::new(),
        };
        manager.refresh();
        Ok(manager)
    }

    /// Use an existing handle for this session.
    #[must_use]
    pub fn with_handle(mut self, handle: SessionHandle) -> Self {
        self.handle = handle;
        self
    }

    /// Handle that closes this session.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// The fields to render, in order.
    #[must_use]
    pub fn selected_fields(&self) -> &[SelectedField] {
        self.reconciler.fields()
    }

    /// The live form rows.
    #[must_use]
    pub fn form_values(&self) -> &[FormValue] {
        &self.form_values
    }

    /// The session's copy of the pins.
    #[must_use]
    pub fn pins(&self) -> &PinSet {
        &self.pins
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether pins take part in reconciliation.
    #[must_use]
    pub fn is_pin_mode(&self) -> bool {
        self.pin_mode
    }

    /// Re-derive the selected fields from the current inputs.
    ///
    /// Returns `true` if the list was rebuilt.
    pub fn refresh(&mut self) -> bool {
        let input = ReconcileInput {
            catalog: &self.catalog,
            current_fields: &self.current_fields,
            pins: &self.pins,
            pin_mode: self.pin_mode,
            form_values: &self.form_values,
            unknown_label: &self.unknown_label,
        };
        self.reconciler.refresh(&input)
    }

    /// Replace the catalog.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        self.refresh();
    }

    /// Replace the values saved on the record.
    pub fn set_current_fields(&mut self, current_fields: Vec<CurrentField>) {
        self.current_fields = current_fields;
        self.refresh();
    }

    /// Replace the live form rows.
    pub fn set_form_values(&mut self, form_values: Vec<FormValue>) {
        self.form_values = form_values;
        self.refresh();
    }

    /// Turn pin mode on or off.
    pub fn set_pin_mode(&mut self, pin_mode: bool) {
        self.pin_mode = pin_mode;
        self.refresh();
    }

    /// Reload the pins from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the pins cannot be loaded.
    pub fn reload_pins(&mut self) -> Result<()> {
        self.pins = self.store.load()?;
        self.refresh();
        Ok(())
    }

    /// Attach a field, creating it in the catalog first if needed.
    ///
    /// Selecting a field that is already attached shows a warning and changes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if field creation fails, if a pin change cannot be
    /// persisted, or if the session was closed. State is unchanged in each case.
    pub async fn select_field(&mut self, choice: FieldChoice) -> Result<SelectOutcome> {
        self.ensure_open()?;

        let entry = match choice {
            FieldChoice::Existing(entry) => entry,
            FieldChoice::Create { name } => self.create_field(&name).await?,
        };

        match ops::select_field(
            &entry,
            self.reconciler.fields(),
            &self.form_values,
            &self.pins,
        ) {
            Selection::Duplicate => {
                debug!(field_id = %entry.id, "Field already selected");
                self.notifier.notify(
                    Severity::Warning,
                    &format!("Field '{}' is already selected", entry.name),
                );
                Ok(SelectOutcome::Duplicate)
            }
            Selection::Added(edit) => {
                self.commit(edit)?;
                debug!(field_id = %entry.id, "Field selected");
                Ok(SelectOutcome::Added(entry.id))
            }
        }
    }

    async fn create_field(&mut self, name: &str) -> Result<FieldCatalogEntry> {
        let result = self
            .creator
            .create_field(name)
            .await
            .and_then(CreatedField::into_entry);

        if self.handle.is_closed() {
            debug!(name, "Session closed during field creation, dropping result");
            return Err(Error::SessionClosed);
        }

        match result {
            Ok(entry) => {
                // Creators may answer with a field the catalog already has.
                let existed = self.catalog.contains(&entry.id);
                self.catalog.upsert(entry.clone());
                self.reconciler
                    .acknowledge(&self.catalog, &self.current_fields);
                if existed {
                    debug!(field_id = %entry.id, name = %entry.name, "Field already in catalog");
                } else {
                    info!(field_id = %entry.id, name = %entry.name, "Created catalog field");
                    self.notifier.notify(
                        Severity::Success,
                        &format!("Field '{}' created", entry.name),
                    );
                }
                Ok(entry)
            }
            Err(err) => {
                warn!(name, error = %err, "Field creation failed");
                self.notifier
                    .notify(Severity::Error, &format!("Could not create field '{name}'"));
                Err(err)
            }
        }
    }

    /// Set the value of the field at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range, if a pin change cannot be
    /// persisted, or if the session was closed.
    pub fn set_field_value(&mut self, index: usize, value: &str) -> Result<()> {
        self.ensure_open()?;
        let edit = ops::set_field_value(
            index,
            value,
            self.reconciler.fields(),
            &self.form_values,
            &self.pins,
        )?;
        self.commit(edit)
    }

    /// Detach a field and clear its pins.
    ///
    /// # Errors
    ///
    /// Returns an error if a pin change cannot be persisted or if the session
    /// was closed.
    pub fn remove_field(&mut self, id: &FieldId) -> Result<()> {
        self.ensure_open()?;
        let edit = ops::remove_field(id, self.reconciler.fields(), &self.form_values, &self.pins);
        self.commit(edit)?;
        debug!(field_id = %id, "Field removed");
        Ok(())
    }

    /// Pin or unpin.
    ///
    /// Returns `true` if the pin now exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the field to pin is not selected, if the change
    /// cannot be persisted, or if the session was closed.
    pub fn toggle_pin(&mut self, toggle: &PinToggle) -> Result<bool> {
        self.ensure_open()?;
        let change = ops::toggle_pin(toggle, self.reconciler.fields(), &self.pins)?;
        self.persist(std::slice::from_ref(&change))?;

        let pinned = !matches!(change, PinChange::Unpin(_));
        let message = match (toggle, pinned) {
            (PinToggle::List, true) => "Selected fields pinned".to_string(),
            (PinToggle::List, false) => "Selected fields unpinned".to_string(),
            (PinToggle::Field(id), true) => format!("Field {id} pinned"),
            (PinToggle::Field(id), false) => format!("Field {id} unpinned"),
        };
        self.notifier.notify(Severity::Success, &message);
        Ok(pinned)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.handle.is_closed() {
            Err(Error::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Write an edit's pin changes to the store as one unit, then to the
    /// session's copy.
    fn persist(&mut self, changes: &[PinChange]) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.store.apply_all(changes) {
            error!(changes = changes.len(), error = %err, "Failed to persist pin changes");
            self.notifier
                .notify(Severity::Error, "Could not save pinned fields");
            return Err(err);
        }
        for change in changes {
            self.pins.apply(change);
        }
        Ok(())
    }

    fn commit(&mut self, edit: Edit) -> Result<()> {
        self.persist(&edit.pin_changes)?;
        self.reconciler.replace(edit.selected);
        self.form_values = edit.form_values;
        Ok(())
    }
}

//! Derivation of the selected field list.
//!
//! [`recompute`] merges four sources into the list of fields to render:
//! the catalog, the values saved on the record, the pin set, and the live
//! form rows. With pin mode on, the result is built in stages:
//!
//! 1. `seed_from_list_pin`: list pin members, values blanked.
//! 2. `seed_from_field_pins`: individually pinned fields not yet seeded.
//! 3. `resolve_values`: each seeded field takes the first non-empty of its
//!    individual pin value, its saved value, and its live form value.
//! 4. `append_current_fields`: saved fields that were not pinned.
//! 5. `append_form_values`: live form rows that were not pinned or saved.
//!
//! Result order follows stage order. A field id appears at most once.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::field::{is_blank, Catalog, CurrentField, FieldId, FormValue, SelectedField};
use crate::pins::PinSet;

/// Everything [`recompute`] reads.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    /// Fields available to attach.
    pub catalog: &'a Catalog,
    /// Values saved on the record being edited.
    pub current_fields: &'a [CurrentField],
    /// Persisted pins.
    pub pins: &'a PinSet,
    /// Whether pins take part in the merge.
    pub pin_mode: bool,
    /// Live form rows.
    pub form_values: &'a [FormValue],
    /// Label for ids missing from the catalog.
    pub unknown_label: &'a str,
}

/// Result list under construction, with the ids it already holds.
#[derive(Debug, Default)]
struct Merge {
    fields: Vec<SelectedField>,
    processed: HashSet<FieldId>,
}

impl Merge {
    /// Push a field unless its id is already present.
    fn push(&mut self, field: SelectedField) -> bool {
        if self.processed.insert(field.value.clone()) {
            self.fields.push(field);
            true
        } else {
            false
        }
    }

    fn contains(&self, id: &FieldId) -> bool {
        self.processed.contains(id)
    }
}

/// Compute the ordered, de-duplicated list of fields to render.
#[must_use]
pub fn recompute(input: &ReconcileInput<'_>) -> Vec<SelectedField> {
    if !input.pin_mode {
        return project_current(input);
    }

    let mut merge = Merge::default();
    seed_from_list_pin(&mut merge, input.pins);
    seed_from_field_pins(&mut merge, input.pins);
    resolve_values(&mut merge.fields, input);
    append_current_fields(&mut merge, input);
    append_form_values(&mut merge, input);

    trace!(fields = merge.fields.len(), "Recomputed selected fields");
    merge.fields
}

/// Saved fields in record order, pins ignored.
fn project_current(input: &ReconcileInput<'_>) -> Vec<SelectedField> {
    let mut merge = Merge::default();
    append_current_fields(&mut merge, input);
    merge.fields
}

fn seed_from_list_pin(merge: &mut Merge, pins: &PinSet) {
    for entry in pins.list_pin().unwrap_or_default() {
        merge.push(entry.to_selected());
    }
}

fn seed_from_field_pins(merge: &mut Merge, pins: &PinSet) {
    for entry in pins.field_pins() {
        merge.push(entry.clone());
    }
}

fn resolve_values(fields: &mut [SelectedField], input: &ReconcileInput<'_>) {
    for field in fields {
        field.field_value = resolve_value(&field.value, input);
    }
}

/// First non-empty of: individual pin, saved value, live form value.
fn resolve_value(id: &FieldId, input: &ReconcileInput<'_>) -> String {
    let pinned = input
        .pins
        .field_pin(id)
        .map(|entry| entry.field_value.as_str());
    let saved = input
        .current_fields
        .iter()
        .find(|field| field.matches(id))
        .and_then(|field| field.value.as_deref());
    let live = input
        .form_values
        .iter()
        .find(|row| row.matches(id))
        .and_then(|row| row.value.as_deref());

    [pinned, saved, live]
        .into_iter()
        .find(|candidate| !is_blank(*candidate))
        .flatten()
        .unwrap_or_default()
        .to_string()
}

fn append_current_fields(merge: &mut Merge, input: &ReconcileInput<'_>) {
    for field in input.current_fields {
        let Some(id) = field.field_id() else {
            debug!("Skipping saved field without an id");
            continue;
        };
        if merge.contains(id) {
            continue;
        }
        let label = match field.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => input.catalog.resolve_label(id, input.unknown_label),
        };
        let value = field.value.clone().unwrap_or_default();
        merge.push(SelectedField::new(id.clone(), label, value));
    }
}

fn append_form_values(merge: &mut Merge, input: &ReconcileInput<'_>) {
    for row in input.form_values {
        let Some(id) = row.field_id() else {
            debug!("Skipping form row without an id");
            continue;
        };
        if merge.contains(id) {
            continue;
        }
        let label = input.catalog.resolve_label(id, input.unknown_label);
        merge.push(SelectedField::new(id.clone(), label, row.value_str()));
    }
}

/// Keeps the last derived list and decides when to rebuild it.
///
/// With pin mode off, the list is only rebuilt when the catalog or the saved
/// fields change, or when it is empty. Values typed into the form live only in
/// this list until they are saved, so rebuilding on every input change would
/// discard them.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    fields: Vec<SelectedField>,
    fingerprint: Option<blake3::Hash>,
}

impl Reconciler {
    /// Create a reconciler with an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current list.
    #[must_use]
    pub fn fields(&self) -> &[SelectedField] {
        &self.fields
    }

    /// Replace the list after an edit, keeping the fingerprint.
    pub fn replace(&mut self, fields: Vec<SelectedField>) {
        self.fields = fields;
    }

    /// Record the current catalog and saved fields as already reflected in
    /// the list, without rebuilding it.
    pub fn acknowledge(&mut self, catalog: &Catalog, current_fields: &[CurrentField]) {
        self.fingerprint = Some(fingerprint(catalog, current_fields));
    }

    /// Rebuild the list if the inputs call for it.
    ///
    /// Returns `true` if the list was rebuilt.
    pub fn refresh(&mut self, input: &ReconcileInput<'_>) -> bool {
        let fingerprint = fingerprint(input.catalog, input.current_fields);
        let sources_changed = self.fingerprint != Some(fingerprint);

        if input.pin_mode || sources_changed || self.fields.is_empty() {
            self.fields = recompute(input);
            self.fingerprint = Some(fingerprint);
            true
        } else {
            trace!("Catalog and saved fields unchanged, keeping selected fields");
            false
        }
    }
}

/// Content hash of the catalog and the saved fields.
fn fingerprint(catalog: &Catalog, current_fields: &[CurrentField]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(catalog.len() as u64).to_le_bytes());
    for entry in catalog.entries() {
        hash_str(&mut hasher, Some(entry.id.as_str()));
        hash_str(&mut hasher, Some(&entry.name));
    }
    hasher.update(&(current_fields.len() as u64).to_le_bytes());
    for field in current_fields {
        hash_str(&mut hasher, field.custom_field_id.as_ref().map(FieldId::as_str));
        hash_str(&mut hasher, field.id.as_ref().map(FieldId::as_str));
        hash_str(&mut hasher, field.name.as_deref());
        hash_str(&mut hasher, field.value.as_deref());
    }
    hasher.finalize()
}

fn hash_str(hasher: &mut blake3::Hasher, value: Option<&str>) {
    match value {
        None => {
            hasher.update(&[0]);
        }
        Some(s) => {
            hasher.update(&[1]);
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
    }
}

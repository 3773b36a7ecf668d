//! Core field types for fieldpin.
//!
//! This module defines the catalog of definable custom fields and the shapes
//! a field takes while a record is being edited: values saved on the record,
//! live form rows, and the reconciled `SelectedField` list.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label shown for a field whose id has no catalog entry.
pub const UNKNOWN_FIELD_LABEL: &str = "Campo Desconocido";

/// Opaque identifier of a catalog field.
///
/// Accepts either a JSON number or a JSON string on input, since form data
/// produced by older clients carries numeric ids. Always serializes as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawFieldId", into = "String")]
pub struct FieldId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldId {
    Int(i64),
    Text(String),
}

impl From<RawFieldId> for FieldId {
    fn from(raw: RawFieldId) -> Self {
        match raw {
            RawFieldId::Int(n) => Self(n.to_string()),
            RawFieldId::Text(s) => Self(s),
        }
    }
}

impl From<FieldId> for String {
    fn from(id: FieldId) -> Self {
        id.0
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FieldId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for FieldId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl From<u64> for FieldId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl FieldId {
    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Returns `true` when a value is absent or the empty string.
#[must_use]
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

/// A custom field definable on a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCatalogEntry {
    /// Unique identifier within the catalog.
    pub id: FieldId,
    /// Display label.
    pub name: String,
}

impl FieldCatalogEntry {
    /// Create a new catalog entry.
    #[must_use]
    pub fn new(id: impl Into<FieldId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The master list of fields available to attach to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<FieldCatalogEntry>,
}

impl Catalog {
    /// Create a catalog from its entries.
    #[must_use]
    pub fn new(entries: Vec<FieldCatalogEntry>) -> Self {
        Self { entries }
    }

    /// All entries, in catalog order.
    #[must_use]
    pub fn entries(&self) -> &[FieldCatalogEntry] {
        &self.entries
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: &FieldId) -> Option<&FieldCatalogEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Check whether the catalog defines the given id.
    #[must_use]
    pub fn contains(&self, id: &FieldId) -> bool {
        self.get(id).is_some()
    }

    /// Resolve the display label for an id, falling back when it is unknown.
    #[must_use]
    pub fn resolve_label(&self, id: &FieldId, fallback: &str) -> String {
        self.get(id)
            .map_or_else(|| fallback.to_string(), |entry| entry.name.clone())
    }

    /// Add an entry, replacing the name of an existing entry with the same id.
    pub fn upsert(&mut self, entry: FieldCatalogEntry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => existing.name = entry.name,
            None => self.entries.push(entry),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<FieldCatalogEntry>> for Catalog {
    fn from(entries: Vec<FieldCatalogEntry>) -> Self {
        Self::new(entries)
    }
}

/// One field attached to the record being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedField {
    /// Catalog id of the field.
    pub value: FieldId,
    /// Display label, denormalized from the catalog.
    pub label: String,
    /// Current value entered for this field.
    #[serde(default)]
    pub field_value: String,
}

impl SelectedField {
    /// Create a selected field with the given value.
    #[must_use]
    pub fn new(value: FieldId, label: impl Into<String>, field_value: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
            field_value: field_value.into(),
        }
    }

    /// Create a selected field with an empty value.
    #[must_use]
    pub fn blank(value: FieldId, label: impl Into<String>) -> Self {
        Self::new(value, label, String::new())
    }
}

/// A custom field value already saved on the record being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentField {
    /// Catalog id, as written by the records API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_id: Option<FieldId>,
    /// Catalog id, as written by older payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FieldId>,
    /// Label carried by the record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Saved value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl CurrentField {
    /// Create a saved value keyed by `customFieldId`.
    #[must_use]
    pub fn new(id: FieldId, value: impl Into<String>) -> Self {
        Self {
            custom_field_id: Some(id),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Set the label carried by the record.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The field id, preferring `customFieldId` over `id`.
    #[must_use]
    pub fn field_id(&self) -> Option<&FieldId> {
        self.custom_field_id.as_ref().or(self.id.as_ref())
    }

    /// Check whether this entry refers to the given field.
    #[must_use]
    pub fn matches(&self, id: &FieldId) -> bool {
        self.custom_field_id.as_ref() == Some(id) || self.id.as_ref() == Some(id)
    }
}

/// A row in the surrounding form's custom field array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValue {
    /// Field id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FieldId>,
    /// Field id, as written by the records API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_id: Option<FieldId>,
    /// Live value.
    #[serde(default)]
    pub value: Option<String>,
}

impl FormValue {
    /// Create a form row carrying the id under both keys.
    #[must_use]
    pub fn new(id: FieldId, value: impl Into<String>) -> Self {
        Self {
            custom_field_id: Some(id.clone()),
            id: Some(id),
            value: Some(value.into()),
        }
    }

    /// The row's field id, preferring `id` over `customFieldId`.
    #[must_use]
    pub fn field_id(&self) -> Option<&FieldId> {
        self.id.as_ref().or(self.custom_field_id.as_ref())
    }

    /// Check whether this row refers to the given field.
    #[must_use]
    pub fn matches(&self, id: &FieldId) -> bool {
        self.id.as_ref() == Some(id) || self.custom_field_id.as_ref() == Some(id)
    }

    /// The live value, or `""` when absent.
    #[must_use]
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

/// A record as handed to the editor: its saved fields and the live form rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordSnapshot {
    /// Values saved on the record.
    pub current_fields: Vec<CurrentField>,
    /// Rows of the surrounding form.
    pub form_values: Vec<FormValue>,
}

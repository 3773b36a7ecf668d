//! Typed pin set.
//!
//! Pins are user preferences persisted outside the record being edited. There
//! are two independent kinds:
//!
//! - The **list pin** decides which fields appear by default on new records.
//!   It records membership only and never carries values.
//! - An **individual pin** records a default value for one field.
//!
//! Older clients stored both kinds in one flat key-value map, using the keys
//! `customFields_selected` and `customField_<id>`. [`PinSet::from_legacy`] and
//! [`PinSet::to_legacy`] convert between that map and the typed form.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::field::{FieldId, SelectedField};

/// Legacy key of the list pin.
pub const LIST_PIN_KEY: &str = "customFields_selected";

/// Legacy key prefix of individual pins.
pub const FIELD_PIN_PREFIX: &str = "customField_";

fn field_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^customField_(.+)$").expect("static regex is valid"))
}

/// Identifies one pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PinKey {
    /// The list pin.
    List,
    /// The individual pin of one field.
    Field(FieldId),
}

impl PinKey {
    /// Parse a legacy key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPinKey`] if the key follows neither convention.
    pub fn parse(key: &str) -> Result<Self> {
        if key == LIST_PIN_KEY {
            return Ok(Self::List);
        }
        field_key_regex()
            .captures(key)
            .and_then(|caps| caps.get(1))
            .map(|id| Self::Field(FieldId::from(id.as_str())))
            .ok_or_else(|| Error::InvalidPinKey {
                key: key.to_string(),
            })
    }
}

impl fmt::Display for PinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str(LIST_PIN_KEY),
            Self::Field(id) => write!(f, "{FIELD_PIN_PREFIX}{id}"),
        }
    }
}

/// A member of the list pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPinEntry {
    /// Catalog id of the field.
    pub value: FieldId,
    /// Display label at the time of pinning.
    pub label: String,
}

impl ListPinEntry {
    /// Membership snapshot of a selected field. The value is dropped.
    #[must_use]
    pub fn from_selected(field: &SelectedField) -> Self {
        Self {
            value: field.value.clone(),
            label: field.label.clone(),
        }
    }

    /// Expand into a selected field with an empty value.
    #[must_use]
    pub fn to_selected(&self) -> SelectedField {
        SelectedField::blank(self.value.clone(), self.label.clone())
    }
}

/// One mutation of the pin set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinChange {
    /// Create or replace the list pin.
    PinList(Vec<ListPinEntry>),
    /// Create or replace an individual pin.
    PinField(SelectedField),
    /// Remove a pin.
    Unpin(PinKey),
}

impl PinChange {
    /// The key this change affects.
    #[must_use]
    pub fn key(&self) -> PinKey {
        match self {
            Self::PinList(_) => PinKey::List,
            Self::PinField(entry) => PinKey::Field(entry.value.clone()),
            Self::Unpin(key) => key.clone(),
        }
    }
}

/// The complete set of pins for one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSet {
    list: Option<Vec<ListPinEntry>>,
    fields: Vec<SelectedField>,
}

impl PinSet {
    /// Create an empty pin set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Members of the list pin, if it is pinned.
    #[must_use]
    pub fn list_pin(&self) -> Option<&[ListPinEntry]> {
        self.list.as_deref()
    }

    /// Check whether the list pin exists.
    #[must_use]
    pub fn is_list_pinned(&self) -> bool {
        self.list.is_some()
    }

    /// Individual pins in pinning order.
    #[must_use]
    pub fn field_pins(&self) -> &[SelectedField] {
        &self.fields
    }

    /// The individual pin for a field.
    #[must_use]
    pub fn field_pin(&self, id: &FieldId) -> Option<&SelectedField> {
        self.fields.iter().find(|entry| &entry.value == id)
    }

    /// Check whether a field has an individual pin.
    #[must_use]
    pub fn is_field_pinned(&self, id: &FieldId) -> bool {
        self.field_pin(id).is_some()
    }

    /// Check whether there are no pins at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_none() && self.fields.is_empty()
    }

    /// Apply one change.
    ///
    /// Replacing an existing individual pin keeps its position.
    pub fn apply(&mut self, change: &PinChange) {
        match change {
            PinChange::PinList(entries) => self.list = Some(entries.clone()),
            PinChange::PinField(entry) => {
                match self.fields.iter_mut().find(|e| e.value == entry.value) {
                    Some(existing) => *existing = entry.clone(),
                    None => self.fields.push(entry.clone()),
                }
            }
            PinChange::Unpin(PinKey::List) => self.list = None,
            PinChange::Unpin(PinKey::Field(id)) => self.fields.retain(|e| &e.value != id),
        }
    }

    /// The change that puts `key` back the way this set holds it.
    #[must_use]
    pub fn restore(&self, key: &PinKey) -> PinChange {
        match key {
            PinKey::List => match &self.list {
                Some(entries) => PinChange::PinList(entries.clone()),
                None => PinChange::Unpin(PinKey::List),
            },
            PinKey::Field(id) => match self.field_pin(id) {
                Some(entry) => PinChange::PinField(entry.clone()),
                None => PinChange::Unpin(key.clone()),
            },
        }
    }

    /// Import the legacy key-value map.
    ///
    /// Keys that follow neither pin convention are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a pin key holds a value of the wrong shape.
    pub fn from_legacy(map: &Map<String, Value>) -> Result<Self> {
        let mut pins = Self::new();
        for (key, value) in map {
            let Ok(pin_key) = PinKey::parse(key) else {
                debug!(key = %key, "Skipping non-pin key");
                continue;
            };
            match pin_key {
                PinKey::List => {
                    let entries: Vec<SelectedField> = serde_json::from_value(value.clone())
                        .map_err(|e| Error::invalid_pin_value(key, e.to_string()))?;
                    let members = entries.iter().map(ListPinEntry::from_selected).collect();
                    pins.apply(&PinChange::PinList(members));
                }
                PinKey::Field(id) => {
                    let mut entry: SelectedField = serde_json::from_value(value.clone())
                        .map_err(|e| Error::invalid_pin_value(key, e.to_string()))?;
                    if entry.value != id {
                        return Err(Error::invalid_pin_value(
                            key,
                            format!("entry refers to field {}", entry.value),
                        ));
                    }
                    entry.value = id;
                    pins.apply(&PinChange::PinField(entry));
                }
            }
        }
        Ok(pins)
    }

    /// Export to the legacy key-value map.
    ///
    /// List members are written with an empty `fieldValue`.
    #[must_use]
    pub fn to_legacy(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(list) = &self.list {
            let entries: Vec<Value> = list
                .iter()
                .map(|entry| legacy_entry(&entry.to_selected()))
                .collect();
            map.insert(PinKey::List.to_string(), Value::Array(entries));
        }
        for entry in &self.fields {
            map.insert(
                PinKey::Field(entry.value.clone()).to_string(),
                legacy_entry(entry),
            );
        }
        map
    }
}

fn legacy_entry(entry: &SelectedField) -> Value {
    serde_json::json!({
        "value": entry.value,
        "label": entry.label,
        "fieldValue": entry.field_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(n: u64) -> FieldId {
        FieldId::from(n)
    }

    #[test]
    fn test_pin_key_display() {
        assert_eq!(PinKey::List.to_string(), "customFields_selected");
        assert_eq!(PinKey::Field(fid(7)).to_string(), "customField_7");
    }

    #[test]
    fn test_pin_key_parse() {
        assert_eq!(PinKey::parse("customFields_selected").unwrap(), PinKey::List);
        assert_eq!(
            PinKey::parse("customField_abc-1").unwrap(),
            PinKey::Field(FieldId::from("abc-1"))
        );
        assert!(PinKey::parse("customField_").is_err());
        assert!(PinKey::parse("somethingElse").is_err());
    }

    #[test]
    fn test_apply_field_pin_keeps_position() {
        let mut pins = PinSet::new();
        pins.apply(&PinChange::PinField(SelectedField::new(fid(1), "A", "x")));
        pins.apply(&PinChange::PinField(SelectedField::new(fid(2), "B", "y")));
        pins.apply(&PinChange::PinField(SelectedField::new(fid(1), "A", "z")));

        let ids: Vec<_> = pins.field_pins().iter().map(|e| e.value.clone()).collect();
        assert_eq!(ids, vec![fid(1), fid(2)]);
        assert_eq!(pins.field_pin(&fid(1)).unwrap().field_value, "z");
    }

    #[test]
    fn test_apply_unpin() {
        let mut pins = PinSet::new();
        pins.apply(&PinChange::PinList(vec![]));
        pins.apply(&PinChange::PinField(SelectedField::new(fid(1), "A", "x")));
        assert!(pins.is_list_pinned());
        assert!(pins.is_field_pinned(&fid(1)));

        pins.apply(&PinChange::Unpin(PinKey::List));
        pins.apply(&PinChange::Unpin(PinKey::Field(fid(1))));
        assert!(pins.is_empty());
    }

    #[test]
    fn test_empty_list_pin_is_still_pinned() {
        let mut pins = PinSet::new();
        pins.apply(&PinChange::PinList(Vec::new()));
        assert!(pins.is_list_pinned());
        assert_eq!(pins.list_pin().map(<[ListPinEntry]>::len), Some(0));
    }

    #[test]
    fn test_from_legacy_strips_list_values() {
        let map = serde_json::json!({
            "customFields_selected": [
                {"value": 1, "label": "Color", "fieldValue": "Rojo"},
                {"value": 2, "label": "Talla", "fieldValue": ""}
            ],
            "customField_2": {"value": 2, "label": "Talla", "fieldValue": "M"},
            "theme": "dark"
        });
        let pins = PinSet::from_legacy(map.as_object().unwrap()).unwrap();

        let list = pins.list_pin().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].value, fid(1));
        assert_eq!(pins.field_pin(&fid(2)).unwrap().field_value, "M");
        assert_eq!(pins.field_pins().len(), 1);
    }

    #[test]
    fn test_from_legacy_preserves_key_order() {
        let map: Map<String, Value> = serde_json::from_str(
            r#"{
                "customField_9": {"value": 9, "label": "Z", "fieldValue": "a"},
                "customField_1": {"value": 1, "label": "A", "fieldValue": "b"}
            }"#,
        )
        .unwrap();
        let pins = PinSet::from_legacy(&map).unwrap();
        let ids: Vec<_> = pins.field_pins().iter().map(|e| e.value.clone()).collect();
        assert_eq!(ids, vec![fid(9), fid(1)]);
    }

    #[test]
    fn test_from_legacy_rejects_malformed_value() {
        let map = serde_json::json!({"customField_1": "not an object"});
        let err = PinSet::from_legacy(map.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidPinValue { .. }));
    }

    #[test]
    fn test_from_legacy_rejects_mismatched_id() {
        let map = serde_json::json!({
            "customField_1": {"value": 2, "label": "B", "fieldValue": ""}
        });
        assert!(PinSet::from_legacy(map.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_to_legacy() {
        let mut pins = PinSet::new();
        pins.apply(&PinChange::PinList(vec![ListPinEntry {
            value: fid(1),
            label: "Color".to_string(),
        }]));
        pins.apply(&PinChange::PinField(SelectedField::new(fid(1), "Color", "Rojo")));

        let map = pins.to_legacy();
        assert_eq!(
            map["customFields_selected"],
            serde_json::json!([{"value": "1", "label": "Color", "fieldValue": ""}])
        );
        assert_eq!(
            map["customField_1"],
            serde_json::json!({"value": "1", "label": "Color", "fieldValue": "Rojo"})
        );

        let reimported = PinSet::from_legacy(&map).unwrap();
        assert_eq!(reimported, pins);
    }

    #[test]
    fn test_restore_undoes_change() {
        let mut before = PinSet::new();
        before.apply(&PinChange::PinField(SelectedField::new(fid(1), "Color", "Rojo")));

        let changes = [
            PinChange::Unpin(PinKey::Field(fid(1))),
            PinChange::PinList(Vec::new()),
            PinChange::PinField(SelectedField::new(fid(2), "Talla", "M")),
        ];
        let mut after = before.clone();
        for change in &changes {
            after.apply(change);
        }
        for change in changes.iter().rev() {
            after.apply(&before.restore(&change.key()));
        }
        assert_eq!(after, before);
    }

    #[test]
    fn test_change_key() {
        assert_eq!(PinChange::PinList(vec![]).key(), PinKey::List);
        assert_eq!(
            PinChange::PinField(SelectedField::blank(fid(3), "C")).key(),
            PinKey::Field(fid(3))
        );
    }
}

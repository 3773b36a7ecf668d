//! Edit operations on the selected field list.
//!
//! Each operation is a pure function from the current state to an [`Edit`]:
//! the new selected list, the new form rows, and the pin changes that keep
//! the pin set consistent with them. Nothing here performs I/O.

use tracing::warn;

use super::PinToggle;
use crate::error::{Error, Result};
use crate::field::{is_blank, FieldCatalogEntry, FieldId, FormValue, SelectedField};
use crate::pins::{ListPinEntry, PinChange, PinKey, PinSet};

/// The outcome of an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edit {
    /// Selected fields after the edit.
    pub selected: Vec<SelectedField>,
    /// Form rows after the edit.
    pub form_values: Vec<FormValue>,
    /// Pin changes to persist, in order.
    pub pin_changes: Vec<PinChange>,
}

/// Outcome of [`select_field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The field was added.
    Added(Edit),
    /// The field was already selected; nothing changes.
    Duplicate,
}

/// Attach a catalog field to the record.
///
/// Appends a blank selected field and a matching blank form row. If the list
/// pin exists, the field joins it.
#[must_use]
pub fn select_field(
    entry: &FieldCatalogEntry,
    selected: &[SelectedField],
    form_values: &[FormValue],
    pins: &PinSet,
) -> Selection {
    if selected.iter().any(|field| field.value == entry.id) {
        return Selection::Duplicate;
    }

    let field = SelectedField::blank(entry.id.clone(), entry.name.clone());

    let mut pin_changes = Vec::new();
    if let Some(list) = pins.list_pin() {
        if !list.iter().any(|member| member.value == entry.id) {
            let mut members = list.to_vec();
            members.push(ListPinEntry::from_selected(&field));
            pin_changes.push(PinChange::PinList(members));
        }
    }

    let mut new_selected = selected.to_vec();
    new_selected.push(field);
    let mut new_form = form_values.to_vec();
    new_form.push(FormValue::new(entry.id.clone(), ""));

    Selection::Added(Edit {
        selected: new_selected,
        form_values: new_form,
        pin_changes,
    })
}

/// Set the value of the field at `index`.
///
/// Form rows are matched by field id. If no row refers to the field, one is
/// appended. An individual pin on the field follows the new value; the list
/// pin is untouched.
///
/// # Errors
///
/// Returns [`Error::FieldIndex`] if `index` is out of range.
pub fn set_field_value(
    index: usize,
    new_value: &str,
    selected: &[SelectedField],
    form_values: &[FormValue],
    pins: &PinSet,
) -> Result<Edit> {
    let mut new_selected = selected.to_vec();
    let field = new_selected.get_mut(index).ok_or(Error::FieldIndex {
        index,
        len: selected.len(),
    })?;
    field.field_value = new_value.to_string();
    let field = field.clone();

    let mut new_form = form_values.to_vec();
    let mut matched = false;
    for row in new_form.iter_mut().filter(|row| row.matches(&field.value)) {
        row.value = Some(new_value.to_string());
        matched = true;
    }
    if !matched {
        warn!(field_id = %field.value, "No form row for selected field, appending one");
        new_form.push(FormValue::new(field.value.clone(), new_value));
    }

    let pin_changes = if pins.is_field_pinned(&field.value) {
        vec![PinChange::PinField(field)]
    } else {
        Vec::new()
    };

    Ok(Edit {
        selected: new_selected,
        form_values: new_form,
        pin_changes,
    })
}

/// Detach a field from the record.
///
/// Removes the field from the selected list and clears its individual pin and
/// its list pin membership. A form row is removed only if it has a non-empty
/// value and its `customFieldId` (or, lacking one, its `id`) is the removed
/// id. Blank rows always survive.
#[must_use]
pub fn remove_field(
    id: &FieldId,
    selected: &[SelectedField],
    form_values: &[FormValue],
    pins: &PinSet,
) -> Edit {
    let new_selected = selected
        .iter()
        .filter(|field| &field.value != id)
        .cloned()
        .collect();

    let new_form = form_values
        .iter()
        .filter(|row| {
            is_blank(row.value.as_deref())
                || row.custom_field_id.as_ref().or(row.id.as_ref()) != Some(id)
        })
        .cloned()
        .collect();

    let mut pin_changes = Vec::new();
    if pins.is_field_pinned(id) {
        pin_changes.push(PinChange::Unpin(PinKey::Field(id.clone())));
    }
    if let Some(list) = pins.list_pin() {
        if list.iter().any(|member| &member.value == id) {
            let members = list
                .iter()
                .filter(|member| &member.value != id)
                .cloned()
                .collect();
            pin_changes.push(PinChange::PinList(members));
        }
    }

    Edit {
        selected: new_selected,
        form_values: new_form,
        pin_changes,
    }
}

/// Pin or unpin.
///
/// Pinning the list snapshots the membership of `selected`, without values.
/// Pinning a field snapshots its current value.
///
/// # Errors
///
/// Returns [`Error::FieldNotSelected`] when pinning a field that is not in
/// `selected`.
pub fn toggle_pin(toggle: &PinToggle, selected: &[SelectedField], pins: &PinSet) -> Result<PinChange> {
    match toggle {
        PinToggle::List if pins.is_list_pinned() => Ok(PinChange::Unpin(PinKey::List)),
        PinToggle::List => Ok(PinChange::PinList(
            selected.iter().map(ListPinEntry::from_selected).collect(),
        )),
        PinToggle::Field(id) if pins.is_field_pinned(id) => {
            Ok(PinChange::Unpin(PinKey::Field(id.clone())))
        }
        PinToggle::Field(id) => selected
            .iter()
            .find(|field| &field.value == id)
            .map(|field| PinChange::PinField(field.clone()))
            .ok_or_else(|| Error::FieldNotSelected { id: id.clone() }),
    }
}

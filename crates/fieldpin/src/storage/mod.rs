//! Storage layer for fieldpin.
//!
//! This module provides `SQLite`-based persistent storage for the field
//! catalog, pins, and the history of pinned values that feeds suggestions.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::collab::{CreatedField, FieldCreator, PinStore, SuggestionLookup};
use crate::error::{Error, Result};
use crate::field::{Catalog, FieldCatalogEntry, FieldId, SelectedField};
use crate::pins::{ListPinEntry, PinChange, PinKey, PinSet};

/// Metadata key marking that the list pin exists.
const LIST_PIN_ACTIVE_KEY: &str = "list_pin_active";

/// Upper bound on values returned by a single suggestion lookup.
const LOOKUP_LIMIT: usize = 50;

/// Storage engine for the catalog and pins.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Catalog fields with backend-assigned ids
/// - List and individual pins, kept in pinning order
/// - A value history searched for suggestions
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    // === Catalog ===

    /// Load the whole catalog, oldest field first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn catalog(&self) -> Result<Catalog> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM catalog_fields ORDER BY id ASC")?;
        let entries = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                Ok(FieldCatalogEntry::new(id, name))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Catalog::new(entries))
    }

    /// Add a field to the catalog.
    ///
    /// Adding a name that already exists returns the existing entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the database operation fails.
    pub fn add_field(&self, name: &str) -> Result<FieldCatalogEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::field_creation(name, "name must not be empty"));
        }

        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO catalog_fields (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM catalog_fields WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;

        if inserted > 0 {
            info!(id, name, "Added catalog field");
        } else {
            debug!(id, name, "Catalog field already exists");
        }
        Ok(FieldCatalogEntry::new(id, name))
    }

    // === Pins ===

    /// Load every pin in pinning order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn load_pins(&self) -> Result<PinSet> {
        let conn = self.conn()?;
        let mut pins = PinSet::new();

        let active: Option<String> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                [LIST_PIN_ACTIVE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        if active.is_some() {
            let mut stmt = conn
                .prepare("SELECT field_id, label FROM list_pin_entries ORDER BY position ASC")?;
            let entries = stmt
                .query_map([], |row| {
                    let id: String = row.get(0)?;
                    Ok(ListPinEntry {
                        value: FieldId::from(id),
                        label: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            pins.apply(&PinChange::PinList(entries));
        }

        let mut stmt = conn.prepare(
            "SELECT field_id, label, field_value FROM field_pins ORDER BY position ASC",
        )?;
        let fields = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let label: String = row.get(1)?;
                let value: String = row.get(2)?;
                Ok(SelectedField::new(FieldId::from(id), label, value))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for entry in fields {
            pins.apply(&PinChange::PinField(entry));
        }

        Ok(pins)
    }

    /// Create or replace the list pin.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn save_list_pin(&self, entries: &[ListPinEntry]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_list_pin(&tx, entries)?;
        tx.commit()?;
        debug!(members = entries.len(), "Saved list pin");
        Ok(())
    }

    /// Create or replace an individual pin.
    ///
    /// A replaced pin keeps its position. Non-empty values go to the value
    /// history: a new pin adds an entry, and later writes to the same pin
    /// revise that entry instead of adding more.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn save_field_pin(&self, entry: &SelectedField) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_field_pin(&tx, entry, &Utc::now().to_rfc3339())?;
        tx.commit()?;
        debug!(field = %entry.value, "Saved field pin");
        Ok(())
    }

    /// Remove a pin. Returns `true` if a pin was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_pin(&self, key: &PinKey) -> Result<bool> {
        let mut conn = self.conn()?;
        let removed = match key {
            PinKey::List => {
                let tx = conn.transaction()?;
                let removed = clear_list_pin(&tx)?;
                tx.commit()?;
                removed
            }
            PinKey::Field(id) => delete_field_pin(&conn, id)?,
        };
        debug!(%key, removed, "Deleted pin");
        Ok(removed)
    }

    /// Replace every pin with `pins` in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails. Nothing is written
    /// in that case.
    pub fn replace_pins(&self, pins: &PinSet) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        clear_list_pin(&tx)?;
        tx.execute("DELETE FROM field_pins", [])?;

        if let Some(entries) = pins.list_pin() {
            write_list_pin(&tx, entries)?;
        }
        let now = Utc::now().to_rfc3339();
        for entry in pins.field_pins() {
            write_field_pin(&tx, entry, &now)?;
        }

        tx.commit()?;
        info!(
            list_pinned = pins.is_list_pinned(),
            field_pins = pins.field_pins().len(),
            "Replaced pins"
        );
        Ok(())
    }

    /// Import pins from the legacy key-value map, replacing what is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the map holds malformed pins or the write fails.
    pub fn import_legacy(&self, map: &Map<String, Value>) -> Result<PinSet> {
        let pins = PinSet::from_legacy(map)?;
        self.replace_pins(&pins)?;
        Ok(pins)
    }

    /// Export stored pins as the legacy key-value map.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn export_legacy(&self) -> Result<Map<String, Value>> {
        Ok(self.load_pins()?.to_legacy())
    }

    // === Value history ===

    /// Search previously pinned values of a field, most recent first.
    ///
    /// Performs a case-insensitive substring search. `%` and `_` in the
    /// query match literally.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_values(&self, field_id: &FieldId, query: &str, limit: usize) -> Result<Vec<String>> {
        let pattern = format!("%{}%", escape_like(query));
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT value FROM pinned_values
            WHERE field_id = ?1 AND value LIKE ?2 ESCAPE '\'
            GROUP BY value
            ORDER BY MAX(id) DESC
            LIMIT ?3
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let values = stmt
            .query_map(params![field_id.as_str(), pattern, limit_i64], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(values)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;

        let catalog_fields: i64 =
            conn.query_row("SELECT COUNT(*) FROM catalog_fields", [], |row| row.get(0))?;
        let field_pins: i64 =
            conn.query_row("SELECT COUNT(*) FROM field_pins", [], |row| row.get(0))?;
        let pinned_values: i64 =
            conn.query_row("SELECT COUNT(*) FROM pinned_values", [], |row| row.get(0))?;

        let list_active: Option<String> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                [LIST_PIN_ACTIVE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        let list_pin_members = match list_active {
            Some(_) => Some(conn.query_row(
                "SELECT COUNT(*) FROM list_pin_entries",
                [],
                |row| row.get(0),
            )?),
            None => None,
        };

        let newest: Option<String> = conn
            .query_row(
                "SELECT pinned_at FROM field_pins ORDER BY pinned_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let last_pinned_at = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            catalog_fields,
            field_pins,
            list_pin_members,
            pinned_values,
            last_pinned_at,
            db_size_bytes,
        })
    }
}

fn write_list_pin(conn: &Connection, entries: &[ListPinEntry]) -> Result<()> {
    conn.execute("DELETE FROM list_pin_entries", [])?;
    let mut stmt = conn
        .prepare("INSERT INTO list_pin_entries (position, field_id, label) VALUES (?1, ?2, ?3)")?;
    for (position, entry) in entries.iter().enumerate() {
        let position = i64::try_from(position).unwrap_or(i64::MAX);
        stmt.execute(params![position, entry.value.as_str(), entry.label])?;
    }
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, '1')",
        [LIST_PIN_ACTIVE_KEY],
    )?;
    Ok(())
}

fn clear_list_pin(conn: &Connection) -> Result<bool> {
    conn.execute("DELETE FROM list_pin_entries", [])?;
    let removed = conn.execute("DELETE FROM metadata WHERE key = ?1", [LIST_PIN_ACTIVE_KEY])?;
    Ok(removed > 0)
}

fn delete_field_pin(conn: &Connection, id: &FieldId) -> Result<bool> {
    let removed = conn.execute("DELETE FROM field_pins WHERE field_id = ?1", [id.as_str()])?;
    Ok(removed > 0)
}

fn write_field_pin(conn: &Connection, entry: &SelectedField, now: &str) -> Result<()> {
    let previous: Option<String> = conn
        .query_row(
            "SELECT field_value FROM field_pins WHERE field_id = ?1",
            [entry.value.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    conn.execute(
        r"
        INSERT INTO field_pins (field_id, label, field_value, position, pinned_at)
        VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(position), -1) + 1 FROM field_pins), ?4)
        ON CONFLICT(field_id) DO UPDATE SET
            label = excluded.label,
            field_value = excluded.field_value,
            pinned_at = excluded.pinned_at
        ",
        params![entry.value.as_str(), entry.label, entry.field_value, now],
    )?;

    if entry.field_value.is_empty() {
        return Ok(());
    }

    // An edit of a pinned, non-empty value revises that pin's history entry.
    let revised = match previous {
        Some(previous) if !previous.is_empty() => conn.execute(
            r"
            UPDATE pinned_values SET value = ?2, pinned_at = ?3
            WHERE id = (SELECT MAX(id) FROM pinned_values WHERE field_id = ?1)
            ",
            params![entry.value.as_str(), entry.field_value, now],
        )?,
        _ => 0,
    };
    if revised == 0 {
        conn.execute(
            "INSERT INTO pinned_values (field_id, value, pinned_at) VALUES (?1, ?2, ?3)",
            params![entry.value.as_str(), entry.field_value, now],
        )?;
    }
    Ok(())
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl PinStore for Storage {
    fn load(&self) -> Result<PinSet> {
        self.load_pins()
    }

    fn pin_list(&self, entries: &[ListPinEntry]) -> Result<()> {
        self.save_list_pin(entries)
    }

    fn pin_field(&self, entry: &SelectedField) -> Result<()> {
        self.save_field_pin(entry)
    }

    fn unpin(&self, key: &PinKey) -> Result<()> {
        self.delete_pin(key).map(|_| ())
    }

    fn apply_all(&self, changes: &[PinChange]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        for change in changes {
            match change {
                PinChange::PinList(entries) => write_list_pin(&tx, entries)?,
                PinChange::PinField(entry) => write_field_pin(&tx, entry, &now)?,
                PinChange::Unpin(PinKey::List) => {
                    clear_list_pin(&tx)?;
                }
                PinChange::Unpin(PinKey::Field(id)) => {
                    delete_field_pin(&tx, id)?;
                }
            }
        }

        tx.commit()?;
        debug!(changes = changes.len(), "Applied pin changes");
        Ok(())
    }
}

#[async_trait]
impl FieldCreator for Storage {
    async fn create_field(&self, name: &str) -> Result<CreatedField> {
        let entry = self
            .add_field(name)
            .map_err(|e| Error::field_creation(name, e.to_string()))?;
        Ok(CreatedField {
            id: Some(entry.id),
            name: entry.name,
        })
    }
}

#[async_trait]
impl SuggestionLookup for Storage {
    async fn lookup(&self, query: &str, field_id: &FieldId) -> Result<Vec<String>> {
        self.search_values(field_id, query, LOOKUP_LIMIT)
            .map_err(|e| Error::lookup(e.to_string()))
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of catalog fields.
    pub catalog_fields: i64,
    /// Number of individual pins.
    pub field_pins: i64,
    /// Members of the list pin, or `None` when no list pin exists.
    pub list_pin_members: Option<i64>,
    /// Number of recorded pinned values.
    pub pinned_values: i64,
    /// When the most recent individual pin was written.
    pub last_pinned_at: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn fid(n: u64) -> FieldId {
        FieldId::from(n)
    }

    fn list_entry(n: u64, label: &str) -> ListPinEntry {
        ListPinEntry {
            value: fid(n),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_add_field_assigns_ids() {
        let storage = create_test_storage();

        let color = storage.add_field("Color").unwrap();
        let talla = storage.add_field("Talla").unwrap();
        assert_ne!(color.id, talla.id);

        let catalog = storage.catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].name, "Color");
        assert_eq!(catalog.resolve_label(&talla.id, "?"), "Talla");
    }

    #[test]
    fn test_add_field_existing_name() {
        let storage = create_test_storage();

        let first = storage.add_field("Color").unwrap();
        let second = storage.add_field("  Color ").unwrap();
        assert_eq!(first, second);
        assert_eq!(storage.catalog().unwrap().len(), 1);
    }

    #[test]
    fn test_add_field_blank_name() {
        let storage = create_test_storage();
        let err = storage.add_field("   ").unwrap_err();
        assert!(matches!(err, Error::FieldCreation { .. }));
    }

    #[test]
    fn test_load_pins_empty() {
        let storage = create_test_storage();
        let pins = storage.load_pins().unwrap();
        assert!(pins.is_empty());
        assert!(!pins.is_list_pinned());
    }

    #[test]
    fn test_field_pins_keep_order() {
        let storage = create_test_storage();

        storage
            .save_field_pin(&SelectedField::new(fid(2), "Talla", "M"))
            .unwrap();
        storage
            .save_field_pin(&SelectedField::new(fid(1), "Color", "Rojo"))
            .unwrap();
        storage
            .save_field_pin(&SelectedField::new(fid(2), "Talla", "L"))
            .unwrap();

        let pins = storage.load_pins().unwrap();
        let ids: Vec<_> = pins.field_pins().iter().map(|e| e.value.clone()).collect();
        assert_eq!(ids, vec![fid(2), fid(1)]);
        assert_eq!(pins.field_pin(&fid(2)).unwrap().field_value, "L");
    }

    #[test]
    fn test_empty_list_pin_survives() {
        let storage = create_test_storage();

        storage.save_list_pin(&[]).unwrap();
        let pins = storage.load_pins().unwrap();
        assert!(pins.is_list_pinned());
        assert_eq!(pins.list_pin(), Some(&[][..]));
    }

    #[test]
    fn test_list_pin_replace() {
        let storage = create_test_storage();

        storage
            .save_list_pin(&[list_entry(1, "Color"), list_entry(2, "Talla")])
            .unwrap();
        storage.save_list_pin(&[list_entry(3, "Serie")]).unwrap();

        let pins = storage.load_pins().unwrap();
        assert_eq!(pins.list_pin().unwrap(), &[list_entry(3, "Serie")]);
    }

    #[test]
    fn test_delete_pin() {
        let storage = create_test_storage();

        storage.save_list_pin(&[list_entry(1, "Color")]).unwrap();
        storage
            .save_field_pin(&SelectedField::new(fid(1), "Color", "Rojo"))
            .unwrap();

        assert!(storage.delete_pin(&PinKey::List).unwrap());
        assert!(!storage.delete_pin(&PinKey::List).unwrap());
        assert!(storage.delete_pin(&PinKey::Field(fid(1))).unwrap());
        assert!(!storage.delete_pin(&PinKey::Field(fid(1))).unwrap());

        assert!(storage.load_pins().unwrap().is_empty());
    }

    #[test]
    fn test_pin_store_apply() {
        let storage = create_test_storage();
        let store: &dyn PinStore = &storage;

        store
            .apply(&PinChange::PinField(SelectedField::new(fid(1), "Color", "Rojo")))
            .unwrap();
        store
            .apply(&PinChange::PinList(vec![list_entry(1, "Color")]))
            .unwrap();
        store.apply(&PinChange::Unpin(PinKey::Field(fid(1)))).unwrap();

        let pins = store.load().unwrap();
        assert!(pins.is_list_pinned());
        assert!(!pins.is_field_pinned(&fid(1)));
    }

    #[test]
    fn test_legacy_round_trip() {
        let storage = create_test_storage();
        let legacy = serde_json::json!({
            "customFields_selected": [
                {"value": 1, "label": "Color", "fieldValue": "Rojo"},
                {"value": 2, "label": "Talla", "fieldValue": ""}
            ],
            "customField_3": {"value": 3, "label": "Serie", "fieldValue": "A-1"},
            "theme": "dark"
        });
        let Value::Object(map) = legacy else {
            panic!("expected object");
        };

        let imported = storage.import_legacy(&map).unwrap();
        assert_eq!(storage.load_pins().unwrap(), imported);

        let exported = storage.export_legacy().unwrap();
        assert!(exported.contains_key("customFields_selected"));
        assert!(exported.contains_key("customField_3"));
        assert!(!exported.contains_key("theme"));
        assert_eq!(exported["customFields_selected"][0]["fieldValue"], "");
    }

    #[test]
    fn test_import_legacy_replaces_pins() {
        let storage = create_test_storage();
        storage
            .save_field_pin(&SelectedField::new(fid(9), "Lote", "X"))
            .unwrap();

        storage.import_legacy(&Map::new()).unwrap();
        assert!(storage.load_pins().unwrap().is_empty());
    }

    #[test]
    fn test_import_legacy_malformed_keeps_pins() {
        let storage = create_test_storage();
        storage
            .save_field_pin(&SelectedField::new(fid(9), "Lote", "X"))
            .unwrap();

        let mut map = Map::new();
        map.insert("customField_1".to_string(), Value::from("not an entry"));
        assert!(storage.import_legacy(&map).is_err());
        assert!(storage.load_pins().unwrap().is_field_pinned(&fid(9)));
    }

    #[test]
    fn test_search_values() {
        let storage = create_test_storage();

        for value in ["Rojo", "Rosa", "Azul", "Rojo"] {
            storage
                .save_field_pin(&SelectedField::new(fid(1), "Color", value))
                .unwrap();
            storage.delete_pin(&PinKey::Field(fid(1))).unwrap();
        }
        storage
            .save_field_pin(&SelectedField::new(fid(2), "Talla", "Roja"))
            .unwrap();

        let values = storage.search_values(&fid(1), "ro", 10).unwrap();
        assert_eq!(values, vec!["Rojo".to_string(), "Rosa".to_string()]);

        let values = storage.search_values(&fid(1), "", 1).unwrap();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_repinning_revises_history_entry() {
        let storage = create_test_storage();
        for typed in ["R", "Ro", "Roj", "Rojo"] {
            storage
                .save_field_pin(&SelectedField::new(fid(1), "Color", typed))
                .unwrap();
        }

        assert_eq!(storage.search_values(&fid(1), "R", 10).unwrap(), vec!["Rojo"]);
        assert_eq!(storage.stats().unwrap().pinned_values, 1);
    }

    #[test]
    fn test_history_survives_cleared_value() {
        let storage = create_test_storage();
        for typed in ["Rojo", "", "Azul"] {
            storage
                .save_field_pin(&SelectedField::new(fid(1), "Color", typed))
                .unwrap();
        }

        let values = storage.search_values(&fid(1), "", 10).unwrap();
        assert_eq!(values, vec!["Azul", "Rojo"]);
    }

    #[test]
    fn test_search_values_matches_wildcards_literally() {
        let storage = create_test_storage();
        for value in ["100%", "Rojo", "a_b", "axb"] {
            storage
                .save_field_pin(&SelectedField::new(fid(1), "Color", value))
                .unwrap();
            storage.delete_pin(&PinKey::Field(fid(1))).unwrap();
        }

        assert_eq!(storage.search_values(&fid(1), "%", 10).unwrap(), vec!["100%"]);
        assert_eq!(storage.search_values(&fid(1), "_", 10).unwrap(), vec!["a_b"]);
        assert!(storage.search_values(&fid(1), "\\", 10).unwrap().is_empty());
    }

    #[test]
    fn test_apply_all_in_one_transaction() {
        let storage = create_test_storage();
        storage.save_list_pin(&[list_entry(1, "Color")]).unwrap();
        storage
            .save_field_pin(&SelectedField::new(fid(1), "Color", "Rojo"))
            .unwrap();

        let store: &dyn PinStore = &storage;
        store
            .apply_all(&[
                PinChange::Unpin(PinKey::Field(fid(1))),
                PinChange::PinList(Vec::new()),
                PinChange::PinField(SelectedField::new(fid(2), "Talla", "M")),
            ])
            .unwrap();

        let pins = storage.load_pins().unwrap();
        assert!(!pins.is_field_pinned(&fid(1)));
        assert_eq!(pins.list_pin().map(<[ListPinEntry]>::len), Some(0));
        assert_eq!(pins.field_pin(&fid(2)).unwrap().field_value, "M");
    }

    #[test]
    fn test_blank_values_not_recorded() {
        let storage = create_test_storage();
        storage
            .save_field_pin(&SelectedField::blank(fid(1), "Color"))
            .unwrap();
        assert!(storage.search_values(&fid(1), "", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_field_creator() {
        let storage = create_test_storage();

        let created = storage.create_field("Serie").await.unwrap();
        let entry = created.into_entry().unwrap();
        assert!(storage.catalog().unwrap().contains(&entry.id));

        let err = storage.create_field("").await.unwrap_err();
        assert!(matches!(err, Error::FieldCreation { .. }));
    }

    #[tokio::test]
    async fn test_suggestion_lookup() {
        let storage = create_test_storage();
        storage
            .save_field_pin(&SelectedField::new(fid(1), "Color", "Rojo"))
            .unwrap();

        let values = storage.lookup("oj", &fid(1)).await.unwrap();
        assert_eq!(values, vec!["Rojo".to_string()]);
        assert!(storage.lookup("oj", &fid(2)).await.unwrap().is_empty());
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.catalog_fields, 0);
        assert_eq!(stats.field_pins, 0);
        assert!(stats.list_pin_members.is_none());
        assert!(stats.last_pinned_at.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let storage = create_test_storage();
        storage.add_field("Color").unwrap();
        storage.save_list_pin(&[list_entry(1, "Color")]).unwrap();
        storage
            .save_field_pin(&SelectedField::new(fid(1), "Color", "Rojo"))
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.catalog_fields, 1);
        assert_eq!(stats.field_pins, 1);
        assert_eq!(stats.list_pin_members, Some(1));
        assert_eq!(stats.pinned_values, 1);
        assert!(stats.last_pinned_at.is_some());
    }

    #[test]
    fn test_open_file_based() {
        let db_path =
            std::env::temp_dir().join(format!("fieldpin_test_{}.db", std::process::id()));

        let storage = Storage::open(&db_path).unwrap();
        storage
            .save_field_pin(&SelectedField::new(fid(1), "Color", "Rojo"))
            .unwrap();
        assert_eq!(storage.path(), db_path);
        drop(storage);

        let reopened = Storage::open(&db_path).unwrap();
        assert!(reopened.load_pins().unwrap().is_field_pinned(&fid(1)));
        assert!(reopened.stats().unwrap().db_size_bytes > 0);

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let nested_path = std::env::temp_dir().join(format!(
            "fieldpin_test_{}/nested/pins.db",
            std::process::id()
        ));

        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent.parent().unwrap());
        }
    }
}

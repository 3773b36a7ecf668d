//! `SQLite` schema definitions for fieldpin.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the catalog table.
pub const CREATE_CATALOG_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS catalog_fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the individual pin table.
pub const CREATE_FIELD_PINS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS field_pins (
    field_id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    field_value TEXT NOT NULL,
    position INTEGER NOT NULL,
    pinned_at TEXT NOT NULL
)
";

/// SQL statement to create the list pin member table.
///
/// Whether the list pin exists at all is recorded in `metadata`, so an empty
/// list pin survives a round trip.
pub const CREATE_LIST_PIN_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS list_pin_entries (
    position INTEGER PRIMARY KEY,
    field_id TEXT NOT NULL,
    label TEXT NOT NULL
)
";

/// SQL statement to create the history of pinned values.
pub const CREATE_PINNED_VALUES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS pinned_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    field_id TEXT NOT NULL,
    value TEXT NOT NULL,
    pinned_at TEXT NOT NULL
)
";

/// SQL statement to create an index on pinned values for suggestion lookups.
pub const CREATE_PINNED_VALUES_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_pinned_values_field ON pinned_values(field_id, value)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_CATALOG_TABLE,
    CREATE_FIELD_PINS_TABLE,
    CREATE_LIST_PIN_TABLE,
    CREATE_PINNED_VALUES_TABLE,
    CREATE_PINNED_VALUES_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_catalog_names_are_unique() {
        assert!(CREATE_CATALOG_TABLE.contains("name TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_field_pins_keyed_by_field() {
        assert!(CREATE_FIELD_PINS_TABLE.contains("field_id TEXT PRIMARY KEY"));
        assert!(CREATE_FIELD_PINS_TABLE.contains("position INTEGER NOT NULL"));
    }
}

//! In-memory shape of the on-disk document.
//!
//! # Responsibility
//! - Mirror the `[{ "table": ..., "data": [...] }, ...]` file format.
//! - Guard table-name uniqueness on every structural change.
//!
//! # Invariants
//! - `tables` keeps file order; new tables are appended.
//! - No two entries share a name once a document passed `check_unique`.

use super::{DbError, DbResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Full document: every table in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    tables: Vec<TableEntry>,
}

/// One table: its name and raw record objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    #[serde(rename = "table")]
    pub name: String,
    /// `null` or a missing `data` key reads as an empty table.
    #[serde(rename = "data", default, deserialize_with = "null_as_empty")]
    pub records: Vec<Value>,
}

impl TableEntry {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> &[TableEntry] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table(&self, name: &str) -> Option<&TableEntry> {
        self.tables.iter().find(|entry| entry.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableEntry> {
        self.tables.iter_mut().find(|entry| entry.name == name)
    }

    /// Appends a new table entry.
    ///
    /// # Errors
    /// - `DbError::DuplicateTable` when an entry with the same name exists.
    pub fn push_table(&mut self, entry: TableEntry) -> DbResult<()> {
        if self.contains_table(&entry.name) {
            return Err(DbError::DuplicateTable(entry.name));
        }
        self.tables.push(entry);
        Ok(())
    }

    /// Rejects documents that carry the same table name twice.
    pub fn check_unique(&self) -> DbResult<()> {
        let mut seen = HashSet::with_capacity(self.tables.len());
        for entry in &self.tables {
            if !seen.insert(entry.name.as_str()) {
                return Err(DbError::DuplicateTable(entry.name.clone()));
            }
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

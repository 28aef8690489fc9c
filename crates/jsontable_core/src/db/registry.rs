//! Explicit table registration and startup bootstrap.
//!
//! # Responsibility
//! - Hold the list of tables an application knows about.
//! - Create empty entries for registered tables missing from the document.
//!
//! # Invariants
//! - Names are registered once; repeated registration is a no-op.
//! - Bootstrap never touches existing entries or their records.

use super::document::TableEntry;
use super::store::DocumentStore;
use super::table::validate_table_name;
use super::DbResult;
use crate::model::record::Record;
use log::info;

/// Ordered set of known table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRegistry {
    names: Vec<String>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the table of entity type `E`.
    pub fn register<E: Record>(&mut self) -> DbResult<&mut Self> {
        self.register_name(E::table_name())
    }

    /// Registers a table by name.
    ///
    /// # Errors
    /// - `DbError::InvalidTableName` when `name` is not a valid table name.
    pub fn register_name(&mut self, name: impl Into<String>) -> DbResult<&mut Self> {
        let name = validate_table_name(name.into())?;
        if !self.contains(&name) {
            self.names.push(name);
        }
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|known| known == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Appends an empty entry for every registered table the document lacks.
    ///
    /// Returns the names that were added, in registration order. The file is
    /// created when absent, even with nothing registered.
    pub fn ensure_tables(&self, store: &DocumentStore) -> DbResult<Vec<String>> {
        let added = store.update_or_create(|document| {
            let mut added = Vec::new();
            for name in &self.names {
                if !document.contains_table(name) {
                    document.push_table(TableEntry::empty(name.as_str()))?;
                    added.push(name.clone());
                }
            }
            DbResult::Ok(added)
        })?;

        info!(
            "event=tables_ensure module=db status=ok registered={} added={}",
            self.names.len(),
            added.len()
        );
        Ok(added)
    }
}

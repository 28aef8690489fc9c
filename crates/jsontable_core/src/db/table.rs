//! Typed view of one table inside a document.
//!
//! # Responsibility
//! - Decode a table's raw record array into entity values.
//! - Encode entity values back into the table's entry.
//!
//! # Invariants
//! - Record ids are validated before the document is touched.
//! - An unknown table is reported as `TableLookup::Unknown`, never as empty.

use super::document::{Document, TableEntry};
use super::{DbError, DbResult};
use crate::model::record::{validate_ids, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::marker::PhantomData;

static TABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid table name regex"));

/// Result of looking a table up in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum TableLookup<E> {
    /// No entry with this name exists.
    Unknown,
    /// The entry exists; it may hold zero records.
    Present(Vec<E>),
}

impl<E> TableLookup<E> {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Collapses `Unknown` into an empty list.
    pub fn into_records(self) -> Vec<E> {
        match self {
            Self::Unknown => Vec::new(),
            Self::Present(records) => records,
        }
    }
}

/// Accessor for the table holding records of type `E`.
#[derive(Debug, Clone)]
pub struct TableAccessor<E> {
    name: String,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Record> TableAccessor<E> {
    /// Binds to `E::table_name()`.
    ///
    /// # Errors
    /// - `DbError::InvalidTableName` when the derived name is not usable.
    pub fn new() -> DbResult<Self> {
        Self::with_name(E::table_name())
    }

    /// Binds to an explicit table name.
    pub fn with_name(name: impl Into<String>) -> DbResult<Self> {
        let name = validate_table_name(name.into())?;
        Ok(Self {
            name,
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decodes this table's records out of `document`.
    pub fn extract_table(&self, document: &Document) -> DbResult<TableLookup<E>> {
        let Some(entry) = document.table(&self.name) else {
            return Ok(TableLookup::Unknown);
        };

        let records = entry
            .records
            .iter()
            .map(|raw| E::deserialize(raw))
            .collect::<Result<Vec<E>, _>>()
            .map_err(|source| DbError::Decode {
                table: self.name.clone(),
                source,
            })?;
        Ok(TableLookup::Present(records))
    }

    /// Writes `records` into this table's entry.
    ///
    /// With `is_new == false` the existing entry's records are overwritten;
    /// with `is_new == true` a new entry is appended.
    ///
    /// # Errors
    /// - `DbError::Validation` when any record has no id; `document` is untouched.
    /// - `DbError::UnknownTable` when overwriting an entry that does not exist.
    /// - `DbError::DuplicateTable` when appending an entry that already exists.
    pub fn replace_table(
        &self,
        document: &mut Document,
        records: &[E],
        is_new: bool,
    ) -> DbResult<()> {
        validate_ids(&self.name, records)?;
        let encoded = self.encode(records)?;

        if is_new {
            return document.push_table(TableEntry {
                name: self.name.clone(),
                records: encoded,
            });
        }

        match document.table_mut(&self.name) {
            Some(entry) => {
                entry.records = encoded;
                Ok(())
            }
            None => Err(DbError::UnknownTable(self.name.clone())),
        }
    }

    /// Overwrites the table, creating its entry when missing.
    pub fn upsert_table(&self, document: &mut Document, records: &[E]) -> DbResult<()> {
        let is_new = !document.contains_table(&self.name);
        self.replace_table(document, records, is_new)
    }

    fn encode(&self, records: &[E]) -> DbResult<Vec<Value>> {
        records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|source| DbError::Encode {
                table: self.name.clone(),
                source,
            })
    }
}

pub(crate) fn validate_table_name(name: String) -> DbResult<String> {
    if TABLE_NAME_RE.is_match(&name) {
        Ok(name)
    } else {
        Err(DbError::InvalidTableName(name))
    }
}

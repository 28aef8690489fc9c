//! Record repository contract and JSON-table implementation.
//!
//! # Responsibility
//! - Provide insert-or-update, point lookup, full listing and delete for one
//!   entity type.
//! - Assign ids to new records and remember the last id mutated.
//!
//! # Invariants
//! - Ids are random v4 UUIDs assigned on first save.
//! - A save or delete either persists the whole table or nothing.
//! - More than one record with the same id is reported, never hidden.

use crate::db::{DbError, DocumentStore, TableAccessor, TableLookup};
use crate::model::record::{Record, RecordId, RecordValidationError};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and lookup.
#[derive(Debug)]
pub enum RepoError {
    Validation(RecordValidationError),
    Db(DbError),
    DuplicateId {
        table: String,
        id: RecordId,
        count: usize,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateId { table, id, count } => {
                write!(f, "table `{table}` holds {count} records with id {id}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::DuplicateId { .. } => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Validation(err) => Self::Validation(err),
            other => Self::Db(other),
        }
    }
}

/// Repository interface for record CRUD operations.
pub trait Repository<E: Record> {
    /// Inserts `entity`, or replaces the stored record with the same id.
    ///
    /// An entity without an id gets a fresh one, written back into `entity`
    /// once the save succeeded.
    fn save(&self, entity: &mut E) -> RepoResult<RecordId>;
    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<E>>;
    fn get_all(&self) -> RepoResult<Vec<E>>;
    /// Returns whether a record was removed.
    fn delete_by_id(&self, id: RecordId) -> RepoResult<bool>;
}

/// Repository storing `E` in its table of a shared `DocumentStore`.
pub struct JsonRepository<'store, E> {
    store: &'store DocumentStore,
    table: TableAccessor<E>,
}

impl<'store, E: Record> JsonRepository<'store, E> {
    /// Binds to the table named by `E::table_name()`.
    pub fn try_new(store: &'store DocumentStore) -> RepoResult<Self> {
        Ok(Self {
            store,
            table: TableAccessor::new()?,
        })
    }

    /// Binds to an explicit table name.
    pub fn with_table(store: &'store DocumentStore, table: &str) -> RepoResult<Self> {
        Ok(Self {
            store,
            table: TableAccessor::with_name(table)?,
        })
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    /// Loads the table, keeping "unknown" apart from "empty".
    pub fn load_table(&self) -> RepoResult<TableLookup<E>> {
        let document = self.store.load_document()?;
        Ok(self.table.extract_table(&document)?)
    }

    pub fn count(&self) -> RepoResult<usize> {
        Ok(self.get_all()?.len())
    }

    pub fn exists(&self, id: RecordId) -> RepoResult<bool> {
        Ok(self.get_by_id(id)?.is_some())
    }

    /// Overwrites the whole table with `records`, creating it when unknown.
    ///
    /// # Errors
    /// - `RepoError::Validation` when any record has no id; the file is
    ///   left unchanged.
    pub fn replace_all(&self, records: &[E]) -> RepoResult<()> {
        let result = self
            .store
            .update(|document| self.table.upsert_table(document, records));
        if let Err(err) = &result {
            warn!(
                "event=table_replace module=repo status=error table={} error={}",
                self.table.name(),
                err
            );
        }
        result?;

        debug!(
            "event=table_replace module=repo status=ok table={} records={}",
            self.table.name(),
            records.len()
        );
        Ok(())
    }

    fn save_inner(&self, record: &E, id: RecordId) -> RepoResult<bool> {
        self.store.update(|document| {
            let lookup = self.table.extract_table(document)?;
            let is_new = lookup.is_unknown();
            let mut records = lookup.into_records();

            let matches = records
                .iter()
                .filter(|existing| existing.id() == Some(id))
                .count();
            if matches > 1 {
                return Err(RepoError::DuplicateId {
                    table: self.table.name().to_string(),
                    id,
                    count: matches,
                });
            }

            let updated = match records.iter().position(|existing| existing.id() == Some(id)) {
                Some(index) => {
                    records[index] = record.clone();
                    true
                }
                None => {
                    records.push(record.clone());
                    false
                }
            };

            self.table.replace_table(document, &records, is_new)?;
            Ok(updated)
        })
    }
}

impl<E: Record> Repository<E> for JsonRepository<'_, E> {
    fn save(&self, entity: &mut E) -> RepoResult<RecordId> {
        let id = entity.id().unwrap_or_else(Uuid::new_v4);
        let mut record = entity.clone();
        record.set_id(id);

        let updated = match self.save_inner(&record, id) {
            Ok(updated) => updated,
            Err(err) => {
                warn!(
                    "event=record_save module=repo status=error table={} id={} error={}",
                    self.table.name(),
                    id,
                    err
                );
                return Err(err);
            }
        };

        if entity.id().is_none() {
            entity.set_id(id);
        }
        self.store.record_operated_id(id);

        debug!(
            "event=record_save module=repo status=ok table={} id={} action={}",
            self.table.name(),
            id,
            if updated { "update" } else { "insert" }
        );
        Ok(id)
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<E>> {
        let mut matches: Vec<E> = self
            .get_all()?
            .into_iter()
            .filter(|record| record.id() == Some(id))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(RepoError::DuplicateId {
                table: self.table.name().to_string(),
                id,
                count,
            }),
        }
    }

    fn get_all(&self) -> RepoResult<Vec<E>> {
        Ok(self.load_table()?.into_records())
    }

    fn delete_by_id(&self, id: RecordId) -> RepoResult<bool> {
        let result = self.store.update(|document| {
            let mut records = match self.table.extract_table(document)? {
                TableLookup::Unknown => return RepoResult::Ok(false),
                TableLookup::Present(records) => records,
            };

            let before = records.len();
            records.retain(|record| record.id() != Some(id));
            if records.len() == before {
                return Ok(false);
            }

            self.table.replace_table(document, &records, false)?;
            Ok(true)
        });

        let removed = match result {
            Ok(removed) => removed,
            Err(err) => {
                warn!(
                    "event=record_delete module=repo status=error table={} id={} error={}",
                    self.table.name(),
                    id,
                    err
                );
                return Err(err);
            }
        };

        if removed {
            self.store.record_operated_id(id);
        }
        debug!(
            "event=record_delete module=repo status=ok table={} id={} removed={}",
            self.table.name(),
            id,
            removed
        );
        Ok(removed)
    }
}

//! File-backed record store: one JSON document, many typed tables.
//! This crate owns the document format and the record CRUD protocol.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{
    DbError, DbResult, Document, DocumentStore, StoreOptions, TableAccessor, TableEntry,
    TableLookup, TableRegistry,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::record::{validate_ids, Record, RecordId, RecordValidationError};
pub use repo::record_repo::{JsonRepository, RepoError, RepoResult, Repository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

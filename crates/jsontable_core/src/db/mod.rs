//! JSON document persistence: store, table accessor and table registry.
//!
//! # Responsibility
//! - Own the single JSON file holding every table.
//! - Map one entity type onto one table entry of that file.
//! - Bootstrap known tables when a store is opened.
//!
//! # Invariants
//! - Table names are unique within a document.
//! - Every write replaces the whole file atomically (temp file + rename).
//! - Failures are returned as `DbError`, never swallowed.

use crate::model::record::RecordValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod document;
pub mod registry;
mod store;
pub mod table;

pub use document::{Document, TableEntry};
pub use registry::TableRegistry;
pub use store::{DocumentStore, StoreOptions};
pub use table::{TableAccessor, TableLookup};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    EncodeDocument {
        path: PathBuf,
        source: serde_json::Error,
    },
    Encode {
        table: String,
        source: serde_json::Error,
    },
    Decode {
        table: String,
        source: serde_json::Error,
    },
    DuplicateTable(String),
    UnknownTable(String),
    InvalidTableName(String),
    InvalidPath(PathBuf),
    Validation(RecordValidationError),
    LockPoisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "document `{}` is not valid: {source}", path.display())
            }
            Self::EncodeDocument { path, source } => {
                write!(f, "failed to encode document `{}`: {source}", path.display())
            }
            Self::Encode { table, source } => {
                write!(f, "failed to encode records for table `{table}`: {source}")
            }
            Self::Decode { table, source } => {
                write!(f, "failed to decode records of table `{table}`: {source}")
            }
            Self::DuplicateTable(name) => write!(f, "table `{name}` appears more than once"),
            Self::UnknownTable(name) => write!(f, "table `{name}` does not exist"),
            Self::InvalidTableName(name) => write!(
                f,
                "invalid table name `{name}`; expected lowercase letters, digits or `_`"
            ),
            Self::InvalidPath(path) => write!(f, "invalid document path `{}`", path.display()),
            Self::Validation(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "document write lock is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::EncodeDocument { source, .. } => Some(source),
            Self::Encode { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
            Self::DuplicateTable(_)
            | Self::UnknownTable(_)
            | Self::InvalidTableName(_)
            | Self::InvalidPath(_)
            | Self::LockPoisoned => None,
        }
    }
}

impl From<RecordValidationError> for DbError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

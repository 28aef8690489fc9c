//! File-backed document store.
//!
//! # Responsibility
//! - Read the whole document from disk and write it back in full.
//! - Serialize read-modify-write cycles on one file behind a per-file lock
//!   shared by every handle in the process.
//! - Track the last record id mutated through this store.
//!
//! # Invariants
//! - Writes land in a uniquely named sibling temp file that is persisted
//!   over the target.
//! - A failed `update` closure leaves the file untouched.
//! - Absent and blank files read as "no document"; unreadable or malformed
//!   files are errors.
//!
//! # See also
//! - `db::table` for per-table views over a loaded `Document`.

use super::document::Document;
use super::registry::TableRegistry;
use super::{DbError, DbResult};
use crate::model::record::RecordId;
use log::{debug, error, info};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Write locks keyed by canonical document path.
static FILE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Options accepted when opening a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Location of the JSON document.
    pub path: PathBuf,
    /// Write indented JSON instead of a single line.
    pub pretty: bool,
}

impl StoreOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: false,
        }
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// Handle on one JSON document file.
///
/// Open once at startup and lend it to every repository; all of them share
/// the last-operated id. Handles opened on the same file share one write lock.
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    dir: PathBuf,
    pretty: bool,
    write_lock: Arc<Mutex<()>>,
    last_operated_id: Mutex<Option<RecordId>>,
}

impl DocumentStore {
    /// Opens a store over `options.path` without touching table entries.
    ///
    /// # Side effects
    /// - Creates the parent directory when missing.
    ///
    /// # Errors
    /// - `DbError::InvalidPath` when the path is empty or names a directory.
    /// - `DbError::Io` when the parent directory cannot be created.
    pub fn open(options: StoreOptions) -> DbResult<Self> {
        let path = options.path;
        if path.as_os_str().is_empty() || path.is_dir() {
            error!(
                "event=store_open module=db status=error error_code=invalid_path path={}",
                path.display()
            );
            return Err(DbError::InvalidPath(path));
        }

        let Some(file_name) = path.file_name().map(|name| name.to_os_string()) else {
            return Err(DbError::InvalidPath(path));
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|source| DbError::Io {
            path: parent.clone(),
            source,
        })?;
        let dir = fs::canonicalize(&parent).map_err(|source| DbError::Io {
            path: parent.clone(),
            source,
        })?;
        let write_lock = file_lock(dir.join(file_name));

        info!(
            "event=store_open module=db status=ok path={} pretty={}",
            path.display(),
            options.pretty
        );

        Ok(Self {
            path,
            dir,
            pretty: options.pretty,
            write_lock,
            last_operated_id: Mutex::new(None),
        })
    }

    /// Opens a store and makes sure every registered table has an entry.
    ///
    /// The document file exists after this call returns `Ok`.
    pub fn open_with_registry(options: StoreOptions, registry: &TableRegistry) -> DbResult<Self> {
        let store = Self::open(options)?;
        registry.ensure_tables(&store)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the whole document.
    ///
    /// Returns `Ok(None)` when the file does not exist or is blank.
    ///
    /// # Errors
    /// - `DbError::Io` when the file cannot be read.
    /// - `DbError::Parse` when the content is not a table document.
    /// - `DbError::DuplicateTable` when a table name repeats.
    pub fn read_document(&self) -> DbResult<Option<Document>> {
        let started_at = Instant::now();
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(
                    "event=document_read module=db status=ok state=absent path={}",
                    self.path.display()
                );
                return Ok(None);
            }
            Err(source) => {
                error!(
                    "event=document_read module=db status=error error_code=io path={} error={}",
                    self.path.display(),
                    source
                );
                return Err(DbError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!(
                "event=document_read module=db status=ok state=blank path={}",
                self.path.display()
            );
            return Ok(None);
        }

        let document: Document = serde_json::from_slice(&bytes).map_err(|source| {
            error!(
                "event=document_read module=db status=error error_code=parse path={} error={}",
                self.path.display(),
                source
            );
            DbError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        document.check_unique()?;

        debug!(
            "event=document_read module=db status=ok state=loaded tables={} bytes={} duration_ms={}",
            document.tables().len(),
            bytes.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Some(document))
    }

    /// Like `read_document`, with "no document" read as an empty one.
    pub fn load_document(&self) -> DbResult<Document> {
        Ok(self.read_document()?.unwrap_or_default())
    }

    /// Replaces the file with `document`.
    ///
    /// # Errors
    /// - `DbError::DuplicateTable` when `document` repeats a table name.
    /// - `DbError::EncodeDocument` when the document cannot be serialized.
    /// - `DbError::Io` when the temp file cannot be written or persisted.
    pub fn write_document(&self, document: &Document) -> DbResult<()> {
        document.check_unique()?;

        let started_at = Instant::now();
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(document)
        } else {
            serde_json::to_vec(document)
        }
        .map_err(|source| DbError::EncodeDocument {
            path: self.path.clone(),
            source,
        })?;

        if let Err(err) = self.persist(&bytes) {
            error!(
                "event=document_write module=db status=error error_code=io path={} error={}",
                self.path.display(),
                err
            );
            return Err(err);
        }

        debug!(
            "event=document_write module=db status=ok tables={} bytes={} duration_ms={}",
            document.tables().len(),
            bytes.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Runs one read-modify-write cycle under the store lock.
    ///
    /// The document is written back only when `mutate` succeeds and changed
    /// it. Errors from `mutate` are returned as-is.
    pub fn update<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: From<DbError>,
    {
        self.cycle(mutate, false)
    }

    /// Like `update`, but also writes when no file exists yet.
    pub(crate) fn update_or_create<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: From<DbError>,
    {
        self.cycle(mutate, true)
    }

    fn cycle<T, E, F>(&self, mutate: F, create: bool) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: From<DbError>,
    {
        let _guard = self.write_lock.lock().map_err(|_| DbError::LockPoisoned)?;

        let original = self.read_document()?;
        let absent = original.is_none();
        let original = original.unwrap_or_default();
        let mut document = original.clone();

        let value = mutate(&mut document)?;

        if document != original || (create && absent) {
            self.write_document(&document)?;
        }
        Ok(value)
    }

    /// Names of all tables, in file order.
    pub fn table_names(&self) -> DbResult<Vec<String>> {
        Ok(self.load_document()?.table_names())
    }

    /// Most recent id saved or deleted through repositories on this store.
    pub fn last_operated_id(&self) -> Option<RecordId> {
        *self
            .last_operated_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record_operated_id(&self, id: RecordId) {
        *self
            .last_operated_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id);
    }

    /// Writes `bytes` to a fresh temp file in the document's directory, then
    /// moves it over the document. The temp file is removed on failure.
    fn persist(&self, bytes: &[u8]) -> DbResult<()> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| DbError::Io { path, source }
        };

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(io_err(&self.dir))?;
        temp.write_all(bytes).map_err(io_err(temp.path()))?;
        temp.as_file().sync_all().map_err(io_err(temp.path()))?;
        temp.persist(&self.path).map_err(|err| io_err(&self.path)(err.error))?;
        Ok(())
    }
}

/// Returns the process-wide write lock for `canonical_path`.
fn file_lock(canonical_path: PathBuf) -> Arc<Mutex<()>> {
    let mut locks = FILE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(canonical_path).or_default())
}

//! Repository layer over JSON tables.
//!
//! # Responsibility
//! - Expose entity-level CRUD (`save`, `get_by_id`, `get_all`, `delete_by_id`).
//! - Keep document and table mechanics out of callers.
//!
//! # Invariants
//! - Every mutation runs inside one `DocumentStore::update` cycle.
//! - Repository APIs return semantic errors (`Validation`, `DuplicateId`)
//!   separately from storage errors; not-found is `Ok(None)`/`Ok(false)`.

pub mod record_repo;

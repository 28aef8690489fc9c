//! Record contract shared by every table.
//!
//! # Responsibility
//! - Define what an entity type must provide to live in a table.
//! - Derive stable table names from entity types.
//!
//! # Invariants
//! - Every persisted record carries a `RecordId`.
//! - One entity type maps to exactly one table name.

pub mod record;

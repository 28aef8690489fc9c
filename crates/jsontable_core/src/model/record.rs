//! Record trait and id validation.
//!
//! # Responsibility
//! - Describe the identity surface (`id`/`set_id`) the repository relies on.
//! - Provide the default table name for an entity type.
//!
//! # Invariants
//! - `table_name()` is lowercase and stable for the lifetime of the type.
//! - A record without an id may exist in memory but is never persisted.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a persisted record.
///
/// Serialized in its hyphenated textual form under the `id` key.
pub type RecordId = Uuid;

/// Entity type that can be stored as a table of records.
///
/// Implementors usually hold `id: Option<RecordId>` and derive serde:
///
/// ```
/// use jsontable_core::{Record, RecordId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct User {
///     id: Option<RecordId>,
///     name: String,
/// }
///
/// impl Record for User {
///     fn id(&self) -> Option<RecordId> {
///         self.id
///     }
///
///     fn set_id(&mut self, id: RecordId) {
///         self.id = Some(id);
///     }
/// }
///
/// assert_eq!(User::table_name(), "user");
/// ```
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Returns the record id, or `None` before first save.
    fn id(&self) -> Option<RecordId>;

    /// Assigns the record id.
    fn set_id(&mut self, id: RecordId);

    /// Table holding records of this type.
    ///
    /// Defaults to the lowercased simple type name (`app::model::User` ->
    /// `user`). Override to pin a name that survives type renames.
    fn table_name() -> String {
        simple_type_name(std::any::type_name::<Self>()).to_ascii_lowercase()
    }
}

/// Validation failures raised before any record list is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    /// Record at `index` of table `table` has no id.
    MissingId { table: String, index: usize },
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId { table, index } => {
                write!(f, "record {index} in table `{table}` has no id")
            }
        }
    }
}

impl Error for RecordValidationError {}

/// Checks that every record in `records` has an id.
///
/// Fails on the first record without one so the caller can abort the whole
/// write.
pub fn validate_ids<E: Record>(table: &str, records: &[E]) -> Result<(), RecordValidationError> {
    match records.iter().position(|record| record.id().is_none()) {
        Some(index) => Err(RecordValidationError::MissingId {
            table: table.to_string(),
            index,
        }),
        None => Ok(()),
    }
}

/// Strips module path and generic arguments from a full type name.
fn simple_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

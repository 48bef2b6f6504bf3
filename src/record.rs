//! Record abstraction shared by every managed entity type.

use std::{fmt::Debug, fmt::Display, hash::Hash};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::types::{KeyPolicy, RecordId, RouteStyle, Status};

/// Failure to read or assign a named field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The entity has no field with this name.
    #[error("unknown field `{0}`")]
    Unknown(String),
    /// The text could not be parsed into the field's scalar type.
    #[error("invalid value for `{field}`: {value:?}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Rejected input.
        value: String,
    },
}

/// A record with a fixed set of named scalar fields and one identity key.
///
/// Field access is textual so that forms, search and filters can work over
/// any entity without knowing its concrete layout. `Default` is the empty
/// draft a creation form starts from.
pub trait Entity:
    Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Identity key type.
    type Key: Clone + Debug + Eq + Hash + Display + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Singular human label, e.g. "Outpatient".
    const LABEL: &'static str;
    /// REST collection segment, e.g. "outpatients".
    const COLLECTION: &'static str;
    /// Who chooses the identity key.
    const KEY_POLICY: KeyPolicy;
    /// Field name carrying the identity key.
    const KEY_FIELD: &'static str;
    /// Fields that must be non-empty before a submit reaches the store.
    const REQUIRED: &'static [&'static str];
    /// Fields matched by free-text search.
    const SEARCHABLE: &'static [&'static str];
    /// Fields offered as discrete filters.
    const FILTERABLE: &'static [&'static str];
    /// REST URL layout of the collection.
    const ROUTE_STYLE: RouteStyle = RouteStyle::Conventional;

    /// Current identity key, `None` while unassigned.
    fn key(&self) -> Option<Self::Key>;

    /// Overwrites the identity key.
    fn set_key(&mut self, key: Option<Self::Key>);

    /// Key a store hands out for its `seq`-th created record.
    ///
    /// Returns `None` for caller-assigned entities.
    fn key_from_seq(seq: RecordId) -> Option<Self::Key>;

    /// Textual value of a field. Empty optional values read as `None`.
    fn field(&self, name: &str) -> Option<String>;

    /// Parses `value` into the named field.
    fn set_field(&mut self, name: &str, value: &str) -> Result<(), FieldError>;

    /// Binary status, for entities that have one.
    fn status(&self) -> Option<Status> {
        None
    }

    /// Assigns the binary status. Returns false when the entity has none.
    fn set_status(&mut self, _status: Status) -> bool {
        false
    }

    /// Short description used in confirmation prompts.
    fn describe(&self) -> String;
}

/// Required fields of `record` that are absent or blank.
pub fn missing_required<E: Entity>(record: &E) -> Vec<&'static str> {
    E::REQUIRED
        .iter()
        .copied()
        .filter(|name| {
            record
                .field(name)
                .is_none_or(|value| value.trim().is_empty())
        })
        .collect()
}

/// True when `needle_lower` is empty or occurs in any searchable field.
///
/// The needle must already be lowercased.
pub fn matches_search<E: Entity>(record: &E, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    E::SEARCHABLE.iter().any(|name| {
        record
            .field(name)
            .is_some_and(|value| value.to_lowercase().contains(needle_lower))
    })
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

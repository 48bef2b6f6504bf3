//! Errors surfaced by list-management operations.

use std::fmt;

use thiserror::Error;

use crate::{record::FieldError, remote::StoreError};

/// Kind of operation that talks to the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Full collection fetch.
    Load,
    /// Create or update from the form.
    Submit,
    /// Delete one record.
    Remove,
    /// Flip one record's status.
    ToggleStatus,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Submit => "submit",
            Self::Remove => "remove",
            Self::ToggleStatus => "status toggle",
        })
    }
}

/// Error returned by [`crate::core::state::ListState`] transitions and
/// [`crate::runtime::handle::ListHandle`] calls.
#[derive(Debug, Error)]
pub enum ListError {
    /// The record store call failed. All store failures land here.
    #[error("record store request failed: {0}")]
    Transport(#[from] StoreError),
    /// Required fields were blank; the store was not contacted.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    /// A caller-assigned key already exists in the loaded collection.
    #[error("a record with key {0} already exists")]
    DuplicateKey(String),
    /// No record with this key is loaded.
    #[error("no record with key {0}")]
    UnknownKey(String),
    /// The identity key cannot be changed in the current form mode.
    #[error("identity key cannot be edited here")]
    KeyImmutable,
    /// The entity has no binary status to toggle.
    #[error("record type has no status field")]
    NoStatusField,
    /// An operation of the same kind is still in flight.
    #[error("{0} already in progress")]
    InFlight(OpKind),
    /// Submit was requested while the form was closed.
    #[error("form is not open")]
    FormClosed,
    /// A form field could not be set.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// The manager task has shut down.
    #[error("list manager is no longer running")]
    ChannelClosed,
}

//! Shared primitive IDs and status enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned numeric identifier.
pub type RecordId = u64;

/// Who is responsible for choosing a record's identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPolicy {
    /// The record store assigns the key on create.
    StoreAssigned,
    /// The caller supplies a business key on create.
    CallerAssigned,
}

/// Binary activity status shared by staff and patient records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Currently active.
    #[default]
    Active,
    /// Currently inactive.
    Inactive,
}

impl Status {
    /// Returns the other value of the binary domain.
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    /// Wire and display spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }

    /// Parses the wire spelling, ignoring ASCII case.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("active") {
            Some(Self::Active)
        } else if value.eq_ignore_ascii_case("inactive") {
            Some(Self::Inactive)
        } else {
            None
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// Booked, not yet seen.
    #[default]
    Pending,
    /// Patient was seen.
    Completed,
    /// Appointment was cancelled.
    Cancelled,
}

impl AppointmentStatus {
    /// Wire and display spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parses the wire spelling, ignoring ASCII case.
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Pending, Self::Completed, Self::Cancelled]
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL layout a REST backend uses for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteStyle {
    /// `GET|POST /{collection}`, `PUT|DELETE /{collection}/{key}`.
    Conventional,
    /// `GET /{collection}/all`, `POST /{collection}/add`,
    /// `PUT|DELETE /{collection}/{key}`.
    Verbs,
}

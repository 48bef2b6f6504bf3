//! Runtime event stream payloads.

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// An operation completed.
    Success,
    /// An operation failed and left state unchanged.
    Error,
}

/// Transient message for the page's snackbar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NoticeLevel,
    /// Display text.
    pub message: String,
}

impl Notification {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Events emitted from the list manager loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// The collection was replaced by a successful load.
    Loaded {
        /// Records now loaded.
        count: usize,
    },
    /// A notification should be shown.
    Notice(Notification),
}

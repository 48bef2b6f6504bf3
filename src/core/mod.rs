//! Synchronous list-management state.

/// Authoritative collection, form and view state for one page.
pub mod state;

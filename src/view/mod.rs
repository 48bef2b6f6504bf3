//! Search, filter and pagination over the loaded collection.

/// Deterministic filtered/paginated projection.
pub mod projection;
/// Ephemeral search/filter/page configuration.
pub mod state;

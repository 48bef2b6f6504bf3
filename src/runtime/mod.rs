//! Single-writer list manager task, its handle, and events.

/// Events broadcast by the manager task.
pub mod events;
/// Manager task and cloneable handle.
pub mod handle;

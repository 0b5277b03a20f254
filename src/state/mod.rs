/// Single-flight guard of the launch sequence.
pub mod flight;
/// Broadcast hubs for status and progress notifications.
pub mod hub;
/// Process-wide registry of game statuses.
pub mod status_store;

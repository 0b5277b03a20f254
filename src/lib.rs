//! Library crate for launcher-card, exposing the game card controller to binaries and tests.
//!
//! Each displayed game card mounts a [`services::lifecycle::CardController`] that reads the
//! shared [`state::status_store::StatusStore`], tracks transfer progress and drives the
//! play/kill toggle through a [`services::process::ProcessManager`].

/// Runtime configuration loading.
pub mod config;
/// Data exchanged with the rendering layer and the external process.
pub mod dto;
/// Errors returned by card controller actions.
pub mod error;
/// Card controller, progress tracking and external process contracts.
pub mod services;
/// Shared status registry, broadcast hubs and the launch flight guard.
pub mod state;

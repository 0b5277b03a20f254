/// Message-passing process manager and progress channel.
pub mod bridge;
/// Per-card controller driving status, progress and the launch flow.
pub mod lifecycle;
/// Mapping from status and progress to the rendered card.
pub mod presentation;
/// Contracts of the external process manager.
pub mod process;
/// Periodic and pushed progress tracking.
pub mod progress_poller;
/// Update decision prompt.
pub mod prompt;

#[cfg(test)]
mod test_support;

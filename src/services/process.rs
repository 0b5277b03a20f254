//! Boundary to the external process that installs, launches, updates and stops games.

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::dto::status::Progress;

/// Marker the external process puts in the launch error when the installed game is stale.
pub const OUT_OF_DATE_MARKER: &str = "out of date";
/// Launch argument asking the external process not to check the installed version.
pub const SKIP_VERSION_CHECK_ARG: &str = "--skip-version-check";

/// Modifiers of a launch request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Launch even if the installed version is stale.
    pub skip_version_check: bool,
}

impl LaunchOptions {
    /// Options of the relaunch issued after the user declined an update.
    pub fn skip_version_check() -> Self {
        Self {
            skip_version_check: true,
        }
    }

    /// Command line arguments carrying these options.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.skip_version_check {
            args.push(SKIP_VERSION_CHECK_ARG.to_string());
        }
        args
    }
}

/// Failure reported for a launch request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// The installed game needs an update before it can run.
    #[error("game is out of date: {0}")]
    OutOfDate(String),
    /// Any other failure reported by the external process.
    #[error("launch failed: {0}")]
    Failed(String),
    /// The external process went away before answering.
    #[error("process manager disconnected")]
    Disconnected,
}

impl LaunchError {
    /// Classify a raw error message reported by the external process.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(OUT_OF_DATE_MARKER) {
            LaunchError::OutOfDate(message)
        } else {
            LaunchError::Failed(message)
        }
    }

    /// Whether the stale version recovery applies.
    pub fn is_out_of_date(&self) -> bool {
        matches!(self, LaunchError::OutOfDate(_))
    }
}

/// Interpret the raw launch report: an absent or empty message means success.
pub fn launch_report(report: Option<String>) -> Result<(), LaunchError> {
    match report {
        Some(message) if !message.trim().is_empty() => Err(LaunchError::from_message(message)),
        _ => Ok(()),
    }
}

/// Operations of the external process manager a card controller relies on.
pub trait ProcessManager: Send + Sync {
    /// Launch the game and resolve once the play session ended or the launch failed.
    fn launch(
        &self,
        app_name: &str,
        options: LaunchOptions,
    ) -> BoxFuture<'static, Result<(), LaunchError>>;
    /// Ask the external process to stop the game. Fire and forget.
    fn terminate(&self, app_name: &str);
    /// Update the game and resolve once the update finished.
    fn update(&self, app_name: &str) -> BoxFuture<'static, ()>;
}

/// Source of progress reports for in-flight transfers.
///
/// Transports answer a request inline (request/response), publish on the push subscription,
/// or both; the poller applies whichever value arrives last.
pub trait ProgressChannel: Send + Sync {
    /// Ask for the current progress of `app_name`; `None` when the answer is pushed instead.
    fn request_progress(&self, app_name: &str) -> BoxFuture<'static, Option<Progress>>;
    /// Subscribe to progress pushed for `app_name`.
    fn subscribe_progress(&self, app_name: &str) -> broadcast::Receiver<Progress>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_success() {
        assert_eq!(launch_report(None), Ok(()));
        assert_eq!(launch_report(Some(String::new())), Ok(()));
        assert_eq!(launch_report(Some("  \n".into())), Ok(()));
    }

    #[test]
    fn out_of_date_marker_is_classified() {
        let err = launch_report(Some("ERROR: Game is out of date".into())).unwrap_err();
        assert!(err.is_out_of_date());
        assert_eq!(
            err,
            LaunchError::OutOfDate("ERROR: Game is out of date".into())
        );
    }

    #[test]
    fn other_errors_are_unclassified() {
        let err = launch_report(Some("ERROR: missing executable".into())).unwrap_err();
        assert!(!err.is_out_of_date());
        assert!(matches!(err, LaunchError::Failed(_)));
    }

    #[test]
    fn skip_check_becomes_an_argument() {
        assert!(LaunchOptions::default().args().is_empty());
        assert_eq!(
            LaunchOptions::skip_version_check().args(),
            vec![SKIP_VERSION_CHECK_ARG.to_string()]
        );
    }
}

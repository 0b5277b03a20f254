use thiserror::Error;

use crate::{dto::status::GameActivity, state::flight::FlightError};

/// Reason a play toggle was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Busy {
    /// The user has not answered the update prompt yet.
    #[error("waiting for the user to decide about an update")]
    AwaitingDecision,
    /// The game was killed but the previous request has not returned yet.
    #[error("previous launch is still settling")]
    Settling,
    /// The external process is working on the game.
    #[error("game is {0}")]
    Transferring(GameActivity),
}

/// Errors returned by a card controller action.
///
/// Failures of the external process never show up here; they are contained by the
/// controller, which always concludes with a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The toggle overlaps an operation already in flight.
    #[error("`{app_name}` is busy: {reason}")]
    Busy {
        /// Game the toggle targeted.
        app_name: String,
        /// Why it was rejected.
        reason: Busy,
    },
    /// The flight guard refused a step.
    #[error(transparent)]
    Flight(#[from] FlightError),
}

impl ControllerError {
    /// Build a [`ControllerError::Busy`] for `app_name`.
    pub fn busy(app_name: &str, reason: Busy) -> Self {
        ControllerError::Busy {
            app_name: app_name.to_owned(),
            reason,
        }
    }
}

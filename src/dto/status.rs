use std::fmt;

use serde::{Deserialize, Serialize};

/// Default percent text shown before the first progress report arrives.
pub const DEFAULT_PERCENT: &str = "0.00%";
/// Default transferred/total text shown before the first progress report arrives.
pub const DEFAULT_BYTES: &str = "0/0MB";

/// Activity a game is currently engaged in.
///
/// A game without any record in the status store is idle. `Done` marks the end of a
/// cycle and is treated like idle when gating user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameActivity {
    /// The external process is downloading and installing the game.
    Installing,
    /// The external process is applying an update.
    Updating,
    /// The external process is verifying and repairing the installed files.
    Repairing,
    /// The installation is being moved to another location.
    Moving,
    /// The game is running (or a launch is in flight).
    Playing,
    /// Nothing is in flight for this game anymore.
    Done,
}

impl GameActivity {
    /// Whether progress is tracked for this activity.
    pub fn is_transferring(self) -> bool {
        matches!(self, GameActivity::Installing | GameActivity::Updating)
    }

    /// Whether a launch or kill must be treated as a cancellation of this activity.
    pub fn is_cancellable(self) -> bool {
        matches!(self, GameActivity::Playing | GameActivity::Updating)
    }

    /// Whether something is in flight for the game.
    pub fn is_busy(self) -> bool {
        !matches!(self, GameActivity::Done)
    }

    /// Stable lowercase name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            GameActivity::Installing => "installing",
            GameActivity::Updating => "updating",
            GameActivity::Repairing => "repairing",
            GameActivity::Moving => "moving",
            GameActivity::Playing => "playing",
            GameActivity::Done => "done",
        }
    }
}

impl fmt::Display for GameActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status record of one game, as exchanged with the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    /// Stable identifier of the game.
    pub app_name: String,
    /// Current activity.
    pub status: GameActivity,
}

/// Notification emitted for every write to the status store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Game the write targeted.
    pub app_name: String,
    /// Activity recorded before the write, if any.
    pub previous: Option<GameActivity>,
    /// Activity written.
    pub current: GameActivity,
}

/// Progress of the transfer currently running for a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Completion as formatted by the external process, e.g. `"42.10%"`.
    pub percent: String,
    /// Transferred and total size, e.g. `"120/800MB"`.
    pub bytes: String,
}

impl Progress {
    /// Build a progress value from its display parts.
    pub fn new(percent: impl Into<String>, bytes: impl Into<String>) -> Self {
        Self {
            percent: percent.into(),
            bytes: bytes.into(),
        }
    }

    /// Numeric completion parsed from [`Progress::percent`], `None` when the text is malformed.
    pub fn percent_value(&self) -> Option<f64> {
        self.percent
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(DEFAULT_PERCENT, DEFAULT_BYTES)
    }
}

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    dto::status::{GameActivity, GameStatus, StatusChange},
    state::hub::Hub,
};

/// Shared handle to the status store.
pub type SharedStatusStore = Arc<StatusStore>;

/// Registry of the current activity of every game, shared by all card controllers and by
/// the external process notifications.
///
/// Writes replace the previous entry (last write wins) and are fanned out to subscribers in
/// the order they were applied for a given game.
pub struct StatusStore {
    entries: DashMap<String, GameActivity>,
    changes: Hub<StatusChange>,
}

impl StatusStore {
    /// Construct an empty store wrapped in an [`Arc`]; `capacity` bounds the change channel.
    pub fn new(capacity: usize) -> SharedStatusStore {
        Arc::new(Self {
            entries: DashMap::new(),
            changes: Hub::new(capacity),
        })
    }

    /// Status record of `app_name`, `None` when the game is idle.
    pub fn get(&self, app_name: &str) -> Option<GameStatus> {
        self.activity(app_name).map(|status| GameStatus {
            app_name: app_name.to_owned(),
            status,
        })
    }

    /// Current activity of `app_name`, `None` when the game is idle.
    pub fn activity(&self, app_name: &str) -> Option<GameActivity> {
        self.entries.get(app_name).map(|entry| *entry)
    }

    /// Record `status` for `app_name`, replacing any previous entry.
    pub fn set(&self, app_name: &str, status: GameActivity) {
        // The change is broadcast while the entry is locked so per-game notifications keep
        // the write order.
        let previous = match self.entries.entry(app_name.to_owned()) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(status);
                self.notify(app_name, Some(previous), status);
                Some(previous)
            }
            Entry::Vacant(entry) => {
                entry.insert(status);
                self.notify(app_name, None, status);
                None
            }
        };

        debug!(app_name, ?previous, %status, "game status updated");
    }

    /// Record a full status record.
    pub fn apply(&self, status: GameStatus) {
        self.set(&status.app_name, status.status);
    }

    /// Whether something is in flight for `app_name`.
    pub fn is_busy(&self, app_name: &str) -> bool {
        self.activity(app_name).is_some_and(GameActivity::is_busy)
    }

    /// Whether `app_name` is installing or updating.
    pub fn is_transferring(&self, app_name: &str) -> bool {
        self.activity(app_name)
            .is_some_and(GameActivity::is_transferring)
    }

    /// Every recorded status, ordered by game identifier.
    pub fn snapshot(&self) -> Vec<GameStatus> {
        let mut statuses = self
            .entries
            .iter()
            .map(|entry| GameStatus {
                app_name: entry.key().clone(),
                status: *entry.value(),
            })
            .collect::<Vec<_>>();
        statuses.sort_by(|a, b| a.app_name.cmp(&b.app_name));
        statuses
    }

    /// Subscribe to every subsequent write.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }

    fn notify(&self, app_name: &str, previous: Option<GameActivity>, current: GameActivity) {
        self.changes.broadcast(StatusChange {
            app_name: app_name.to_owned(),
            previous,
            current,
        });
    }
}

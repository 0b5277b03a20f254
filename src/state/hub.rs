use dashmap::DashMap;
use tokio::sync::broadcast;

/// Simple broadcast hub wrapper used for status and progress notifications.
pub struct Hub<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> Hub<T> {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, returning whether anyone was listening.
    pub fn broadcast(&self, event: T) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One [`Hub`] per game, created on first subscription.
pub struct KeyedHub<T> {
    hubs: DashMap<String, Hub<T>>,
    capacity: usize,
}

impl<T: Clone> KeyedHub<T> {
    /// Create an empty keyed hub whose per-game channels hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to the events of `key`.
    pub fn subscribe(&self, key: &str) -> broadcast::Receiver<T> {
        self.hubs
            .entry(key.to_owned())
            .or_insert_with(|| Hub::new(self.capacity))
            .subscribe()
    }

    /// Deliver `event` to the subscribers of `key`.
    ///
    /// Returns `false` when nobody listens; the hub of a key whose last subscriber is gone
    /// is dropped.
    pub fn publish(&self, key: &str, event: T) -> bool {
        let delivered = match self.hubs.get(key) {
            Some(hub) => hub.broadcast(event),
            None => return false,
        };

        if !delivered {
            self.hubs
                .remove_if(key, |_, hub| hub.subscriber_count() == 0);
        }
        delivered
    }

    /// Number of live subscribers for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.hubs
            .get(key)
            .map(|hub| hub.subscriber_count())
            .unwrap_or(0)
    }
}

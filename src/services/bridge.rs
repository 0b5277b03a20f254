//! Message-passing implementation of the process manager and progress channel.
//!
//! The controller side holds a [`ProcessBridge`]; the external process side drains a
//! [`BackendEndpoint`] and answers through the reply channels carried by each request.

use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::{
    dto::status::{GameActivity, GameStatus, Progress},
    services::process::{
        LaunchError, LaunchOptions, ProcessManager, ProgressChannel, launch_report,
    },
    state::{hub::KeyedHub, status_store::SharedStatusStore},
};

/// Request sent to the external process.
#[derive(Debug)]
pub enum ProcessRequest {
    /// Launch a game; the reply carries the raw error message, `None` on success.
    Launch {
        /// Game to launch.
        app_name: String,
        /// Extra launch arguments.
        args: Vec<String>,
        /// Channel resolved once the session ended or the launch failed.
        reply: oneshot::Sender<Option<String>>,
    },
    /// Stop a running game.
    Terminate {
        /// Game to stop.
        app_name: String,
    },
    /// Update a game.
    Update {
        /// Game to update.
        app_name: String,
        /// Channel resolved once the update finished.
        reply: oneshot::Sender<()>,
    },
    /// Publish the current progress of a game on the push channel.
    RequestProgress {
        /// Game whose progress is wanted.
        app_name: String,
    },
}

impl ProcessRequest {
    /// Game targeted by the request.
    pub fn app_name(&self) -> &str {
        match self {
            ProcessRequest::Launch { app_name, .. }
            | ProcessRequest::Terminate { app_name }
            | ProcessRequest::Update { app_name, .. }
            | ProcessRequest::RequestProgress { app_name } => app_name,
        }
    }
}

/// Controller-side handle of the bridge.
#[derive(Clone)]
pub struct ProcessBridge {
    requests: mpsc::UnboundedSender<ProcessRequest>,
    progress: Arc<KeyedHub<Progress>>,
}

impl ProcessBridge {
    /// Create a connected bridge and endpoint pair.
    ///
    /// Status notifications received through the endpoint are written to `store`.
    pub fn new(store: SharedStatusStore, progress_capacity: usize) -> (Self, BackendEndpoint) {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = Arc::new(KeyedHub::new(progress_capacity));

        let bridge = Self {
            requests: tx,
            progress: progress.clone(),
        };
        let endpoint = BackendEndpoint {
            requests: rx,
            publisher: BackendPublisher { progress, store },
        };

        (bridge, endpoint)
    }

    fn send(&self, request: ProcessRequest) -> Result<(), ProcessRequest> {
        self.requests.send(request).map_err(|err| err.0)
    }
}

impl ProcessManager for ProcessBridge {
    fn launch(
        &self,
        app_name: &str,
        options: LaunchOptions,
    ) -> BoxFuture<'static, Result<(), LaunchError>> {
        let (reply, response) = oneshot::channel();
        let request = ProcessRequest::Launch {
            app_name: app_name.to_owned(),
            args: options.args(),
            reply,
        };

        if self.send(request).is_err() {
            warn!(app_name, "process manager unavailable; launch not sent");
            return futures::future::ready(Err(LaunchError::Disconnected)).boxed();
        }

        async move {
            match response.await {
                Ok(report) => launch_report(report),
                Err(_) => Err(LaunchError::Disconnected),
            }
        }
        .boxed()
    }

    fn terminate(&self, app_name: &str) {
        let request = ProcessRequest::Terminate {
            app_name: app_name.to_owned(),
        };
        if self.send(request).is_err() {
            debug!(app_name, "process manager unavailable; terminate dropped");
        }
    }

    fn update(&self, app_name: &str) -> BoxFuture<'static, ()> {
        let (reply, response) = oneshot::channel();
        let request = ProcessRequest::Update {
            app_name: app_name.to_owned(),
            reply,
        };

        if self.send(request).is_err() {
            warn!(app_name, "process manager unavailable; update not sent");
            return futures::future::ready(()).boxed();
        }

        let app_name = app_name.to_owned();
        async move {
            if response.await.is_err() {
                warn!(app_name = %app_name, "process manager dropped the update without answering");
            }
        }
        .boxed()
    }
}

impl ProgressChannel for ProcessBridge {
    fn request_progress(&self, app_name: &str) -> BoxFuture<'static, Option<Progress>> {
        let request = ProcessRequest::RequestProgress {
            app_name: app_name.to_owned(),
        };
        if self.send(request).is_err() {
            debug!(app_name, "process manager unavailable; progress request dropped");
        }
        // Answers arrive on the push subscription.
        futures::future::ready(None).boxed()
    }

    fn subscribe_progress(&self, app_name: &str) -> broadcast::Receiver<Progress> {
        self.progress.subscribe(app_name)
    }
}

/// External-process side of the bridge.
pub struct BackendEndpoint {
    requests: mpsc::UnboundedReceiver<ProcessRequest>,
    publisher: BackendPublisher,
}

impl BackendEndpoint {
    /// Wait for the next request; `None` once every [`ProcessBridge`] handle is dropped.
    pub async fn next_request(&mut self) -> Option<ProcessRequest> {
        self.requests.recv().await
    }

    /// Handle used to push progress and status notifications.
    pub fn publisher(&self) -> BackendPublisher {
        self.publisher.clone()
    }
}

/// Cloneable handle the external process uses to push notifications.
#[derive(Clone)]
pub struct BackendPublisher {
    progress: Arc<KeyedHub<Progress>>,
    store: SharedStatusStore,
}

impl BackendPublisher {
    /// Push a progress report for `app_name`; returns whether a poller received it.
    pub fn publish_progress(&self, app_name: &str, progress: Progress) -> bool {
        self.progress.publish(app_name, progress)
    }

    /// Record a status reported by the external process.
    pub fn publish_status(&self, app_name: &str, status: GameActivity) {
        self.store.apply(GameStatus {
            app_name: app_name.to_owned(),
            status,
        });
    }
}

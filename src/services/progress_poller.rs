use std::{sync::Arc, time::Duration};

use futures::{StreamExt, stream::FuturesUnordered};
use serde::Deserialize;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        oneshot, watch,
    },
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, trace};

use crate::{dto::status::Progress, services::process::ProgressChannel};

/// Upper bound of progress requests awaiting an answer; ticks beyond it issue nothing.
const MAX_PENDING_REQUESTS: usize = 4;

/// How the poller obtains progress from the [`ProgressChannel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSourcing {
    /// Request on every tick and apply pushed values.
    #[default]
    PushAndPull,
    /// Request on every tick and apply only the inline answers.
    PullOnly,
    /// Never request; apply pushed values.
    PushOnly,
}

impl ProgressSourcing {
    fn pulls(self) -> bool {
        !matches!(self, ProgressSourcing::PushOnly)
    }

    fn pushes(self) -> bool {
        !matches!(self, ProgressSourcing::PullOnly)
    }
}

/// Keeps the local progress of one game in sync with the external process.
///
/// While the activity predicate holds, a request is issued every period. Pushed values are
/// applied while the predicate holds; answers to requests already sent are applied whenever
/// they arrive. The latest value wins.
pub struct ProgressPoller {
    app_name: String,
    progress: watch::Receiver<Progress>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ProgressPoller {
    /// Spawn the polling task for `app_name`.
    ///
    /// Must be called from within a Tokio runtime. Dropping the poller without calling
    /// [`ProgressPoller::stop`] aborts the task.
    pub fn start<F>(
        app_name: impl Into<String>,
        channel: Arc<dyn ProgressChannel>,
        sourcing: ProgressSourcing,
        period: Duration,
        is_active: F,
    ) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let app_name = app_name.into();
        let (progress_tx, progress_rx) = watch::channel(Progress::default());
        let (stop_tx, stop_rx) = oneshot::channel();

        // Subscribe before returning so no push sent after `start` can be missed.
        let pushes = sourcing
            .pushes()
            .then(|| channel.subscribe_progress(&app_name));

        let task = tokio::spawn(run(PollLoop {
            app_name: app_name.clone(),
            channel,
            sourcing,
            period,
            is_active: Box::new(is_active),
            progress: progress_tx,
            pushes,
            stop: stop_rx,
        }));

        debug!(app_name = %app_name, ?sourcing, ?period, "progress poller started");

        Self {
            app_name,
            progress: progress_rx,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Latest applied progress.
    pub fn progress(&self) -> Progress {
        self.progress.borrow().clone()
    }

    /// Receiver notified whenever a new progress value is applied.
    pub fn watch(&self) -> watch::Receiver<Progress> {
        self.progress.clone()
    }

    /// Cancel the timer and the push subscription.
    ///
    /// Once this returns no request is issued and no progress is applied anymore.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                debug!(app_name = %self.app_name, error = %err, "progress poller task ended abnormally");
            }
        }
        debug!(app_name = %self.app_name, "progress poller stopped");
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct PollLoop {
    app_name: String,
    channel: Arc<dyn ProgressChannel>,
    sourcing: ProgressSourcing,
    period: Duration,
    is_active: Box<dyn Fn() -> bool + Send + Sync>,
    progress: watch::Sender<Progress>,
    pushes: Option<broadcast::Receiver<Progress>>,
    stop: oneshot::Receiver<()>,
}

async fn run(mut state: PollLoop) {
    let mut ticker = interval_at(Instant::now() + state.period, state.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut answers = FuturesUnordered::new();

    loop {
        tokio::select! {
            biased;
            // Resolves on `stop()` and when the poller handle is dropped.
            _ = &mut state.stop => break,
            _ = ticker.tick() => {
                if !state.sourcing.pulls() || !(state.is_active)() {
                    continue;
                }
                if answers.len() >= MAX_PENDING_REQUESTS {
                    trace!(app_name = %state.app_name, pending = answers.len(), "progress requests unanswered; skipping tick");
                } else {
                    trace!(app_name = %state.app_name, "requesting progress");
                    answers.push(state.channel.request_progress(&state.app_name));
                }
            }
            Some(answer) = answers.next(), if !answers.is_empty() => {
                if let Some(progress) = answer {
                    state.progress.send_replace(progress);
                }
            }
            pushed = next_push(&mut state.pushes) => match pushed {
                Ok(progress) => {
                    if (state.is_active)() {
                        state.progress.send_replace(progress);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    trace!(app_name = %state.app_name, skipped, "progress pushes lagged");
                }
                Err(RecvError::Closed) => {
                    debug!(app_name = %state.app_name, "progress push channel closed");
                    state.pushes = None;
                }
            },
        }
    }
}

async fn next_push(pushes: &mut Option<broadcast::Receiver<Progress>>) -> Result<Progress, RecvError> {
    match pushes {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

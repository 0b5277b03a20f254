//! Recording fakes of the external collaborators, shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::{FutureExt, future::BoxFuture};
use tokio::sync::{Notify, broadcast};

use crate::{
    config::AppConfig,
    dto::{
        card::Card,
        status::{GameActivity, Progress, StatusChange},
    },
    services::{
        lifecycle::CardDeps,
        process::{LaunchError, LaunchOptions, ProcessManager, ProgressChannel},
        prompt::{ConfirmPrompt, PromptError, PromptRequest},
    },
    state::{hub::KeyedHub, status_store::SharedStatusStore},
};

/// Call received by [`FakeProcess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessCall {
    Launch {
        app_name: String,
        options: LaunchOptions,
    },
    Terminate(String),
    Update(String),
}

impl ProcessCall {
    pub fn launch(app_name: &str, options: LaunchOptions) -> Self {
        ProcessCall::Launch {
            app_name: app_name.to_owned(),
            options,
        }
    }
}

/// Process manager answering launches from a script, optionally holding them until released.
#[derive(Default)]
pub struct FakeProcess {
    calls: Mutex<Vec<ProcessCall>>,
    launch_results: Mutex<VecDeque<Result<(), LaunchError>>>,
    launch_gate: Option<Arc<Notify>>,
}

impl FakeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next unscripted launch; launches default to success.
    pub fn then_launch(self, result: Result<(), LaunchError>) -> Self {
        self.launch_results.lock().unwrap().push_back(result);
        self
    }

    /// Hold every launch until the returned gate is notified once per launch.
    pub fn hold_launches(&mut self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.launch_gate = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<ProcessCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn launches(&self) -> Vec<LaunchOptions> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProcessCall::Launch { options, .. } => Some(options),
                _ => None,
            })
            .collect()
    }

    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ProcessCall::Update(_)))
            .count()
    }
}

impl ProcessManager for FakeProcess {
    fn launch(
        &self,
        app_name: &str,
        options: LaunchOptions,
    ) -> BoxFuture<'static, Result<(), LaunchError>> {
        self.calls
            .lock()
            .unwrap()
            .push(ProcessCall::launch(app_name, options));
        let result = self
            .launch_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        let gate = self.launch_gate.clone();

        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            result
        }
        .boxed()
    }

    fn terminate(&self, app_name: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(ProcessCall::Terminate(app_name.to_owned()));
    }

    fn update(&self, app_name: &str) -> BoxFuture<'static, ()> {
        self.calls
            .lock()
            .unwrap()
            .push(ProcessCall::Update(app_name.to_owned()));
        futures::future::ready(()).boxed()
    }
}

#[derive(Debug, Clone, Copy)]
enum PromptScript {
    Answer(usize),
    Fail,
    Never,
}

/// Prompt answering from a script and recording every question.
pub struct FakePrompt {
    script: PromptScript,
    requests: Mutex<Vec<PromptRequest>>,
    gate: Option<Arc<Notify>>,
}

impl FakePrompt {
    fn with(script: PromptScript) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn answering(index: usize) -> Self {
        Self::with(PromptScript::Answer(index))
    }

    pub fn failing() -> Self {
        Self::with(PromptScript::Fail)
    }

    pub fn never() -> Self {
        Self::with(PromptScript::Never)
    }

    /// Hold the answer until the returned gate is notified.
    pub fn hold(&mut self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        gate
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ConfirmPrompt for FakePrompt {
    fn confirm(&self, request: PromptRequest) -> BoxFuture<'static, Result<usize, PromptError>> {
        self.requests.lock().unwrap().push(request);
        let script = self.script;
        let gate = self.gate.clone();

        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            match script {
                PromptScript::Answer(index) => Ok(index),
                PromptScript::Fail => Err(PromptError::Closed),
                PromptScript::Never => std::future::pending().await,
            }
        }
        .boxed()
    }
}

/// Progress channel recording requests and letting tests push values.
pub struct FakeProgressChannel {
    store: SharedStatusStore,
    hub: KeyedHub<Progress>,
    requests: Mutex<Vec<Option<GameActivity>>>,
    answer: Mutex<Option<Progress>>,
    answer_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeProgressChannel {
    /// `store` is read at every request to record the status the request was issued under.
    pub fn new(store: SharedStatusStore) -> Arc<Self> {
        Arc::new(Self {
            store,
            hub: KeyedHub::new(16),
            requests: Mutex::new(Vec::new()),
            answer: Mutex::new(None),
            answer_gate: Mutex::new(None),
        })
    }

    /// Answer every subsequent request inline with `progress`.
    pub fn answer_with(&self, progress: Progress) {
        *self.answer.lock().unwrap() = Some(progress);
    }

    /// Keep every subsequent answer in transit until [`FakeProgressChannel::release_answers`].
    pub fn hold_answers(&self) {
        *self.answer_gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Deliver the answers held so far and stop holding new ones.
    pub fn release_answers(&self) {
        if let Some(gate) = self.answer_gate.lock().unwrap().take() {
            gate.notify_waiters();
        }
    }

    pub fn push(&self, app_name: &str, progress: Progress) -> bool {
        self.hub.publish(app_name, progress)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Status of the game at the time of each request.
    pub fn requested_during(&self) -> Vec<Option<GameActivity>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn subscriber_count(&self, app_name: &str) -> usize {
        self.hub.subscriber_count(app_name)
    }
}

impl ProgressChannel for FakeProgressChannel {
    fn request_progress(&self, app_name: &str) -> BoxFuture<'static, Option<Progress>> {
        self.requests
            .lock()
            .unwrap()
            .push(self.store.activity(app_name));
        let answer = self.answer.lock().unwrap().clone();
        let gate = self.answer_gate.lock().unwrap().clone();

        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            answer
        }
        .boxed()
    }

    fn subscribe_progress(&self, app_name: &str) -> broadcast::Receiver<Progress> {
        self.hub.subscribe(app_name)
    }
}

pub fn card(app_name: &str, is_installed: bool) -> Card {
    Card {
        cover: format!("https://cdn.example/{app_name}/cover.jpg"),
        logo: None,
        title: app_name.to_uppercase(),
        app_name: app_name.to_owned(),
        is_installed,
    }
}

pub fn deps(
    store: SharedStatusStore,
    process: Arc<FakeProcess>,
    progress: Arc<FakeProgressChannel>,
    prompt: Arc<FakePrompt>,
    config: AppConfig,
) -> CardDeps {
    CardDeps {
        store,
        process,
        progress,
        prompt,
        config,
    }
}

/// Drain every status change received so far.
pub fn drain_statuses(changes: &mut broadcast::Receiver<StatusChange>) -> Vec<GameActivity> {
    let mut statuses = Vec::new();
    while let Ok(change) = changes.try_recv() {
        statuses.push(change.current);
    }
    statuses
}

/// Yield until `app_name` reaches `status`.
pub async fn wait_for_status(store: &SharedStatusStore, app_name: &str, status: GameActivity) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.activity(app_name) != Some(status) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("status never reached");
}

/// Yield until `condition` holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition never met");
}

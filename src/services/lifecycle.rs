//! Per-card controller: lifecycle status, play/kill toggle and stale version recovery.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::{sync::watch, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dto::{
        card::{Card, CardView},
        status::{GameActivity, Progress},
    },
    error::{Busy, ControllerError},
    services::{
        presentation::present,
        process::{LaunchError, LaunchOptions, ProcessManager, ProgressChannel},
        progress_poller::ProgressPoller,
        prompt::{CONFIRM_INDEX, ConfirmPrompt, PromptRequest},
    },
    state::{
        flight::{Decision, FlightError, FlightEvent, FlightId, FlightMachine, FlightPhase, FlightSnapshot},
        status_store::SharedStatusStore,
    },
};

/// Collaborators shared by every card controller.
#[derive(Clone)]
pub struct CardDeps {
    /// Status registry of every game.
    pub store: SharedStatusStore,
    /// External process manager.
    pub process: Arc<dyn ProcessManager>,
    /// Source of transfer progress.
    pub progress: Arc<dyn ProgressChannel>,
    /// Prompt used for the update decision.
    pub prompt: Arc<dyn ConfirmPrompt>,
    /// Runtime configuration.
    pub config: AppConfig,
}

/// How a play toggle concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The running (or updating) game was asked to stop.
    Killed,
    /// The game launched and its session ended.
    Played,
    /// The launch failed for a reason other than a stale version.
    Failed(LaunchError),
    /// The game was stale and the user updated it.
    Updated,
    /// The game was stale and the user launched it without version check.
    Relaunched(Result<(), LaunchError>),
    /// The game was stale and the prompt went unanswered.
    Dismissed,
    /// The game was killed before the launch reported it stale; no prompt was shown.
    Interrupted,
}

enum Step<'a> {
    Kill,
    Launch(FlightTicket<'a>),
}

/// Settles its flight when dropped, so every launch path ends with a `done` status.
struct FlightTicket<'a> {
    controller: &'a CardController,
    id: FlightId,
}

impl Drop for FlightTicket<'_> {
    fn drop(&mut self) {
        self.controller.settle(self.id);
    }
}

/// Controller of one game card.
///
/// The status lives in the shared store; progress is owned by the card's poller. Toggles go
/// through a single-flight guard so overlapping actions are either a kill or rejected.
pub struct CardController {
    card: Card,
    deps: CardDeps,
    flight: Mutex<FlightMachine>,
    poller: Option<ProgressPoller>,
}

impl CardController {
    /// Mount a controller for `card` and start tracking its progress.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(card: Card, deps: CardDeps) -> Self {
        let poller = start_poller(&card.app_name, &deps);
        info!(app_name = %card.app_name, "card mounted");

        Self {
            card,
            deps,
            flight: Mutex::new(FlightMachine::new()),
            poller: Some(poller),
        }
    }

    /// Card currently displayed.
    pub fn card(&self) -> &Card {
        &self.card
    }

    /// Identifier of the tracked game.
    pub fn app_name(&self) -> &str {
        &self.card.app_name
    }

    /// Current status of the tracked game, `None` when idle.
    pub fn status(&self) -> Option<GameActivity> {
        self.deps.store.activity(self.app_name())
    }

    /// Latest progress of the tracked game.
    pub fn progress(&self) -> Progress {
        self.poller
            .as_ref()
            .map(ProgressPoller::progress)
            .unwrap_or_default()
    }

    /// Receiver notified whenever the progress changes.
    pub fn progress_watch(&self) -> Option<watch::Receiver<Progress>> {
        self.poller.as_ref().map(ProgressPoller::watch)
    }

    /// Snapshot of the flight guard.
    pub fn flight(&self) -> FlightSnapshot {
        self.lock_flight().snapshot()
    }

    /// Visual representation of the card for its current status and progress.
    pub fn view(&self) -> CardView {
        present(self.status(), &self.progress(), self.card.is_installed)
    }

    /// Replace the displayed card.
    ///
    /// When the game identity changes the progress poller is restarted for the new game and
    /// the local progress is reset.
    pub async fn set_card(&mut self, card: Card) {
        if card.app_name == self.card.app_name {
            self.card = card;
            return;
        }

        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        info!(from = %self.card.app_name, to = %card.app_name, "card identity changed");

        self.flight = Mutex::new(FlightMachine::new());
        self.poller = Some(start_poller(&card.app_name, &self.deps));
        self.card = card;
    }

    /// Tear the controller down, stopping its progress poller.
    pub async fn unmount(mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        info!(app_name = %self.card.app_name, "card unmounted");
    }

    /// Play/kill entry point triggered by the user.
    ///
    /// A running or updating game is stopped. Otherwise the game is launched and the call
    /// resolves once the session ended, including the update-or-skip recovery when the game
    /// turns out to be stale. Whatever happens, the status ends as `done`.
    pub async fn handle_play_toggle(&self) -> Result<ToggleOutcome, ControllerError> {
        match self.plan_toggle()? {
            Step::Kill => Ok(ToggleOutcome::Killed),
            Step::Launch(ticket) => self.fly(&ticket).await,
        }
    }

    /// Decide what a toggle does and perform its synchronous part atomically.
    fn plan_toggle(&self) -> Result<Step<'_>, ControllerError> {
        let app_name = self.app_name();
        let mut flight = self.lock_flight();
        let phase = flight.phase();
        let status = self.deps.store.activity(app_name);

        if phase == FlightPhase::AwaitingDecision {
            info!(app_name, "toggle ignored while the update prompt is open");
            return Err(ControllerError::busy(app_name, Busy::AwaitingDecision));
        }

        if let Some(running) = status.filter(|status| status.is_cancellable()) {
            let pending = flight.current().map(|current| current.id);
            if let Some(id) = pending
                && phase.awaits_process()
            {
                flight.apply(id, FlightEvent::Kill)?;
            }
            self.deps.store.set(app_name, GameActivity::Done);
            drop(flight);

            info!(app_name, status = %running, "stopping game");
            self.deps.process.terminate(app_name);
            return Ok(Step::Kill);
        }

        if phase != FlightPhase::Idle {
            info!(app_name, ?phase, "toggle ignored while the previous launch settles");
            return Err(ControllerError::busy(app_name, Busy::Settling));
        }

        if let Some(active) = status.filter(|status| status.is_busy()) {
            info!(app_name, status = %active, "toggle ignored while the game is busy");
            return Err(ControllerError::busy(app_name, Busy::Transferring(active)));
        }

        let started = flight.begin()?;
        self.deps.store.set(app_name, GameActivity::Playing);
        debug!(app_name, generation = started.generation, "launch flight started");

        Ok(Step::Launch(FlightTicket {
            controller: self,
            id: started.id,
        }))
    }

    async fn fly(&self, ticket: &FlightTicket<'_>) -> Result<ToggleOutcome, ControllerError> {
        let app_name = self.app_name();
        info!(app_name, "launching game");

        match self
            .deps
            .process
            .launch(app_name, LaunchOptions::default())
            .await
        {
            Ok(()) => {
                debug!(app_name, "play session ended");
                Ok(ToggleOutcome::Played)
            }
            Err(err) if err.is_out_of_date() => self.recover_stale(ticket.id).await,
            Err(err) => {
                warn!(app_name, error = %err, "launch failed");
                Ok(ToggleOutcome::Failed(err))
            }
        }
    }

    async fn recover_stale(&self, id: FlightId) -> Result<ToggleOutcome, ControllerError> {
        let app_name = self.app_name();
        if !self.enter_decision(id)? {
            info!(app_name, "game stopped before the stale launch returned; no update prompt");
            return Ok(ToggleOutcome::Interrupted);
        }

        match self.ask_for_update().await {
            Decision::Update => {
                self.advance(id, FlightEvent::Decided(Decision::Update), GameActivity::Updating)?;
                info!(app_name, "updating stale game");
                self.deps.process.update(app_name).await;
                Ok(ToggleOutcome::Updated)
            }
            Decision::SkipCheck => {
                self.advance(
                    id,
                    FlightEvent::Decided(Decision::SkipCheck),
                    GameActivity::Playing,
                )?;
                info!(app_name, "launching stale game without version check");
                let relaunched = self
                    .deps
                    .process
                    .launch(app_name, LaunchOptions::skip_version_check())
                    .await;
                if let Err(err) = &relaunched {
                    warn!(app_name, error = %err, "launch without version check failed");
                }
                Ok(ToggleOutcome::Relaunched(relaunched))
            }
            Decision::Dismissed => Ok(ToggleOutcome::Dismissed),
        }
    }

    /// Suspend on the user decision, honouring the configured timeout.
    async fn ask_for_update(&self) -> Decision {
        let app_name = self.app_name();
        let answer = self.deps.prompt.confirm(PromptRequest::update_available());

        let answer = match self.deps.config.decision_timeout() {
            Some(limit) => match timeout(limit, answer).await {
                Ok(answer) => answer,
                Err(_) => {
                    warn!(app_name, ?limit, "update prompt timed out");
                    return Decision::Dismissed;
                }
            },
            None => answer.await,
        };

        match answer {
            Ok(CONFIRM_INDEX) => Decision::Update,
            Ok(_) => Decision::SkipCheck,
            Err(err) => {
                warn!(app_name, error = %err, "update prompt failed");
                Decision::Dismissed
            }
        }
    }

    /// Move flight `id` to the decision step; `false` when it was killed meanwhile.
    fn enter_decision(&self, id: FlightId) -> Result<bool, FlightError> {
        let mut flight = self.lock_flight();
        if flight.phase() == FlightPhase::Settling {
            return Ok(false);
        }
        flight.apply(id, FlightEvent::StaleDetected)?;
        Ok(true)
    }

    fn advance(
        &self,
        id: FlightId,
        event: FlightEvent,
        status: GameActivity,
    ) -> Result<FlightPhase, FlightError> {
        let mut flight = self.lock_flight();
        let phase = flight.apply(id, event)?;
        self.deps.store.set(self.app_name(), status);
        Ok(phase)
    }

    fn settle(&self, id: FlightId) {
        let app_name = self.app_name();
        let mut flight = self.lock_flight();
        let elapsed = flight.current().map(|current| current.started_at.elapsed());
        if let Err(err) = flight.apply(id, FlightEvent::Settled) {
            warn!(app_name, flight = %id, error = %err, "failed to settle flight");
        }
        self.deps.store.set(app_name, GameActivity::Done);
        debug!(app_name, flight = %id, ?elapsed, "launch flight settled");
    }

    fn lock_flight(&self) -> MutexGuard<'_, FlightMachine> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn start_poller(app_name: &str, deps: &CardDeps) -> ProgressPoller {
    let store = deps.store.clone();
    let tracked = app_name.to_owned();

    ProgressPoller::start(
        app_name,
        deps.progress.clone(),
        deps.config.progress_sourcing(),
        deps.config.poll_interval(),
        move || store.is_transferring(&tracked),
    )
}

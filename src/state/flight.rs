use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Phases of the launch flight a card controller drives for its game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    /// Nothing is in flight; a toggle may start a launch.
    Idle,
    /// The first launch request is pending.
    Launching,
    /// The launch reported a stale version and the user has to pick update or skip.
    AwaitingDecision,
    /// The user chose to update; the update request is pending.
    Updating,
    /// The user declined the update; the launch without version check is pending.
    Relaunching,
    /// The game was killed while a request was pending; waiting for it to return.
    Settling,
}

impl FlightPhase {
    /// Whether an external request is pending in this phase.
    pub fn awaits_process(self) -> bool {
        matches!(
            self,
            FlightPhase::Launching | FlightPhase::Updating | FlightPhase::Relaunching
        )
    }
}

/// Answer to the stale version prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Update the game now.
    Update,
    /// Launch anyway, skipping the version check.
    SkipCheck,
    /// The prompt failed or timed out; give up without updating or relaunching.
    Dismissed,
}

/// Events that move a flight forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightEvent {
    /// The user asked to play an idle game.
    Launch,
    /// The pending launch reported that the game is out of date.
    StaleDetected,
    /// The user answered the stale version prompt.
    Decided(Decision),
    /// The user killed the game while a request was pending.
    Kill,
    /// The flight concluded.
    Settled,
}

/// Unique identifier of one flight.
pub type FlightId = Uuid;

/// Error returned when an event does not apply to the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid flight transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the flight was in when the event was received.
    pub from: FlightPhase,
    /// Event that cannot be applied from this phase.
    pub event: FlightEvent,
}

/// Errors raised by the flight guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlightError {
    /// A flight is already running and must settle first.
    #[error("a flight is already in progress")]
    AlreadyInFlight,
    /// No flight is running.
    #[error("no flight is in progress")]
    NoFlight,
    /// The event belongs to a flight that is no longer current.
    #[error("flight {got} is not the current flight {expected}")]
    IdMismatch {
        /// Identifier of the current flight.
        expected: FlightId,
        /// Identifier carried by the event.
        got: FlightId,
    },
    /// The event is not valid from the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Flight currently owned by the controller.
#[derive(Debug, Clone)]
pub struct Flight {
    /// Unique identifier for this flight.
    pub id: FlightId,
    /// Generation number; increments with every new flight.
    pub generation: u64,
    /// Current phase.
    pub phase: FlightPhase,
    /// Timestamp when this flight began.
    pub started_at: Instant,
}

/// Snapshot of the flight guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightSnapshot {
    /// Current phase, `Idle` when no flight runs.
    pub phase: FlightPhase,
    /// Generation of the latest flight.
    pub generation: u64,
}

/// Single-flight guard for the launch, stale-recovery and kill sequence of one game.
///
/// At most one flight runs at a time; every step after [`FlightMachine::begin`] must present
/// the flight identifier, so a finished or foreign flight can never move the current one.
#[derive(Debug, Clone, Default)]
pub struct FlightMachine {
    generation: u64,
    current: Option<Flight>,
}

impl FlightMachine {
    /// Create a guard with no flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> FlightPhase {
        self.current
            .as_ref()
            .map(|flight| flight.phase)
            .unwrap_or(FlightPhase::Idle)
    }

    /// The flight in progress, if any.
    pub fn current(&self) -> Option<&Flight> {
        self.current.as_ref()
    }

    /// Create a snapshot of the guard.
    pub fn snapshot(&self) -> FlightSnapshot {
        FlightSnapshot {
            phase: self.phase(),
            generation: self.generation,
        }
    }

    /// Start a new flight with a [`FlightEvent::Launch`].
    pub fn begin(&mut self) -> Result<Flight, FlightError> {
        if self.current.is_some() {
            return Err(FlightError::AlreadyInFlight);
        }

        let phase = compute_transition(FlightPhase::Idle, FlightEvent::Launch)?;
        self.generation += 1;
        let flight = Flight {
            id: Uuid::new_v4(),
            generation: self.generation,
            phase,
            started_at: Instant::now(),
        };
        self.current = Some(flight.clone());

        Ok(flight)
    }

    /// Apply `event` to flight `id`, returning the next phase.
    ///
    /// [`FlightEvent::Settled`] ends the flight and returns [`FlightPhase::Idle`].
    pub fn apply(&mut self, id: FlightId, event: FlightEvent) -> Result<FlightPhase, FlightError> {
        let flight = self.current.as_mut().ok_or(FlightError::NoFlight)?;

        if flight.id != id {
            return Err(FlightError::IdMismatch {
                expected: flight.id,
                got: id,
            });
        }

        let next = compute_transition(flight.phase, event)?;
        if next == FlightPhase::Idle {
            self.current = None;
        } else {
            flight.phase = next;
        }

        Ok(next)
    }
}

/// Compute a transition from an event if the transition is valid.
fn compute_transition(
    phase: FlightPhase,
    event: FlightEvent,
) -> Result<FlightPhase, InvalidTransition> {
    let next = match (phase, event) {
        (FlightPhase::Idle, FlightEvent::Launch) => FlightPhase::Launching,
        (FlightPhase::Launching, FlightEvent::StaleDetected) => FlightPhase::AwaitingDecision,
        (FlightPhase::AwaitingDecision, FlightEvent::Decided(Decision::Update)) => {
            FlightPhase::Updating
        }
        (FlightPhase::AwaitingDecision, FlightEvent::Decided(Decision::SkipCheck)) => {
            FlightPhase::Relaunching
        }
        (from, FlightEvent::Kill) if from.awaits_process() => FlightPhase::Settling,
        (from, FlightEvent::Settled) if from != FlightPhase::Idle => FlightPhase::Idle,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

// State management module
//
// StateManager wraps ConsoleState with thread-safe access using Arc<RwLock<T>>
// and emits change events for the console renderer.

use crate::metrics::Metrics;
use crate::models::{
    ConsoleState, DetectionResult, SelectionKind, SelectionSummary, SubmissionState, TransitionError,
};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// Subscribers (primarily the terminal console) react to these instead of
/// polling the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The active selection changed (new file, capture, camera, reset)
    SelectionChanged {
        kind: SelectionKind,
    },

    /// The camera went live or was released
    CameraStateChanged {
        live: bool,
    },

    /// A detection request was issued under `generation`
    SubmissionStarted {
        generation: u64,
    },

    /// The current request succeeded
    SubmissionCompleted {
        is_safe: bool,
        confidence: f64,
    },

    /// The current request failed; media is still selected
    SubmissionFailed {
        message: String,
    },

    /// Whether "Analyze" is currently offered
    ReadinessChanged {
        can_submit: bool,
    },

    /// Something the operator must be told about (camera denied, capture failed, ...)
    UserNotice {
        message: String,
    },

    /// A response arrived for a superseded generation and was ignored
    StaleResponseDiscarded {
        generation: u64,
    },

    /// State has been reset
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// This is the central state component that:
/// - Provides thread-safe access to [`ConsoleState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Owns the generation marker used to discard stale detection responses
///
/// # Usage
///
/// Always use `StateManager` instead of mutating [`ConsoleState`] directly:
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
///
/// # Generation marker
///
/// Every selection change, camera start/stop, reset and submission bumps
/// `ConsoleState::generation`. [`begin_submission`](Self::begin_submission)
/// hands the caller the generation it runs under, and
/// [`finish_submission`](Self::finish_submission) only applies the outcome if
/// that generation is still current.
pub struct StateManager {
    state: Arc<RwLock<ConsoleState>>,

    /// Broadcast channel for state change events
    state_tx: broadcast::Sender<StateChange>,

    metrics: Arc<Metrics>,
}

impl StateManager {
    /// Create a new StateManager with default state and its own metrics
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(Metrics::new()))
    }

    /// Create a new StateManager recording into shared `metrics`
    ///
    /// The broadcast channel buffers 100 events.
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(ConsoleState::default())),
            state_tx,
            metrics,
        }
    }

    /// Get a cloned snapshot of the current state
    pub fn snapshot(&self) -> ConsoleState {
        self.state.read().unwrap().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let can_submit = state_manager.read(|state| state.can_submit());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ConsoleState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, diffs the two and
    /// broadcasts whatever changed.
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut ConsoleState),
    {
        let mut state = self.state.write().unwrap();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        self.metrics.record_state_update();
        self.broadcast_all(&changes);

        changes
    }

    /// Like [`update`](Self::update), but the closure may refuse.
    ///
    /// The closure runs against a working copy; on `Err` nothing is committed
    /// and no events are emitted.
    pub fn try_update<F, T, E>(&self, update_fn: F) -> Result<(T, Vec<StateChange>), E>
    where
        F: FnOnce(&mut ConsoleState) -> Result<T, E>,
    {
        let mut state = self.state.write().unwrap();
        let mut next = state.clone();

        let value = update_fn(&mut next)?;

        let changes = Self::detect_changes(&state, &next);
        *state = next;
        self.metrics.record_state_update();
        self.broadcast_all(&changes);

        Ok((value, changes))
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    fn broadcast_all(&self, changes: &[StateChange]) {
        for change in changes {
            self.emit(change.clone());
        }
    }

    fn emit(&self, change: StateChange) {
        // No subscribers is fine
        let _ = self.state_tx.send(change);
        self.metrics.record_state_broadcast();
    }

    fn detect_changes(old: &ConsoleState, new: &ConsoleState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.selection != new.selection {
            changes.push(StateChange::SelectionChanged {
                kind: new.selection.kind,
            });
        }

        if old.is_camera_live() != new.is_camera_live() {
            changes.push(StateChange::CameraStateChanged {
                live: new.is_camera_live(),
            });
        }

        if old.submission != new.submission {
            match &new.submission {
                SubmissionState::Submitting => changes.push(StateChange::SubmissionStarted {
                    generation: new.generation,
                }),
                SubmissionState::Completed(result) => {
                    changes.push(StateChange::SubmissionCompleted {
                        is_safe: result.is_safe,
                        confidence: result.confidence,
                    })
                }
                SubmissionState::Failed(message) => changes.push(StateChange::SubmissionFailed {
                    message: message.clone(),
                }),
                SubmissionState::Idle | SubmissionState::Ready => {}
            }
        }

        if old.can_submit() != new.can_submit() {
            changes.push(StateChange::ReadinessChanged {
                can_submit: new.can_submit(),
            });
        }

        changes
    }

    // Convenience methods for the console's actions

    /// New media became the active selection (upload or capture)
    pub fn media_selected(&self, summary: SelectionSummary) -> Vec<StateChange> {
        self.update(|state| {
            state.submission = state.submission.on_media_selected();
            state.selection = summary;
            state.notice = None;
            state.bump_generation();
        })
    }

    /// The camera is live; any previous media and result are gone
    pub fn camera_started(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.submission = state.submission.on_media_cleared();
            state.selection = SelectionSummary::camera_live();
            state.notice = None;
            state.bump_generation();
        })
    }

    /// The camera was stopped without a capture, or the selection was lost
    /// without a replacement. `summary` is what remains selected.
    pub fn media_released(&self, summary: SelectionSummary) -> Vec<StateChange> {
        self.update(|state| {
            if !summary.has_media() {
                state.submission = state.submission.on_media_cleared();
            }
            state.selection = summary;
            state.bump_generation();
        })
    }

    /// Move to `Submitting` and return the generation the request runs under.
    ///
    /// Fails without touching state when there is no blob to send, a request is
    /// already in flight, or the current media already has a result.
    pub fn begin_submission(&self) -> Result<u64, TransitionError> {
        let (generation, _) = self.try_update(|state| {
            if !state.has_media() {
                return Err(TransitionError::NoMedia);
            }
            state.submission = state.submission.on_submit()?;
            Ok(state.bump_generation())
        })?;

        self.metrics.record_submission_started();
        tracing::debug!("Submission started under generation {}", generation);
        Ok(generation)
    }

    /// Apply the outcome of the request issued under `generation`.
    ///
    /// Returns `false` and leaves state untouched when the selection has moved
    /// on since the request was issued.
    pub fn finish_submission(
        &self,
        generation: u64,
        outcome: Result<DetectionResult, String>,
    ) -> bool {
        let applied: Result<(), u64> = self
            .try_update(|state| {
                let current = state.generation;
                if current != generation {
                    return Err(current);
                }
                let next = match outcome {
                    Ok(result) => state.submission.on_success(result),
                    Err(message) => state.submission.on_failure(message),
                };
                state.submission = next.map_err(|_| current)?;
                Ok(())
            })
            .map(|_| ());

        match applied {
            Ok(()) => true,
            Err(current) => {
                tracing::info!(
                    "Discarding response for generation {} (current generation is {})",
                    generation,
                    current
                );
                self.metrics.record_stale_response();
                self.emit(StateChange::StaleResponseDiscarded { generation });
                false
            }
        }
    }

    /// Back to `Idle` with nothing selected
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.submission = state.submission.on_reset();
            state.selection = SelectionSummary::default();
            state.notice = None;
            state.bump_generation();
        });

        let reset_event = StateChange::StateReset;
        self.emit(reset_event.clone());
        changes.push(reset_event);

        changes
    }

    /// Record a user-visible notice and broadcast it
    pub fn notify(&self, message: impl Into<String>) -> StateChange {
        let message = message.into();
        tracing::warn!("{}", message);

        self.update(|state| state.notice = Some(message.clone()));

        let event = StateChange::UserNotice { message };
        self.emit(event.clone());
        event
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

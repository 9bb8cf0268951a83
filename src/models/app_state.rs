use crate::models::detection::DetectionResult;
use crate::models::media::{SelectionKind, SelectionSummary};
use thiserror::Error;

/// Rejected state-machine transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("no media selected")]
    NoMedia,

    #[error("a detection request is already in flight")]
    AlreadySubmitting,

    #[error("this media has already been analyzed; select new media or reset")]
    AlreadyCompleted,

    #[error("no detection request is in flight")]
    NotSubmitting,
}

/// Submission lifecycle of the Detection page.
///
/// ```text
/// Idle --select--> Ready --submit--> Submitting --ok--> Completed(result)
///                    ^                    |
///                    |                    +--err--> Failed(message) --submit--> Submitting
///                    +---- select new media (from Completed/Failed)
/// any --reset--> Idle
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Ready,
    Submitting,
    Completed(DetectionResult),
    Failed(String),
}

impl SubmissionState {
    /// New media was selected or captured. Valid from every state except
    /// `Submitting`, where the caller must treat the in-flight request as stale.
    pub fn on_media_selected(&self) -> SubmissionState {
        SubmissionState::Ready
    }

    /// The selection went away (camera started or stopped without a capture)
    pub fn on_media_cleared(&self) -> SubmissionState {
        SubmissionState::Idle
    }

    pub fn on_submit(&self) -> Result<SubmissionState, TransitionError> {
        match self {
            SubmissionState::Ready | SubmissionState::Failed(_) => Ok(SubmissionState::Submitting),
            SubmissionState::Idle => Err(TransitionError::NoMedia),
            SubmissionState::Submitting => Err(TransitionError::AlreadySubmitting),
            SubmissionState::Completed(_) => Err(TransitionError::AlreadyCompleted),
        }
    }

    pub fn on_success(&self, result: DetectionResult) -> Result<SubmissionState, TransitionError> {
        match self {
            SubmissionState::Submitting => Ok(SubmissionState::Completed(result)),
            _ => Err(TransitionError::NotSubmitting),
        }
    }

    pub fn on_failure(&self, message: String) -> Result<SubmissionState, TransitionError> {
        match self {
            SubmissionState::Submitting => Ok(SubmissionState::Failed(message)),
            _ => Err(TransitionError::NotSubmitting),
        }
    }

    pub fn on_reset(&self) -> SubmissionState {
        SubmissionState::Idle
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, SubmissionState::Submitting)
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        match self {
            SubmissionState::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SubmissionState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Short name used in logs and the console status line
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Ready => "ready",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Completed(_) => "completed",
            SubmissionState::Failed(_) => "failed",
        }
    }
}

/// Cloneable snapshot of everything the console displays.
///
/// Wrapped in `Arc<RwLock<ConsoleState>>` by [`crate::state::StateManager`].
/// Do not mutate it directly; go through the manager so change events fire.
///
/// The camera stream and the preview file are not part of this struct. They are
/// owned by [`crate::media::MediaSourceManager`]; only their summary lives here.
#[derive(Clone, Debug, Default)]
pub struct ConsoleState {
    pub submission: SubmissionState,
    pub selection: SelectionSummary,

    /// Bumped whenever the selection changes or a request is issued.
    /// Responses carrying an older value are discarded.
    pub generation: u64,

    /// Last user-visible notice (camera denied, capture failed, ...)
    pub notice: Option<String>,
}

impl ConsoleState {
    pub fn is_camera_live(&self) -> bool {
        self.selection.kind == SelectionKind::CameraLive
    }

    pub fn has_media(&self) -> bool {
        self.selection.has_media()
    }

    /// Whether an "Analyze" action should be offered right now
    pub fn can_submit(&self) -> bool {
        self.has_media()
            && matches!(
                self.submission,
                SubmissionState::Ready | SubmissionState::Failed(_)
            )
    }

    /// Whether a "Reset" action should be offered right now
    pub fn can_reset(&self) -> bool {
        self.selection.kind != SelectionKind::None
            || !matches!(self.submission, SubmissionState::Idle)
    }

    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample_result() -> DetectionResult {
        DetectionResult {
            is_safe: true,
            confidence: 97.0,
            reason: "All PPE detected".to_string(),
            detected_items: Value::Null,
            missing_items: Value::Null,
            id: None,
            file_type: None,
            file_path: None,
            created_at: None,
        }
    }

    #[test]
    fn test_default_state() {
        let state = ConsoleState::default();
        assert_eq!(state.submission, SubmissionState::Idle);
        assert_eq!(state.selection.kind, SelectionKind::None);
        assert_eq!(state.generation, 0);
        assert!(!state.can_submit());
        assert!(!state.can_reset());
    }

    #[test]
    fn test_happy_path_transitions() {
        let state = SubmissionState::Idle.on_media_selected();
        assert_eq!(state, SubmissionState::Ready);

        let state = state.on_submit().unwrap();
        assert!(state.is_submitting());

        let state = state.on_success(sample_result()).unwrap();
        assert_eq!(state.result().map(|r| r.is_safe), Some(true));
    }

    #[test]
    fn test_failure_then_retry() {
        let state = SubmissionState::Submitting
            .on_failure("model unavailable".to_string())
            .unwrap();
        assert_eq!(state.error_message(), Some("model unavailable"));

        // Retry keeps the same media, no reselect needed
        assert_eq!(state.on_submit().unwrap(), SubmissionState::Submitting);
    }

    #[test]
    fn test_rejected_transitions() {
        assert_eq!(SubmissionState::Idle.on_submit(), Err(TransitionError::NoMedia));
        assert_eq!(
            SubmissionState::Submitting.on_submit(),
            Err(TransitionError::AlreadySubmitting)
        );
        assert_eq!(
            SubmissionState::Completed(sample_result()).on_submit(),
            Err(TransitionError::AlreadyCompleted)
        );
        assert_eq!(
            SubmissionState::Ready.on_success(sample_result()),
            Err(TransitionError::NotSubmitting)
        );
        assert_eq!(
            SubmissionState::Idle.on_failure("x".to_string()),
            Err(TransitionError::NotSubmitting)
        );
    }

    #[test]
    fn test_new_media_after_result_returns_to_ready() {
        let completed = SubmissionState::Completed(sample_result());
        assert_eq!(completed.on_media_selected(), SubmissionState::Ready);

        let failed = SubmissionState::Failed("boom".to_string());
        assert_eq!(failed.on_media_selected(), SubmissionState::Ready);
    }

    #[test]
    fn test_reset_from_any_state() {
        for state in [
            SubmissionState::Idle,
            SubmissionState::Ready,
            SubmissionState::Submitting,
            SubmissionState::Completed(sample_result()),
            SubmissionState::Failed("boom".to_string()),
        ] {
            assert_eq!(state.on_reset(), SubmissionState::Idle);
        }
    }

    #[test]
    fn test_can_submit_requires_media() {
        let mut state = ConsoleState::default();
        state.submission = SubmissionState::Ready;
        assert!(!state.can_submit());

        state.selection.kind = SelectionKind::CapturedOrUploaded;
        assert!(state.can_submit());

        state.submission = SubmissionState::Submitting;
        assert!(!state.can_submit());
    }

    #[test]
    fn test_bump_generation() {
        let mut state = ConsoleState::default();
        assert_eq!(state.bump_generation(), 1);
        assert_eq!(state.bump_generation(), 2);
        assert_eq!(state.generation, 2);
    }
}

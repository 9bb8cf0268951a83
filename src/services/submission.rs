use super::api::{ApiError, DetectionApi, DetectionRequest};
use crate::metrics::Metrics;
use crate::models::{DetectionResult, MediaBlob, TransitionError};
use crate::state::StateManager;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Why a submission was refused before any request went out
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Select or capture an image first")]
    NoMedia,

    #[error("The camera is live; capture a photo before analyzing")]
    CaptureRequired,

    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// What happened to a request that was actually sent
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Completed(DetectionResult),
    Failed(ApiError),

    /// The response arrived after the selection moved on and was ignored
    Discarded { generation: u64 },
}

/// Packages the active blob, calls the backend once and records the outcome
/// under the generation it was issued with.
#[derive(Clone)]
pub struct SubmissionController {
    state: StateManager,
    api: Arc<dyn DetectionApi>,
    metrics: Arc<Metrics>,
}

/// A request that has claimed its generation but has not been sent yet
#[derive(Debug)]
pub struct SubmissionTicket {
    generation: u64,
    request: DetectionRequest,
}

impl SubmissionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl SubmissionController {
    pub fn new(state: StateManager, api: Arc<dyn DetectionApi>) -> Self {
        let metrics = Arc::clone(state.metrics());
        Self { state, api, metrics }
    }

    /// Claim a generation for `blob` and build its request.
    ///
    /// Synchronous so the caller can hold the media lock while reading the
    /// blob and claiming the generation; a selection change can then never
    /// land between the two.
    pub fn prepare(&self, blob: Option<&MediaBlob>) -> Result<SubmissionTicket, SubmissionError> {
        let Some(blob) = blob else {
            return Err(if self.state.read(|s| s.is_camera_live()) {
                SubmissionError::CaptureRequired
            } else {
                SubmissionError::NoMedia
            });
        };

        let generation = self.state.begin_submission()?;
        Ok(SubmissionTicket {
            generation,
            request: DetectionRequest::from_blob(blob),
        })
    }

    /// Send a prepared request exactly once and record the outcome under its generation
    pub async fn send(&self, ticket: SubmissionTicket) -> SubmissionOutcome {
        let SubmissionTicket {
            generation,
            request,
        } = ticket;
        let started = Instant::now();

        match self.api.submit_media(request).await {
            Ok(result) => {
                self.metrics.record_submission_succeeded(started.elapsed());
                tracing::info!(
                    "Detection finished in {}ms: safe={}, confidence={}",
                    started.elapsed().as_millis(),
                    result.is_safe,
                    result.confidence
                );

                if self.state.finish_submission(generation, Ok(result.clone())) {
                    SubmissionOutcome::Completed(result)
                } else {
                    SubmissionOutcome::Discarded { generation }
                }
            }
            Err(err) => {
                self.metrics.record_submission_failed();
                let message = err.user_message();
                tracing::error!("Detection failed: {} ({})", message, err);

                if self.state.finish_submission(generation, Err(message)) {
                    SubmissionOutcome::Failed(err)
                } else {
                    SubmissionOutcome::Discarded { generation }
                }
            }
        }
    }

    /// Submit `blob` for detection.
    ///
    /// `None` means nothing submittable is selected. No lock is held while the
    /// request is in flight.
    pub async fn submit(&self, blob: Option<MediaBlob>) -> Result<SubmissionOutcome, SubmissionError> {
        let ticket = self.prepare(blob.as_ref())?;
        Ok(self.send(ticket).await)
    }
}

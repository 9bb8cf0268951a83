//! Services module - the remote detection capability and the submission flow.
//!
//! The services are **framework-agnostic**: nothing here knows about the
//! terminal console, so everything can be driven from tests.
//!
//! # Components
//!
//! - [`DetectionApi`]: the three backend endpoints the console depends on
//!   (`POST /detect`, `GET /detections`, `GET /dashboard`). [`HttpDetectionApi`]
//!   implements it with reqwest; tests substitute a mock.
//!
//! - [`SubmissionController`]: turns the active [`MediaBlob`](crate::models::MediaBlob)
//!   into a [`DetectionRequest`], calls the backend exactly once and records the
//!   outcome through the [`StateManager`](crate::state::StateManager) under the
//!   generation the request was issued with.
//!
//! # Error Reporting
//!
//! Backend failures become [`ApiError`]. [`ApiError::user_message`] picks the
//! most specific text available, preferring the server's `detail` field:
//!
//! ```ignore
//! match api.submit_media(request).await {
//!     Ok(result) => println!("safe: {}", result.is_safe),
//!     Err(err) => println!("{}", err.user_message()),
//! }
//! ```

pub mod api;
pub mod submission;

pub use api::{ApiError, DetectionApi, DetectionRequest, HttpDetectionApi, extract_detail};
pub use submission::{SubmissionController, SubmissionError, SubmissionOutcome, SubmissionTicket};

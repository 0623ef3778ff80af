//! Speech-to-text HTTP service.
//!
//! `POST /transcribe` buffers the request body to a temp file, waits for a
//! slot on the [`AdmissionGate`], and runs the [`SpeechModel`] on the blocking
//! pool. `GET /health` reports the model configuration.

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod audio;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod health;
pub mod model;
pub mod observability;
pub mod routes;
pub mod state;
pub mod transcription;
pub mod vad;

pub use config::{Config, Device};
pub use error::AsrError;
pub use gate::{AdmissionGate, AdmissionPermit};
pub use health::perform_health_check;
pub use model::{ModelError, Segment, SpeechModel, Task, TranscribeOptions, Transcript};
pub use observability::AsrMetrics;
pub use state::{AppState, HealthReport};
pub use transcription::{Transcriber, TranscriptionRequest, TranscriptionResult};

/// Full application router
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
	Router::new()
		.merge(routes::health::get_health())
		.merge(routes::transcribe::post_transcribe(max_body_bytes))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
}

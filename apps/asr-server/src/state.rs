use axum::extract::FromRef;
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::transcription::Transcriber;

/// Static status reported by `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
	pub ok: bool,
	pub model: String,
	pub device: String,
	pub compute_type: String,
}

impl HealthReport {
	pub fn from_config(config: &Config) -> Self {
		Self {
			ok: true,
			model: config.whisper_model.clone(),
			device: config.device.to_string(),
			compute_type: config.compute_type.clone(),
		}
	}
}

/// Everything the handlers share, built once at startup
#[derive(Clone)]
pub struct AppState {
	pub health: Arc<HealthReport>,
	pub transcriber: Arc<Transcriber>,
}

impl AppState {
	pub fn new(health: HealthReport, transcriber: Transcriber) -> Self {
		Self {
			health: Arc::new(health),
			transcriber: Arc::new(transcriber),
		}
	}
}

impl FromRef<AppState> for Arc<HealthReport> {
	fn from_ref(state: &AppState) -> Self {
		state.health.clone()
	}
}

impl FromRef<AppState> for Arc<Transcriber> {
	fn from_ref(state: &AppState) -> Self {
		state.transcriber.clone()
	}
}

use axum::body::Body;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::gate::GateClosed;
use crate::model::ModelError;

#[derive(thiserror::Error, Debug)]
pub enum AsrError {
	#[error("{0}")]
	InvalidInput(String),

	#[error("{0}")]
	PayloadTooLarge(String),

	#[error("failed to buffer audio: {0}")]
	TempFile(#[from] std::io::Error),

	#[error("{0}")]
	Model(#[from] ModelError),

	#[error("transcription worker failed: {0}")]
	Worker(#[from] tokio::task::JoinError),

	#[error("{0}")]
	GateClosed(#[from] GateClosed),
}

/// Error body, `{"detail": "..."}`
#[derive(Serialize)]
pub struct ErrorBody {
	pub detail: String,
}

impl AsrError {
	pub fn invalid_input(detail: impl Into<String>) -> Self {
		Self::InvalidInput(detail.into())
	}

	pub const fn status_code(&self) -> StatusCode {
		match self {
			Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
			Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
			Self::TempFile(_) | Self::Model(_) | Self::Worker(_) | Self::GateClosed(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Short label for logs and metrics
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::InvalidInput(_) => "invalid_input",
			Self::PayloadTooLarge(_) => "payload_too_large",
			Self::TempFile(_) => "temp_file",
			Self::Model(_) => "model",
			Self::Worker(_) => "worker",
			Self::GateClosed(_) => "gate_closed",
		}
	}
}

impl From<BytesRejection> for AsrError {
	fn from(rejection: BytesRejection) -> Self {
		if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
			Self::PayloadTooLarge(rejection.body_text())
		} else {
			Self::InvalidInput(rejection.body_text())
		}
	}
}

impl From<QueryRejection> for AsrError {
	fn from(rejection: QueryRejection) -> Self {
		Self::InvalidInput(rejection.body_text())
	}
}

impl IntoResponse for AsrError {
	fn into_response(self) -> Response<Body> {
		let status = self.status_code();
		if status.is_server_error() {
			tracing::error!(kind = self.kind(), error = %self, "❌ Transcription request failed");
		} else {
			tracing::debug!(kind = self.kind(), error = %self, "Rejected transcription request");
		}

		(status, Json(ErrorBody { detail: self.to_string() })).into_response()
	}
}

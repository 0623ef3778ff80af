use crate::handlers::transcribe as routes;
use crate::transcription::Transcriber;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::{extract::FromRef, Router};
use std::sync::Arc;

/// `POST /transcribe`, accepting bodies up to `max_body_bytes`
pub fn post_transcribe<S>(max_body_bytes: usize) -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	Arc<Transcriber>: FromRef<S>,
{
	Router::new()
		.route("/transcribe", post(routes::transcribe))
		// axum's 2MB extractor default is replaced by the configured limit
		.layer(DefaultBodyLimit::max(max_body_bytes))
}

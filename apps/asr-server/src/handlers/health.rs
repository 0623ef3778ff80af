use axum::{extract::State, response::Json};
use std::sync::Arc;
use tracing::instrument;

use crate::state::HealthReport;

#[axum::debug_handler(state = crate::AppState)]
#[instrument(name = "health", skip_all)]
pub async fn health(State(report): State<Arc<HealthReport>>) -> Json<HealthReport> {
	Json(report.as_ref().clone())
}

use crate::handlers::health as routes;
use crate::state::HealthReport;
use axum::routing::get;
use axum::{extract::FromRef, http::Method, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub fn get_health<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	Arc<HealthReport>: FromRef<S>,
{
	let cors = CorsLayer::new().allow_origin(Any).allow_methods([Method::GET]).allow_headers(Any);

	Router::new().route("/health", get(routes::health)).layer(cors)
}

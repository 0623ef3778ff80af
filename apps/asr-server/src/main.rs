use anyhow::Result;
use asr_server::model::{resolver, whisper::WhisperModel};
use asr_server::observability::init_observability;
use asr_server::{perform_health_check, router, AdmissionGate, AppState, Config, HealthReport, Transcriber};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
	// Load environment variables
	dotenvy::dotenv().ok();

	// Parse CLI arguments
	let config = Config::parse();

	// Handle health check flag
	if config.health_check {
		return perform_health_check(&config).await;
	}

	config.validate().map_err(anyhow::Error::msg)?;

	let (telemetry, metrics) = init_observability(&config)?;

	if let Some(raw) = config.ignored_beam_size() {
		warn!(beam_size = raw, "⚠️ BEAM_SIZE is not a positive integer, falling back to greedy decoding");
	}

	info!(
		model = %config.whisper_model,
		device = %config.device,
		compute_type = %config.compute_type,
		max_transcribe_workers = config.max_transcribe_workers,
		beam_size = config.beam_size(),
		"🎯 Starting asr-server"
	);

	// Load Whisper model
	let model_path = resolver::resolve(&config.whisper_model, &config.whisper_models_path, &config.compute_type)?;
	let (device, threads) = (config.device, config.whisper_threads);
	let model = tokio::task::spawn_blocking(move || WhisperModel::load(&model_path, device, threads)).await??;

	let gate = AdmissionGate::new(config.max_transcribe_workers);
	let transcriber = Transcriber::new(Arc::new(model), gate.clone(), metrics)
		.with_beam_size(config.beam_size())
		.with_temp_dir(config.temp_dir.clone());

	let state = AppState::new(HealthReport::from_config(&config), transcriber);
	let app = router(state, config.max_body_bytes());

	let listener = TcpListener::bind(config.listen_addr()).await?;
	info!(addr = %listener.local_addr()?, "🎧 Listening for transcription requests");

	// Create cancellation token for cooperative shutdown
	let shutdown_token = CancellationToken::new();
	let signal_token = shutdown_token.clone();
	tokio::spawn(async move {
		wait_for_shutdown_signal().await;
		info!("🛑 Shutdown signal received (SIGTERM/SIGINT)");
		signal_token.cancel();
	});

	// Queued requests are turned away once the signal lands; held permits run to completion
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			shutdown_token.cancelled().await;
			gate.close();
			info!(waiting = gate.waiting(), in_flight = gate.in_flight(), "🚪 Admission gate closed");
		})
		.await?;

	telemetry.shutdown();
	info!("✅ Shutdown complete");
	Ok(())
}

async fn wait_for_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			warn!(error = %e, "Failed to install Ctrl+C handler");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				warn!(error = %e, "Failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
			_ = ctrl_c => {},
			_ = terminate => {},
	}
}

use axum::body::Bytes;
use opentelemetry::metrics::UpDownCounter;
use opentelemetry::KeyValue;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::AsrError;
use crate::gate::AdmissionGate;
use crate::model::{SpeechModel, Task, TranscribeOptions};
use crate::observability::AsrMetrics;

/// One inbound transcription
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
	pub audio: Bytes,
	pub language: Option<String>,
	pub task: Task,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionResult {
	pub text: String,
	pub language: String,
	pub duration_sec: f64,
}

/// Buffers audio, gates admission and runs the model off the async runtime
pub struct Transcriber {
	model: Arc<dyn SpeechModel>,
	gate: AdmissionGate,
	beam_size: Option<i32>,
	temp_dir: Option<PathBuf>,
	metrics: AsrMetrics,
}

impl Transcriber {
	pub fn new(model: Arc<dyn SpeechModel>, gate: AdmissionGate, metrics: AsrMetrics) -> Self {
		Self {
			model,
			gate,
			beam_size: None,
			temp_dir: None,
			metrics,
		}
	}

	#[must_use]
	pub fn with_beam_size(mut self, beam_size: Option<i32>) -> Self {
		self.beam_size = beam_size;
		self
	}

	/// Buffer audio under `dir` instead of the system temp dir
	#[must_use]
	pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
		self.temp_dir = dir;
		self
	}

	pub const fn gate(&self) -> &AdmissionGate {
		&self.gate
	}

	#[instrument(name = "transcribe", skip_all, fields(bytes = request.audio.len(), task = %request.task, language = request.language.as_deref()))]
	pub async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResult, AsrError> {
		let started = Instant::now();
		self.metrics.requests.add(1, &[]);

		if request.audio.is_empty() {
			self.metrics.requests_rejected.add(1, &[KeyValue::new("reason", "empty_body")]);
			return Err(AsrError::invalid_input("empty body"));
		}
		self.metrics.bytes_received.add(request.audio.len() as u64, &[]);

		match self.run(request, started).await {
			Ok(result) => {
				self.metrics.transcriptions_completed.add(1, &[]);
				info!(
					text_length = result.text.len(),
					language = %result.language,
					duration_sec = result.duration_sec,
					"✨ Transcription complete"
				);
				Ok(result)
			}
			Err(e) => {
				self.metrics.transcriptions_failed.add(1, &[KeyValue::new("error", e.kind())]);
				Err(e)
			}
		}
	}

	async fn run(&self, request: TranscriptionRequest, started: Instant) -> Result<TranscriptionResult, AsrError> {
		let audio_file = self.buffer_audio(request.audio).await?;

		let wait_start = Instant::now();
		let permit = self.gate.acquire().await?;
		let queue_wait_ms = wait_start.elapsed().as_secs_f64() * 1000.0;
		self.metrics.queue_wait_latency.record(queue_wait_ms, &[]);
		debug!(queue_wait_ms, "🎟️ Admission permit granted");

		let options = TranscribeOptions {
			language: request.language,
			task: request.task,
			vad_filter: true,
			beam_size: self.beam_size,
		};

		let model = Arc::clone(&self.model);
		let in_flight = InFlight::enter(self.metrics.in_flight.clone());

		// The permit and the temp file move into the worker so neither is
		// released before the model returns, even if this future is dropped.
		let (outcome, model_ms) = tokio::task::spawn_blocking(move || {
			let _in_flight = in_flight;
			let model_start = Instant::now();
			let outcome = model.transcribe(audio_file.path(), &options);
			let model_ms = model_start.elapsed().as_secs_f64() * 1000.0;
			permit.release();
			drop(audio_file);
			(outcome, model_ms)
		})
		.await?;

		self.metrics.transcription_latency.record(model_ms, &[]);
		let transcript = outcome?;

		Ok(TranscriptionResult {
			text: transcript.text(),
			language: transcript.language,
			duration_sec: round_millis(started.elapsed().as_secs_f64()),
		})
	}

	/// Write the body to a scoped temp file, deleted when the handle drops
	async fn buffer_audio(&self, audio: Bytes) -> Result<NamedTempFile, AsrError> {
		let temp_dir = self.temp_dir.clone();

		let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
			let mut builder = tempfile::Builder::new();
			builder.prefix("asr-").suffix(".wav");

			let mut file = match temp_dir {
				Some(dir) => builder.tempfile_in(dir)?,
				None => builder.tempfile()?,
			};
			file.write_all(&audio)?;
			file.flush()?;
			Ok(file)
		})
		.await??;

		debug!(path = %file.path().display(), "📦 Audio buffered to temp file");
		Ok(file)
	}
}

/// Tracks the in-flight gauge for the lifetime of one model call
struct InFlight(UpDownCounter<i64>);

impl InFlight {
	fn enter(counter: UpDownCounter<i64>) -> Self {
		counter.add(1, &[]);
		Self(counter)
	}
}

impl Drop for InFlight {
	fn drop(&mut self) {
		self.0.add(-1, &[]);
	}
}

fn round_millis(secs: f64) -> f64 {
	(secs * 1000.0).round() / 1000.0
}

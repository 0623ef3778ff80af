#![allow(dead_code)]

use asr_server::{router, AdmissionGate, AppState, AsrMetrics, Config, HealthReport, ModelError, Segment, SpeechModel, TranscribeOptions, Transcriber, Transcript};
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use clap::Parser;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn config(args: &[&str]) -> Config {
	let mut argv = vec!["asr-server"];
	argv.extend_from_slice(args);
	Config::try_parse_from(argv).unwrap()
}

pub fn app_with_config(model: Arc<dyn SpeechModel>, config: &Config) -> Router {
	let transcriber = Transcriber::new(model, AdmissionGate::new(config.max_transcribe_workers), AsrMetrics::default()).with_beam_size(config.beam_size());
	router(AppState::new(HealthReport::from_config(config), transcriber), config.max_body_bytes())
}

pub fn app(model: Arc<dyn SpeechModel>, workers: usize) -> Router {
	let workers = workers.to_string();
	app_with_config(model, &config(&["--max-transcribe-workers", &workers]))
}

pub fn post_transcribe(query: &str, body: impl Into<Body>) -> Request<Body> {
	Request::builder().method("POST").uri(format!("/transcribe{query}")).body(body.into()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

/// One second of 16 kHz mono silence as WAV bytes
pub fn silent_wav() -> Vec<u8> {
	let spec = WavSpec {
		channels: 1,
		sample_rate: 16_000,
		bits_per_sample: 16,
		sample_format: SampleFormat::Int,
	};
	let mut bytes = Vec::new();
	let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
	for _ in 0..16_000 {
		writer.write_sample(0_i16).unwrap();
	}
	writer.finalize().unwrap();
	bytes
}

/// Returns fixed segments and echoes the language hint (or "en")
pub struct EchoModel {
	pub segments: Vec<&'static str>,
	pub calls: AtomicUsize,
}

impl EchoModel {
	pub fn new(segments: Vec<&'static str>) -> Arc<Self> {
		Arc::new(Self {
			segments,
			calls: AtomicUsize::new(0),
		})
	}
}

impl SpeechModel for EchoModel {
	fn transcribe(&self, _audio_path: &Path, options: &TranscribeOptions) -> Result<Transcript, ModelError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(Transcript {
			segments: self.segments.iter().map(|text| Segment::new(*text)).collect(),
			language: options.language.clone().unwrap_or_else(|| "en".to_string()),
		})
	}
}

/// Fails the first `failures` calls, then succeeds
pub struct FlakyModel {
	pub failures: usize,
	pub calls: AtomicUsize,
}

impl FlakyModel {
	pub fn new(failures: usize) -> Arc<Self> {
		Arc::new(Self {
			failures,
			calls: AtomicUsize::new(0),
		})
	}
}

impl SpeechModel for FlakyModel {
	fn transcribe(&self, _audio_path: &Path, _options: &TranscribeOptions) -> Result<Transcript, ModelError> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		if call < self.failures {
			return Err(ModelError::Inference(format!("injected failure #{}", call + 1)));
		}
		Ok(Transcript {
			segments: vec![Segment::new(" recovered")],
			language: "en".to_string(),
		})
	}
}

/// Sleeps inside the model and records how many calls overlap
pub struct ConcurrencyProbe {
	pub work: Duration,
	pub current: AtomicUsize,
	pub max_seen: AtomicUsize,
	pub completed: AtomicUsize,
}

impl ConcurrencyProbe {
	pub fn new(work: Duration) -> Arc<Self> {
		Arc::new(Self {
			work,
			current: AtomicUsize::new(0),
			max_seen: AtomicUsize::new(0),
			completed: AtomicUsize::new(0),
		})
	}

	pub fn running(&self) -> usize {
		self.current.load(Ordering::SeqCst)
	}

	pub fn max_seen(&self) -> usize {
		self.max_seen.load(Ordering::SeqCst)
	}

	pub fn completed(&self) -> usize {
		self.completed.load(Ordering::SeqCst)
	}
}

impl SpeechModel for ConcurrencyProbe {
	fn transcribe(&self, _audio_path: &Path, _options: &TranscribeOptions) -> Result<Transcript, ModelError> {
		let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_seen.fetch_max(now, Ordering::SeqCst);

		std::thread::sleep(self.work);

		self.current.fetch_sub(1, Ordering::SeqCst);
		self.completed.fetch_add(1, Ordering::SeqCst);
		Ok(Transcript {
			segments: vec![Segment::new("done")],
			language: "en".to_string(),
		})
	}
}

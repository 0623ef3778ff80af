use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{ModelError, Segment, SpeechModel, Task, TranscribeOptions, Transcript};
use crate::audio::{self, WHISPER_SAMPLE_RATE};
use crate::config::Device;
use crate::vad::VadProcessor;

/// whisper.cpp's own default when nothing can be detected
const FALLBACK_LANGUAGE: &str = "en";

/// whisper.cpp refuses inputs shorter than one second
const MIN_SAMPLES: usize = WHISPER_SAMPLE_RATE as usize;

/// Speech model backed by whisper.cpp.
///
/// One context is loaded at startup and shared; every call creates its own
/// decoder state, so concurrent calls are independent.
pub struct WhisperModel {
	ctx: WhisperContext,
	threads: i32,
}

/// Decoder knobs derived from one request's options
#[derive(Debug, Clone)]
struct DecodeSettings<'a> {
	strategy: SamplingStrategy,
	translate: bool,
	language: &'a str,
}

impl<'a> DecodeSettings<'a> {
	fn from_options(options: &'a TranscribeOptions) -> Self {
		let strategy = match options.beam_size {
			Some(beam_size) => SamplingStrategy::BeamSearch { beam_size, patience: -1.0 },
			None => SamplingStrategy::Greedy { best_of: 1 },
		};

		Self {
			strategy,
			translate: options.task == Task::Translate,
			language: options.language.as_deref().unwrap_or("auto"),
		}
	}

	fn into_params(self, threads: i32) -> FullParams<'a, 'a> {
		let mut params = FullParams::new(self.strategy);
		params.set_n_threads(threads);
		params.set_translate(self.translate);
		params.set_language(Some(self.language));
		params.set_no_context(true);
		params.set_print_special(false);
		params.set_print_progress(false);
		params.set_print_realtime(false);
		params.set_print_timestamps(false);
		params
	}
}

impl WhisperModel {
	/// Load Whisper model from disk
	pub fn load(model_path: &Path, device: Device, threads: i32) -> Result<Self, ModelError> {
		info!(model_path = %model_path.display(), %device, "🔄 Loading Whisper model...");
		let start = Instant::now();

		let path = model_path
			.to_str()
			.ok_or_else(|| ModelError::Load(format!("model path is not valid UTF-8: {}", model_path.display())))?;

		let mut ctx_params = WhisperContextParameters::default();
		ctx_params.use_gpu(device.wants_gpu());

		let ctx = WhisperContext::new_with_params(path, ctx_params).map_err(|e| ModelError::Load(e.to_string()))?;

		info!(load_time_ms = start.elapsed().as_millis(), threads, "✅ Whisper model loaded");

		Ok(Self { ctx, threads })
	}
}

/// Decode the buffered file and keep only what the VAD marks as speech
fn speech_samples(audio_path: &Path, options: &TranscribeOptions) -> Result<Vec<f32>, ModelError> {
	let samples = audio::load_wav(audio_path)?;
	if !options.vad_filter {
		return Ok(samples);
	}

	let mut vad = VadProcessor::default();
	let speech = vad.filter_speech(&samples);
	debug!(
		kept_secs = format!("{:.2}", speech.len() as f64 / f64::from(WHISPER_SAMPLE_RATE)),
		speech_ratio = format!("{:.2}", vad.stats().speech_ratio()),
		"🎚️ VAD filter applied"
	);
	Ok(speech)
}

/// Result for audio with no speech left after filtering
fn silent_transcript(options: &TranscribeOptions) -> Transcript {
	Transcript {
		segments: Vec::new(),
		language: options.language.clone().unwrap_or_else(|| FALLBACK_LANGUAGE.to_string()),
	}
}

impl SpeechModel for WhisperModel {
	fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<Transcript, ModelError> {
		let mut samples = speech_samples(audio_path, options)?;

		if samples.is_empty() {
			warn!("⚠️ No speech detected - audio may be silence");
			return Ok(silent_transcript(options));
		}

		let speech_secs = samples.len() as f64 / f64::from(WHISPER_SAMPLE_RATE);
		if samples.len() < MIN_SAMPLES {
			samples.resize(MIN_SAMPLES, 0.0);
		}

		let settings = DecodeSettings::from_options(options);
		info!(
			speech_secs = format!("{:.2}", speech_secs),
			task = %options.task,
			language = settings.language,
			beam_size = options.beam_size,
			"🎬 Running Whisper model"
		);

		let start = Instant::now();
		let mut state = self.ctx.create_state().map_err(|e| ModelError::Inference(format!("failed to create Whisper state: {e}")))?;

		// BLOCKING FFI - cannot be interrupted
		state.full(settings.into_params(self.threads), &samples).map_err(|e| ModelError::Inference(e.to_string()))?;

		let num_segments = state.full_n_segments();
		let mut segments = Vec::new();
		for i in 0..num_segments {
			if let Some(segment) = state.get_segment(i) {
				match segment.to_str() {
					Ok(text) => segments.push(Segment::new(text)),
					Err(e) => warn!(segment = i, error = %e, "Skipping segment with invalid UTF-8"),
				}
			}
		}

		let language = match options.language {
			Some(ref hint) => hint.clone(),
			None => whisper_rs::get_lang_str(state.full_lang_id_from_state()).unwrap_or(FALLBACK_LANGUAGE).to_string(),
		};

		let transcribe_latency = start.elapsed().as_secs_f64();
		info!(
			num_segments = segments.len(),
			%language,
			transcribe_latency_ms = format!("{:.0}", transcribe_latency * 1000.0),
			realtime_factor = format!("{:.2}x", transcribe_latency / speech_secs.max(f64::EPSILON)),
			"✅ Whisper transcription completed"
		);

		Ok(Transcript { segments, language })
	}
}

use tracing::{debug, warn};
use webrtc_vad::{SampleRate, Vad, VadMode};

use crate::audio::WHISPER_SAMPLE_RATE;

/// 30ms at 16kHz
const FRAME_SAMPLES: usize = (WHISPER_SAMPLE_RATE as usize * 30) / 1000;

/// Frames kept around detected speech so word edges are not clipped
const PADDING_FRAMES: usize = 10;

/// Voice Activity Detection filter
///
/// Drops non-speech regions from 16 kHz mono audio before it reaches the
/// recognizer. Uses WebRTC VAD on 30ms frames.
pub struct VadProcessor {
	vad: Vad,
	stats: VadStats,
}

#[derive(Debug, Clone, Default)]
pub struct VadStats {
	pub total_frames: u64,
	pub speech_frames: u64,
	pub silence_frames: u64,
}

impl VadStats {
	pub fn speech_ratio(&self) -> f32 {
		if self.total_frames == 0 {
			return 0.0;
		}
		self.speech_frames as f32 / self.total_frames as f32
	}
}

impl VadProcessor {
	pub fn new(mode: VadMode) -> Self {
		Self {
			vad: Vad::new_with_rate_and_mode(SampleRate::Rate16kHz, mode),
			stats: VadStats::default(),
		}
	}

	/// Keep speech frames (plus padding) and drop the rest
	pub fn filter_speech(&mut self, audio: &[f32]) -> Vec<f32> {
		let frames: Vec<&[f32]> = audio.chunks_exact(FRAME_SAMPLES).collect();
		let flags: Vec<bool> = frames.iter().map(|frame| self.is_speech(frame)).collect();
		let keep = pad_speech(&flags, PADDING_FRAMES);

		let kept: Vec<f32> = frames
			.iter()
			.zip(keep.iter())
			.filter(|(_, keep)| **keep)
			.flat_map(|(frame, _)| frame.iter().copied())
			.collect();

		debug!(
			total_frames = frames.len(),
			kept_frames = keep.iter().filter(|k| **k).count(),
			speech_ratio = format!("{:.2}", self.stats.speech_ratio()),
			"VAD analysis"
		);

		kept
	}

	fn is_speech(&mut self, frame: &[f32]) -> bool {
		// Convert f32 samples to i16 for WebRTC VAD
		let samples_i16: Vec<i16> = frame.iter().map(|&sample| (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16).collect();

		self.stats.total_frames += 1;
		let is_speech = match self.vad.is_voice_segment(&samples_i16) {
			Ok(is_speech) => is_speech,
			Err(()) => {
				// keep the frame rather than lose audio
				warn!("VAD rejected frame");
				true
			}
		};

		if is_speech {
			self.stats.speech_frames += 1;
		} else {
			self.stats.silence_frames += 1;
		}
		is_speech
	}

	/// Get VAD statistics
	pub fn stats(&self) -> &VadStats {
		&self.stats
	}
}

impl Default for VadProcessor {
	fn default() -> Self {
		Self::new(VadMode::Quality)
	}
}

/// Widen every speech frame by `padding` frames on each side
fn pad_speech(flags: &[bool], padding: usize) -> Vec<bool> {
	let mut keep = vec![false; flags.len()];
	for (idx, _) in flags.iter().enumerate().filter(|(_, speech)| **speech) {
		let start = idx.saturating_sub(padding);
		let end = (idx + padding + 1).min(flags.len());
		keep[start..end].iter_mut().for_each(|k| *k = true);
	}
	keep
}

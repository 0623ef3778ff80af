use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::debug;

use crate::model::ModelError;

/// Sample rate whisper.cpp expects
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Decode a WAV file into 16 kHz mono `f32` samples
pub fn load_wav(path: &Path) -> Result<Vec<f32>, ModelError> {
	let reader = WavReader::open(path).map_err(|e| ModelError::Decode(e.to_string()))?;
	let spec = reader.spec();

	debug!(
		sample_rate = spec.sample_rate,
		channels = spec.channels,
		bits_per_sample = spec.bits_per_sample,
		format = ?spec.sample_format,
		"📂 Decoding WAV payload"
	);

	if spec.channels == 0 {
		return Err(ModelError::Decode("WAV header declares zero channels".to_string()));
	}

	let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
		(SampleFormat::Float, 32) => reader.into_samples::<f32>().collect::<Result<_, _>>(),
		(SampleFormat::Int, bits @ 1..=32) => {
			let scale = (1_i64 << (bits - 1)) as f32;
			reader.into_samples::<i32>().map(|s| s.map(|sample| sample as f32 / scale)).collect::<Result<_, _>>()
		}
		(format, bits) => return Err(ModelError::Decode(format!("unsupported sample format {format:?} at {bits} bits"))),
	}
	.map_err(|e| ModelError::Decode(e.to_string()))?;

	let mono = downmix(samples, spec.channels);
	Ok(resample_simple(&mono, spec.sample_rate, WHISPER_SAMPLE_RATE))
}

/// Average interleaved channels into one
pub fn downmix(samples: Vec<f32>, channels: u16) -> Vec<f32> {
	let channels = usize::from(channels);
	if channels <= 1 {
		return samples;
	}

	samples.chunks_exact(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
}

/// Nearest-sample rate conversion
pub fn resample_simple(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
	if from_rate == to_rate || from_rate == 0 {
		return samples.to_vec();
	}

	let ratio = f64::from(from_rate) / f64::from(to_rate);
	let output_len = (samples.len() as f64 / ratio) as usize;

	(0..output_len)
		.map(|i| {
			let src_idx = (i as f64 * ratio) as usize;
			samples.get(src_idx).copied().unwrap_or(0.0)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use hound::{WavSpec, WavWriter};

	fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize, value: i16) {
		let spec = WavSpec {
			channels,
			sample_rate,
			bits_per_sample: 16,
			sample_format: SampleFormat::Int,
		};
		let mut writer = WavWriter::create(path, spec).unwrap();
		for _ in 0..frames * usize::from(channels) {
			writer.write_sample(value).unwrap();
		}
		writer.finalize().unwrap();
	}

	#[test]
	fn test_mono_16k_passthrough() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mono.wav");
		write_wav(&path, 16_000, 1, 16_000, 16_384);

		let samples = load_wav(&path).unwrap();
		assert_eq!(samples.len(), 16_000);
		assert!((samples[0] - 0.5).abs() < 1e-4);
	}

	#[test]
	fn test_stereo_48k_is_downmixed_and_resampled() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("stereo.wav");
		write_wav(&path, 48_000, 2, 48_000, 0);

		let samples = load_wav(&path).unwrap();
		assert_eq!(samples.len(), 16_000);
		assert!(samples.iter().all(|s| *s == 0.0));
	}

	#[test]
	fn test_float_wav() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("float.wav");
		let spec = WavSpec {
			channels: 1,
			sample_rate: 16_000,
			bits_per_sample: 32,
			sample_format: SampleFormat::Float,
		};
		let mut writer = WavWriter::create(&path, spec).unwrap();
		for _ in 0..160 {
			writer.write_sample(0.25_f32).unwrap();
		}
		writer.finalize().unwrap();

		let samples = load_wav(&path).unwrap();
		assert_eq!(samples, vec![0.25; 160]);
	}

	#[test]
	fn test_garbage_bytes_fail_to_decode() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("garbage.wav");
		std::fs::write(&path, b"definitely not a RIFF header").unwrap();

		assert!(matches!(load_wav(&path), Err(ModelError::Decode(_))));
	}

	#[test]
	fn test_downmix_averages_frames() {
		let mixed = downmix(vec![1.0, 0.0, 0.5, 0.5], 2);
		assert_eq!(mixed, vec![0.5, 0.5]);
	}

	#[test]
	fn test_resample_halves_length() {
		let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
		let out = resample_simple(&samples, 32_000, 16_000);
		assert_eq!(out.len(), 50);
		assert_eq!(out[1], 2.0);
	}
}

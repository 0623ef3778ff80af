//! Speech model seam.
//!
//! The HTTP layer only sees [`SpeechModel`]; the whisper.cpp backend lives
//! behind the `whisper` feature and tests plug in stubs.

pub mod resolver;
#[cfg(feature = "whisper")]
pub mod whisper;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Task {
	/// Speech to text in the spoken language
	#[default]
	Transcribe,
	/// Speech to English text
	Translate,
}

impl Task {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Transcribe => "transcribe",
			Self::Translate => "translate",
		}
	}
}

impl fmt::Display for Task {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("unknown task '{0}', expected 'transcribe' or 'translate'")]
pub struct UnknownTask(pub String);

impl FromStr for Task {
	type Err = UnknownTask;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"transcribe" => Ok(Self::Transcribe),
			"translate" => Ok(Self::Translate),
			_ => Err(UnknownTask(s.to_string())),
		}
	}
}

/// Per-call options handed to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeOptions {
	/// Language hint; `None` lets the model detect it
	pub language: Option<String>,
	pub task: Task,
	pub vad_filter: bool,
	/// Beam width; `None` means greedy decoding
	pub beam_size: Option<i32>,
}

impl Default for TranscribeOptions {
	fn default() -> Self {
		Self {
			language: None,
			task: Task::Transcribe,
			vad_filter: true,
			beam_size: None,
		}
	}
}

/// One span of recognised text, in model order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
	pub text: String,
}

impl Segment {
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into() }
	}
}

/// Model output: ordered segments plus the language the model settled on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
	pub segments: Vec<Segment>,
	pub language: String,
}

impl Transcript {
	/// Segments joined in order, surrounding whitespace trimmed
	pub fn text(&self) -> String {
		let joined: String = self.segments.iter().map(|segment| segment.text.as_str()).collect();
		joined.trim().to_string()
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
	#[error("model '{model}' not found (tried: {})", display_paths(.tried))]
	NotFound { model: String, tried: Vec<PathBuf> },

	#[error("failed to load model: {0}")]
	Load(String),

	#[error("failed to decode audio: {0}")]
	Decode(String),

	#[error("transcription failed: {0}")]
	Inference(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
	paths.iter().map(|path| path.display().to_string()).collect::<Vec<_>>().join(", ")
}

/// Blocking speech-to-text capability.
///
/// Implementations are called from the blocking thread pool and may take
/// seconds per call. They must be safe to call from several threads at once;
/// the admission gate decides how many actually do.
pub trait SpeechModel: Send + Sync {
	fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<Transcript, ModelError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_task_parsing() {
		assert_eq!("transcribe".parse::<Task>().unwrap(), Task::Transcribe);
		assert_eq!("Translate".parse::<Task>().unwrap(), Task::Translate);
		assert!("summarize".parse::<Task>().is_err());
	}

	#[test]
	fn test_transcript_text_joins_in_order_and_trims() {
		let transcript = Transcript {
			segments: vec![Segment::new(" Hello"), Segment::new(" world."), Segment::new(" Bye  ")],
			language: "en".to_string(),
		};

		assert_eq!(transcript.text(), "Hello world. Bye");
	}

	#[test]
	fn test_empty_transcript_has_empty_text() {
		let transcript = Transcript {
			segments: Vec::new(),
			language: "en".to_string(),
		};
		assert_eq!(transcript.text(), "");
	}

	#[test]
	fn test_default_options_enable_vad() {
		let options = TranscribeOptions::default();
		assert!(options.vad_filter);
		assert_eq!(options.task, Task::Transcribe);
		assert_eq!(options.beam_size, None);
	}

	#[test]
	fn test_not_found_lists_paths() {
		let err = ModelError::NotFound {
			model: "small".to_string(),
			tried: vec![PathBuf::from("/m/a.bin"), PathBuf::from("/m/b.bin")],
		};
		assert_eq!(err.to_string(), "model 'small' not found (tried: /m/a.bin, /m/b.bin)");
	}
}

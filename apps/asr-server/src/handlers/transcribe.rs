use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Json;
use std::sync::Arc;

use crate::error::AsrError;
use crate::model::Task;
use crate::transcription::{Transcriber, TranscriptionRequest, TranscriptionResult};

/// `?language=<code>&task=<transcribe|translate>`, both optional
#[derive(Debug, Default)]
pub struct TranscribeParams {
	pub language: Option<String>,
	pub task: Option<String>,
}

impl TranscribeParams {
	/// Collect known keys from decoded query pairs; a repeated key keeps its last value
	pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
		pairs.into_iter().fold(Self::default(), |mut params, (key, value)| {
			match key.as_str() {
				"language" => params.language = Some(value),
				"task" => params.task = Some(value),
				_ => {}
			}
			params
		})
	}

	/// Language hint, empty values mean "detect"
	pub fn language(&self) -> Option<String> {
		self.language.as_deref().map(str::trim).filter(|lang| !lang.is_empty()).map(str::to_string)
	}

	pub fn task(&self) -> Result<Task, AsrError> {
		match self.task.as_deref().map(str::trim).filter(|task| !task.is_empty()) {
			Some(raw) => raw.parse::<Task>().map_err(|e| AsrError::invalid_input(e.to_string())),
			None => Ok(Task::default()),
		}
	}
}

#[axum::debug_handler(state = crate::AppState)]
pub async fn transcribe(
	State(transcriber): State<Arc<Transcriber>>,
	query: Result<Query<Vec<(String, String)>>, QueryRejection>,
	body: Result<Bytes, BytesRejection>,
) -> Result<Json<TranscriptionResult>, AsrError> {
	let body = body?;

	// an empty body is rejected by the transcriber whatever the query says
	let (language, task) = if body.is_empty() {
		(None, Task::default())
	} else {
		let Query(pairs) = query?;
		let params = TranscribeParams::from_pairs(pairs);
		(params.language(), params.task()?)
	};

	let request = TranscriptionRequest { audio: body, language, task };

	transcriber.transcribe(request).await.map(Json)
}

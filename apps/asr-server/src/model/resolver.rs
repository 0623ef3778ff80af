use std::path::{Path, PathBuf};

use super::ModelError;

/// ggml quantisation suffixes matching a compute type, best match first
fn quant_suffixes(compute_type: &str) -> &'static [&'static str] {
	match compute_type.to_ascii_lowercase().as_str() {
		"int8" | "int8_float16" | "int8_float32" | "int8_bfloat16" => &["q8_0"],
		"int5" => &["q5_0", "q5_1"],
		"int4" => &["q4_0", "q4_1"],
		_ => &[],
	}
}

/// Candidate model files, in lookup order
pub fn candidates(model: &str, models_dir: &Path, compute_type: &str) -> Vec<PathBuf> {
	let mut paths: Vec<PathBuf> = quant_suffixes(compute_type)
		.iter()
		.map(|quant| models_dir.join(format!("ggml-{model}-{quant}.bin")))
		.collect();
	paths.push(models_dir.join(format!("ggml-{model}.bin")));
	paths
}

/// Resolve a model identifier to a file on disk.
///
/// Resolution order:
/// 1. `model` itself when it names an existing file
/// 2. `<models_dir>/ggml-<model>-<quant>.bin` for the compute type's quantisations
/// 3. `<models_dir>/ggml-<model>.bin`
pub fn resolve(model: &str, models_dir: &Path, compute_type: &str) -> Result<PathBuf, ModelError> {
	let direct = PathBuf::from(model);
	if direct.is_file() {
		return Ok(direct);
	}

	let tried = candidates(model, models_dir, compute_type);
	if let Some(found) = tried.iter().find(|path| path.is_file()) {
		return Ok(found.clone());
	}

	Err(ModelError::NotFound {
		model: model.to_string(),
		tried,
	})
}

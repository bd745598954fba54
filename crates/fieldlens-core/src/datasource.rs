use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{EvalError, Result};
use crate::record::{EvaluationPair, GroundTruth, Prediction, SideMetadata};

/// Anything that can produce the pairs of one evaluation run.
#[async_trait]
pub trait PairSource: Send + Sync {
	async fn load(&self) -> Result<Vec<EvaluationPair>>;
}

pub struct VecPairSource {
	pairs: Vec<EvaluationPair>,
}

impl VecPairSource {
	pub fn new(pairs: Vec<EvaluationPair>) -> Self {
		Self { pairs }
	}
}

#[async_trait]
impl PairSource for VecPairSource {
	async fn load(&self) -> Result<Vec<EvaluationPair>> {
		Ok(self.pairs.clone())
	}
}

#[derive(Deserialize)]
struct PairLine {
	#[serde(default)]
	id: Option<String>,
	prediction: Map<String, Value>,
	ground_truth: Map<String, Value>,
	#[serde(default)]
	latency: Option<f64>,
	#[serde(default)]
	confidence: Option<f64>,
	#[serde(default)]
	raw_output: Option<String>,
	#[serde(default)]
	metadata: Map<String, Value>,
}

impl From<PairLine> for EvaluationPair {
	fn from(line: PairLine) -> Self {
		let metadata = SideMetadata {
			latency: line.latency,
			confidence: line.confidence,
			extra: line.metadata,
		};
		let mut prediction = Prediction::new(line.prediction).with_metadata(metadata);
		prediction.id = line.id.clone();
		prediction.raw_output = line.raw_output;
		let mut ground_truth = GroundTruth::new(line.ground_truth);
		ground_truth.id = line.id;
		EvaluationPair::new(prediction, ground_truth)
	}
}

/// Read JSONL where each line is
/// `{"id"?, "prediction": {...}, "ground_truth": {...}, "latency"?, "confidence"?, "raw_output"?, "metadata"?}`.
/// Blank lines are skipped.
pub struct JsonlPairSource {
	path: PathBuf,
}

impl JsonlPairSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

#[async_trait]
impl PairSource for JsonlPairSource {
	async fn load(&self) -> Result<Vec<EvaluationPair>> {
		let content = read_to_string(&self.path).await?;
		parse_jsonl(&content)
	}
}

pub fn parse_jsonl(content: &str) -> Result<Vec<EvaluationPair>> {
	let mut pairs = Vec::new();
	for (idx, line) in content.lines().enumerate() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		let parsed: PairLine = serde_json::from_str(line)
			.map_err(|e| EvalError::DataSource(format!("line {}: {}", idx + 1, e)))?;
		pairs.push(parsed.into());
	}
	Ok(pairs)
}

#[cfg(not(feature = "sync-fs"))]
async fn read_to_string(path: &Path) -> Result<String> {
	tokio::fs::read_to_string(path)
		.await
		.map_err(|e| EvalError::DataSource(format!("failed to read {}: {}", path.display(), e)))
}

#[cfg(feature = "sync-fs")]
async fn read_to_string(path: &Path) -> Result<String> {
	let owned = path.to_path_buf();
	tokio::task::spawn_blocking(move || {
		std::fs::read_to_string(&owned)
			.map_err(|e| EvalError::DataSource(format!("failed to read {}: {}", owned.display(), e)))
	})
	.await
	.map_err(|e| EvalError::DataSource(e.to_string()))?
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn temp_file(name: &str, content: &str) -> PathBuf {
		let path = std::env::temp_dir().join(format!("fieldlens-{}-{}.jsonl", name, std::process::id()));
		std::fs::write(&path, content).unwrap();
		path
	}

	#[tokio::test]
	async fn loads_pairs_and_side_metadata() {
		let path = temp_file(
			"load",
			concat!(
				r#"{"id": "a", "prediction": {"total": 10}, "ground_truth": {"total": 10}, "latency": 0.2, "confidence": 0.9}"#,
				"\n\n",
				r#"{"prediction": {"total": 11}, "ground_truth": {"total": 10}, "raw_output": "{\"total\": 11}", "metadata": {"tokens": 7}}"#,
				"\n"
			),
		);
		let pairs = JsonlPairSource::new(&path).load().await.unwrap();
		std::fs::remove_file(&path).ok();

		assert_eq!(pairs.len(), 2);
		assert_eq!(pairs[0].prediction.id.as_deref(), Some("a"));
		assert_eq!(pairs[0].ground_truth.id.as_deref(), Some("a"));
		assert_eq!(pairs[0].prediction.metadata.latency, Some(0.2));
		assert_eq!(pairs[0].prediction.metadata.confidence, Some(0.9));
		assert_eq!(pairs[1].prediction.id, None);
		assert_eq!(pairs[1].prediction.raw_output.as_deref(), Some("{\"total\": 11}"));
		assert_eq!(pairs[1].prediction.metadata.extra.get("tokens"), Some(&json!(7)));
	}

	#[tokio::test]
	async fn bad_line_names_its_number() {
		let path = temp_file("bad", "{\"prediction\": {\"a\": 1}, \"ground_truth\": {\"a\": 1}}\n{\"prediction\": {}}\n");
		let err = JsonlPairSource::new(&path).load().await.unwrap_err();
		std::fs::remove_file(&path).ok();
		match err {
			EvalError::DataSource(msg) => assert!(msg.starts_with("line 2"), "{msg}"),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn missing_file_is_a_data_source_error() {
		let missing = std::env::temp_dir().join("fieldlens-definitely-missing.jsonl");
		assert!(matches!(
			JsonlPairSource::new(missing).load().await,
			Err(EvalError::DataSource(_))
		));
	}

	#[tokio::test]
	async fn vec_source_returns_its_pairs() {
		let pair = EvaluationPair::new(
			Prediction::from_value(json!({"a": 1})).unwrap(),
			GroundTruth::from_value(json!({"a": 1})).unwrap(),
		);
		let loaded = VecPairSource::new(vec![pair.clone()]).load().await.unwrap();
		assert_eq!(loaded, vec![pair]);
	}
}

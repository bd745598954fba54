//! Prediction and ground-truth records accumulated by an [`Orchestrator`](crate::Orchestrator).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EvalError, Result};

/// Per-prediction side channel: timing, confidence, anything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideMetadata {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub latency: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confidence: Option<f64>,
	#[serde(default, flatten)]
	pub extra: Map<String, Value>,
}

impl SideMetadata {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn latency(mut self, seconds: f64) -> Self {
		self.latency = Some(seconds);
		self
	}

	pub fn confidence(mut self, confidence: f64) -> Self {
		self.confidence = Some(confidence);
		self
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.extra.insert(key.into(), value.into());
		self
	}

	pub fn validate(&self) -> Result<()> {
		if let Some(l) = self.latency {
			if !l.is_finite() || l < 0.0 {
				return Err(EvalError::malformed(format!("latency must be a non-negative number, got {}", l)));
			}
		}
		if let Some(c) = self.confidence {
			if !c.is_finite() {
				return Err(EvalError::malformed(format!("confidence must be finite, got {}", c)));
			}
		}
		Ok(())
	}
}

/// One structured output produced by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub raw_output: Option<String>,
	pub output: Map<String, Value>,
	#[serde(default)]
	pub metadata: SideMetadata,
}

impl Prediction {
	pub fn new(output: Map<String, Value>) -> Self {
		Self {
			id: None,
			raw_output: None,
			output,
			metadata: SideMetadata::default(),
		}
	}

	/// Build from a JSON object value; anything else is malformed.
	pub fn from_value(output: Value) -> Result<Self> {
		match output {
			Value::Object(map) => Ok(Self::new(map)),
			other => Err(EvalError::malformed(format!("prediction output must be an object, got {}", other))),
		}
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_raw_output(mut self, raw: impl Into<String>) -> Self {
		self.raw_output = Some(raw.into());
		self
	}

	pub fn with_metadata(mut self, metadata: SideMetadata) -> Self {
		self.metadata = metadata;
		self
	}

	pub fn validate(&self) -> Result<()> {
		if self.output.is_empty() {
			return Err(EvalError::malformed("prediction output is empty"));
		}
		if matches!(self.raw_output.as_deref(), Some(raw) if raw.trim().is_empty()) {
			return Err(EvalError::malformed("prediction raw_output is empty"));
		}
		self.metadata.validate()
	}
}

/// Reference record a prediction is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub data: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub metadata: Map<String, Value>,
}

impl GroundTruth {
	pub fn new(data: Map<String, Value>) -> Self {
		Self { id: None, data, metadata: Map::new() }
	}

	pub fn from_value(data: Value) -> Result<Self> {
		match data {
			Value::Object(map) => Ok(Self::new(map)),
			other => Err(EvalError::malformed(format!("ground truth must be an object, got {}", other))),
		}
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn validate(&self) -> Result<()> {
		if self.data.is_empty() {
			return Err(EvalError::malformed("ground truth data is empty"));
		}
		Ok(())
	}
}

/// A prediction with its ground truth, matched by position in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPair {
	pub prediction: Prediction,
	pub ground_truth: GroundTruth,
}

impl EvaluationPair {
	pub fn new(prediction: Prediction, ground_truth: GroundTruth) -> Self {
		Self { prediction, ground_truth }
	}
}

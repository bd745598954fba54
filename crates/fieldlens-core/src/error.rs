//! Evaluation errors.

use thiserror::Error;

/// Errors raised while accumulating or evaluating a run.
#[derive(Debug, Error)]
pub enum EvalError {
	/// Prediction and ground-truth sequences differ in length.
	#[error("count mismatch: {predictions} predictions vs {ground_truths} ground truths")]
	CountMismatch {
		predictions: usize,
		ground_truths: usize,
	},

	/// A metric asked for an input the accumulated run cannot provide.
	#[error("metric '{metric}' requires input '{key}', which this run cannot provide")]
	UnresolvedMetricInput { metric: String, key: String },

	/// A requested metric is not registered.
	#[error("unknown metric '{0}'")]
	UnknownMetric(String),

	/// A record failed shape validation when it was added.
	#[error("malformed record: {0}")]
	MalformedRecord(String),

	/// `evaluate` was called with nothing accumulated.
	#[error("nothing to evaluate: no prediction/ground-truth pairs accumulated")]
	EmptyRun,

	/// The supplied field schema could not be interpreted.
	#[error("invalid schema: {0}")]
	InvalidSchema(String),

	/// A run setting (tolerance, policy) is out of range.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// A metric's compute function returned an error.
	#[error("metric '{metric}' failed: {message}")]
	MetricFailed { metric: String, message: String },

	/// A metric read an input as the wrong kind.
	#[error("metric input '{key}' is not {expected}")]
	InvalidInput { key: String, expected: &'static str },

	/// Loading pairs from a data source failed.
	#[error("data source error: {0}")]
	DataSource(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),
}

impl EvalError {
	pub fn malformed(reason: impl Into<String>) -> Self {
		Self::MalformedRecord(reason.into())
	}

	pub fn metric_failed(metric: impl Into<String>, message: impl Into<String>) -> Self {
		Self::MetricFailed {
			metric: metric.into(),
			message: message.into(),
		}
	}

	pub fn unresolved(metric: impl Into<String>, key: impl Into<String>) -> Self {
		Self::UnresolvedMetricInput {
			metric: metric.into(),
			key: key.into(),
		}
	}
}

/// Result type for fieldlens operations.
pub type Result<T, E = EvalError> = std::result::Result<T, E>;

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{EvalError, Result};
use crate::evaluators::{evaluate_field, Tolerance};
use crate::record::{EvaluationPair, GroundTruth, Prediction, SideMetadata};
use crate::registry::{keys, MetricDescriptor, MetricInput, MetricInputs, MetricRegistry};
use crate::schema::FieldSchema;
use crate::types::{EvaluationResult, FieldResult};

/// What `evaluate` does when a metric needs an input the run cannot provide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedInputPolicy {
	/// Abort the whole call.
	#[default]
	Fail,
	/// Leave the metric out and record why under `details.skipped_metrics`.
	Skip,
}

pub struct OrchestratorBuilder {
	registry: Option<Arc<MetricRegistry>>,
	metrics: Vec<String>,
	schema: Option<FieldSchema>,
	json_schema: Option<Value>,
	tolerance: Tolerance,
	on_unresolved_input: UnresolvedInputPolicy,
	validate_schema: bool,
	run_id: Option<String>,
}

impl OrchestratorBuilder {
	pub fn new() -> Self {
		Self {
			registry: None,
			metrics: Vec::new(),
			schema: None,
			json_schema: None,
			tolerance: Tolerance::default(),
			on_unresolved_input: UnresolvedInputPolicy::default(),
			validate_schema: false,
			run_id: None,
		}
	}

	pub fn registry(mut self, registry: Arc<MetricRegistry>) -> Self {
		self.registry = Some(registry);
		self
	}

	/// Metrics computed by [`Orchestrator::evaluate`]. Empty means every registered metric.
	pub fn metrics<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.metrics = names.into_iter().map(Into::into).collect();
		self
	}

	pub fn add_metric(mut self, name: impl Into<String>) -> Self {
		self.metrics.push(name.into());
		self
	}

	/// JSON-Schema-like description of a record; enables per-field results.
	pub fn schema(mut self, schema: Value) -> Self {
		self.json_schema = Some(schema);
		self
	}

	pub fn field_schema(mut self, schema: FieldSchema) -> Self {
		self.schema = Some(schema);
		self
	}

	pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
		self.tolerance = tolerance;
		self
	}

	pub fn on_unresolved_input(mut self, policy: UnresolvedInputPolicy) -> Self {
		self.on_unresolved_input = policy;
		self
	}

	/// Also validate each prediction against the JSON schema.
	pub fn validate_schema(mut self, enabled: bool) -> Self {
		self.validate_schema = enabled;
		self
	}

	pub fn run_id(mut self, id: impl Into<String>) -> Self {
		self.run_id = Some(id.into());
		self
	}

	pub fn build(self) -> Result<Orchestrator> {
		self.tolerance.validate()?;
		let schema = match (self.schema, &self.json_schema) {
			(Some(s), _) => Some(s),
			(None, Some(raw)) => Some(FieldSchema::from_json(raw)?),
			(None, None) => None,
		};

		let validator = if self.validate_schema {
			let raw = self.json_schema.as_ref().ok_or_else(|| {
				EvalError::InvalidSchema("schema validation requires a JSON schema".to_string())
			})?;
			let compiled = JSONSchema::compile(raw)
				.map_err(|e| EvalError::InvalidSchema(format!("invalid JSON schema: {}", e)))?;
			Some(compiled)
		} else {
			None
		};

		Ok(Orchestrator {
			registry: self.registry.unwrap_or_else(|| Arc::new(MetricRegistry::with_builtins())),
			metrics: self.metrics,
			schema,
			validator,
			tolerance: self.tolerance,
			on_unresolved_input: self.on_unresolved_input,
			run_id: self.run_id,
			predictions: Vec::new(),
			ground_truths: Vec::new(),
		})
	}
}

impl Default for OrchestratorBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Accumulates prediction/ground-truth pairs for one run and evaluates them.
///
/// Pairs are matched by insertion position. `evaluate` never clears what has
/// been accumulated; use [`Orchestrator::reset`] for that.
pub struct Orchestrator {
	registry: Arc<MetricRegistry>,
	metrics: Vec<String>,
	schema: Option<FieldSchema>,
	validator: Option<JSONSchema>,
	tolerance: Tolerance,
	on_unresolved_input: UnresolvedInputPolicy,
	run_id: Option<String>,
	predictions: Vec<Prediction>,
	ground_truths: Vec<GroundTruth>,
}

impl Orchestrator {
	pub fn builder() -> OrchestratorBuilder {
		OrchestratorBuilder::new()
	}

	/// An orchestrator over `registry` with no schema and default settings.
	pub fn new(registry: Arc<MetricRegistry>) -> Self {
		Self {
			registry,
			metrics: Vec::new(),
			schema: None,
			validator: None,
			tolerance: Tolerance::default(),
			on_unresolved_input: UnresolvedInputPolicy::default(),
			run_id: None,
			predictions: Vec::new(),
			ground_truths: Vec::new(),
		}
	}

	pub fn registry(&self) -> &Arc<MetricRegistry> {
		&self.registry
	}

	pub fn schema(&self) -> Option<&FieldSchema> {
		self.schema.as_ref()
	}

	pub fn predictions(&self) -> &[Prediction] {
		&self.predictions
	}

	pub fn ground_truths(&self) -> &[GroundTruth] {
		&self.ground_truths
	}

	/// Append a prediction. `metadata`, when given, replaces the record's own.
	pub fn add_prediction(&mut self, mut prediction: Prediction, metadata: Option<SideMetadata>) -> Result<()> {
		if let Some(metadata) = metadata {
			prediction.metadata = metadata;
		}
		prediction.validate()?;
		self.predictions.push(prediction);
		Ok(())
	}

	pub fn add_ground_truth(&mut self, ground_truth: GroundTruth) -> Result<()> {
		ground_truth.validate()?;
		self.ground_truths.push(ground_truth);
		Ok(())
	}

	/// Append both halves of a pair, or neither if either is malformed.
	pub fn add_pair(&mut self, pair: EvaluationPair) -> Result<()> {
		pair.prediction.validate()?;
		pair.ground_truth.validate()?;
		self.predictions.push(pair.prediction);
		self.ground_truths.push(pair.ground_truth);
		Ok(())
	}

	pub fn extend<I>(&mut self, pairs: I) -> Result<()>
	where
		I: IntoIterator<Item = EvaluationPair>,
	{
		for pair in pairs {
			self.add_pair(pair)?;
		}
		Ok(())
	}

	/// Number of accumulated predictions.
	pub fn len(&self) -> usize {
		self.predictions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.predictions.is_empty() && self.ground_truths.is_empty()
	}

	pub fn reset(&mut self) {
		self.predictions.clear();
		self.ground_truths.clear();
	}

	/// Evaluate the configured metrics, or every registered one if none were configured.
	pub fn evaluate(&self) -> Result<EvaluationResult> {
		let names = if self.metrics.is_empty() {
			self.registry.names()
		} else {
			self.metrics.clone()
		};
		self.run(&names)
	}

	/// Evaluate exactly the named metrics.
	pub fn evaluate_metrics<S: AsRef<str>>(&self, names: &[S]) -> Result<EvaluationResult> {
		let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
		self.run(&names)
	}

	fn run(&self, names: &[String]) -> Result<EvaluationResult> {
		if self.predictions.len() != self.ground_truths.len() {
			return Err(EvalError::CountMismatch {
				predictions: self.predictions.len(),
				ground_truths: self.ground_truths.len(),
			});
		}
		if self.predictions.is_empty() {
			return Err(EvalError::EmptyRun);
		}
		debug!(pairs = self.predictions.len(), metrics = names.len(), "evaluating run");

		let mut result = EvaluationResult::default();
		let mut skipped = Map::new();

		for name in names {
			let descriptor = self
				.registry
				.get(name)
				.ok_or_else(|| EvalError::UnknownMetric(name.clone()))?;
			let inputs = match self.resolve_inputs(&descriptor) {
				Ok(inputs) => inputs,
				Err(err @ EvalError::UnresolvedMetricInput { .. })
					if self.on_unresolved_input == UnresolvedInputPolicy::Skip =>
				{
					warn!(metric = %name, error = %err, "skipping metric");
					skipped.insert(name.clone(), Value::String(err.to_string()));
					continue;
				}
				Err(err) => return Err(err),
			};
			let value = descriptor.compute(&inputs).map_err(|e| match e {
				e @ EvalError::MetricFailed { .. } => e,
				other => EvalError::metric_failed(name, other.to_string()),
			})?;
			result.metrics.insert(name.clone(), value);
		}

		result.details.insert("total_pairs".into(), self.predictions.len().into());
		if !skipped.is_empty() {
			result.details.insert("skipped_metrics".into(), Value::Object(skipped));
		}

		let pair_keys = self.pair_keys();

		if let Some(schema) = &self.schema {
			let field_results = self.field_results(schema, &pair_keys);
			let correct = field_results.values().filter(|r| r.correct).count();
			let accuracy = if field_results.is_empty() {
				0.0
			} else {
				correct as f64 / field_results.len() as f64
			};
			result.details.insert("field_accuracy".into(), accuracy.into());
			result.field_results = Some(field_results);
		}

		if let Some(validator) = &self.validator {
			result
				.details
				.insert("schema_violations".into(), Value::Object(self.schema_violations(validator, &pair_keys)));
		}

		debug!(metrics = result.metrics.len(), "evaluation finished");
		Ok(result)
	}

	fn resolve_inputs(&self, descriptor: &MetricDescriptor) -> Result<MetricInputs> {
		let mut inputs = MetricInputs::new(&descriptor.name);
		for key in &descriptor.input_keys {
			let input = match key.as_str() {
				keys::PREDICTIONS => {
					MetricInput::Records(self.predictions.iter().map(|p| p.output.clone()).collect())
				}
				keys::GROUND_TRUTHS => {
					MetricInput::Records(self.ground_truths.iter().map(|g| g.data.clone()).collect())
				}
				keys::LATENCIES => {
					let latencies: Vec<f64> = self.predictions.iter().filter_map(|p| p.metadata.latency).collect();
					if latencies.is_empty() {
						return Err(EvalError::unresolved(&descriptor.name, key.as_str()));
					}
					MetricInput::Numbers(latencies)
				}
				keys::CONFIDENCES => {
					let confidences: Vec<f64> =
						self.predictions.iter().filter_map(|p| p.metadata.confidence).collect();
					if confidences.is_empty() {
						return Err(EvalError::unresolved(&descriptor.name, key.as_str()));
					}
					MetricInput::Numbers(confidences)
				}
				keys::RAW_OUTPUTS => {
					MetricInput::Strings(self.predictions.iter().filter_map(|p| p.raw_output.clone()).collect())
				}
				keys::IDS => MetricInput::Strings(self.pair_keys()),
				other => {
					let carried = self.predictions.iter().any(|p| p.metadata.extra.contains_key(other));
					if !carried {
						return Err(EvalError::unresolved(&descriptor.name, other));
					}
					MetricInput::Values(
						self.predictions
							.iter()
							.map(|p| p.metadata.extra.get(other).cloned().unwrap_or(Value::Null))
							.collect(),
					)
				}
			};
			inputs.insert(key.clone(), input);
		}
		Ok(inputs)
	}

	// Prediction id, else ground-truth id, else position. Falls back to
	// positions for the whole run if ids collide or contain '.', which
	// separates pair from field in result keys.
	fn pair_keys(&self) -> Vec<String> {
		let ids: Vec<String> = self
			.predictions
			.iter()
			.zip(&self.ground_truths)
			.enumerate()
			.map(|(i, (p, g))| p.id.clone().or_else(|| g.id.clone()).unwrap_or_else(|| i.to_string()))
			.collect();

		let mut seen = HashSet::new();
		let ids = if ids.iter().all(|id| !id.contains('.') && seen.insert(id.as_str())) {
			ids
		} else {
			warn!("duplicate or dotted pair ids in run; keying field results by position");
			(0..ids.len()).map(|i| i.to_string()).collect()
		};

		match &self.run_id {
			Some(run) => ids.into_iter().map(|id| format!("{}/{}", run, id)).collect(),
			None => ids,
		}
	}

	fn field_results(&self, schema: &FieldSchema, pair_keys: &[String]) -> IndexMap<String, FieldResult> {
		let mut out = IndexMap::new();
		let pairs = self.predictions.iter().zip(&self.ground_truths);
		for ((prediction, ground_truth), pair) in pairs.zip(pair_keys) {
			match schema {
				FieldSchema::Object { properties } if !properties.is_empty() => {
					for (name, field) in properties {
						let r = evaluate_field(
							field,
							prediction.output.get(name),
							ground_truth.data.get(name),
							self.tolerance,
						);
						out.insert(format!("{}.{}", pair, name), r);
					}
				}
				_ => {
					let p = Value::Object(prediction.output.clone());
					let g = Value::Object(ground_truth.data.clone());
					out.insert(pair.clone(), evaluate_field(schema, Some(&p), Some(&g), self.tolerance));
				}
			}
		}
		out
	}

	fn schema_violations(&self, validator: &JSONSchema, pair_keys: &[String]) -> Map<String, Value> {
		let mut violations = Map::new();
		for (prediction, pair) in self.predictions.iter().zip(pair_keys) {
			let instance = Value::Object(prediction.output.clone());
			let messages: Vec<Value> = match validator.validate(&instance) {
				Ok(()) => continue,
				Err(errors) => errors
					.map(|e| Value::String(format!("{}: {}", e.instance_path, e)))
					.collect(),
			};
			violations.insert(pair.clone(), Value::Array(messages));
		}
		violations
	}
}

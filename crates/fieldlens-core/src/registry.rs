//! Name-keyed catalogue of aggregate metrics.
//!
//! A [`MetricRegistry`] is an explicit object: build one (usually with
//! [`MetricRegistry::with_builtins`]), share it behind an `Arc`, and hand it to
//! each [`Orchestrator`](crate::Orchestrator). Registering under an existing
//! name replaces the previous descriptor, which lets metrics be redefined
//! while iterating in a long-lived process.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{EvalError, Result};
use crate::types::{MetricCategory, MetricValue};

/// Input keys the orchestrator can resolve from an accumulated run.
pub mod keys {
	pub const PREDICTIONS: &str = "predictions";
	pub const GROUND_TRUTHS: &str = "ground_truths";
	pub const LATENCIES: &str = "latencies";
	pub const CONFIDENCES: &str = "confidences";
	pub const RAW_OUTPUTS: &str = "raw_outputs";
	pub const IDS: &str = "ids";
}

const NO_DESCRIPTION: &str = "No description provided";

pub type ComputeFn = Arc<dyn Fn(&MetricInputs) -> Result<MetricValue> + Send + Sync>;

/// One resolved metric input.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricInput {
	Records(Vec<Map<String, Value>>),
	Numbers(Vec<f64>),
	Strings(Vec<String>),
	Values(Vec<Value>),
}

impl MetricInput {
	fn kind(&self) -> &'static str {
		match self {
			MetricInput::Records(_) => "records",
			MetricInput::Numbers(_) => "numbers",
			MetricInput::Strings(_) => "strings",
			MetricInput::Values(_) => "values",
		}
	}
}

/// Named inputs handed to a metric's compute function.
#[derive(Debug, Clone, Default)]
pub struct MetricInputs {
	metric: String,
	inputs: HashMap<String, MetricInput>,
}

impl MetricInputs {
	pub fn new(metric: impl Into<String>) -> Self {
		Self {
			metric: metric.into(),
			inputs: HashMap::new(),
		}
	}

	pub fn with(mut self, key: impl Into<String>, input: MetricInput) -> Self {
		self.insert(key, input);
		self
	}

	pub fn insert(&mut self, key: impl Into<String>, input: MetricInput) {
		self.inputs.insert(key.into(), input);
	}

	pub fn get(&self, key: &str) -> Result<&MetricInput> {
		self.inputs
			.get(key)
			.ok_or_else(|| EvalError::unresolved(&self.metric, key))
	}

	pub fn records(&self, key: &str) -> Result<&[Map<String, Value>]> {
		match self.get(key)? {
			MetricInput::Records(r) => Ok(r),
			other => Err(self.wrong_kind(key, "records", other)),
		}
	}

	pub fn numbers(&self, key: &str) -> Result<&[f64]> {
		match self.get(key)? {
			MetricInput::Numbers(n) => Ok(n),
			other => Err(self.wrong_kind(key, "numbers", other)),
		}
	}

	pub fn strings(&self, key: &str) -> Result<&[String]> {
		match self.get(key)? {
			MetricInput::Strings(s) => Ok(s),
			other => Err(self.wrong_kind(key, "strings", other)),
		}
	}

	pub fn values(&self, key: &str) -> Result<&[Value]> {
		match self.get(key)? {
			MetricInput::Values(v) => Ok(v),
			other => Err(self.wrong_kind(key, "values", other)),
		}
	}

	fn wrong_kind(&self, key: &str, expected: &'static str, got: &MetricInput) -> EvalError {
		debug!(metric = %self.metric, key, got = got.kind(), expected, "metric input kind mismatch");
		EvalError::InvalidInput {
			key: key.to_string(),
			expected,
		}
	}
}

/// A registered metric: its metadata plus the function computing it.
#[derive(Clone)]
pub struct MetricDescriptor {
	pub name: String,
	pub category: MetricCategory,
	pub input_keys: Vec<String>,
	pub description: String,
	compute: ComputeFn,
}

impl MetricDescriptor {
	pub fn new<I, K, F>(name: impl Into<String>, category: MetricCategory, input_keys: I, compute: F) -> Self
	where
		I: IntoIterator<Item = K>,
		K: Into<String>,
		F: Fn(&MetricInputs) -> Result<MetricValue> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			category,
			input_keys: input_keys.into_iter().map(Into::into).collect(),
			description: NO_DESCRIPTION.to_string(),
			compute: Arc::new(compute),
		}
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		let description = description.into();
		let trimmed = description.trim();
		self.description = if trimmed.is_empty() {
			NO_DESCRIPTION.to_string()
		} else {
			trimmed.to_string()
		};
		self
	}

	pub fn compute(&self, inputs: &MetricInputs) -> Result<MetricValue> {
		(self.compute)(inputs)
	}
}

impl fmt::Debug for MetricDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MetricDescriptor")
			.field("name", &self.name)
			.field("category", &self.category)
			.field("input_keys", &self.input_keys)
			.field("description", &self.description)
			.finish_non_exhaustive()
	}
}

/// Process-lifetime catalogue of metrics, keyed by name.
#[derive(Default)]
pub struct MetricRegistry {
	metrics: RwLock<HashMap<String, Arc<MetricDescriptor>>>,
}

impl MetricRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding `overall_accuracy`, `field_specific_accuracy`,
	/// `average_latency` and `confidence_score`.
	pub fn with_builtins() -> Self {
		let registry = Self::new();
		crate::builtins::register_builtins(&registry);
		registry
	}

	/// Insert or replace a descriptor. Returns the one it replaced, if any.
	pub fn register_descriptor(&self, descriptor: MetricDescriptor) -> Option<Arc<MetricDescriptor>> {
		let name = descriptor.name.clone();
		let previous = self.metrics.write().insert(name.clone(), Arc::new(descriptor));
		if previous.is_some() {
			debug!(metric = %name, "metric redefined");
		}
		previous
	}

	/// Register a metric computed by `compute` over the named `input_keys`.
	pub fn register<I, K, F>(
		&self,
		name: impl Into<String>,
		category: MetricCategory,
		input_keys: I,
		compute: F,
	) -> Option<Arc<MetricDescriptor>>
	where
		I: IntoIterator<Item = K>,
		K: Into<String>,
		F: Fn(&MetricInputs) -> Result<MetricValue> + Send + Sync + 'static,
	{
		self.register_descriptor(MetricDescriptor::new(name, category, input_keys, compute))
	}

	pub fn get(&self, name: &str) -> Option<Arc<MetricDescriptor>> {
		self.metrics.read().get(name).cloned()
	}

	/// Snapshot of every registered metric. Mutating it does not touch the registry.
	pub fn get_all(&self) -> BTreeMap<String, Arc<MetricDescriptor>> {
		self.metrics
			.read()
			.iter()
			.map(|(k, v)| (k.clone(), Arc::clone(v)))
			.collect()
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.metrics.read().keys().cloned().collect();
		names.sort();
		names
	}

	pub fn contains(&self, name: &str) -> bool {
		self.metrics.read().contains_key(name)
	}

	pub fn remove(&self, name: &str) -> bool {
		self.metrics.write().remove(name).is_some()
	}

	pub fn len(&self) -> usize {
		self.metrics.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.metrics.read().is_empty()
	}
}

impl fmt::Debug for MetricRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MetricRegistry")
			.field("metrics", &self.names())
			.finish()
	}
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// Which aspect of a run a metric describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
	Accuracy,
	Performance,
	#[default]
	Other,
}

impl fmt::Display for MetricCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MetricCategory::Accuracy => write!(f, "accuracy"),
			MetricCategory::Performance => write!(f, "performance"),
			MetricCategory::Other => write!(f, "other"),
		}
	}
}

/// Output of a metric: a single number or a keyed breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
	Scalar(f64),
	Mapping(BTreeMap<String, f64>),
}

impl MetricValue {
	pub fn as_scalar(&self) -> Option<f64> {
		match self {
			MetricValue::Scalar(v) => Some(*v),
			MetricValue::Mapping(_) => None,
		}
	}

	pub fn as_mapping(&self) -> Option<&BTreeMap<String, f64>> {
		match self {
			MetricValue::Scalar(_) => None,
			MetricValue::Mapping(m) => Some(m),
		}
	}
}

impl From<f64> for MetricValue {
	fn from(v: f64) -> Self {
		MetricValue::Scalar(v)
	}
}

impl From<BTreeMap<String, f64>> for MetricValue {
	fn from(m: BTreeMap<String, f64>) -> Self {
		MetricValue::Mapping(m)
	}
}

/// Outcome of comparing one predicted field against its ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResult {
	pub correct: bool,
	pub predicted: Value,
	pub ground_truth: Value,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub details: Map<String, Value>,
}

impl FieldResult {
	pub fn new(correct: bool, predicted: Value, ground_truth: Value) -> Self {
		Self { correct, predicted, ground_truth, details: Map::new() }
	}

	pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.details.insert(key.into(), value.into());
		self
	}

	pub fn detail(&self, key: &str) -> Option<&Value> {
		self.details.get(key)
	}

	/// Fraction of positionally correct items, present on array results.
	pub fn array_accuracy(&self) -> Option<f64> {
		self.details.get("array_accuracy").and_then(Value::as_f64)
	}

	pub fn correct_items(&self) -> Option<u64> {
		self.details.get("correct_items").and_then(Value::as_u64)
	}

	pub fn total_items(&self) -> Option<u64> {
		self.details.get("total_items").and_then(Value::as_u64)
	}

	/// Per-item results of an array comparison, in index order.
	pub fn item_results(&self) -> Option<Vec<FieldResult>> {
		let items = self.details.get("item_results")?;
		serde_json::from_value(items.clone()).ok()
	}

	/// Per-property results of an object comparison.
	pub fn property_results(&self) -> Option<IndexMap<String, FieldResult>> {
		let props = self.details.get("property_results")?;
		serde_json::from_value(props.clone()).ok()
	}
}

/// Summary of one `evaluate` call over an accumulated run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
	pub metrics: IndexMap<String, MetricValue>,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub details: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub field_results: Option<IndexMap<String, FieldResult>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
struct MetricRow {
	metric: String,
	value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
struct FieldRow {
	field: String,
	correct: String,
	predicted: String,
	ground_truth: String,
	notes: String,
}

impl EvaluationResult {
	pub fn metric(&self, name: &str) -> Option<&MetricValue> {
		self.metrics.get(name)
	}

	pub fn scalar(&self, name: &str) -> Option<f64> {
		self.metrics.get(name).and_then(MetricValue::as_scalar)
	}

	pub fn field(&self, key: &str) -> Option<&FieldResult> {
		self.field_results.as_ref().and_then(|f| f.get(key))
	}

	/// (correct, total) over the top-level field results, if any were produced.
	pub fn field_counts(&self) -> Option<(usize, usize)> {
		let fields = self.field_results.as_ref()?;
		let correct = fields.values().filter(|f| f.correct).count();
		Some((correct, fields.len()))
	}

	pub fn summary_table(&self) -> String {
		use tabled::Table;

		let mut metric_rows = Vec::new();
		for (name, value) in &self.metrics {
			match value {
				MetricValue::Scalar(v) => metric_rows.push(MetricRow {
					metric: name.clone(),
					value: format!("{:.4}", v),
				}),
				MetricValue::Mapping(m) => {
					for (key, v) in m {
						metric_rows.push(MetricRow {
							metric: format!("{}.{}", name, key),
							value: format!("{:.4}", v),
						});
					}
				}
			}
		}

		let mut out = Table::new(metric_rows).to_string();

		if let Some(fields) = &self.field_results {
			let rows: Vec<FieldRow> = fields.iter().map(|(key, fr)| {
				let notes = match fr.array_accuracy() {
					Some(acc) => format!(
						"items {}/{} ({:.1}%)",
						fr.correct_items().unwrap_or(0),
						fr.total_items().unwrap_or(0),
						acc * 100.0
					),
					None => fr.details.get("missing")
						.map(|m| format!("missing {}", value_preview(m)))
						.unwrap_or_default(),
				};
				FieldRow {
					field: key.clone(),
					correct: if fr.correct { "✓" } else { "✗" }.to_string(),
					predicted: truncate(value_preview(&fr.predicted), 48),
					ground_truth: truncate(value_preview(&fr.ground_truth), 48),
					notes,
				}
			}).collect();

			out.push_str("\n\n");
			out.push_str(&Table::new(rows).to_string());
		}

		if let Some((correct, total)) = self.field_counts() {
			let rate = if total == 0 { 0.0 } else { correct as f64 / total as f64 };
			out.push_str(&format!(
				"\n\nFields: {}  Correct: {}  Field accuracy: {:.1}%",
				total,
				correct,
				rate * 100.0
			));
		}

		format!("{}\n", out)
	}
}

fn value_preview(v: &Value) -> String {
	match v {
		Value::String(s) => s.clone(),
		_ => v.to_string(),
	}
}

fn truncate(s: String, max_len: usize) -> String {
	if s.chars().count() <= max_len {
		return s;
	}
	let mut truncated = s.chars().take(max_len.saturating_sub(1)).collect::<String>();
	truncated.push('…');
	truncated
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn field_result_accessors_read_array_details() {
		let item = FieldResult::new(true, json!(1), json!(1));
		let fr = FieldResult::new(false, json!([1]), json!([1, 2]))
			.with_detail("array_accuracy", 0.5)
			.with_detail("correct_items", 1)
			.with_detail("total_items", 2)
			.with_detail("item_results", serde_json::to_value(vec![item.clone()]).unwrap());

		assert_eq!(fr.array_accuracy(), Some(0.5));
		assert_eq!(fr.correct_items(), Some(1));
		assert_eq!(fr.total_items(), Some(2));
		assert_eq!(fr.item_results(), Some(vec![item]));
		assert!(fr.property_results().is_none());
	}

	#[test]
	fn metric_value_serializes_untagged() {
		let mut m = BTreeMap::new();
		m.insert("total".to_string(), 0.5);
		assert_eq!(serde_json::to_value(MetricValue::Scalar(0.25)).unwrap(), json!(0.25));
		assert_eq!(serde_json::to_value(MetricValue::Mapping(m)).unwrap(), json!({"total": 0.5}));

		let back: MetricValue = serde_json::from_value(json!({"a": 1.0})).unwrap();
		assert_eq!(back.as_mapping().map(|m| m.len()), Some(1));
	}

	#[test]
	fn summary_table_lists_metrics_and_fields() {
		let mut result = EvaluationResult::default();
		result.metrics.insert("overall_accuracy".into(), MetricValue::Scalar(0.75));
		let mut per_field = BTreeMap::new();
		per_field.insert("total".to_string(), 0.5);
		result.metrics.insert("field_specific_accuracy".into(), per_field.into());
		let mut fields = IndexMap::new();
		fields.insert("0.total".to_string(), FieldResult::new(false, json!(1.0), json!(2.0)));
		fields.insert("0.name".to_string(), FieldResult::new(true, json!("a"), json!("a")));
		result.field_results = Some(fields);

		let table = result.summary_table();
		assert!(table.contains("overall_accuracy"));
		assert!(table.contains("field_specific_accuracy.total"));
		assert!(table.contains("0.total"));
		assert!(table.contains("Field accuracy: 50.0%"));
		assert_eq!(result.field_counts(), Some((1, 2)));
	}

	#[test]
	fn truncate_keeps_char_boundaries() {
		let s = "é".repeat(10);
		let t = truncate(s, 4);
		assert_eq!(t.chars().count(), 4);
		assert!(t.ends_with('…'));
	}
}

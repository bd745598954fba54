//! Metrics every registry built with [`MetricRegistry::with_builtins`] carries.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::evaluators::json_equal;
use crate::registry::{keys, MetricDescriptor, MetricInputs, MetricRegistry};
use crate::types::{MetricCategory, MetricValue};

pub const OVERALL_ACCURACY: &str = "overall_accuracy";
pub const FIELD_SPECIFIC_ACCURACY: &str = "field_specific_accuracy";
pub const AVERAGE_LATENCY: &str = "average_latency";
pub const CONFIDENCE_SCORE: &str = "confidence_score";

pub fn register_builtins(registry: &MetricRegistry) {
	registry.register_descriptor(
		MetricDescriptor::new(
			OVERALL_ACCURACY,
			MetricCategory::Accuracy,
			[keys::GROUND_TRUTHS, keys::PREDICTIONS],
			overall_accuracy,
		)
		.with_description("Fraction of ground-truth fields, across every pair, whose predicted value matches."),
	);
	registry.register_descriptor(
		MetricDescriptor::new(
			FIELD_SPECIFIC_ACCURACY,
			MetricCategory::Accuracy,
			[keys::GROUND_TRUTHS, keys::PREDICTIONS],
			field_specific_accuracy,
		)
		.with_description("Per top-level field: fraction of pairs where the predicted value matches."),
	);
	registry.register_descriptor(
		MetricDescriptor::new(AVERAGE_LATENCY, MetricCategory::Performance, [keys::LATENCIES], average_latency)
			.with_description("Mean latency over predictions that report one."),
	);
	registry.register_descriptor(
		MetricDescriptor::new(CONFIDENCE_SCORE, MetricCategory::Performance, [keys::CONFIDENCES], confidence_score)
			.with_description("Mean confidence over predictions that report one."),
	);
}

/// Fields are counted from the ground truth; a key the prediction lacks is a miss.
pub fn overall_accuracy(inputs: &MetricInputs) -> Result<MetricValue> {
	let ground_truths = inputs.records(keys::GROUND_TRUTHS)?;
	let predictions = inputs.records(keys::PREDICTIONS)?;

	let mut total = 0usize;
	let mut correct = 0usize;
	for (gt, pred) in ground_truths.iter().zip(predictions) {
		for (key, expected) in gt {
			total += 1;
			if field_matches(pred, key, expected) {
				correct += 1;
			}
		}
	}
	Ok(MetricValue::Scalar(ratio(correct, total)))
}

pub fn field_specific_accuracy(inputs: &MetricInputs) -> Result<MetricValue> {
	let ground_truths = inputs.records(keys::GROUND_TRUTHS)?;
	let predictions = inputs.records(keys::PREDICTIONS)?;

	let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
	for (gt, pred) in ground_truths.iter().zip(predictions) {
		for (key, expected) in gt {
			let entry = counts.entry(key.clone()).or_default();
			entry.1 += 1;
			if field_matches(pred, key, expected) {
				entry.0 += 1;
			}
		}
	}
	Ok(MetricValue::Mapping(
		counts
			.into_iter()
			.map(|(key, (correct, total))| (key, ratio(correct, total)))
			.collect(),
	))
}

pub fn average_latency(inputs: &MetricInputs) -> Result<MetricValue> {
	Ok(MetricValue::Scalar(mean(inputs.numbers(keys::LATENCIES)?)))
}

pub fn confidence_score(inputs: &MetricInputs) -> Result<MetricValue> {
	Ok(MetricValue::Scalar(mean(inputs.numbers(keys::CONFIDENCES)?)))
}

fn field_matches(prediction: &Map<String, Value>, key: &str, expected: &Value) -> bool {
	prediction.get(key).is_some_and(|v| json_equal(v, expected))
}

fn ratio(n: usize, d: usize) -> f64 {
	if d == 0 { 0.0 } else { n as f64 / d as f64 }
}

fn mean(values: &[f64]) -> f64 {
	if values.is_empty() {
		0.0
	} else {
		values.iter().sum::<f64>() / values.len() as f64
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::registry::MetricInput;
	use serde_json::json;

	fn record(v: Value) -> Map<String, Value> {
		v.as_object().cloned().unwrap()
	}

	fn invoice_inputs(n: usize) -> MetricInputs {
		let mut gts = Vec::new();
		let mut preds = Vec::new();
		for i in 0..n {
			gts.push(record(json!({
				"invoice_number": format!("INV-{:04}", i),
				"total_amount": 100.0,
				"date": "2023-01-01"
			})));
			preds.push(record(json!({
				"invoice_number": format!("INV-{:04}", i),
				"total_amount": if i % 2 == 0 { 100.0 } else { 200.0 },
				"date": "2023-01-01"
			})));
		}
		MetricInputs::new("test")
			.with(keys::GROUND_TRUTHS, MetricInput::Records(gts))
			.with(keys::PREDICTIONS, MetricInput::Records(preds))
	}

	#[test]
	fn overall_accuracy_counts_every_field() {
		let v = overall_accuracy(&invoice_inputs(10)).unwrap().as_scalar().unwrap();
		// 30 fields, 5 wrong totals
		assert!((v - 25.0 / 30.0).abs() < 1e-12);
	}

	#[test]
	fn field_specific_accuracy_isolates_the_bad_field() {
		let v = field_specific_accuracy(&invoice_inputs(10)).unwrap();
		let m = v.as_mapping().unwrap();
		assert_eq!(m["total_amount"], 0.5);
		assert_eq!(m["invoice_number"], 1.0);
		assert_eq!(m["date"], 1.0);
	}

	#[test]
	fn missing_prediction_key_is_a_miss() {
		let inputs = MetricInputs::new("t")
			.with(keys::GROUND_TRUTHS, MetricInput::Records(vec![record(json!({"a": 1, "b": 2}))]))
			.with(keys::PREDICTIONS, MetricInput::Records(vec![record(json!({"a": 1.0}))]));
		assert_eq!(overall_accuracy(&inputs).unwrap(), MetricValue::Scalar(0.5));
	}

	#[test]
	fn means_over_reported_values() {
		let inputs = MetricInputs::new("t")
			.with(keys::LATENCIES, MetricInput::Numbers(vec![0.2, 0.4]))
			.with(keys::CONFIDENCES, MetricInput::Numbers(vec![0.8, 1.0]));
		let l = average_latency(&inputs).unwrap().as_scalar().unwrap();
		assert!((l - 0.3).abs() < 1e-12);
		let c = confidence_score(&inputs).unwrap().as_scalar().unwrap();
		assert!((c - 0.9).abs() < 1e-12);
	}
}

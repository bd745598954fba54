use serde_json::Value;
use strsim::levenshtein;

use super::{type_mismatch, FieldEvaluator};
use crate::types::FieldResult;

/// Exact, case-sensitive string comparison. No trimming or normalization.
///
/// The Levenshtein similarity is recorded in `details` for diagnostics only.
pub struct StringEvaluator;

impl FieldEvaluator for StringEvaluator {
	fn name(&self) -> &'static str {
		"string"
	}

	fn evaluate(&self, predicted: &Value, ground_truth: &Value) -> FieldResult {
		let (Some(p), Some(g)) = (predicted.as_str(), ground_truth.as_str()) else {
			return type_mismatch(predicted, ground_truth, self.name());
		};
		FieldResult::new(p == g, predicted.clone(), ground_truth.clone())
			.with_detail("similarity", similarity(p, g))
	}
}

pub fn similarity(a: &str, b: &str) -> f64 {
	let max_len = a.chars().count().max(b.chars().count()).max(1) as f64;
	1.0 - (levenshtein(a, b) as f64 / max_len)
}

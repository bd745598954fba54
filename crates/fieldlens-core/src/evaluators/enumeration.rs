use serde_json::Value;

use super::{json_equal, FieldEvaluator};
use crate::types::FieldResult;

/// Correct iff predicted equals ground truth. Membership in the declared
/// enum is recorded as `in_enum` but never changes `correct`.
pub struct EnumEvaluator<'a> {
	values: &'a [Value],
}

impl<'a> EnumEvaluator<'a> {
	pub fn new(values: &'a [Value]) -> Self {
		Self { values }
	}

	pub fn contains(&self, value: &Value) -> bool {
		self.values.iter().any(|v| json_equal(v, value))
	}
}

impl FieldEvaluator for EnumEvaluator<'_> {
	fn name(&self) -> &'static str {
		"enum"
	}

	fn evaluate(&self, predicted: &Value, ground_truth: &Value) -> FieldResult {
		FieldResult::new(json_equal(predicted, ground_truth), predicted.clone(), ground_truth.clone())
			.with_detail("in_enum", self.contains(predicted))
	}
}

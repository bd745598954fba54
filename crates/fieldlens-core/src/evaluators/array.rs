use serde_json::Value;

use super::{evaluate_field, type_mismatch, FieldEvaluator, Tolerance};
use crate::schema::FieldSchema;
use crate::types::FieldResult;

/// Positional array comparison: item `i` of the prediction is scored against
/// item `i` of the ground truth, never by content matching.
///
/// The array is correct only when both sides have the same length and every
/// item is correct. `array_accuracy` is reported regardless, so a length
/// mismatch still shows how many leading items lined up.
pub struct ArrayEvaluator<'a> {
	items: &'a FieldSchema,
	tolerance: Tolerance,
}

impl<'a> ArrayEvaluator<'a> {
	pub fn new(items: &'a FieldSchema, tolerance: Tolerance) -> Self {
		Self { items, tolerance }
	}
}

impl FieldEvaluator for ArrayEvaluator<'_> {
	fn name(&self) -> &'static str {
		"array"
	}

	fn evaluate(&self, predicted: &Value, ground_truth: &Value) -> FieldResult {
		let (Some(pred_items), Some(gt_items)) = (predicted.as_array(), ground_truth.as_array()) else {
			return type_mismatch(predicted, ground_truth, self.name());
		};

		let total_items = gt_items.len();
		let slots = total_items.max(pred_items.len());
		let mut item_results = Vec::with_capacity(slots);
		let mut correct_items = 0usize;

		for i in 0..slots {
			let result = evaluate_field(self.items, pred_items.get(i), gt_items.get(i), self.tolerance);
			if i < total_items && result.correct {
				correct_items += 1;
			}
			item_results.push(result);
		}

		let array_accuracy = if total_items == 0 {
			1.0
		} else {
			correct_items as f64 / total_items as f64
		};
		let correct = pred_items.len() == total_items && correct_items == total_items;

		FieldResult::new(correct, predicted.clone(), ground_truth.clone())
			.with_detail("array_accuracy", array_accuracy)
			.with_detail("correct_items", correct_items)
			.with_detail("total_items", total_items)
			.with_detail("predicted_items", pred_items.len())
			.with_detail(
				"item_results",
				serde_json::to_value(&item_results).unwrap_or(Value::Null),
			)
	}
}

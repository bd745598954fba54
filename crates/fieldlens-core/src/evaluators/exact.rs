use serde_json::Value;

use super::FieldEvaluator;
use crate::types::FieldResult;

/// Fallback for schema types with no dedicated evaluator.
pub struct ExactEvaluator;

impl FieldEvaluator for ExactEvaluator {
	fn name(&self) -> &'static str {
		"exact"
	}

	fn evaluate(&self, predicted: &Value, ground_truth: &Value) -> FieldResult {
		FieldResult::new(json_equal(predicted, ground_truth), predicted.clone(), ground_truth.clone())
	}
}

/// JSON equality where numbers compare by value, so `100` equals `100.0`.
pub fn json_equal(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => {
			if x == y {
				return true;
			}
			if !x.is_f64() && !y.is_f64() {
				return false;
			}
			matches!((x.as_f64(), y.as_f64()), (Some(x), Some(y)) if x == y)
		}
		(Value::Array(x), Value::Array(y)) => {
			x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| json_equal(a, b))
		}
		(Value::Object(x), Value::Object(y)) => {
			x.len() == y.len()
				&& x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
		}
		_ => a == b,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn numbers_compare_by_value() {
		assert!(json_equal(&json!(100), &json!(100.0)));
		assert!(json_equal(&json!(-2), &json!(-2.0)));
		assert!(!json_equal(&json!(100), &json!(100.5)));
		assert!(!json_equal(&json!(u64::MAX), &json!(u64::MAX - 1)));
	}

	#[test]
	fn nested_structures() {
		assert!(json_equal(
			&json!({"a": [1, {"b": 2.0}]}),
			&json!({"a": [1.0, {"b": 2}]})
		));
		assert!(!json_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
		assert!(!json_equal(&json!([1, 2]), &json!([2, 1])));
		assert!(!json_equal(&json!("1"), &json!(1)));
	}

	#[test]
	fn exact_evaluator_uses_equality() {
		assert!(ExactEvaluator.evaluate(&json!(true), &json!(true)).correct);
		assert!(!ExactEvaluator.evaluate(&json!(true), &json!(false)).correct);
	}
}

//! Field evaluators and the schema-driven dispatcher.

pub mod array;
pub mod enumeration;
pub mod exact;
pub mod number;
pub mod object;
pub mod string;

use serde_json::Value;

use crate::schema::FieldSchema;
use crate::types::FieldResult;

pub use array::ArrayEvaluator;
pub use enumeration::EnumEvaluator;
pub use exact::{json_equal, ExactEvaluator};
pub use number::{NumberEvaluator, Tolerance};
pub use object::ObjectEvaluator;
pub use string::StringEvaluator;

/// Compares a predicted value against its ground truth.
pub trait FieldEvaluator {
	fn name(&self) -> &'static str;
	fn evaluate(&self, predicted: &Value, ground_truth: &Value) -> FieldResult;
}

/// Evaluate one field against its schema.
///
/// Either side may be absent (a key missing from its record); that is always
/// incorrect. A `null` on either side is compared by exact equality so that a
/// field left empty on both sides matches.
pub fn evaluate_field(
	schema: &FieldSchema,
	predicted: Option<&Value>,
	ground_truth: Option<&Value>,
	tolerance: Tolerance,
) -> FieldResult {
	let (predicted, ground_truth) = match (predicted, ground_truth) {
		(Some(p), Some(g)) => (p, g),
		(p, g) => return missing(p, g),
	};

	if predicted.is_null() || ground_truth.is_null() {
		return ExactEvaluator.evaluate(predicted, ground_truth);
	}

	match schema {
		FieldSchema::Number { tolerance: overrides } => {
			NumberEvaluator::new(overrides.apply(tolerance)).evaluate(predicted, ground_truth)
		}
		FieldSchema::String => StringEvaluator.evaluate(predicted, ground_truth),
		FieldSchema::Enum { values } => EnumEvaluator::new(values).evaluate(predicted, ground_truth),
		FieldSchema::Array { items } => {
			ArrayEvaluator::new(items, tolerance).evaluate(predicted, ground_truth)
		}
		FieldSchema::Object { properties } => {
			ObjectEvaluator::new(properties, tolerance).evaluate(predicted, ground_truth)
		}
		FieldSchema::Other => ExactEvaluator.evaluate(predicted, ground_truth),
	}
}

fn missing(predicted: Option<&Value>, ground_truth: Option<&Value>) -> FieldResult {
	let side = match (predicted, ground_truth) {
		(None, None) => "both",
		(None, Some(_)) => "predicted",
		_ => "ground_truth",
	};
	FieldResult::new(
		false,
		predicted.cloned().unwrap_or(Value::Null),
		ground_truth.cloned().unwrap_or(Value::Null),
	)
	.with_detail("missing", side)
}

pub(crate) fn type_mismatch(predicted: &Value, ground_truth: &Value, expected: &str) -> FieldResult {
	FieldResult::new(false, predicted.clone(), ground_truth.clone())
		.with_detail("type_mismatch", true)
		.with_detail("expected_type", expected)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn missing_side_is_incorrect_not_error() {
		let r = evaluate_field(&FieldSchema::String, None, Some(&json!("a")), Tolerance::default());
		assert!(!r.correct);
		assert_eq!(r.detail("missing"), Some(&json!("predicted")));
		assert_eq!(r.predicted, Value::Null);

		let r = evaluate_field(&FieldSchema::number(), Some(&json!(1)), None, Tolerance::default());
		assert_eq!(r.detail("missing"), Some(&json!("ground_truth")));

		let r = evaluate_field(&FieldSchema::Other, None, None, Tolerance::default());
		assert!(!r.correct);
		assert_eq!(r.detail("missing"), Some(&json!("both")));
	}

	#[test]
	fn nulls_compare_by_equality() {
		let t = Tolerance::default();
		assert!(evaluate_field(&FieldSchema::number(), Some(&Value::Null), Some(&Value::Null), t).correct);
		assert!(!evaluate_field(&FieldSchema::number(), Some(&Value::Null), Some(&json!(3)), t).correct);
	}

	#[test]
	fn dispatches_on_schema_variant() {
		let t = Tolerance::default();
		let enum_schema = FieldSchema::enumeration(["red", "green"]);
		let r = evaluate_field(&enum_schema, Some(&json!("red")), Some(&json!("red")), t);
		assert!(r.correct);
		assert_eq!(r.detail("in_enum"), Some(&json!(true)));

		let r = evaluate_field(&FieldSchema::String, Some(&json!("Red")), Some(&json!("red")), t);
		assert!(!r.correct);

		let r = evaluate_field(&FieldSchema::Other, Some(&json!(true)), Some(&json!(true)), t);
		assert!(r.correct);
	}

	#[test]
	fn per_field_override_beats_run_tolerance() {
		let loose = FieldSchema::number_with_tolerance(1.0, 0.1);
		let r = evaluate_field(&loose, Some(&json!(100.5)), Some(&json!(100)), Tolerance::default());
		assert!(r.correct);
		let r = evaluate_field(&FieldSchema::number(), Some(&json!(100.5)), Some(&json!(100)), Tolerance::default());
		assert!(!r.correct);
	}
}

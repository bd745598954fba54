use serde_json::{Map, Value};

use super::{evaluate_field, json_equal, type_mismatch, FieldEvaluator, Tolerance};
use crate::schema::FieldSchema;
use crate::types::FieldResult;

/// Property-by-property comparison of structured values.
///
/// Every declared property must be correct; a property missing from either
/// side counts as a mismatch. Undeclared properties are ignored. With no
/// declared properties the whole values are compared for equality.
pub struct ObjectEvaluator<'a> {
	properties: &'a [(String, FieldSchema)],
	tolerance: Tolerance,
}

impl<'a> ObjectEvaluator<'a> {
	pub fn new(properties: &'a [(String, FieldSchema)], tolerance: Tolerance) -> Self {
		Self { properties, tolerance }
	}
}

impl FieldEvaluator for ObjectEvaluator<'_> {
	fn name(&self) -> &'static str {
		"object"
	}

	fn evaluate(&self, predicted: &Value, ground_truth: &Value) -> FieldResult {
		let (Some(pred), Some(gt)) = (predicted.as_object(), ground_truth.as_object()) else {
			return type_mismatch(predicted, ground_truth, self.name());
		};

		if self.properties.is_empty() {
			return FieldResult::new(json_equal(predicted, ground_truth), predicted.clone(), ground_truth.clone());
		}

		let mut property_results = Map::new();
		let mut correct_properties = 0usize;
		for (name, schema) in self.properties {
			let result = evaluate_field(schema, pred.get(name), gt.get(name), self.tolerance);
			if result.correct {
				correct_properties += 1;
			}
			property_results.insert(
				name.clone(),
				serde_json::to_value(&result).unwrap_or(Value::Null),
			);
		}

		let total = self.properties.len();
		FieldResult::new(correct_properties == total, predicted.clone(), ground_truth.clone())
			.with_detail("correct_properties", correct_properties)
			.with_detail("total_properties", total)
			.with_detail("property_results", Value::Object(property_results))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn schema() -> FieldSchema {
		FieldSchema::object([
			("name", FieldSchema::String),
			("price", FieldSchema::number()),
			("tags", FieldSchema::array(FieldSchema::String)),
		])
	}

	fn eval(p: Value, g: Value) -> FieldResult {
		let FieldSchema::Object { properties } = schema() else { unreachable!() };
		ObjectEvaluator::new(&properties, Tolerance::default()).evaluate(&p, &g)
	}

	#[test]
	fn all_declared_properties_must_match() {
		let v = json!({"name": "Laptop", "price": 899.99, "tags": ["a"]});
		let r = eval(v.clone(), v);
		assert!(r.correct);
		assert_eq!(r.detail("correct_properties"), Some(&json!(3)));

		let r = eval(
			json!({"name": "Laptop", "price": 899.0, "tags": ["a"]}),
			json!({"name": "Laptop", "price": 899.99, "tags": ["a"]}),
		);
		assert!(!r.correct);
		let props = r.property_results().unwrap();
		assert!(props["name"].correct);
		assert!(!props["price"].correct);
	}

	#[test]
	fn missing_property_on_either_side_is_mismatch() {
		let r = eval(
			json!({"name": "Laptop", "tags": []}),
			json!({"name": "Laptop", "price": 1, "tags": []}),
		);
		assert!(!r.correct);
		assert_eq!(r.property_results().unwrap()["price"].detail("missing"), Some(&json!("predicted")));

		let r = eval(json!({"name": "x", "price": 1, "tags": []}), json!({"name": "x", "tags": []}));
		assert!(!r.correct);
	}

	#[test]
	fn undeclared_properties_are_ignored() {
		let r = eval(
			json!({"name": "x", "price": 1, "tags": [], "extra": true}),
			json!({"name": "x", "price": 1.0, "tags": []}),
		);
		assert!(r.correct);
	}

	#[test]
	fn empty_property_list_compares_whole_value() {
		let e = ObjectEvaluator::new(&[], Tolerance::default());
		assert!(e.evaluate(&json!({"a": 1}), &json!({"a": 1.0})).correct);
		assert!(!e.evaluate(&json!({"a": 1}), &json!({"a": 2})).correct);
	}
}

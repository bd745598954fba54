//! Typed field schemas parsed from JSON-Schema-like descriptions.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::{EvalError, Result};
use crate::evaluators::number::Tolerance;

/// Per-field overrides of the run-wide numeric tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToleranceOverride {
	pub absolute: Option<f64>,
	pub relative: Option<f64>,
}

impl ToleranceOverride {
	pub fn is_empty(&self) -> bool {
		self.absolute.is_none() && self.relative.is_none()
	}

	pub fn apply(&self, base: Tolerance) -> Tolerance {
		Tolerance {
			absolute: self.absolute.unwrap_or(base.absolute),
			relative: self.relative.unwrap_or(base.relative),
			epsilon: base.epsilon,
		}
	}
}

/// Expected shape of one field. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSchema {
	Number { tolerance: ToleranceOverride },
	String,
	Enum { values: Vec<Value> },
	Array { items: Box<FieldSchema> },
	/// Properties in declaration order.
	Object { properties: Vec<(String, FieldSchema)> },
	/// Anything else; compared by exact equality.
	Other,
}

impl FieldSchema {
	pub fn number() -> Self {
		FieldSchema::Number {
			tolerance: ToleranceOverride::default(),
		}
	}

	pub fn number_with_tolerance(absolute: f64, relative: f64) -> Self {
		FieldSchema::Number {
			tolerance: ToleranceOverride {
				absolute: Some(absolute),
				relative: Some(relative),
			},
		}
	}

	pub fn enumeration<I, V>(values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		FieldSchema::Enum {
			values: values.into_iter().map(Into::into).collect(),
		}
	}

	pub fn array(items: FieldSchema) -> Self {
		FieldSchema::Array {
			items: Box::new(items),
		}
	}

	pub fn object<I, K>(properties: I) -> Self
	where
		I: IntoIterator<Item = (K, FieldSchema)>,
		K: Into<String>,
	{
		FieldSchema::Object {
			properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
		}
	}

	pub fn type_name(&self) -> &'static str {
		match self {
			FieldSchema::Number { .. } => "number",
			FieldSchema::String => "string",
			FieldSchema::Enum { .. } => "enum",
			FieldSchema::Array { .. } => "array",
			FieldSchema::Object { .. } => "object",
			FieldSchema::Other => "other",
		}
	}

	pub fn property(&self, name: &str) -> Option<&FieldSchema> {
		match self {
			FieldSchema::Object { properties } => {
				properties.iter().find(|(k, _)| k == name).map(|(_, s)| s)
			}
			_ => None,
		}
	}

	/// Parse a JSON-Schema-like value (`type`, `properties`, `items`, `enum`).
	///
	/// `integer` is treated as a number, `allOf` resolves through its first
	/// entry, and unknown or missing types become [`FieldSchema::Other`].
	/// `enum` yields [`FieldSchema::Enum`] only on string or untyped schemas.
	pub fn from_json(schema: &Value) -> Result<Self> {
		let obj = schema.as_object().ok_or_else(|| {
			EvalError::InvalidSchema(format!("expected a schema object, got {}", schema))
		})?;
		let obj = resolve_all_of(obj);

		let type_tag = type_tag(&obj);

		if let Some(values) = obj.get("enum") {
			if matches!(type_tag, None | Some("string")) {
				let values = values.as_array().ok_or_else(|| {
					EvalError::InvalidSchema("'enum' must be an array".to_string())
				})?;
				return Ok(FieldSchema::Enum {
					values: values.clone(),
				});
			}
		}

		let parsed = match type_tag {
			Some("number") | Some("integer") => FieldSchema::Number {
				tolerance: ToleranceOverride {
					absolute: tolerance_keyword(&obj, "absolute_tolerance")?,
					relative: tolerance_keyword(&obj, "relative_tolerance")?,
				},
			},
			Some("string") => FieldSchema::String,
			Some("array") => match obj.get("items") {
				Some(items) => FieldSchema::array(FieldSchema::from_json(items)?),
				None => FieldSchema::array(FieldSchema::Other),
			},
			Some("object") => FieldSchema::Object {
				properties: parse_properties(&obj)?,
			},
			None if obj.contains_key("properties") => FieldSchema::Object {
				properties: parse_properties(&obj)?,
			},
			_ => FieldSchema::Other,
		};
		Ok(parsed)
	}
}

fn resolve_all_of(obj: &Map<String, Value>) -> Cow<'_, Map<String, Value>> {
	let first = obj
		.get("allOf")
		.and_then(Value::as_array)
		.and_then(|entries| entries.first())
		.and_then(Value::as_object);
	match first {
		Some(first) => {
			let mut merged = first.clone();
			for (k, v) in obj {
				if k != "allOf" {
					merged.insert(k.clone(), v.clone());
				}
			}
			Cow::Owned(merged)
		}
		None => Cow::Borrowed(obj),
	}
}

// `type` may be a list such as ["number", "null"]; the first non-null tag wins.
fn type_tag(obj: &Map<String, Value>) -> Option<&str> {
	match obj.get("type")? {
		Value::String(s) => Some(s.as_str()),
		Value::Array(tags) => tags
			.iter()
			.filter_map(Value::as_str)
			.find(|t| *t != "null"),
		_ => None,
	}
}

fn tolerance_keyword(obj: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
	match obj.get(key) {
		None => Ok(None),
		Some(v) => match v.as_f64() {
			Some(t) if t.is_finite() && t >= 0.0 => Ok(Some(t)),
			_ => Err(EvalError::InvalidSchema(format!(
				"'{}' must be a non-negative number, got {}",
				key, v
			))),
		},
	}
}

fn parse_properties(obj: &Map<String, Value>) -> Result<Vec<(String, FieldSchema)>> {
	let Some(props) = obj.get("properties") else {
		return Ok(Vec::new());
	};
	let props = props
		.as_object()
		.ok_or_else(|| EvalError::InvalidSchema("'properties' must be an object".to_string()))?;
	props
		.iter()
		.map(|(name, s)| Ok((name.clone(), FieldSchema::from_json(s)?)))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn parses_invoice_schema() {
		let schema = FieldSchema::from_json(&json!({
			"type": "object",
			"properties": {
				"number": {"type": "string"},
				"currency": {"allOf": [{"enum": ["USD", "EUR"], "type": "string"}]},
				"items": {
					"type": "array",
					"items": {
						"type": "object",
						"properties": {
							"price": {"type": "number"},
							"quantity": {"type": "integer"}
						}
					}
				},
				"total": {"type": "number", "absolute_tolerance": 0.01}
			}
		}))
		.unwrap();

		assert_eq!(schema.type_name(), "object");
		assert_eq!(schema.property("number"), Some(&FieldSchema::String));
		assert_eq!(
			schema.property("currency"),
			Some(&FieldSchema::enumeration(["USD", "EUR"]))
		);
		let FieldSchema::Array { items } = schema.property("items").unwrap() else {
			panic!("items should be an array");
		};
		assert_eq!(items.property("quantity"), Some(&FieldSchema::number()));
		assert_eq!(
			schema.property("total"),
			Some(&FieldSchema::Number {
				tolerance: ToleranceOverride {
					absolute: Some(0.01),
					relative: None
				}
			})
		);
	}

	#[test]
	fn properties_keep_declaration_order() {
		let schema = FieldSchema::from_json(&json!({
			"properties": {"zeta": {"type": "string"}, "alpha": {"type": "string"}}
		}))
		.unwrap();
		let FieldSchema::Object { properties } = schema else {
			panic!("expected object");
		};
		let names: Vec<_> = properties.iter().map(|(k, _)| k.as_str()).collect();
		assert_eq!(names, vec!["zeta", "alpha"]);
	}

	#[test]
	fn unknown_and_missing_types_fall_back_to_other() {
		assert_eq!(FieldSchema::from_json(&json!({"type": "boolean"})).unwrap(), FieldSchema::Other);
		assert_eq!(FieldSchema::from_json(&json!({})).unwrap(), FieldSchema::Other);
		assert_eq!(
			FieldSchema::from_json(&json!({"type": "array"})).unwrap(),
			FieldSchema::array(FieldSchema::Other)
		);
		assert_eq!(
			FieldSchema::from_json(&json!({"type": ["number", "null"]})).unwrap(),
			FieldSchema::number()
		);
	}

	#[test]
	fn rejects_malformed_schemas() {
		assert!(FieldSchema::from_json(&json!("number")).is_err());
		assert!(FieldSchema::from_json(&json!({"enum": "red"})).is_err());
		assert!(FieldSchema::from_json(&json!({"type": "number", "relative_tolerance": -1})).is_err());
		assert!(FieldSchema::from_json(&json!({"type": "object", "properties": []})).is_err());
	}

	#[test]
	fn override_applies_over_base() {
		let base = Tolerance::default();
		let o = ToleranceOverride {
			absolute: Some(0.5),
			relative: None,
		};
		let t = o.apply(base);
		assert_eq!(t.absolute, 0.5);
		assert_eq!(t.relative, base.relative);
		assert!(!o.is_empty());
	}

	#[test]
	fn numeric_enum_keeps_tolerance() {
		let schema = FieldSchema::from_json(&json!({
			"type": "number",
			"enum": [1, 2],
			"absolute_tolerance": 0.5,
			"relative_tolerance": 0.5
		}))
		.unwrap();
		assert_eq!(schema, FieldSchema::number_with_tolerance(0.5, 0.5));

		let r = crate::evaluators::evaluate_field(&schema, Some(&json!(1.2)), Some(&json!(1)), Tolerance::default());
		assert!(r.correct);
	}

	#[test]
	fn string_and_untyped_enums_parse_as_enum() {
		for raw in [json!({"type": "string", "enum": ["a", "b"]}), json!({"enum": ["a", "b"]})] {
			assert_eq!(FieldSchema::from_json(&raw).unwrap(), FieldSchema::enumeration(["a", "b"]));
		}
	}
}

use anyhow::Result;

use crate::types::EvaluationResult;

/// Assert a scalar metric reached `min`.
///
/// Use this in your `#[test]` functions.
///
/// # Example
/// ```ignore
/// #[test]
/// fn extraction_quality() -> anyhow::Result<()> {
///     let mut orchestrator = Orchestrator::builder().build()?;
///     // add predictions and ground truths ...
///     let result = orchestrator.evaluate()?;
///
///     assert_metric_at_least(&result, "overall_accuracy", 0.8)?;
///     Ok(())
/// }
/// ```
pub fn assert_metric_at_least(result: &EvaluationResult, metric: &str, min: f64) -> Result<()> {
	let Some(value) = result.metric(metric) else {
		anyhow::bail!("Evaluation failed: metric '{}' was not computed\n{}", metric, result.summary_table());
	};
	let Some(value) = value.as_scalar() else {
		anyhow::bail!("Evaluation failed: metric '{}' is not a scalar", metric);
	};
	if value < min {
		anyhow::bail!(
			"Evaluation failed: {} {:.4} is below threshold {:.4}\n{}",
			metric,
			value,
			min,
			result.summary_table()
		);
	}
	Ok(())
}

/// Assert every field result is correct. Fails if the run had no schema.
pub fn assert_all_fields_correct(result: &EvaluationResult) -> Result<()> {
	let Some((correct, total)) = result.field_counts() else {
		anyhow::bail!("Evaluation failed: no field results; configure a schema");
	};
	if correct != total {
		let wrong: Vec<&str> = result
			.field_results
			.iter()
			.flatten()
			.filter(|(_, r)| !r.correct)
			.map(|(k, _)| k.as_str())
			.collect();
		anyhow::bail!(
			"Evaluation failed: {}/{} fields correct (wrong: {})\n{}",
			correct,
			total,
			wrong.join(", "),
			result.summary_table()
		);
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{FieldResult, MetricValue};
	use indexmap::IndexMap;
	use serde_json::json;

	fn result(accuracy: f64, fields: &[(&str, bool)]) -> EvaluationResult {
		let mut r = EvaluationResult::default();
		r.metrics.insert("overall_accuracy".into(), MetricValue::Scalar(accuracy));
		let map: IndexMap<String, FieldResult> = fields
			.iter()
			.map(|(k, ok)| (k.to_string(), FieldResult::new(*ok, json!(1), json!(1))))
			.collect();
		r.field_results = Some(map);
		r
	}

	#[test]
	fn metric_threshold() {
		let r = result(0.9, &[]);
		assert!(assert_metric_at_least(&r, "overall_accuracy", 0.8).is_ok());
		let err = assert_metric_at_least(&r, "overall_accuracy", 0.95).unwrap_err();
		assert!(err.to_string().contains("below threshold"));
		assert!(assert_metric_at_least(&r, "missing", 0.0).is_err());
	}

	#[test]
	fn all_fields_correct() {
		assert!(assert_all_fields_correct(&result(1.0, &[("0.a", true), ("0.b", true)])).is_ok());
		let err = assert_all_fields_correct(&result(1.0, &[("0.a", true), ("0.b", false)])).unwrap_err();
		assert!(err.to_string().contains("wrong: 0.b"));
		assert!(assert_all_fields_correct(&EvaluationResult::default()).is_err());
	}
}

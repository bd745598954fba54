use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{type_mismatch, FieldEvaluator};
use crate::error::{EvalError, Result};
use crate::types::FieldResult;

/// Default absolute slack: numbers must agree to within 1e-9.
pub const DEFAULT_ABSOLUTE_TOLERANCE: f64 = 1e-9;
/// Default relative slack, matching the usual `isclose` default.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-9;
/// Floor for the relative-difference denominator when both values are near zero.
pub const DEFAULT_EPSILON: f64 = 1e-12;

/// Numeric slack permitted before two numbers are declared unequal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
	pub absolute: f64,
	pub relative: f64,
	pub epsilon: f64,
}

impl Default for Tolerance {
	fn default() -> Self {
		Self {
			absolute: DEFAULT_ABSOLUTE_TOLERANCE,
			relative: DEFAULT_RELATIVE_TOLERANCE,
			epsilon: DEFAULT_EPSILON,
		}
	}
}

impl Tolerance {
	pub fn new(absolute: f64, relative: f64) -> Self {
		Self { absolute, relative, ..Self::default() }
	}

	/// Every component must be finite and non-negative.
	pub fn validate(&self) -> Result<()> {
		for (name, v) in [("absolute", self.absolute), ("relative", self.relative), ("epsilon", self.epsilon)] {
			if !v.is_finite() || v < 0.0 {
				return Err(EvalError::InvalidConfig(format!(
					"{} tolerance must be a non-negative number, got {}",
					name, v
				)));
			}
		}
		Ok(())
	}
}

/// Numbers are correct only when BOTH the absolute and the relative check pass.
pub struct NumberEvaluator {
	tolerance: Tolerance,
}

/// Differences computed for one numeric comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Closeness {
	pub absolute_difference: f64,
	pub relative_difference: f64,
	pub correct: bool,
}

impl NumberEvaluator {
	pub fn new(tolerance: Tolerance) -> Self {
		Self { tolerance }
	}

	pub fn compare(&self, predicted: f64, ground_truth: f64) -> Closeness {
		let diff = (predicted - ground_truth).abs();
		let denom = predicted.abs().max(ground_truth.abs()).max(self.tolerance.epsilon);
		let rel = diff / denom;
		// Equal infinities produce a NaN difference, hence the explicit equality.
		let correct = predicted == ground_truth
			|| (diff <= self.tolerance.absolute && rel <= self.tolerance.relative);
		Closeness {
			absolute_difference: diff,
			relative_difference: rel,
			correct,
		}
	}
}

impl Default for NumberEvaluator {
	fn default() -> Self {
		Self::new(Tolerance::default())
	}
}

impl FieldEvaluator for NumberEvaluator {
	fn name(&self) -> &'static str {
		"number"
	}

	fn evaluate(&self, predicted: &Value, ground_truth: &Value) -> FieldResult {
		let (Some(p), Some(g)) = (predicted.as_f64(), ground_truth.as_f64()) else {
			return type_mismatch(predicted, ground_truth, self.name());
		};
		let c = self.compare(p, g);
		FieldResult::new(c.correct, predicted.clone(), ground_truth.clone())
			.with_detail("absolute_difference", c.absolute_difference)
			.with_detail("relative_difference", c.relative_difference)
			.with_detail("absolute_tolerance", self.tolerance.absolute)
			.with_detail("relative_tolerance", self.tolerance.relative)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(10.0, 10.0, true)]
	#[case(10.0, 10.1, false)]
	#[case(1e6, 1e6 + 1e-5, false)]
	#[case(0.0, 0.0, true)]
	#[case(-3.5, -3.5, true)]
	#[case(0.0, 1e-12, false)]
	fn default_tolerance_is_near_exact(#[case] p: f64, #[case] g: f64, #[case] expected: bool) {
		assert_eq!(NumberEvaluator::default().compare(p, g).correct, expected);
	}

	#[rstest]
	#[case(100.0, 100.05, true)]
	// relative passes (1/101 < 0.01) but absolute fails (1.0 > 0.1)
	#[case(100.0, 101.0, false)]
	// absolute passes (0.001 <= 0.1) but relative fails (0.5 > 0.01)
	#[case(0.001, 0.002, false)]
	#[case(-50.0, -50.04, true)]
	fn both_checks_must_hold(#[case] p: f64, #[case] g: f64, #[case] expected: bool) {
		let e = NumberEvaluator::new(Tolerance::new(1e-1, 1e-2));
		assert_eq!(e.compare(p, g).correct, expected);
	}

	#[test]
	fn zero_denominator_uses_epsilon() {
		let e = NumberEvaluator::new(Tolerance::new(1.0, 1.0));
		let c = e.compare(0.0, 0.0);
		assert!(c.correct);
		assert_eq!(c.relative_difference, 0.0);
	}

	#[test]
	fn infinities_and_nan() {
		let e = NumberEvaluator::default();
		assert!(e.compare(f64::INFINITY, f64::INFINITY).correct);
		assert!(!e.compare(f64::NAN, f64::NAN).correct);
		assert!(!e.compare(f64::INFINITY, 1.0).correct);
	}

	#[test]
	fn integers_and_floats_compare_numerically() {
		let r = NumberEvaluator::default().evaluate(&json!(10), &json!(10.0));
		assert!(r.correct);
		assert_eq!(r.predicted, json!(10));
		assert_eq!(r.detail("absolute_difference"), Some(&json!(0.0)));
	}

	#[rstest]
	#[case(Tolerance::new(f64::NAN, 1e-9))]
	#[case(Tolerance::new(1e-9, -1.0))]
	#[case(Tolerance { epsilon: f64::INFINITY, ..Tolerance::default() })]
	fn invalid_tolerances_rejected(#[case] t: Tolerance) {
		assert!(matches!(t.validate(), Err(EvalError::InvalidConfig(_))));
	}

	#[test]
	fn default_tolerance_is_valid() {
		assert!(Tolerance::default().validate().is_ok());
		assert!(Tolerance::new(0.0, 0.0).validate().is_ok());
	}

	#[test]
	fn non_numeric_is_type_mismatch() {
		let r = NumberEvaluator::default().evaluate(&json!("10"), &json!(10));
		assert!(!r.correct);
		assert_eq!(r.detail("type_mismatch"), Some(&json!(true)));
	}
}

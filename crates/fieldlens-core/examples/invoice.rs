use std::sync::Arc;

use fieldlens_core::{
	EvaluationPair, GroundTruth, JsonlPairSource, MetricCategory, MetricRegistry, MetricValue, Orchestrator,
	PairSource, Prediction, SideMetadata, Tolerance,
};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let registry = Arc::new(MetricRegistry::with_builtins());

	// A custom metric: share of predictions that kept every ground-truth key.
	registry.register("key_coverage", MetricCategory::Accuracy, ["ground_truths", "predictions"], |inputs| {
		let gts = inputs.records("ground_truths")?;
		let preds = inputs.records("predictions")?;
		let covered = gts
			.iter()
			.zip(preds)
			.filter(|(gt, pred)| gt.keys().all(|k| pred.contains_key(k)))
			.count();
		Ok(MetricValue::Scalar(covered as f64 / gts.len().max(1) as f64))
	});

	let mut orchestrator = Orchestrator::builder()
		.registry(Arc::clone(&registry))
		.schema(json!({
			"type": "object",
			"properties": {
				"invoice_number": {"type": "string"},
				"total_amount": {"type": "number", "absolute_tolerance": 0.01, "relative_tolerance": 0.001},
				"currency": {"type": "string", "enum": ["USD", "EUR"]},
				"line_items": {
					"type": "array",
					"items": {
						"type": "object",
						"properties": {
							"description": {"type": "string"},
							"amount": {"type": "number"}
						}
					}
				}
			}
		}))
		.tolerance(Tolerance::new(1e-6, 1e-6))
		.build()?;

	for i in 0..4 {
		let total = 120.0 + i as f64;
		let predicted_total = if i == 3 { total + 5.0 } else { total + 0.001 };
		let prediction = Prediction::from_value(json!({
			"invoice_number": format!("INV-{:04}", i),
			"total_amount": predicted_total,
			"currency": if i == 2 { "GBP" } else { "USD" },
			"line_items": [
				{"description": "Widget", "amount": 100.0},
				{"description": "Shipping", "amount": total - 100.0}
			]
		}))?
		.with_id(format!("invoice-{}", i));
		let ground_truth = GroundTruth::from_value(json!({
			"invoice_number": format!("INV-{:04}", i),
			"total_amount": total,
			"currency": "USD",
			"line_items": [
				{"description": "Widget", "amount": 100.0},
				{"description": "Shipping", "amount": total - 100.0}
			]
		}))?;
		orchestrator.add_prediction(prediction, Some(SideMetadata::new().latency(0.2 + i as f64 * 0.05).confidence(0.9)))?;
		orchestrator.add_ground_truth(ground_truth)?;
	}

	let result = orchestrator.evaluate()?;
	println!("{}", result.summary_table());

	// Load more pairs from JSONL if a path is given.
	if let Some(path) = std::env::args().nth(1) {
		let pairs: Vec<EvaluationPair> = JsonlPairSource::new(path).load().await?;
		orchestrator.reset();
		orchestrator.extend(pairs)?;
		let result = orchestrator.evaluate()?;
		println!("{}", result.summary_table());
	}

	Ok(())
}

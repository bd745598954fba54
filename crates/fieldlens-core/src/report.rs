use serde_json::Value;

use crate::types::{EvaluationResult, MetricValue};

pub fn generate_html_report(result: &EvaluationResult) -> String {
	let mut metric_rows = String::new();
	for (name, value) in &result.metrics {
		match value {
			MetricValue::Scalar(v) => metric_rows.push_str(&metric_row(name, *v)),
			MetricValue::Mapping(m) => {
				for (key, v) in m {
					metric_rows.push_str(&metric_row(&format!("{}.{}", name, key), *v));
				}
			}
		}
	}

	let mut field_rows = String::new();
	if let Some(fields) = &result.field_results {
		for (key, fr) in fields {
			let row_class = if fr.correct { "pass" } else { "fail" };
			let icon = if fr.correct { "✓" } else { "✗" };
			let predicted = serde_json::to_string_pretty(&fr.predicted).unwrap_or_default();
			let ground_truth = serde_json::to_string_pretty(&fr.ground_truth).unwrap_or_default();

			let mut badges = String::new();
			for (name, value) in &fr.details {
				// nested results are too large for a badge
				if matches!(value, Value::Array(_) | Value::Object(_)) {
					continue;
				}
				badges.push_str(&format!(
					r#"<span class="badge">{}: {}</span>"#,
					html_escape(name),
					html_escape(&value.to_string())
				));
			}

			field_rows.push_str(&format!(
				r#"
            <tr class="{}">
                <td>{}</td>
                <td class="icon">{}</td>
                <td><pre>{}</pre></td>
                <td><pre>{}</pre></td>
                <td class="details">{}</td>
            </tr>
            "#,
				row_class,
				html_escape(key),
				icon,
				html_escape(&predicted),
				html_escape(&ground_truth),
				badges
			));
		}
	}

	let total_pairs = result.details.get("total_pairs").and_then(Value::as_u64).unwrap_or(0);
	let (correct, total) = result.field_counts().unwrap_or((0, 0));
	let accuracy = if total == 0 { 0.0 } else { correct as f64 / total as f64 };
	let accuracy_class = if accuracy >= 0.8 {
		"good"
	} else if accuracy >= 0.5 {
		"warn"
	} else {
		"bad"
	};

	let fields_section = if field_rows.is_empty() {
		String::new()
	} else {
		format!(
			r#"
        <h2>Field results</h2>
        <table>
            <thead>
                <tr>
                    <th>Field</th>
                    <th>Status</th>
                    <th>Predicted</th>
                    <th>Ground truth</th>
                    <th>Details</th>
                </tr>
            </thead>
            <tbody>
                {}
            </tbody>
        </table>"#,
			field_rows
		)
	};

	format!(
		r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Fieldlens Report</title>
    <style>
        * {{ box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
        }}
        .container {{
            max-width: 1400px;
            margin: 0 auto;
            background: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        h1, h2 {{ color: #333; }}
        .summary {{
            display: flex;
            gap: 20px;
            margin: 20px 0 30px 0;
            padding: 20px;
            background: #f8f9fa;
            border-radius: 6px;
        }}
        .summary-item {{ flex: 1; }}
        .summary-label {{
            font-size: 12px;
            color: #666;
            text-transform: uppercase;
            margin-bottom: 5px;
        }}
        .summary-value {{
            font-size: 28px;
            font-weight: 600;
            color: #333;
        }}
        .summary-value.good {{ color: #28a745; }}
        .summary-value.warn {{ color: #ffc107; }}
        .summary-value.bad {{ color: #dc3545; }}
        table {{
            width: 100%;
            border-collapse: collapse;
            margin-top: 20px;
        }}
        th {{
            background: #343a40;
            color: white;
            padding: 12px;
            text-align: left;
            font-size: 13px;
            text-transform: uppercase;
        }}
        td {{
            padding: 12px;
            border-bottom: 1px solid #dee2e6;
            vertical-align: top;
        }}
        tr.pass {{ background: #f0f9f4; }}
        tr.fail {{ background: #fef3f2; }}
        .icon {{ text-align: center; width: 50px; }}
        pre {{
            margin: 0;
            padding: 8px;
            background: #f8f9fa;
            border-radius: 4px;
            font-size: 12px;
            max-height: 150px;
            overflow: auto;
            white-space: pre-wrap;
            word-break: break-word;
        }}
        .details {{ display: flex; flex-wrap: wrap; gap: 6px; }}
        .badge {{
            padding: 4px 8px;
            border-radius: 4px;
            font-size: 11px;
            background: #e9ecef;
            white-space: nowrap;
        }}
        .timestamp {{ color: #6c757d; font-size: 14px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Fieldlens Report</h1>
        <div class="timestamp">Generated: {}</div>

        <div class="summary">
            <div class="summary-item">
                <div class="summary-label">Pairs</div>
                <div class="summary-value">{}</div>
            </div>
            <div class="summary-item">
                <div class="summary-label">Fields</div>
                <div class="summary-value">{}</div>
            </div>
            <div class="summary-item">
                <div class="summary-label">Correct</div>
                <div class="summary-value good">{}</div>
            </div>
            <div class="summary-item">
                <div class="summary-label">Field accuracy</div>
                <div class="summary-value {}">{:.1}%</div>
            </div>
        </div>

        <h2>Metrics</h2>
        <table>
            <thead>
                <tr><th>Metric</th><th>Value</th></tr>
            </thead>
            <tbody>
                {}
            </tbody>
        </table>
        {}
    </div>
</body>
</html>"#,
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
		total_pairs,
		total,
		correct,
		accuracy_class,
		accuracy * 100.0,
		metric_rows,
		fields_section
	)
}

fn metric_row(name: &str, value: f64) -> String {
	format!("<tr><td>{}</td><td>{:.4}</td></tr>\n", html_escape(name), value)
}

fn html_escape(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&#39;")
}

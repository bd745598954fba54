pub use fieldlens_types::{EvaluationResult, FieldResult, MetricCategory, MetricValue};

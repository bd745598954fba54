//! fieldlens-core: field-level evaluation of structured model outputs.
//! Accumulate prediction/ground-truth pairs in an [`Orchestrator`], describe
//! records with a [`FieldSchema`], and compute metrics from a [`MetricRegistry`].
//! See `examples/invoice.rs` for a quickstart.

pub mod builtins;
pub mod config;
pub mod datasource;
pub mod error;
pub mod evaluators;
pub mod orchestrator;
pub mod record;
pub mod registry;
pub mod report;
pub mod schema;
pub mod testing;
pub mod types;

pub use config::{DataConfig, RunConfig};
pub use datasource::{JsonlPairSource, PairSource, VecPairSource};
pub use error::{EvalError, Result};
pub use evaluators::{evaluate_field, FieldEvaluator, Tolerance};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, UnresolvedInputPolicy};
pub use record::{EvaluationPair, GroundTruth, Prediction, SideMetadata};
pub use registry::{MetricDescriptor, MetricInput, MetricInputs, MetricRegistry};
pub use schema::{FieldSchema, ToleranceOverride};
pub use types::{EvaluationResult, FieldResult, MetricCategory, MetricValue};

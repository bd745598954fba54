use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluators::Tolerance;
use crate::orchestrator::{OrchestratorBuilder, UnresolvedInputPolicy};

/// File-backed description of one run. Loadable from YAML or JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
	pub data: Option<DataConfig>,
	/// Path to a JSON schema describing each record.
	pub schema: Option<PathBuf>,
	/// Metrics to compute; empty means every registered metric.
	pub metrics: Vec<String>,
	pub tolerance: Tolerance,
	pub on_unresolved_input: UnresolvedInputPolicy,
	pub validate_schema: bool,
	pub run_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
	pub path: PathBuf,
}

impl RunConfig {
	/// Parse by extension: `.yaml`/`.yml` as YAML, everything else as JSON.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path)?;
		let is_yaml = matches!(
			path.extension().and_then(|e| e.to_str()),
			Some("yaml") | Some("yml")
		);
		if is_yaml {
			Self::from_yaml(&content)
		} else {
			Self::from_json(&content)
		}
	}

	pub fn from_yaml(content: &str) -> Result<Self> {
		let config: Self = serde_yaml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_json(content: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<()> {
		self.tolerance.validate()
	}

	/// Load the referenced schema file, if any.
	pub fn load_schema(&self) -> Result<Option<serde_json::Value>> {
		match &self.schema {
			Some(path) => {
				let content = std::fs::read_to_string(path)?;
				Ok(Some(serde_json::from_str(&content)?))
			}
			None => Ok(None),
		}
	}

	/// Seed a builder with everything this config sets except the schema.
	pub fn apply(&self, builder: OrchestratorBuilder) -> OrchestratorBuilder {
		let mut builder = builder
			.metrics(self.metrics.iter().cloned())
			.tolerance(self.tolerance)
			.on_unresolved_input(self.on_unresolved_input)
			.validate_schema(self.validate_schema);
		if let Some(id) = &self.run_id {
			builder = builder.run_id(id.clone());
		}
		builder
	}
}

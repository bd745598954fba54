use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use fieldlens_core::report::generate_html_report;
use fieldlens_core::{JsonlPairSource, MetricRegistry, Orchestrator, PairSource, RunConfig, UnresolvedInputPolicy};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fieldlens", about = "Score structured LLM outputs against ground truth")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	Run(RunArgs),
	/// List the built-in metrics
	Metrics,
}

#[derive(Debug, Clone, Parser)]
struct RunArgs {
	/// JSONL file with lines: { "id"?, "prediction": {...}, "ground_truth": {...}, "latency"?, "confidence"? }
	#[arg(long)]
	data: Option<PathBuf>,

	/// JSON schema describing each record; enables per-field results
	#[arg(long)]
	schema: Option<PathBuf>,

	/// Metric to compute (repeatable). Defaults to every registered metric
	#[arg(long = "metric")]
	metrics: Vec<String>,

	/// YAML or JSON run configuration; flags override it
	#[arg(long)]
	config: Option<PathBuf>,

	#[arg(long)]
	absolute_tolerance: Option<f64>,

	#[arg(long)]
	relative_tolerance: Option<f64>,

	/// Skip metrics whose inputs cannot be resolved instead of failing
	#[arg(long, action = ArgAction::SetTrue)]
	skip_unresolved: bool,

	/// Validate predictions against the schema
	#[arg(long, action = ArgAction::SetTrue)]
	validate_schema: bool,

	/// Output JSON result to a file
	#[arg(long)]
	json_out: Option<PathBuf>,

	/// Output an HTML report to a file
	#[arg(long)]
	html_out: Option<PathBuf>,

	#[arg(short, long, action = ArgAction::SetTrue)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let verbose = matches!(&cli.command, Commands::Run(args) if args.verbose);
	init_tracing(verbose);

	match cli.command {
		Commands::Run(args) => run(args).await?,
		Commands::Metrics => list_metrics(),
	}
	Ok(())
}

fn init_tracing(verbose: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
	};
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn list_metrics() {
	let registry = MetricRegistry::with_builtins();
	for (name, descriptor) in registry.get_all() {
		println!(
			"{:<26} {:<12} [{}]\n    {}",
			name,
			descriptor.category,
			descriptor.input_keys.join(", "),
			descriptor.description
		);
	}
}

async fn run(args: RunArgs) -> Result<()> {
	let mut config = match &args.config {
		Some(path) => RunConfig::from_path(path).with_context(|| format!("Failed to load config {:?}", path))?,
		None => RunConfig::default(),
	};

	if args.schema.is_some() {
		config.schema = args.schema.clone();
	}
	if !args.metrics.is_empty() {
		config.metrics = args.metrics.clone();
	}
	if let Some(abs) = args.absolute_tolerance {
		config.tolerance.absolute = abs;
	}
	if let Some(rel) = args.relative_tolerance {
		config.tolerance.relative = rel;
	}
	if args.skip_unresolved {
		config.on_unresolved_input = UnresolvedInputPolicy::Skip;
	}
	if args.validate_schema {
		config.validate_schema = true;
	}

	let data_path = args
		.data
		.clone()
		.or_else(|| config.data.as_ref().map(|d| d.path.clone()))
		.context("No data file: pass --data or set data.path in the config")?;
	debug!(?config, "resolved run configuration");

	let mut builder = config.apply(Orchestrator::builder().registry(Arc::new(MetricRegistry::with_builtins())));
	if let Some(schema) = config.load_schema().context("Failed to load schema")? {
		builder = builder.schema(schema);
	}
	let mut orchestrator = builder.build()?;

	let pairs = JsonlPairSource::new(&data_path).load().await?;
	info!(pairs = pairs.len(), path = %data_path.display(), "loaded pairs");
	orchestrator.extend(pairs)?;

	let result = orchestrator.evaluate()?;
	println!("{}", result.summary_table());

	if let Some(path) = args.json_out {
		let json = serde_json::to_string_pretty(&result)?;
		tokio::fs::write(path, json).await?;
	}

	if let Some(path) = args.html_out {
		tokio::fs::write(path, generate_html_report(&result)).await?;
	}

	Ok(())
}

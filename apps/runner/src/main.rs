//! Kurt Runner
//!
//! Drives one `run_workflow` invocation against a registered pipeline:
//! wires up the Postgres pool, the Config Resolver, the Provider
//! Registry, and the Step/Event Tracker, then hands off to the Workflow
//! Orchestrator. Model/pipeline registration itself lives with whatever
//! project embeds this crate — this binary only assembles the machinery
//! and drives one run to completion from the command line.

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use kurt_common::init_tracing;
use kurt_db::pool::{connect, PoolConfig};
use kurt_db::repo::run_repo::PgRunRepository;
use kurt_db::repo::step_event_repo::PgStepEventRepository;
use kurt_db::repo::step_log_repo::PgStepLogRepository;
use kurt_pipeline::config::ConfigResolver;
use kurt_pipeline::model::ModelRegistry;
use kurt_pipeline::orchestrator::WorkflowOrchestrator;
use kurt_pipeline::runner::Pipeline;
use kurt_pipeline::tracker::{EventTracker, StepEventTracker};
use kurt_providers::registry::ProviderRegistry;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "kurt-runner")]
#[command(about = "Run a registered Kurt pipeline to completion")]
struct Cli {
    /// Name of the pipeline to run.
    target: String,

    /// JSON object of inputs passed to the run, e.g. '{"cluster":"acme"}'.
    #[arg(long, default_value = "{}")]
    inputs: String,

    /// Bypass provider-level response caching for this run.
    #[arg(long)]
    no_cache: bool,
}

/// Pipelines this binary knows how to run. A real deployment populates
/// this (and the model registry below) from project-specific model
/// definitions registered at startup; this binary ships with none built
/// in, so an unrecognized `target` reports clearly rather than silently
/// doing nothing.
fn build_pipelines() -> HashMap<String, Pipeline> {
    HashMap::new()
}

fn build_models() -> ModelRegistry {
    ModelRegistry::new()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let inputs: serde_json::Value = serde_json::from_str(&cli.inputs)?;

    let pool = connect(&PoolConfig::from_env()).await?;
    let project_root = std::env::current_dir()?;

    let tracker: Arc<dyn EventTracker> = Arc::new(StepEventTracker::new(
        Arc::new(PgRunRepository::new(pool.clone())),
        Arc::new(PgStepLogRepository::new(pool.clone())),
        Arc::new(PgStepEventRepository::new(pool.clone())),
    ));

    let orchestrator = WorkflowOrchestrator::new(
        pool,
        build_models(),
        build_pipelines(),
        Arc::new(ConfigResolver::for_project(&project_root)),
        Arc::new(ProviderRegistry::new(Some(&project_root), Vec::new())),
        tracker,
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, canceling run");
            ctrl_c.cancel();
        }
    });

    let run = orchestrator
        .run_workflow(&cli.target, inputs, cli.no_cache, cancel)
        .await?;

    tracing::info!(run_id = %run.id, status = ?run.status, "run finished");
    println!("{}", serde_json::to_string_pretty(&run)?);

    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! probe - workflow-driven operational probe runner

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use probe_core::{Limits, SystemClock};
use probe_dispatch::{EchoExecutor, ExecutorRegistry, FailExecutor, SubprocessExecutor};
use probe_engine::CancellationToken;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "probe", version, about = "workflow-driven operational probe runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow to completion
    Run(RunArgs),
    /// Validate a workflow without running it
    Validate(ValidateArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to the workflow YAML file
    workflow: PathBuf,
    /// Override a workflow variable (repeatable: --var key=value)
    #[arg(long = "var", value_parser = parse_key_value)]
    var: Vec<(String, String)>,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Path to the workflow YAML file
    workflow: PathBuf,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() {
    init_logging();

    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            2
        }
    };
    std::process::exit(code);
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_workflow_file(args).await,
        Commands::Validate(args) => validate_workflow_file(args),
    }
}

fn load_workflow(path: &PathBuf) -> Result<probe_workflow::WorkflowDef> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("reading workflow file '{}'", path.display()))?;
    probe_workflow::load(&yaml)
        .with_context(|| format!("parsing workflow file '{}'", path.display()))
}

fn validate_workflow_file(args: ValidateArgs) -> Result<i32> {
    let workflow = load_workflow(&args.workflow)?;
    match probe_engine::validate(&workflow, &Limits::from_env()) {
        Ok(_) => {
            println!("workflow is valid");
            Ok(0)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            Ok(2)
        }
    }
}

async fn run_workflow_file(args: RunArgs) -> Result<i32> {
    let workflow = load_workflow(&args.workflow)?;
    let limits = Limits::from_env();

    if let Err(e) = probe_engine::validate(&workflow, &limits) {
        eprintln!("Error: {e}");
        return Ok(2);
    }

    let registry = build_registry(&workflow);
    let cancel = CancellationToken::new();

    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt, cancelling in-flight work");
            shutdown_cancel.cancel();
        }
    });

    let outcome =
        probe_engine::run_workflow(&workflow, registry, SystemClock, &limits, cancel).await?;

    for (name, result) in &outcome.jobs {
        tracing::info!(job = %name, status = ?result.status, "job finished");
    }

    Ok(outcome.status)
}

/// Registers the two in-process builtins plus a [`SubprocessExecutor`] for
/// every non-builtin entry in the workflow's `executors` map. A declared
/// path of `"in-process"` for `echo`/`fail` is a no-op since those are
/// always registered; any other name maps to a subprocess binary.
fn build_registry(workflow: &probe_workflow::WorkflowDef) -> std::sync::Arc<ExecutorRegistry> {
    let registry = ExecutorRegistry::new();
    registry.register(EchoExecutor);
    registry.register(FailExecutor);

    for (name, spec) in &workflow.executors {
        if spec == "in-process" {
            continue;
        }
        registry.register(SubprocessExecutor::new(name.clone(), spec.clone(), Vec::new()));
    }

    std::sync::Arc::new(registry)
}

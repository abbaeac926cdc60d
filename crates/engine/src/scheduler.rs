// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow scheduler (4.G): validates the job graph, layers it
//! topologically, runs each layer's jobs concurrently, marks a failed
//! job's transitive dependents as skipped, and aggregates a final
//! status.

use crate::cancel::CancellationToken;
use crate::job_runner::run_job;
use indexmap::IndexMap;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Direction;
use probe_core::{Clock, Context, Limits, ValidationError, Value};
use probe_dispatch::ExecutorRegistry;
use probe_workflow::WorkflowDef;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Grace period after cancellation before in-flight dispatches are
/// considered unresponsive (§4.G's cancellation rules).
pub const CANCEL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Failure,
    Skipped,
}

impl JobStatus {
    fn as_status_code(self) -> i32 {
        match self {
            JobStatus::Success => 0,
            JobStatus::Failure | JobStatus::Skipped => 1,
        }
    }
}

pub struct JobResult {
    pub status: JobStatus,
    pub context: Option<Context>,
}

pub struct WorkflowOutcome {
    /// 0 if every job succeeded, 1 if any job failed or was skipped.
    pub status: i32,
    pub jobs: IndexMap<String, JobResult>,
}

/// Builds the job dependency graph and runs §4.G.1's validation:
/// structural checks (delegated to [`probe_workflow::validate_structure`]),
/// acyclicity, and per-job/per-step bound checks against `limits`.
pub fn validate(workflow: &WorkflowDef, limits: &Limits) -> Result<Graph<String, ()>, ValidationError> {
    probe_workflow::validate_structure(workflow)?;

    let mut graph = Graph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for job in &workflow.jobs {
        let idx = graph.add_node(job.name.clone());
        nodes.insert(job.name.as_str(), idx);
    }
    for job in &workflow.jobs {
        let to = nodes[job.name.as_str()];
        for dep in &job.needs {
            let from = nodes[dep.as_str()];
            graph.add_edge(from, to, ());
        }
    }

    if petgraph::algo::is_cyclic_directed(&graph) {
        return Err(ValidationError::Cycle(workflow.jobs.iter().map(|j| j.name.clone()).collect::<Vec<_>>().join(", ")));
    }

    for job in &workflow.jobs {
        if let Some(repeat) = &job.repeat {
            if repeat.count > limits.max_repeat_count {
                return Err(ValidationError::BoundExceeded {
                    field: format!("{}.repeat.count", job.name),
                    value: repeat.count,
                    limit: limits.max_repeat_count,
                });
            }
        }
        for step in &job.steps {
            if let Some(retry) = &step.retry {
                let max_attempts = retry.max_attempts();
                if max_attempts > limits.max_attempts {
                    return Err(ValidationError::BoundExceeded {
                        field: format!("{}.{}.retry.max_attempts", job.name, step.name),
                        value: max_attempts,
                        limit: limits.max_attempts,
                    });
                }
            }
        }
    }

    Ok(graph)
}

/// Groups `graph`'s nodes into topological layers: every node in layer
/// `n` depends only on nodes in layers `< n`, so a layer's jobs may run
/// concurrently (§4.G.2).
fn topological_layers(graph: &Graph<String, ()>) -> Vec<Vec<NodeIndex>> {
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
        .collect();

    let mut layers = Vec::new();
    let mut remaining: HashSet<NodeIndex> = graph.node_indices().collect();

    while !remaining.is_empty() {
        let layer: Vec<NodeIndex> = remaining
            .iter()
            .copied()
            .filter(|n| in_degree[n] == 0)
            .collect();
        for node in &layer {
            remaining.remove(node);
            for succ in graph.neighbors_directed(*node, Direction::Outgoing) {
                if let Some(d) = in_degree.get_mut(&succ) {
                    *d = d.saturating_sub(1);
                }
            }
        }
        layers.push(layer);
    }
    layers
}

/// Runs every job in `workflow` to completion, in dependency order,
/// parallelizing within each topological layer.
pub async fn run_workflow<C: Clock + 'static>(
    workflow: &WorkflowDef,
    registry: Arc<ExecutorRegistry>,
    clock: C,
    limits: &Limits,
    cancel: CancellationToken,
) -> Result<WorkflowOutcome, ValidationError> {
    let graph = validate(workflow, limits)?;
    let layers = topological_layers(&graph);

    let jobs_by_name: HashMap<String, &probe_workflow::JobDef> =
        workflow.jobs.iter().map(|j| (j.name.clone(), j)).collect();
    let node_name: HashMap<NodeIndex, String> =
        graph.node_indices().map(|n| (n, graph[n].clone())).collect();

    let env: IndexMap<String, String> = std::env::vars().collect();
    let vars: IndexMap<String, Value> = workflow
        .vars
        .iter()
        .map(|(k, v)| (k.clone(), probe_workflow::model::yaml_to_value(v)))
        .collect();

    let mut results: IndexMap<String, JobResult> = IndexMap::new();
    let mut failed_or_skipped: HashSet<String> = HashSet::new();

    for layer in layers {
        if cancel.is_cancelled() {
            for node in &layer {
                let name = node_name[node].clone();
                results.insert(name, JobResult { status: JobStatus::Skipped, context: None });
            }
            continue;
        }

        let mut set = JoinSet::new();
        for node in layer {
            let name = node_name[&node].clone();
            let needs_failed = jobs_by_name[&name].needs.iter().any(|n| failed_or_skipped.contains(n));

            if needs_failed {
                failed_or_skipped.insert(name.clone());
                results.insert(name, JobResult { status: JobStatus::Skipped, context: None });
                continue;
            }

            let job: probe_workflow::JobDef = (*jobs_by_name[&name]).clone();
            let registry = registry.clone();
            let clock = clock.clone();
            let env = env.clone();
            let vars = vars.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                let outcome = run_job(&job, env, vars, &registry, &clock, &cancel).await;
                (name, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    let status = if outcome.status == 0 { JobStatus::Success } else { JobStatus::Failure };
                    if status != JobStatus::Success {
                        failed_or_skipped.insert(name.clone());
                    }
                    results.insert(name, JobResult { status, context: Some(outcome.context) });
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "job task panicked");
                }
            }
        }
    }

    let status = results.values().map(|r| r.status.as_status_code()).max().unwrap_or(0);
    Ok(WorkflowOutcome { status, jobs: results })
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

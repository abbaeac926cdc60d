// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job runner (4.F): steps run strictly in order; a job's status is
//! the AND of its step statuses. `repeat={count,interval}` loops the
//! entire step sequence, each iteration replacing the same context slots
//! (§3's "frozen after commit" invariant applies within one iteration).

use crate::cancel::CancellationToken;
use crate::step_runner::run_step;
use probe_core::{Clock, Context, JobView, Value};
use probe_dispatch::ExecutorRegistry;
use probe_workflow::JobDef;
use indexmap::IndexMap;

/// Outcome of running a job to completion: its final context (whose
/// `outputs`/committed steps reflect the last repeat iteration) and its
/// aggregated status.
pub struct JobOutcome {
    pub status: i32,
    pub context: Context,
}

/// Runs `job`'s steps (and, if present, its `repeat` loop) to completion.
/// Bound validation of `repeat.count` against [`probe_core::Limits`] is
/// the scheduler's responsibility, performed once before any job starts
/// (§4.F: "count > MaxRepeatCount -> ErrBoundExceeded before any
/// iteration runs").
pub async fn run_job<C: Clock>(
    job: &JobDef,
    env: IndexMap<String, String>,
    vars: IndexMap<String, Value>,
    registry: &ExecutorRegistry,
    clock: &C,
    cancel: &CancellationToken,
) -> JobOutcome {
    let iterations = job.repeat.as_ref().map(|r| r.count).unwrap_or(1);
    let interval = job.repeat.as_ref().map(|r| r.interval_duration()).unwrap_or(std::time::Duration::ZERO);

    let mut ctx = Context::new(JobView { name: job.name.clone(), iteration: 0 }, env, vars);
    let mut status = 0;

    'iterations: for iteration in 0..iterations {
        if cancel.is_cancelled() {
            status = 1;
            break;
        }
        ctx.job.iteration = iteration;
        for (ordinal, step) in job.steps.iter().enumerate() {
            let name = if step.name.is_empty() { None } else { Some(step.name.as_str()) };
            ctx.begin_iteration_slot(ordinal, name);
        }

        status = 0;
        for (ordinal, step) in job.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                status = 1;
                break 'iterations;
            }
            let effective_step = with_job_defaults(step, &job.defaults);
            let view = run_step(&effective_step, ordinal, &mut ctx, registry, clock).await;
            if view.status != 0 {
                status = 1;
            }
        }

        if iteration + 1 < iterations && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    JobOutcome { status, context: ctx }
}

/// Merges a job's default `with` parameters underneath a step's own, so
/// a step may override any default it names explicitly while inheriting
/// the rest (e.g. a shared `base_url` or auth header across every step).
fn with_job_defaults(step: &probe_workflow::StepDef, defaults: &IndexMap<String, String>) -> probe_workflow::StepDef {
    if defaults.is_empty() {
        return step.clone();
    }
    let mut with = defaults.clone();
    for (k, v) in &step.with {
        with.insert(k.clone(), v.clone());
    }
    probe_workflow::StepDef { with, ..step.clone() }
}

#[cfg(test)]
#[path = "job_runner_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step runner (4.E): `pending -> waiting? -> evaluating ->
//! dispatching -> testing -> done(success|failure)`, looping back to
//! `dispatching` on a retryable failure. Handles `iter` expansion into N
//! sub-steps whose statuses are combined by AND.

use crate::retry::{apply_jitter, backoff_interval, should_retry};
use indexmap::IndexMap;
use probe_core::{unflatten, Clock, Context, StepView, Value};
use probe_dispatch::{DispatchRequest, ExecutorRegistry};
use probe_workflow::model::yaml_to_value;
use probe_workflow::template::{evaluate, expand};
use probe_workflow::StepDef;
use std::collections::BTreeMap;
use std::time::Duration;

/// Runs one step (including its `iter` expansion, if any) to completion
/// and commits the result into `ctx` under `ordinal`.
pub async fn run_step<C: Clock>(
    step: &StepDef,
    ordinal: usize,
    ctx: &mut Context,
    registry: &ExecutorRegistry,
    clock: &C,
) -> StepView {
    let view = match &step.iter {
        Some(elements) => run_iter_step(step, elements, ctx, registry, clock).await,
        None => run_attempt_sequence(step, ctx, registry, clock, &IndexMap::new()).await,
    };
    ctx.commit_step(ordinal, view.clone());
    view
}

async fn run_iter_step<C: Clock>(
    step: &StepDef,
    elements: &[IndexMap<String, serde_yaml::Value>],
    ctx: &Context,
    registry: &ExecutorRegistry,
    clock: &C,
) -> StepView {
    let mut reqs = Vec::with_capacity(elements.len());
    let mut ress = Vec::with_capacity(elements.len());
    let mut total_rt = Duration::ZERO;
    let mut all_succeeded = true;

    for element in elements {
        let item_value = Value::Map(element.iter().map(|(k, v)| (k.clone(), yaml_to_value(v))).collect());
        let mut locals = IndexMap::new();
        locals.insert("item".to_string(), item_value);

        let sub = run_attempt_sequence(step, ctx, registry, clock, &locals).await;
        all_succeeded &= sub.status == 0;
        total_rt += sub.rt;
        reqs.push(sub.req);
        ress.push(sub.res);
    }

    StepView {
        req: Value::List(reqs),
        res: Value::List(ress),
        rt: total_rt,
        status: if all_succeeded { 0 } else { 1 },
    }
}

/// Runs the wait/evaluate/dispatch/test sequence, retrying on retryable
/// failure per the step's [`RetryDef`]. A step with no `retry` block is
/// attempted exactly once (§4.E).
async fn run_attempt_sequence<C: Clock>(
    step: &StepDef,
    ctx: &Context,
    registry: &ExecutorRegistry,
    clock: &C,
    locals: &IndexMap<String, Value>,
) -> StepView {
    if let Some(wait) = step.wait_duration() {
        tokio::time::sleep(wait).await;
    }

    let retry = step.retry.clone().unwrap_or_default();
    // An absent `retry` block means exactly one attempt (§4.E); the
    // defaulted `RetryDef` above is only used for its backoff/jitter
    // shape once a present `retry` has already allowed a second attempt.
    let max_attempts = if step.retry.is_some() { retry.max_attempts() } else { 1 };
    let started = clock.now();
    let mut attempt: u32 = 1;

    loop {
        if attempt > 1 {
            let interval = apply_jitter(backoff_interval(&retry, attempt), retry.jitter());
            tokio::time::sleep(interval).await;
        }

        let (view, retryable) = dispatch_attempt(step, ctx, registry, locals).await;

        if view.status == 0 || !retryable || !should_retry(max_attempts, attempt) {
            let rt = clock.now().saturating_duration_since(started);
            return StepView { rt, ..view };
        }
        attempt += 1;
    }
}

/// One attempt: evaluate `with` against the context, dispatch to the
/// named executor, then compute status — from `test` if present,
/// otherwise from the dispatch response's success flag. Returns whether
/// a retry should be considered on failure.
async fn dispatch_attempt(
    step: &StepDef,
    ctx: &Context,
    registry: &ExecutorRegistry,
    locals: &IndexMap<String, Value>,
) -> (StepView, bool) {
    let evaluated_with = match evaluate_with(step, ctx, locals) {
        Ok(w) => w,
        Err(_) => {
            // A malformed template in `with` is not retryable; it will
            // fail identically on every attempt.
            return (
                StepView { req: Value::Null, res: Value::Null, rt: Duration::ZERO, status: 1 },
                false,
            );
        }
    };
    let req_value = unflatten(&evaluated_with);
    let wire_with: BTreeMap<String, String> = evaluated_with.into_iter().collect();

    let request = DispatchRequest { args: Vec::new(), with: wire_with };
    let dispatch_result = registry.dispatch(&step.uses, request).await;

    let (res_value, dispatch_succeeded, retryable) = match &dispatch_result {
        Ok(response) => (unflatten(&response.result), response.is_success(), true),
        Err(e) => (Value::Null, false, e.is_retryable()),
    };

    let mut eval_locals = locals.clone();
    eval_locals.insert("req".to_string(), req_value.clone());
    eval_locals.insert("res".to_string(), res_value.clone());

    let status = match &step.test {
        Some(test_expr) => match evaluate(test_expr, ctx, &eval_locals) {
            Ok(v) => i32::from(!v.is_truthy()),
            Err(_) => 1,
        },
        None => i32::from(!dispatch_succeeded),
    };

    if let Some(echo) = &step.echo {
        if let Ok(message) = expand(echo, ctx, &eval_locals) {
            tracing::info!(step = %step.name, %message, "echo");
        }
    }

    (StepView { req: req_value, res: res_value, rt: Duration::ZERO, status }, retryable)
}

fn evaluate_with(
    step: &StepDef,
    ctx: &Context,
    locals: &IndexMap<String, Value>,
) -> Result<IndexMap<String, String>, probe_workflow::TemplateError> {
    let mut out = IndexMap::new();
    for (key, template) in &step.with {
        out.insert(key.clone(), expand(template, ctx, locals)?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "step_runner_tests.rs"]
mod tests;

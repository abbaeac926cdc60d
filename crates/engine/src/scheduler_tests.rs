use super::*;
use probe_core::SystemClock;
use probe_dispatch::fake::FakeExecutor;
use probe_dispatch::DispatchResponse;
use probe_workflow::{JobDef, StepDef, WorkflowDef};
use std::collections::BTreeMap;

fn step(name: &str, uses: &str) -> StepDef {
    StepDef {
        name: name.into(),
        uses: uses.into(),
        with: IndexMap::new(),
        test: None,
        echo: None,
        iter: None,
        retry: None,
        wait: None,
    }
}

fn job(name: &str, needs: &[&str], uses: &str) -> JobDef {
    JobDef {
        name: name.into(),
        needs: needs.iter().map(|s| s.to_string()).collect(),
        repeat: None,
        defaults: IndexMap::new(),
        steps: vec![step("step", uses)],
    }
}

fn workflow(jobs: Vec<JobDef>) -> WorkflowDef {
    WorkflowDef { vars: IndexMap::new(), executors: IndexMap::new(), jobs }
}

#[test]
fn validate_rejects_a_cycle() {
    let wf = workflow(vec![job("a", &["b"], "echo"), job("b", &["a"], "echo")]);
    let err = validate(&wf, &Limits::default()).unwrap_err();
    assert!(matches!(err, ValidationError::Cycle(_)));
}

#[test]
fn validate_rejects_unknown_needs() {
    let wf = workflow(vec![job("a", &["ghost"], "echo")]);
    let err = validate(&wf, &Limits::default()).unwrap_err();
    assert!(matches!(err, ValidationError::UnknownNeeds { .. }));
}

#[test]
fn validate_rejects_repeat_count_above_limit() {
    let mut a = job("a", &[], "echo");
    a.repeat = Some(probe_workflow::RepeatDef { count: 5000, interval: None });
    let wf = workflow(vec![a]);
    let err = validate(&wf, &Limits::default()).unwrap_err();
    assert!(matches!(err, ValidationError::BoundExceeded { .. }));
}

#[test]
fn validate_accepts_a_well_formed_dag() {
    let wf = workflow(vec![job("a", &[], "echo"), job("b", &["a"], "echo")]);
    assert!(validate(&wf, &Limits::default()).is_ok());
}

#[test]
fn topological_layers_group_independent_jobs_together() {
    let wf = workflow(vec![
        job("a", &[], "echo"),
        job("b", &[], "echo"),
        job("c", &["a", "b"], "echo"),
    ]);
    let graph = validate(&wf, &Limits::default()).unwrap();
    let layers = topological_layers(&graph);
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].len(), 2);
    assert_eq!(layers[1].len(), 1);
}

fn registry_with_echo_and_fail() -> Arc<ExecutorRegistry> {
    let registry = ExecutorRegistry::new();
    registry.register(FakeExecutor::new(
        "echo",
        DispatchResponse { result: BTreeMap::new(), error: String::new() },
    ));
    registry.register(FakeExecutor::new(
        "fail",
        DispatchResponse { result: BTreeMap::new(), error: "nope".into() },
    ));
    Arc::new(registry)
}

#[tokio::test]
async fn independent_jobs_all_run_and_succeed() {
    let wf = workflow(vec![job("a", &[], "echo"), job("b", &[], "echo")]);
    let outcome = run_workflow(
        &wf,
        registry_with_echo_and_fail(),
        SystemClock,
        &Limits::default(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, 0);
    assert_eq!(outcome.jobs["a"].status, JobStatus::Success);
    assert_eq!(outcome.jobs["b"].status, JobStatus::Success);
}

#[tokio::test]
async fn a_failed_job_skips_its_transitive_dependents() {
    let wf = workflow(vec![
        job("a", &[], "fail"),
        job("b", &["a"], "echo"),
        job("c", &["b"], "echo"),
    ]);
    let outcome = run_workflow(
        &wf,
        registry_with_echo_and_fail(),
        SystemClock,
        &Limits::default(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, 1);
    assert_eq!(outcome.jobs["a"].status, JobStatus::Failure);
    assert_eq!(outcome.jobs["b"].status, JobStatus::Skipped);
    assert_eq!(outcome.jobs["c"].status, JobStatus::Skipped);
}

#[tokio::test]
async fn cancellation_before_a_layer_starts_skips_its_jobs() {
    let wf = workflow(vec![job("a", &[], "echo")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = run_workflow(
        &wf,
        registry_with_echo_and_fail(),
        SystemClock,
        &Limits::default(),
        cancel,
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, 1);
    assert_eq!(outcome.jobs["a"].status, JobStatus::Skipped);
}

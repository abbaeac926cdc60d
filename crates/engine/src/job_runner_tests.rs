use super::*;
use probe_core::SystemClock;
use probe_dispatch::fake::FakeExecutor;
use probe_dispatch::DispatchResponse;
use probe_workflow::{RepeatDef, StepDef};
use crate::cancel::CancellationToken;
use std::collections::BTreeMap;

fn plain_step(name: &str, uses: &str) -> StepDef {
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

#[tokio::test]
async fn job_status_is_and_of_step_statuses() {
    let registry = ExecutorRegistry::new();
    registry.register(FakeExecutor::new(
        "echo",
        DispatchResponse { result: BTreeMap::new(), error: String::new() },
    ));
    registry.register(FakeExecutor::new(
        "fail",
        DispatchResponse { result: BTreeMap::new(), error: "nope".into() },
    ));

    let job = JobDef {
        name: "deploy".into(),
        needs: vec![],
        repeat: None,
        defaults: IndexMap::new(),
        steps: vec![plain_step("a", "echo"), plain_step("b", "fail")],
    };

    let outcome = run_job(&job, IndexMap::new(), IndexMap::new(), &registry, &SystemClock, &CancellationToken::new()).await;
    assert_eq!(outcome.status, 1);
    assert_eq!(outcome.context.step_by_name("a").unwrap().status, 0);
    assert_eq!(outcome.context.step_by_name("b").unwrap().status, 1);
}

#[tokio::test]
async fn job_defaults_are_inherited_and_overridable() {
    let registry = ExecutorRegistry::new();
    registry.register(FakeExecutor::new(
        "echo",
        DispatchResponse { result: BTreeMap::new(), error: String::new() },
    ));

    let mut defaults = IndexMap::new();
    defaults.insert("base_url".to_string(), "http://default".to_string());
    defaults.insert("timeout".to_string(), "5s".to_string());

    let mut step = plain_step("a", "echo");
    step.with.insert("timeout".to_string(), "30s".to_string());

    let job = JobDef { name: "deploy".into(), needs: vec![], repeat: None, defaults, steps: vec![step] };
    let outcome = run_job(&job, IndexMap::new(), IndexMap::new(), &registry, &SystemClock, &CancellationToken::new()).await;

    let req = outcome.context.step_by_name("a").unwrap().req.as_map().unwrap();
    assert_eq!(req.get("base_url").unwrap().as_str(), Some("http://default"));
    assert_eq!(req.get("timeout").unwrap().to_text(), "30s");
}

#[tokio::test]
async fn repeat_runs_the_whole_step_sequence_count_times_and_keeps_the_last_iteration() {
    let registry = ExecutorRegistry::new();
    let fake = FakeExecutor::new(
        "echo",
        DispatchResponse { result: BTreeMap::new(), error: String::new() },
    );
    registry.register(fake.clone());

    let job = JobDef {
        name: "poll".into(),
        needs: vec![],
        repeat: Some(RepeatDef { count: 3, interval: None }),
        defaults: IndexMap::new(),
        steps: vec![plain_step("ping", "echo")],
    };

    let outcome = run_job(&job, IndexMap::new(), IndexMap::new(), &registry, &SystemClock, &CancellationToken::new()).await;
    assert_eq!(outcome.status, 0);
    assert_eq!(outcome.context.job.iteration, 2);
    assert_eq!(fake.call_count(), 3);
}

#[tokio::test]
async fn repeat_count_zero_runs_no_iterations() {
    let registry = ExecutorRegistry::new();
    let fake = FakeExecutor::new(
        "echo",
        DispatchResponse { result: BTreeMap::new(), error: String::new() },
    );
    registry.register(fake.clone());

    let job = JobDef {
        name: "noop".into(),
        needs: vec![],
        repeat: Some(RepeatDef { count: 0, interval: None }),
        defaults: IndexMap::new(),
        steps: vec![plain_step("ping", "echo")],
    };

    let outcome = run_job(&job, IndexMap::new(), IndexMap::new(), &registry, &SystemClock, &CancellationToken::new()).await;
    assert_eq!(outcome.status, 0);
    assert_eq!(fake.call_count(), 0);
}

use super::*;
use probe_core::{Clock, JobView, SystemClock};
use probe_dispatch::fake::FakeExecutor;
use probe_dispatch::DispatchError;
use std::collections::BTreeMap;

fn new_ctx() -> Context {
    Context::new(JobView { name: "deploy".into(), iteration: 0 }, IndexMap::new(), IndexMap::new())
}

fn step(uses: &str) -> StepDef {
    StepDef {
        name: "probe".into(),
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
async fn successful_dispatch_commits_status_zero() {
    let registry = ExecutorRegistry::new();
    registry.register(FakeExecutor::new(
        "echo",
        DispatchResponse { result: BTreeMap::from([("ok".into(), "1".into())]), error: String::new() },
    ));
    let mut ctx = new_ctx();
    let clock = SystemClock;

    let view = run_step(&step("echo"), 0, &mut ctx, &registry, &clock).await;
    assert_eq!(view.status, 0);
    assert_eq!(ctx.step_by_ordinal(0).unwrap().status, 0);
}

#[tokio::test]
async fn test_expression_overrides_dispatch_success() {
    let registry = ExecutorRegistry::new();
    registry.register(FakeExecutor::new(
        "echo",
        DispatchResponse { result: BTreeMap::from([("code".into(), "500".into())]), error: String::new() },
    ));
    let mut ctx = new_ctx();
    let clock = SystemClock;

    let mut s = step("echo");
    s.test = Some("{{ res.code == \"200\" }}".to_string());

    let view = run_step(&s, 0, &mut ctx, &registry, &clock).await;
    assert_eq!(view.status, 1);
}

#[tokio::test]
async fn absent_retry_block_attempts_exactly_once_on_failure() {
    let registry = ExecutorRegistry::new();
    let fake = FakeExecutor::new(
        "flaky",
        DispatchResponse { result: BTreeMap::new(), error: String::new() },
    );
    fake.push_response(Err(DispatchError::ActionTransport("timeout".into())));
    fake.push_response(Err(DispatchError::ActionTransport("timeout".into())));
    fake.push_response(Err(DispatchError::ActionTransport("timeout".into())));
    registry.register(fake.clone());

    let mut ctx = new_ctx();
    let clock = SystemClock;
    let view = run_step(&step("flaky"), 0, &mut ctx, &registry, &clock).await;

    assert_eq!(view.status, 1);
    assert_eq!(fake.call_count(), 1);
}

#[tokio::test]
async fn retries_until_a_retryable_failure_succeeds() {
    let registry = ExecutorRegistry::new();
    let fake = FakeExecutor::new(
        "flaky",
        DispatchResponse { result: BTreeMap::new(), error: String::new() },
    );
    fake.push_response(Err(DispatchError::ActionTransport("timeout".into())));
    registry.register(fake.clone());

    let mut s = step("flaky");
    s.retry = Some(serde_yaml::from_str("max_attempts: 3\ninitial_interval: 1ms\n").unwrap());

    let mut ctx = new_ctx();
    let clock = SystemClock;
    let view = run_step(&s, 0, &mut ctx, &registry, &clock).await;

    assert_eq!(view.status, 0);
    assert_eq!(fake.call_count(), 2);
}

#[tokio::test]
async fn action_unavailable_is_never_retried() {
    let registry = ExecutorRegistry::new();
    let mut ctx = new_ctx();
    let clock = SystemClock;

    let mut s = step("does-not-exist");
    s.retry = Some(serde_yaml::from_str("max_attempts: 5\ninitial_interval: 1ms\n").unwrap());

    let view = run_step(&s, 0, &mut ctx, &registry, &clock).await;
    assert_eq!(view.status, 1);
}

#[tokio::test]
async fn iter_expansion_aggregates_status_by_and() {
    let registry = ExecutorRegistry::new();
    let fake = FakeExecutor::new(
        "echo",
        DispatchResponse { result: BTreeMap::new(), error: String::new() },
    );
    fake.push_response(Ok(DispatchResponse { result: BTreeMap::new(), error: String::new() }));
    fake.push_response(Err(DispatchError::ActionUnavailable("gone".into())));
    registry.register(fake);

    let mut s = step("echo");
    let mut element = IndexMap::new();
    element.insert("host".to_string(), serde_yaml::Value::String("a".into()));
    let mut element2 = IndexMap::new();
    element2.insert("host".to_string(), serde_yaml::Value::String("b".into()));
    s.iter = Some(vec![element, element2]);

    let mut ctx = new_ctx();
    let clock = SystemClock;
    let view = run_step(&s, 0, &mut ctx, &registry, &clock).await;

    assert_eq!(view.status, 1);
    assert_eq!(view.res.as_list().unwrap().len(), 2);
}

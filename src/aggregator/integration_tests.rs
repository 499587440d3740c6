//! Integration tests for aggregator graph execution.

use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::errors::InstanceFailure;
use crate::stubs::{FailingInstance, PanickingInstance, StubInstance};
use crate::traits::Instance;

#[tokio::test]
async fn test_linear_chain_runs_every_instance_once() {
    let a = Arc::new(StubInstance::new("a", &[]));
    let b = Arc::new(StubInstance::new("b", &["a"]));
    let c = Arc::new(StubInstance::new("c", &["b"]));
    let aggregator = Aggregator::new(vec![
        Arc::clone(&a) as Arc<dyn Instance>,
        Arc::clone(&b) as Arc<dyn Instance>,
        Arc::clone(&c) as Arc<dyn Instance>,
    ])
    .unwrap();

    aggregator.process(serde_json::Value::Null).await;

    assert_eq!(a.invocations(), 1);
    assert_eq!(b.invocations(), 1);
    assert_eq!(c.invocations(), 1);
}

#[tokio::test]
async fn test_poison_propagates_down_a_chain_without_executing_it() {
    // A -> B -> C where A fails: neither B nor C runs, and both record A's
    // failure as their outcome
    let a = Arc::new(FailingInstance::new("a", &[], "source outage"));
    let b = Arc::new(StubInstance::new("b", &["a"]));
    let c = Arc::new(StubInstance::new("c", &["b"]));
    let aggregator = Aggregator::new(vec![
        Arc::clone(&a) as Arc<dyn Instance>,
        Arc::clone(&b) as Arc<dyn Instance>,
        Arc::clone(&c) as Arc<dyn Instance>,
    ])
    .unwrap();

    let outcomes = aggregator.execute(serde_json::Value::Null).await;

    assert_eq!(a.invocations(), 1);
    assert_eq!(b.invocations(), 0);
    assert_eq!(c.invocations(), 0);

    let poison = InstanceFailure::new("a", "source outage");
    assert_eq!(outcomes.get("b"), Some(&Some(poison.clone())));
    assert_eq!(outcomes.get("c"), Some(&Some(poison)));
}

#[tokio::test]
async fn test_fan_in_requires_every_parent_to_succeed() {
    // {A, B} -> C with A succeeding and B failing: any single failed
    // parent blocks execution
    let a = Arc::new(StubInstance::new("a", &[]));
    let b = Arc::new(FailingInstance::new("b", &[], "partial outage"));
    let c = Arc::new(StubInstance::new("c", &["a", "b"]));
    let aggregator = Aggregator::new(vec![
        Arc::clone(&a) as Arc<dyn Instance>,
        Arc::clone(&b) as Arc<dyn Instance>,
        Arc::clone(&c) as Arc<dyn Instance>,
    ])
    .unwrap();

    let outcomes = aggregator.execute(serde_json::Value::Null).await;

    assert_eq!(a.invocations(), 1);
    assert_eq!(c.invocations(), 0);
    assert_eq!(
        outcomes.get("c"),
        Some(&Some(InstanceFailure::new("b", "partial outage")))
    );
}

#[tokio::test]
async fn test_independent_branches_are_not_poisoned() {
    // A failing root poisons only its own subtree
    let poisoned_root = Arc::new(FailingInstance::new("bad-root", &[], "outage"));
    let poisoned_child = Arc::new(StubInstance::new("bad-child", &["bad-root"]));
    let healthy_root = Arc::new(StubInstance::new("good-root", &[]));
    let healthy_child = Arc::new(StubInstance::new("good-child", &["good-root"]));
    let aggregator = Aggregator::new(vec![
        Arc::clone(&poisoned_root) as Arc<dyn Instance>,
        Arc::clone(&poisoned_child) as Arc<dyn Instance>,
        Arc::clone(&healthy_root) as Arc<dyn Instance>,
        Arc::clone(&healthy_child) as Arc<dyn Instance>,
    ])
    .unwrap();

    aggregator.process(serde_json::Value::Null).await;

    assert_eq!(poisoned_child.invocations(), 0);
    assert_eq!(healthy_root.invocations(), 1);
    assert_eq!(healthy_child.invocations(), 1);
}

#[tokio::test]
async fn test_diamond_fan_out_and_fan_in() {
    let entry = Arc::new(StubInstance::new("entry", &[]));
    let left = Arc::new(StubInstance::new("left", &["entry"]));
    let right = Arc::new(StubInstance::new("right", &["entry"]));
    let merge = Arc::new(StubInstance::new("merge", &["left", "right"]));
    let aggregator = Aggregator::new(vec![
        Arc::clone(&entry) as Arc<dyn Instance>,
        Arc::clone(&left) as Arc<dyn Instance>,
        Arc::clone(&right) as Arc<dyn Instance>,
        Arc::clone(&merge) as Arc<dyn Instance>,
    ])
    .unwrap();

    aggregator.process(serde_json::Value::Null).await;

    assert_eq!(entry.invocations(), 1);
    assert_eq!(left.invocations(), 1);
    assert_eq!(right.invocations(), 1);
    assert_eq!(merge.invocations(), 1);
}

#[tokio::test]
async fn test_panicking_instance_poisons_dependents_instead_of_hanging() {
    let exploding = Arc::new(PanickingInstance::new("exploding", &[]));
    let downstream = Arc::new(StubInstance::new("downstream", &["exploding"]));
    let aggregator = Aggregator::new(vec![
        Arc::clone(&exploding) as Arc<dyn Instance>,
        Arc::clone(&downstream) as Arc<dyn Instance>,
    ])
    .unwrap();

    let outcomes = aggregator.execute(serde_json::Value::Null).await;

    // The panicking worker never delivered an outcome; the dependent
    // poisoned itself from the dropped channel rather than blocking forever
    assert_eq!(downstream.invocations(), 0);
    assert!(outcomes.get("downstream").unwrap().is_some());
    assert!(outcomes.get("exploding").unwrap().is_some());
}

#[tokio::test]
async fn test_instances_receive_the_pass_input() {
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CapturingInstance {
        name: String,
        seen: Mutex<Option<serde_json::Value>>,
    }

    #[async_trait]
    impl Instance for CapturingInstance {
        async fn process(&self, data: &serde_json::Value) -> anyhow::Result<()> {
            *self.seen.lock().unwrap() = Some(data.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn depends_on(&self) -> &[String] {
            &[]
        }
    }

    let capturing = Arc::new(CapturingInstance {
        name: "capture".to_string(),
        seen: Mutex::new(None),
    });
    let aggregator =
        Aggregator::new(vec![Arc::clone(&capturing) as Arc<dyn Instance>]).unwrap();

    aggregator
        .process(serde_json::json!({"pass": "2026-08-07"}))
        .await;

    assert_eq!(
        capturing.seen.lock().unwrap().clone(),
        Some(serde_json::json!({"pass": "2026-08-07"}))
    );
}

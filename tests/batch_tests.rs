mod common;

use std::sync::Arc;

use agent_orchestrator::prelude::*;
use common::*;

#[tokio::test]
async fn test_batch_results_line_up_with_requests() {
    let (orchestrator, _) = orchestrator_with_events().await;

    let report = orchestrator
        .run_many(vec![
            TaskRequest::new("echo", "first"),
            TaskRequest::new("missing", "second"),
            TaskRequest::new("broken", "third"),
            TaskRequest::new("echo", "fourth"),
        ])
        .await;

    assert_eq!(report.total, 4);
    assert_eq!(report.successful, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.results.len(), 4);

    let first = report.results[0].as_result().unwrap();
    assert_eq!(first.result.as_ref().unwrap()["echo"], "first");

    match &report.results[1] {
        BatchEntry::Stub(stub) => {
            assert!(!stub.success);
            assert_eq!(stub.agent_type, "missing");
            assert!(stub.error.contains("missing"));
        }
        other => panic!("expected stub, got {:?}", other),
    }

    let third = report.results[2].as_result().unwrap();
    assert!(!third.success);
    assert_eq!(third.error.as_deref(), Some("agent exploded"));

    let fourth = report.results[3].as_result().unwrap();
    assert_eq!(fourth.result.as_ref().unwrap()["echo"], "fourth");
}

#[tokio::test]
async fn test_batch_counts_add_up() {
    let (orchestrator, _) = orchestrator_with_events().await;
    let requests = (0..10)
        .map(|i| {
            let agent = if i % 3 == 0 { "broken" } else { "echo" };
            TaskRequest::new(agent, format!("job {}", i))
        })
        .collect();

    let report = orchestrator.run_many(requests).await;

    assert_eq!(report.successful + report.failed, report.total);
    assert_eq!(report.failed, 4);
    assert!(!report.all_succeeded());
}

#[tokio::test]
async fn test_batch_runs_concurrently() {
    let (orchestrator, _) = orchestrator_with_events().await;
    let gauge = Arc::new(InFlightExecutor::new(ExecutorDescriptor::new("gauge", "Gauge")));
    orchestrator.registry().register("gauge", gauge.clone()).await;

    let requests = (0..8)
        .map(|i| TaskRequest::new("gauge", format!("job {}", i)))
        .collect();
    let report = orchestrator.run_many(requests).await;

    assert!(report.all_succeeded());
    assert!(gauge.peak() > 1, "peak in flight was {}", gauge.peak());
}

#[tokio::test]
async fn test_batch_serializes_stub_shape() {
    let (orchestrator, _) = orchestrator_with_events().await;
    let report = orchestrator
        .run_many(vec![TaskRequest::new("missing", "x")])
        .await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["results"][0]["success"], false);
    assert_eq!(json["results"][0]["agentType"], "missing");
    assert!(json["results"][0].get("durationMs").is_none());
}

#[tokio::test]
async fn test_batch_emits_task_and_summary_events() {
    let (orchestrator, publisher) = orchestrator_with_events().await;
    orchestrator
        .run_many(vec![
            TaskRequest::new("echo", "a"),
            TaskRequest::new("broken", "b"),
        ])
        .await;

    let names = publisher.names().await;
    assert_eq!(names.iter().filter(|n| **n == EventName::TaskStarted).count(), 2);
    assert_eq!(names.iter().filter(|n| **n == EventName::TaskCompleted).count(), 1);
    assert_eq!(names.iter().filter(|n| **n == EventName::TaskFailed).count(), 1);
    assert_eq!(names.last(), Some(&EventName::BatchCompleted));
}

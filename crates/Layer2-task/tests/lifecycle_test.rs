//! Service-level lifecycle tests
//!
//! `cargo test -p taskflow-task --test lifecycle_test`

use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskflow_foundation::{EngineConfig, Error, HubConfig, TaskflowConfig};
use taskflow_task::{Executor, FnExecutor, TaskService, TaskStatus, UNKNOWN_TASK};
use tokio::sync::Semaphore;

const WAIT: Option<Duration> = Some(Duration::from_secs(10));

fn config(max_active_tasks: usize) -> TaskflowConfig {
    TaskflowConfig {
        engine: EngineConfig {
            max_concurrent: 8,
            max_active_tasks,
            work_delay_ms: 20,
            success_rate: 1.0,
        },
        hub: HubConfig::default(),
        ..Default::default()
    }
}

/// Completes once the gate hands out a permit
fn gated(gate: &Arc<Semaphore>) -> Arc<dyn Executor> {
    let gate = Arc::clone(gate);
    Arc::new(FnExecutor::new("gated", move |_task| {
        let gate = Arc::clone(&gate);
        async move {
            let _permit = gate.acquire().await;
            Ok(())
        }
        .boxed()
    }))
}

/// Fails every task whose description contains "bad"
fn picky() -> Arc<dyn Executor> {
    Arc::new(FnExecutor::new("picky", |task| {
        async move {
            if task.description.contains("bad") {
                Err(Error::Task(format!("refused '{}'", task.description)))
            } else {
                Ok(())
            }
        }
        .boxed()
    }))
}

#[tokio::test]
async fn test_sample_task_scenario() {
    let service = TaskService::new(&config(100));
    let id = service.submit_task("Sample Task", "HIGH").unwrap();

    let immediate = service.check_task_status(&id);
    assert!(
        immediate == "QUEUED" || immediate == "IN_PROGRESS",
        "unexpected immediate status {immediate}"
    );

    let terminal = service.wait_task(&id, WAIT).await.unwrap();
    assert_eq!(terminal, TaskStatus::Completed);

    // terminal statuses stay put
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.check_task_status(&id), "COMPLETED");
    let task = service.task(&id).unwrap();
    assert_eq!(task.priority, "HIGH");
    assert!(task.started_at.is_some());
    assert!(task.completed_at.is_some());
}

#[tokio::test]
async fn test_stream_follows_lifecycle() {
    let gate = Arc::new(Semaphore::new(0));
    let service = TaskService::with_executor(&config(100), gated(&gate));

    let id = service.submit_task("streamed", "LOW").unwrap();
    let subscription = service.stream_task_status(&id).unwrap();
    gate.add_permits(1);

    let seen = subscription.collect_all().await;
    assert_eq!(seen, vec![TaskStatus::InProgress, TaskStatus::Completed]);
}

#[tokio::test]
async fn test_failed_task_records_error() {
    let service = TaskService::with_executor(&config(100), picky());

    let id = service.submit_task("bad input", "LOW").unwrap();
    let seen = service.stream_task_status(&id).unwrap().collect_all().await;

    assert_eq!(seen.last(), Some(&TaskStatus::Failed));
    assert_eq!(service.check_task_status(&id), "FAILED");
    let task = service.task(&id).unwrap();
    assert!(task.error.unwrap().contains("refused 'bad input'"));
}

#[tokio::test]
async fn test_two_subscribers_see_identical_sequences() {
    let gate = Arc::new(Semaphore::new(0));
    let service = TaskService::with_executor(&config(100), gated(&gate));

    let id = service.submit_task("shared", "HIGH").unwrap();
    let first = service.stream_task_status(&id).unwrap();
    let second = service.stream_task_status(&id).unwrap();

    let readers = (
        tokio::spawn(first.collect_all()),
        tokio::spawn(second.collect_all()),
    );
    gate.add_permits(1);

    let first_seen = readers.0.await.unwrap();
    let second_seen = readers.1.await.unwrap();

    assert_eq!(first_seen, second_seen);
    assert_eq!(
        first_seen,
        vec![TaskStatus::InProgress, TaskStatus::Completed]
    );
}

#[tokio::test]
async fn test_unknown_ids() {
    let service = TaskService::new(&config(100));

    assert_eq!(service.check_task_status("nonexistent"), UNKNOWN_TASK);

    let result = tokio::time::timeout(Duration::from_millis(100), async {
        service.stream_task_status("nonexistent")
    })
    .await
    .expect("stream of an unknown id must fail immediately");
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_statistics_before_any_submission() {
    let service = TaskService::new(&config(100));
    let stats = service.get_statistics();

    assert_eq!(stats.queued, 0);
    assert_eq!(stats.in_progress, 0);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.failed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions() {
    let service = TaskService::with_executor(&config(1_000), picky());

    let submissions = (0..200).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            let description = if i % 4 == 0 {
                format!("bad task {i}")
            } else {
                format!("task {i}")
            };
            service.submit_task(&description, "LOW").unwrap()
        })
    });
    let ids: Vec<String> = join_all(submissions)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let distinct: HashSet<&String> = ids.iter().collect();
    assert_eq!(distinct.len(), 200);
    assert_eq!(service.manager().registry().len(), 200);

    // statistics always account for every submission
    assert_eq!(service.get_statistics().total(), 200);

    for id in &ids {
        service.wait_task(id, WAIT).await.unwrap();
    }

    let stats = service.get_statistics();
    assert_eq!(stats.total(), 200);
    assert_eq!(stats.failed, 50);
    assert_eq!(stats.completed, 150);
    assert_eq!(stats.active(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_statistics_track_submissions_in_flight() {
    let service = TaskService::with_executor(&config(10_000), picky());
    let attempted = Arc::new(AtomicU64::new(0));
    let returned = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let sampler = {
        let service = service.clone();
        let attempted = Arc::clone(&attempted);
        let returned = Arc::clone(&returned);
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            let mut samples = 0u64;
            loop {
                let finished = done.load(Ordering::SeqCst);
                let before = returned.load(Ordering::SeqCst);
                let total = service.get_statistics().total();
                let after = attempted.load(Ordering::SeqCst);
                assert!(
                    before <= total && total <= after,
                    "statistics total {total} outside [{before}, {after}]"
                );
                samples += 1;
                if finished {
                    break samples;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let submitters = (0..4).map(|worker| {
        let service = service.clone();
        let attempted = Arc::clone(&attempted);
        let returned = Arc::clone(&returned);
        tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..250 {
                let description = if i % 5 == 0 {
                    format!("bad {worker}-{i}")
                } else {
                    format!("task {worker}-{i}")
                };
                attempted.fetch_add(1, Ordering::SeqCst);
                ids.push(service.submit_task(&description, "LOW").unwrap());
                returned.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
            ids
        })
    });
    let ids: Vec<String> = join_all(submitters)
        .await
        .into_iter()
        .flat_map(|joined| joined.unwrap())
        .collect();

    for id in &ids {
        service.wait_task(id, WAIT).await.unwrap();
    }
    done.store(true, Ordering::SeqCst);

    let samples = sampler.await.unwrap();
    assert!(samples > 1);

    let stats = service.get_statistics();
    assert_eq!(stats.total(), 1_000);
    assert_eq!(stats.failed, 200);
    assert_eq!(stats.completed, 800);
}

#[tokio::test]
async fn test_capacity_exceeded_is_reported() {
    let gate = Arc::new(Semaphore::new(0));
    let service = TaskService::with_executor(&config(3), gated(&gate));

    for i in 0..3 {
        service.submit_task(&format!("task {i}"), "LOW").unwrap();
    }
    let err = service.submit_task("overflow", "LOW").unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(_)));
    assert!(err.is_retryable());

    // refused submissions leave no record behind
    assert_eq!(service.get_statistics().total(), 3);
    gate.add_permits(3);
}

#[tokio::test]
async fn test_dropped_stream_does_not_block_engine() {
    let gate = Arc::new(Semaphore::new(0));
    let service = TaskService::with_executor(&config(100), gated(&gate));

    let id = service.submit_task("abandoned", "LOW").unwrap();
    drop(service.stream_task_status(&id).unwrap());
    gate.add_permits(1);

    assert_eq!(
        service.wait_task(&id, WAIT).await.unwrap(),
        TaskStatus::Completed
    );
}

// tests/local_engine.rs

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use lazydag::exec::{ExecutionEngine, HandleOutcome, LocalEngine, PoolTarget, SubmitRequest};
use lazydag::fs::RealFileSystem;
use lazydag::status::{JsonlMonitoringStore, MonitorStatus, MonitoringStore};
use lazydag::workflow::{EngineSection, LOCAL_POOL};
use lazydag::workflow::command::job_command_line;
use lazydag_test_utils::builders::{JobSpecBuilder, WorkflowBuilder};
use lazydag_test_utils::{init_tracing, with_timeout};

fn request(dir: &Path, job: &str, command: &str, inputs: Vec<lazydag::exec::Handle>) -> SubmitRequest {
    SubmitRequest {
        job: job.to_string(),
        task_type: job.to_string(),
        command: command.to_string(),
        inputs,
        stdout: dir.join("logging").join(format!("{job}.stdout")),
        stderr: dir.join("logging").join(format!("{job}.stderr")),
    }
}

fn local() -> PoolTarget {
    PoolTarget::Named(LOCAL_POOL.to_string())
}

#[tokio::test]
async fn wrapped_command_writes_marker_and_stdout() {
    init_tracing();
    let dir = tempdir().unwrap();
    let run = WorkflowBuilder::new("wf")
        .rooted_at(dir.path())
        .with_job("a", JobSpecBuilder::new("echo hello").build())
        .build()
        .run;
    let cmd = job_command_line(&JobSpecBuilder::new("echo hello").build(), &run, None);

    let engine = LocalEngine::from_config(&EngineSection::default());
    let handle = engine.submit(&local(), request(dir.path(), "a", &cmd, Vec::new()));

    assert_eq!(with_timeout(handle.wait()).await, HandleOutcome::Succeeded);
    let stderr = fs::read_to_string(dir.path().join("logging/a.stderr")).unwrap();
    assert_eq!(stderr.trim_end().lines().last(), Some("success"));
    let stdout = fs::read_to_string(dir.path().join("logging/a.stdout")).unwrap();
    assert_eq!(stdout.trim(), "hello");
}

#[tokio::test]
async fn failing_command_reports_exit_code_and_blocks_dependents() {
    init_tracing();
    let dir = tempdir().unwrap();
    let engine = LocalEngine::from_config(&EngineSection::default());

    let failing = engine.submit(&local(), request(dir.path(), "bad", "exit 4", Vec::new()));
    let marker = dir.path().join("ran");
    let dependent = engine.submit(
        &local(),
        request(
            dir.path(),
            "after",
            &format!("touch {}", marker.display()),
            vec![failing.clone()],
        ),
    );

    assert_eq!(
        with_timeout(failing.wait()).await,
        HandleOutcome::Failed { exit_code: Some(4) }
    );
    assert_eq!(
        with_timeout(dependent.wait()).await,
        HandleOutcome::DependencyFailed
    );
    assert!(!marker.exists());
}

#[tokio::test]
async fn dependent_starts_after_its_input_finished() {
    init_tracing();
    let dir = tempdir().unwrap();
    let engine = LocalEngine::from_config(&EngineSection {
        local_workers: 4,
        ..Default::default()
    });
    let flag = dir.path().join("flag");

    let first = engine.submit(
        &local(),
        request(
            dir.path(),
            "first",
            &format!("sleep 0.2 && touch {}", flag.display()),
            Vec::new(),
        ),
    );
    let second = engine.submit(
        &local(),
        request(
            dir.path(),
            "second",
            &format!("test -e {}", flag.display()),
            vec![first],
        ),
    );

    assert_eq!(with_timeout(second.wait()).await, HandleOutcome::Succeeded);
}

#[tokio::test]
async fn transitions_are_recorded_in_monitoring_store() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = Arc::new(JsonlMonitoringStore::new(
        dir.path().join("monitoring.jsonl"),
        Arc::new(RealFileSystem),
    ));
    let engine =
        LocalEngine::from_config(&EngineSection::default()).with_monitoring(store.clone(), "wf");

    let ok = engine.submit(&local(), request(dir.path(), "ok", "true", Vec::new()));
    let bad = engine.submit(&local(), request(dir.path(), "bad", "false", Vec::new()));
    with_timeout(ok.wait()).await;
    with_timeout(bad.wait()).await;
    let skipped = engine.submit(&local(), request(dir.path(), "skipped", "true", vec![bad]));
    with_timeout(skipped.wait()).await;

    let snapshot = store.query("wf").unwrap();
    assert_eq!(snapshot.get("ok").unwrap().status, MonitorStatus::Completed);
    assert_eq!(snapshot.get("bad").unwrap().status, MonitorStatus::Failed);
    assert_eq!(
        snapshot.get("skipped").unwrap().status,
        MonitorStatus::DependencyFailed
    );

    let lines = fs::read_to_string(dir.path().join("monitoring.jsonl")).unwrap();
    let ok_events: Vec<&str> = lines.lines().filter(|l| l.contains("\"job\":\"ok\"")).collect();
    assert_eq!(ok_events.len(), 4);
}

// tests/status_resolution.rs

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use lazydag::dag::DependencyGraph;
use lazydag::fs::mock::MockFileSystem;
use lazydag::status::{
    FsRepository, JsonlMonitoringStore, MonitorStatus, MonitoringEvent, MonitoringStore,
    StatusResolver,
};
use lazydag::types::JobStatus;
use lazydag::workflow::WorkflowFile;
use lazydag_test_utils::builders::{JobSpecBuilder, WorkflowBuilder};
use lazydag_test_utils::fake_engine::FakeEngine;
use lazydag_test_utils::{init_tracing, mock_scheduler};

fn workflow() -> WorkflowFile {
    WorkflowBuilder::new("wf")
        .with_job(
            "job_isr_1",
            JobSpecBuilder::new("isr")
                .output("postISR/1")
                .successor("job_calibrate_1")
                .build(),
        )
        .with_job(
            "job_calibrate_1",
            JobSpecBuilder::new("calibrate").output("calexp/1").build(),
        )
        .with_job("job_report_1", JobSpecBuilder::new("report").build())
        .build()
}

fn setup(fs: &Arc<MockFileSystem>) -> (DependencyGraph, StatusResolver) {
    let wf = workflow();
    let repo = Arc::new(FsRepository::new("/repo", fs.clone()));
    let resolver = StatusResolver::new(&wf.run, fs.clone(), repo);
    (DependencyGraph::from_workflow(wf), resolver)
}

fn event(job: &str, status: MonitorStatus, secs: i64) -> MonitoringEvent {
    MonitoringEvent {
        workflow: "wf".into(),
        job: job.into(),
        status,
        timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
    }
}

#[test]
fn nothing_known_is_pending() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let (graph, resolver) = setup(&fs);
    let isr = graph.lookup("job_isr_1").unwrap();
    assert_eq!(resolver.resolve(isr), JobStatus::Pending);
    assert!(!isr.is_done(&resolver));
}

#[test]
fn log_markers_drive_status_without_monitoring() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/submit/logging/job_isr_1.stderr", "x\nsuccess\n");
    fs.add_file("/submit/logging/job_calibrate_1.stderr", "failure\n");
    fs.add_file("/submit/logging/job_report_1.stderr", "still going\n");
    let (graph, resolver) = setup(&fs);

    assert_eq!(resolver.resolve(graph.lookup("job_isr_1").unwrap()), JobStatus::Succeeded);
    assert_eq!(resolver.resolve(graph.lookup("job_calibrate_1").unwrap()), JobStatus::Failed);
    assert_eq!(resolver.resolve(graph.lookup("job_report_1").unwrap()), JobStatus::Running);
}

#[test]
fn outputs_override_a_failure_log() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/submit/logging/job_calibrate_1.stderr", "failure\n");
    fs.add_file("/repo/out/calexp/1", "pixels");
    let (graph, resolver) = setup(&fs);

    let calibrate = graph.lookup("job_calibrate_1").unwrap();
    assert!(calibrate.is_done(&resolver));
    assert_eq!(calibrate.status(), JobStatus::Succeeded);
}

#[test]
fn job_without_outputs_is_never_overridden() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/submit/logging/job_report_1.stderr", "failure\n");
    fs.add_dir("/repo/out");
    let (graph, resolver) = setup(&fs);

    assert_eq!(
        resolver.resolve(graph.lookup("job_report_1").unwrap()),
        JobStatus::Failed
    );
}

#[test]
fn missing_monitoring_store_falls_back_to_logs() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/submit/logging/job_isr_1.stderr", "success\n");
    let (graph, resolver) = setup(&fs);
    let store = JsonlMonitoringStore::new("/submit/monitoring.jsonl", fs.clone());

    assert!(!resolver.refresh_monitoring(&store, "wf"));
    assert!(!resolver.has_monitoring_info());
    assert!(graph.lookup("job_isr_1").unwrap().is_done(&resolver));
}

#[test]
fn monitoring_record_wins_over_log() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/submit/logging/job_isr_1.stderr", "failure\n");
    fs.add_file("/submit/logging/job_report_1.stderr", "success\n");
    let store = JsonlMonitoringStore::new("/submit/monitoring.jsonl", fs.clone());
    store.record(&event("job_isr_1", MonitorStatus::Running, 1)).unwrap();
    store.record(&event("job_isr_1", MonitorStatus::Completed, 2)).unwrap();
    store.record(&event("job_calibrate_1", MonitorStatus::Launched, 3)).unwrap();

    let (graph, resolver) = setup(&fs);
    assert!(resolver.refresh_monitoring(&store, "wf"));

    assert_eq!(resolver.resolve(graph.lookup("job_isr_1").unwrap()), JobStatus::Succeeded);
    assert_eq!(
        resolver.resolve(graph.lookup("job_calibrate_1").unwrap()),
        JobStatus::Scheduled
    );
    // No monitoring row: the log decides.
    assert_eq!(
        resolver.resolve(graph.lookup("job_report_1").unwrap()),
        JobStatus::Succeeded
    );
}

#[test]
fn monitoring_failure_is_subject_to_output_override() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/repo/out/postISR/1", "pixels");
    let store = JsonlMonitoringStore::new("/submit/monitoring.jsonl", fs.clone());
    store.record(&event("job_isr_1", MonitorStatus::Failed, 5)).unwrap();

    let (graph, resolver) = setup(&fs);
    resolver.refresh_monitoring(&store, "wf");
    assert_eq!(resolver.resolve(graph.lookup("job_isr_1").unwrap()), JobStatus::Succeeded);
}

#[test]
fn placeholder_is_never_done() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/submit/logging/ghost.stderr", "success\n");
    let (mut graph, resolver) = setup(&fs);

    let ghost = graph.get("ghost");
    let ghost = graph.job(ghost);
    assert!(ghost.is_placeholder());
    assert_eq!(resolver.resolve(ghost), JobStatus::Pending);
    assert!(!ghost.is_done(&resolver));
}

#[test]
fn monitoring_summary_counts_graph_jobs() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let store = Arc::new(JsonlMonitoringStore::new("/submit/monitoring.jsonl", fs.clone()));
    store.record(&event("job_isr_1", MonitorStatus::Completed, 1)).unwrap();
    store.record(&event("job_calibrate_1", MonitorStatus::Failed, 2)).unwrap();

    let scheduler = mock_scheduler(workflow(), fs.clone(), FakeEngine::new()).with_monitoring(store);

    let summary = scheduler.status(false);
    assert_eq!(summary.count("isr", "completed"), 1);
    assert_eq!(summary.count("calibrate", "failed"), 1);
    assert_eq!(summary.count("report", "pending"), 1);

    let by_logs = scheduler.status(true);
    assert_eq!(by_logs.count("isr", "succeeded"), 1);
    assert_eq!(by_logs.count("calibrate", "failed"), 1);
}

// src/lib.rs

pub mod cli;
pub mod dag;
pub mod dispatch;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod persist;
pub mod pipeline;
pub mod scheduler;
pub mod status;
pub mod summary;
pub mod types;
pub mod workflow;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::fs::RealFileSystem;
use crate::pipeline::{restore_pipeline, start_pipeline};
use crate::scheduler::{LazyScheduler, RunOptions};
use crate::status::{JsonlMonitoringStore, MonitoringStore};
use crate::summary::{StatusSummary, TaskOrder};
use crate::types::LinkMode;
use crate::workflow::{WorkflowFile, load_and_validate};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Run {
            workflow,
            state_link,
            copy,
            jobs,
            no_finalize,
            dry_run,
        } => {
            if dry_run {
                let wf = load_and_validate(&workflow)?;
                print_dry_run(&wf);
                return Ok(());
            }
            let mode = if copy { LinkMode::Copy } else { LinkMode::Symlink };
            let scheduler = start_pipeline(&workflow, state_link.as_deref(), mode).await?;
            execute(&scheduler, jobs, !no_finalize).await
        }
        Command::Restart {
            state,
            engine_config,
            jobs,
            no_finalize,
        } => {
            let scheduler = restore_pipeline(&state, engine_config.as_deref())?;
            execute(&scheduler, jobs, !no_finalize).await
        }
        Command::Status { state, use_logs } => {
            let scheduler = restore_pipeline(&state, None)?;
            print!("{}", scheduler.status(use_logs));
            Ok(())
        }
        Command::Summary {
            workflow_name,
            db,
            tasks,
        } => summary(&workflow_name, &db, &tasks),
    }
}

/// Blocking run; the status breakdown is printed whether or not it failed.
async fn execute(scheduler: &LazyScheduler, jobs: Vec<String>, finalize: bool) -> Result<()> {
    let targets = (!jobs.is_empty()).then_some(jobs);
    let result = scheduler
        .run_with(
            targets.as_deref(),
            RunOptions {
                block: true,
                finalize,
            },
        )
        .await;

    scheduler.refresh_statuses();
    print!("{}", scheduler.status_summary());

    let report = result?;
    info!(
        submitted = report.submitted,
        no_ops = report.no_ops,
        finalized = report.finalized,
        "all requested jobs succeeded"
    );
    Ok(())
}

fn summary(workflow_name: &str, db: &Path, tasks: &[String]) -> Result<()> {
    let store = JsonlMonitoringStore::new(db, Arc::new(RealFileSystem));
    let snapshot = store.query(workflow_name)?;
    let order = TaskOrder::from_names(tasks);
    print!("{}", StatusSummary::from_snapshot(&snapshot, &order));
    Ok(())
}

/// Simple dry-run output: print run settings, jobs, edges and commands.
fn print_dry_run(wf: &WorkflowFile) {
    println!("lazydag dry-run");
    println!("  run.name = {}", wf.run.name);
    println!("  run.submit_dir = {}", wf.run.submit_dir.display());
    println!("  run.output_collection = {}", wf.run.output_collection);
    println!("  engine.executor = {:?}", wf.engine.executor);
    for pool in &wf.engine.pools {
        println!(
            "  engine.pool {} (max_workers = {}, mem_per_worker = {:?})",
            pool.name, pool.max_workers, pool.mem_per_worker
        );
    }
    if let Some(staging) = &wf.run.staging_dir {
        println!("  staging from {}", staging.display());
    }
    println!();

    println!("jobs ({}):", wf.job.len());
    for (name, spec) in wf.job.iter() {
        let marker = if wf.is_init_job(name) { " (init)" } else { "" };
        println!("  - {name}{marker} [{}]", spec.task_type(name));
        println!("      cmd: {}", spec.cmd);
        if !spec.successors.is_empty() {
            println!("      successors: {:?}", spec.successors);
        }
        if !spec.outputs.is_empty() {
            println!("      outputs: {:?}", spec.outputs);
        }
        if let Some(mem) = spec.resources.memory {
            println!("      memory: {mem} MB");
        }
    }

    debug!("dry-run complete (no execution)");
}

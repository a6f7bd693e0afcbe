// tests/persist_restore.rs

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use lazydag::errors::LazydagError;
use lazydag::persist::{PersistedState, STATE_FILE, load_engine_override};
use lazydag::types::LinkMode;
use lazydag::workflow::{ExecutorKind, load_and_validate};

fn write_workflow(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("workflow.toml");
    fs::write(
        &path,
        r#"
[run]
name = "u/demo/persist"
submit_dir = "submit"
repository = "repo"
output_collection = "out"

[engine]
executor = "pools"
[[engine.pools]]
name = "small"
mem_per_worker = 4.0

[job.a]
cmd = "true"
successors = ["b"]

[job.b]
cmd = "true"
"#,
    )
    .unwrap();
    path
}

#[test]
fn state_round_trips_through_master_file() {
    let dir = tempdir().unwrap();
    let wf_path = write_workflow(dir.path());
    let wf = load_and_validate(&wf_path).unwrap();

    let state = PersistedState::new(&wf_path, &wf).unwrap();
    assert!(state.workflow_path.is_absolute());
    let master = state.save_as_run(None, LinkMode::Symlink).unwrap();
    assert_eq!(master, dir.path().join("submit").join(STATE_FILE));

    let loaded = PersistedState::load(&master).unwrap();
    assert_eq!(loaded, state);

    let restored = loaded.restore_workflow(None).unwrap();
    assert_eq!(restored.run, wf.run);
    assert_eq!(restored.engine, wf.engine);
    assert_eq!(restored.job, wf.job);
}

#[test]
fn outfile_is_symlinked_or_copied_and_never_overwritten() {
    let dir = tempdir().unwrap();
    let wf_path = write_workflow(dir.path());
    let wf = load_and_validate(&wf_path).unwrap();
    let state = PersistedState::new(&wf_path, &wf).unwrap();

    let copy = dir.path().join("copy.toml");
    state.save_as_run(Some(&copy), LinkMode::Copy).unwrap();
    assert!(!fs::symlink_metadata(&copy).unwrap().file_type().is_symlink());
    assert_eq!(PersistedState::load(&copy).unwrap(), state);

    let err = state.save_as_run(Some(&copy), LinkMode::Copy).unwrap_err();
    assert!(matches!(err, LazydagError::StateFileExists(p) if p == copy));

    #[cfg(unix)]
    {
        let link = dir.path().join("link.toml");
        state.save_as_run(Some(&link), LinkMode::Symlink).unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(PersistedState::load(&link).unwrap(), state);
    }
}

#[test]
fn restore_fails_fast_when_workflow_is_gone() {
    let dir = tempdir().unwrap();
    let wf_path = write_workflow(dir.path());
    let wf = load_and_validate(&wf_path).unwrap();
    let state = PersistedState::new(&wf_path, &wf).unwrap();
    let master = state.save_as_run(None, LinkMode::Symlink).unwrap();

    fs::remove_file(&wf_path).unwrap();
    let err = PersistedState::load(&master)
        .unwrap()
        .restore_workflow(None)
        .unwrap_err();
    assert!(matches!(err, LazydagError::MissingWorkflow(_)));
}

#[test]
fn engine_section_can_be_replaced_on_restore() {
    let dir = tempdir().unwrap();
    let wf_path = write_workflow(dir.path());
    let wf = load_and_validate(&wf_path).unwrap();
    let state = PersistedState::new(&wf_path, &wf).unwrap();

    let override_path = dir.path().join("engine.toml");
    fs::write(
        &override_path,
        "[engine]\nexecutor = \"elastic\"\nelastic_cores = 16\n",
    )
    .unwrap();
    let engine = load_engine_override(&override_path).unwrap();
    let restored = state.restore_workflow(Some(engine)).unwrap();
    assert_eq!(restored.engine.executor, ExecutorKind::Elastic);
    assert_eq!(restored.engine.elastic_cores, 16);

    fs::write(&override_path, "[engine]\nexecutor = \"pools\"\n").unwrap();
    assert!(matches!(
        load_engine_override(&override_path).unwrap_err(),
        LazydagError::ConfigError(_)
    ));
}

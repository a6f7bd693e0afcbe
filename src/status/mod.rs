// src/status/mod.rs

//! Where job status comes from when the current run has no handle for a job:
//! the monitoring store, per-job logs and the data repository.

pub mod logs;
pub mod monitoring;
pub mod repository;
pub mod resolver;

pub use logs::{LogVerdict, inspect_log};
pub use monitoring::{
    JsonlMonitoringStore, MonitorStatus, MonitoringEvent, MonitoringRow, MonitoringSnapshot,
    MonitoringStore,
};
pub use repository::{DataRepository, FsRepository};
pub use resolver::StatusResolver;

// src/summary.rs

//! Plain-text status breakdowns grouped by task type.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::dag::DependencyGraph;
use crate::status::{MonitorStatus, MonitoringSnapshot};
use crate::types::JobStatus;
use crate::workflow::task_type_from_name;

/// Keyword selecting alphabetical task-type ordering.
pub const DISCOVER: &str = "discover";

/// Order in which task types are listed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskOrder {
    /// Whatever task types are present, alphabetically.
    #[default]
    Discover,
    /// These first, in this order, when present; any other present types appended.
    Preferred(Vec<String>),
}

impl TaskOrder {
    pub fn from_names(names: &[String]) -> Self {
        match names {
            [] => TaskOrder::Discover,
            [only] if only == DISCOVER => TaskOrder::Discover,
            names => TaskOrder::Preferred(names.to_vec()),
        }
    }

    pub fn arrange(&self, present: &BTreeSet<String>) -> Vec<String> {
        match self {
            TaskOrder::Discover => present.iter().cloned().collect(),
            TaskOrder::Preferred(preferred) => {
                let mut ordered: Vec<String> = Vec::new();
                for name in preferred {
                    if present.contains(name) && !ordered.contains(name) {
                        ordered.push(name.clone());
                    }
                }
                for name in present {
                    if !ordered.contains(name) {
                        ordered.push(name.clone());
                    }
                }
                ordered
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    task_type: String,
    counts: Vec<usize>,
}

/// Counts of jobs per task type and status column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    columns: Vec<&'static str>,
    rows: Vec<Row>,
}

impl StatusSummary {
    fn tally<S: Copy + Eq>(
        columns: &[S],
        names: Vec<&'static str>,
        entries: impl IntoIterator<Item = (String, S)>,
        order: &TaskOrder,
    ) -> Self {
        let mut counts: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (task_type, status) in entries {
            let row = counts
                .entry(task_type)
                .or_insert_with(|| vec![0; columns.len()]);
            if let Some(idx) = columns.iter().position(|c| *c == status) {
                row[idx] += 1;
            }
        }
        let present: BTreeSet<String> = counts.keys().cloned().collect();
        let rows = order
            .arrange(&present)
            .into_iter()
            .map(|task_type| Row {
                counts: counts
                    .get(&task_type)
                    .cloned()
                    .unwrap_or_else(|| vec![0; columns.len()]),
                task_type,
            })
            .collect();
        Self {
            columns: names,
            rows,
        }
    }

    /// Last known job statuses in the graph. Staging jobs are left out.
    pub fn from_graph(graph: &DependencyGraph, order: &TaskOrder) -> Self {
        let entries = graph
            .jobs()
            .filter(|job| !job.is_staging())
            .map(|job| (job.task_type().to_string(), job.status()));
        Self::tally(
            &JobStatus::ALL,
            JobStatus::ALL.iter().map(|s| s.as_str()).collect(),
            entries,
            order,
        )
    }

    /// Monitoring rows, given as `(task type, status)` pairs.
    pub fn from_monitoring(
        entries: impl IntoIterator<Item = (String, MonitorStatus)>,
        order: &TaskOrder,
    ) -> Self {
        Self::tally(
            &MonitorStatus::ALL,
            MonitorStatus::ALL.iter().map(|s| s.as_str()).collect(),
            entries,
            order,
        )
    }

    /// Monitoring snapshot with task types derived from job names.
    pub fn from_snapshot(snapshot: &MonitoringSnapshot, order: &TaskOrder) -> Self {
        Self::from_monitoring(
            snapshot
                .iter()
                .map(|(job, row)| (task_type_from_name(job).to_string(), row.status)),
            order,
        )
    }

    pub fn task_types(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.task_type.as_str())
    }

    /// Count for one task type and column name (`"failed"`, `"running"`...).
    pub fn count(&self, task_type: &str, column: &str) -> usize {
        let Some(idx) = self.columns.iter().position(|c| *c == column) else {
            return 0;
        };
        self.rows
            .iter()
            .find(|r| r.task_type == task_type)
            .map(|r| r.counts[idx])
            .unwrap_or(0)
    }

    pub fn total(&self, task_type: &str) -> usize {
        self.rows
            .iter()
            .find(|r| r.task_type == task_type)
            .map(|r| r.counts.iter().sum())
            .unwrap_or(0)
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .rows
            .iter()
            .map(|r| r.task_type.len())
            .chain(["task".len(), "total".len()])
            .max()
            .unwrap_or(0);
        let width = |col: &str| col.len().max(7);

        write!(f, "{:<name_width$}", "task")?;
        for col in &self.columns {
            write!(f, " {:>w$}", col, w = width(col))?;
        }
        writeln!(f, " {:>7}", "total")?;

        let mut sums = vec![0usize; self.columns.len()];
        for row in &self.rows {
            write!(f, "{:<name_width$}", row.task_type)?;
            for (idx, col) in self.columns.iter().enumerate() {
                write!(f, " {:>w$}", row.counts[idx], w = width(col))?;
                sums[idx] += row.counts[idx];
            }
            writeln!(f, " {:>7}", row.counts.iter().sum::<usize>())?;
        }

        write!(f, "{:<name_width$}", "total")?;
        for (idx, col) in self.columns.iter().enumerate() {
            write!(f, " {:>w$}", sums[idx], w = width(col))?;
        }
        writeln!(f, " {:>7}", sums.iter().sum::<usize>())
    }
}

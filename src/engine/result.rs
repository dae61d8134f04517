// Tue Jan 13 2026 - Alex

use crate::engine::job::JobKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    Wait,
    Job(JobKind),
}

/// One line of a worker's logbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub activity: Activity,
    pub seq: Option<u32>,
    pub duration: Duration,
    pub failed: bool,
}

impl LogEntry {
    pub fn wait(duration: Duration) -> Self {
        Self {
            activity: Activity::Wait,
            seq: None,
            duration,
            failed: false,
        }
    }

    pub fn job(kind: JobKind, seq: Option<u32>, duration: Duration) -> Self {
        Self {
            activity: Activity::Job(kind),
            seq,
            duration,
            failed: false,
        }
    }

    pub fn with_failed(mut self, failed: bool) -> Self {
        self.failed = failed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub entries: Vec<LogEntry>,
}

impl WorkerReport {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn jobs_executed(&self) -> usize {
        self.entries.iter()
            .filter(|e| matches!(e.activity, Activity::Job(_)))
            .count()
    }

    pub fn busy_time(&self) -> Duration {
        self.entries.iter()
            .filter(|e| matches!(e.activity, Activity::Job(_)))
            .map(|e| e.duration)
            .sum()
    }

    pub fn idle_time(&self) -> Duration {
        self.entries.iter()
            .filter(|e| e.activity == Activity::Wait)
            .map(|e| e.duration)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub worker_id: usize,
    pub kind: JobKind,
    pub job: String,
    pub reason: String,
}

/// Dispatch counters kept by the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub jobs: usize,
    pub waits: usize,
    pub stops: usize,
}

impl DispatchStats {
    pub fn total_replies(&self) -> usize {
        self.jobs + self.waits + self.stops
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub workers: Vec<WorkerReport>,
    pub dispatch: DispatchStats,
    pub failures: Vec<JobFailure>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn jobs_by_kind(&self) -> BTreeMap<JobKind, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.workers.iter().flat_map(|w| w.entries.iter()) {
            if let Activity::Job(kind) = entry.activity {
                *counts.entry(kind).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn total_busy(&self) -> Duration {
        self.workers.iter().map(|w| w.busy_time()).sum()
    }

    pub fn total_idle(&self) -> Duration {
        self.workers.iter().map(|w| w.idle_time()).sum()
    }

    pub fn rendered_frames(&self) -> Vec<u32> {
        let mut seqs: Vec<u32> = self.workers.iter()
            .flat_map(|w| w.entries.iter())
            .filter(|e| e.activity == Activity::Job(JobKind::Render) && !e.failed)
            .filter_map(|e| e.seq)
            .collect();
        seqs.sort_unstable();
        seqs
    }

    pub fn slowest(&self, n: usize) -> Vec<(usize, &LogEntry)> {
        let mut sorted: Vec<_> = self.workers.iter()
            .flat_map(|w| w.entries.iter().map(move |e| (w.worker_id, e)))
            .filter(|(_, e)| matches!(e.activity, Activity::Job(_)))
            .collect();
        sorted.sort_by(|a, b| b.1.duration.cmp(&a.1.duration));
        sorted.into_iter().take(n).collect()
    }

    pub fn summary(&self) -> String {
        let kinds = self.jobs_by_kind()
            .iter()
            .map(|(kind, n)| format!("{}: {}", kind, n))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Workers: {}, Jobs: {} ({}), Waits: {}, Failures: {}",
            self.workers.len(),
            self.dispatch.jobs,
            kinds,
            self.dispatch.waits,
            self.failures.len()
        )
    }
}

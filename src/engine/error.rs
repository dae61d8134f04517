// Tue Jan 13 2026 - Alex

use crate::engine::job::JobKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Dependency counter underflow after {0} completed")]
    CounterUnderflow(JobKind),
    #[error("Job {kind} failed: {reason}")]
    JobFailed { kind: JobKind, reason: String },
    #[error("Protocol violation from worker {worker_id}: {detail}")]
    Protocol { worker_id: usize, detail: String },
    #[error("Channel closed")]
    ChannelClosed,
    #[error("Pipeline stalled: no termination after {0:?}")]
    Stalled(Duration),
    #[error("Worker thread {0} panicked")]
    WorkerPanicked(usize),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing input: {0}")]
    MissingInput(PathBuf),
    #[error("Command `{program}` exited with {status}")]
    Command { program: String, status: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

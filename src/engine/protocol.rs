// Tue Jan 13 2026 - Alex

use crate::engine::job::Job;
use crate::engine::result::WorkerReport;
use serde::{Deserialize, Serialize};

/// Coordinator answer to a request for work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    /// Nothing ready yet, back off and ask again.
    Wait,
    /// Terminal, the worker must leave its loop.
    Stop,
    Job(Job),
}

impl Reply {
    pub fn is_job(&self) -> bool {
        matches!(self, Reply::Job(_))
    }

    pub fn job(&self) -> Option<&Job> {
        match self {
            Reply::Job(job) => Some(job),
            _ => None,
        }
    }
}

/// What happened to the previous reply, carried by every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Nothing was executed since the last request.
    Ready,
    /// The job ran; `produced` tells whether its declared artifact exists.
    Done { produced: bool },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub worker_id: usize,
    pub outcome: Outcome,
}

impl Request {
    pub fn new(worker_id: usize, outcome: Outcome) -> Self {
        Self { worker_id, outcome }
    }

    pub fn ready(worker_id: usize) -> Self {
        Self::new(worker_id, Outcome::Ready)
    }
}

/// Everything a worker can send to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inbound {
    Request(Request),
    Report(WorkerReport),
}

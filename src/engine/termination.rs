// Tue Jan 13 2026 - Alex

use crate::engine::error::{Result, SchedulerError};
use std::fmt;

/// Shutdown progress of a run: every worker gets exactly one `Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Running { remaining: usize },
    Draining { remaining: usize },
    AllStopped,
}

impl Termination {
    pub fn new(workers: usize) -> Self {
        if workers == 0 {
            Termination::AllStopped
        } else {
            Termination::Running { remaining: workers }
        }
    }

    /// Records one `Stop` reply.
    pub fn stop_sent(&mut self, worker_id: usize) -> Result<()> {
        *self = match *self {
            Termination::Running { remaining } | Termination::Draining { remaining } => {
                if remaining <= 1 {
                    Termination::AllStopped
                } else {
                    Termination::Draining { remaining: remaining - 1 }
                }
            }
            Termination::AllStopped => {
                return Err(SchedulerError::Protocol {
                    worker_id,
                    detail: "stop requested after every worker stopped".to_string(),
                });
            }
        };
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        match self {
            Termination::Running { remaining } | Termination::Draining { remaining } => *remaining,
            Termination::AllStopped => 0,
        }
    }

    pub fn is_draining(&self) -> bool {
        matches!(self, Termination::Draining { .. })
    }

    pub fn is_all_stopped(&self) -> bool {
        *self == Termination::AllStopped
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Running { remaining } => write!(f, "running ({} workers)", remaining),
            Termination::Draining { remaining } => write!(f, "draining ({} left)", remaining),
            Termination::AllStopped => write!(f, "all stopped"),
        }
    }
}

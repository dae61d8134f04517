// Tue Jan 13 2026 - Alex

use crate::engine::job::{Job, JobKind};
use crate::engine::queue::Expansion;
use std::fmt;

/// Where the prep -> shard-prep -> render pipeline currently is.
///
/// Never stored, always derived from the counters in [`StageTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    PendingStageA,
    StageADone,
    StageBInFlight(usize),
    StageBDone,
    FramesEnqueued,
    Drained,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::PendingStageA => write!(f, "preparing ground motion"),
            PipelineStage::StageADone => write!(f, "ground motion prepared"),
            PipelineStage::StageBInFlight(k) => write!(f, "preparing timeslices ({} shards left)", k),
            PipelineStage::StageBDone => write!(f, "finishing frames"),
            PipelineStage::FramesEnqueued => write!(f, "rendering frames"),
            PipelineStage::Drained => write!(f, "drained"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StageTracker {
    prep_planned: bool,
    prep_done: bool,
    shards_issued: usize,
    shards_done: usize,
}

impl StageTracker {
    pub fn new(prep_planned: bool) -> Self {
        Self {
            prep_planned,
            ..Default::default()
        }
    }

    pub fn completed(&mut self, job: &Job, expansion: &Expansion) {
        match job.kind() {
            JobKind::Prep => {
                self.prep_done = true;
                self.shards_issued += expansion.generators;
            }
            JobKind::ShardPrep => self.shards_done += 1,
            JobKind::Render => {}
        }
    }

    pub fn stage(&self, pending_jobs: usize, in_flight: usize) -> PipelineStage {
        if self.prep_planned && !self.prep_done {
            return PipelineStage::PendingStageA;
        }
        if self.shards_done < self.shards_issued {
            if self.shards_done == 0 && pending_jobs >= self.shards_issued && in_flight == 0 {
                return PipelineStage::StageADone;
            }
            return PipelineStage::StageBInFlight(self.shards_issued - self.shards_done);
        }
        if pending_jobs > 0 {
            PipelineStage::FramesEnqueued
        } else if in_flight > 0 {
            PipelineStage::StageBDone
        } else {
            PipelineStage::Drained
        }
    }
}

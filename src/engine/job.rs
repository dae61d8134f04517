// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit of work handed to exactly one worker.
///
/// Jobs have no identity beyond their contents: the coordinator removes a job
/// from the queue when it dispatches it, so the same value is never executed twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Job {
    /// Global ground motion preparation (mask, peak values, colour scale).
    Prep,
    /// Timeslice preparation for one partition of the ground motion time axis.
    ShardPrep(Partition),
    /// Render a single image of the animation.
    Render(Frame),
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self {
            Job::Prep => JobKind::Prep,
            Job::ShardPrep(_) => JobKind::ShardPrep,
            Job::Render(_) => JobKind::Render,
        }
    }

    pub fn is_generator(&self) -> bool {
        self.kind().is_generator()
    }

    pub fn frame(&self) -> Option<&Frame> {
        match self {
            Job::Render(frame) => Some(frame),
            _ => None,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Prep => write!(f, "prep"),
            Job::ShardPrep(p) => write!(f, "shard-prep[{}/{}]", p.start, p.stride),
            Job::Render(frame) => match frame.seq {
                Some(seq) => write!(f, "render[{:04}]", seq),
                None => write!(f, "render[still]"),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobKind {
    Prep,
    ShardPrep,
    Render,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Prep => "prep",
            JobKind::ShardPrep => "shard-prep",
            JobKind::Render => "render",
        }
    }

    /// Generators expand the queue when they complete.
    pub fn is_generator(&self) -> bool {
        matches!(self, JobKind::Prep | JobKind::ShardPrep)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strided slice of an index space: `index % stride == start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    pub start: usize,
    pub stride: usize,
}

impl Partition {
    pub fn new(start: usize, stride: usize) -> Self {
        Self {
            start,
            stride: stride.max(1),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index % self.stride == self.start
    }

    pub fn indices(&self, limit: usize) -> impl Iterator<Item = usize> {
        (self.start..limit).step_by(self.stride)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position in the animation, `None` for a single still image.
    pub seq: Option<u32>,
    pub azimuth: f64,
    pub tilt: f64,
    /// Scale of the colour bar area, 0 (hidden) to 1.
    pub scale_t: f64,
    /// Overlay transparency in percent.
    pub transparency: f64,
    /// Simulation time shown; `None` renders the final slip distribution.
    pub sim_time: Option<f64>,
}

impl Frame {
    pub fn still(azimuth: f64, tilt: f64, transparency: f64) -> Self {
        Self {
            seq: None,
            azimuth,
            tilt,
            scale_t: 1.0,
            transparency,
            sim_time: None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.sim_time.is_some()
    }
}

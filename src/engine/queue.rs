// Tue Jan 13 2026 - Alex

use crate::engine::error::{Result, SchedulerError};
use crate::engine::job::{Frame, Job, JobKind, Partition};
use crate::engine::protocol::Reply;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Pending replies in dispatch order.
#[derive(Debug, Default)]
pub struct JobQueue {
    entries: VecDeque<Reply>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        let mut queue = Self::new();
        queue.enqueue_all(jobs);
        queue
    }

    pub fn enqueue(&mut self, entry: Reply) {
        self.entries.push_back(entry);
    }

    pub fn enqueue_job(&mut self, job: Job) {
        self.entries.push_back(Reply::Job(job));
    }

    pub fn enqueue_all(&mut self, jobs: Vec<Job>) {
        self.entries.extend(jobs.into_iter().map(Reply::Job));
    }

    pub fn dequeue(&mut self) -> Option<Reply> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&Reply> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_jobs(&self) -> usize {
        self.entries.iter().filter(|e| e.is_job()).count()
    }

    /// Queued jobs whose completion enqueues more work.
    pub fn generators(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.job().map_or(false, Job::is_generator))
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Generator jobs that still have to complete before the pipeline can drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyCounter {
    outstanding: usize,
}

impl DependencyCounter {
    pub fn new(outstanding: usize) -> Self {
        Self { outstanding }
    }

    pub fn increment(&mut self, n: usize) {
        self.outstanding += n;
    }

    pub fn decrement(&mut self, kind: JobKind) -> Result<()> {
        self.outstanding = self.outstanding
            .checked_sub(1)
            .ok_or(SchedulerError::CounterUnderflow(kind))?;
        Ok(())
    }

    pub fn get(&self) -> usize {
        self.outstanding
    }

    pub fn is_zero(&self) -> bool {
        self.outstanding == 0
    }
}

/// The frames that depend on ground motion timeslices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicFrames {
    /// Number of dynamic frames, timed at `i / framerate`.
    pub frame_count: usize,
    pub framerate: f64,
    /// Ground motion timestep.
    pub dt: f64,
    /// Ground motion timeslice count.
    pub nt: usize,
    /// Sequence number of the first dynamic frame.
    pub first_seq: u32,
    /// Frames over which the colour bar grows in.
    pub t_frames: usize,
    pub azimuth: f64,
    pub tilt: f64,
    pub transparency: f64,
}

impl DynamicFrames {
    pub fn sim_time(&self, i: usize) -> f64 {
        i as f64 / self.framerate
    }

    /// Timeslice shown by dynamic frame `i`.
    pub fn timeslice(&self, i: usize) -> usize {
        (self.sim_time(i) / self.dt).round() as usize
    }

    pub fn frame(&self, i: usize) -> Frame {
        let scale_t = if self.t_frames == 0 {
            1.0
        } else {
            i.min(self.t_frames) as f64 / self.t_frames as f64
        };

        Frame {
            seq: Some(self.first_seq + i as u32),
            azimuth: self.azimuth,
            tilt: self.tilt,
            scale_t,
            transparency: self.transparency,
            sim_time: Some(self.sim_time(i)),
        }
    }

    /// Frames whose timeslice belongs to `partition`.
    pub fn ready_frames(&self, partition: &Partition) -> Vec<Frame> {
        (0..self.frame_count)
            .filter(|&i| {
                let t = self.timeslice(i);
                t < self.nt && partition.contains(t)
            })
            .map(|i| self.frame(i))
            .collect()
    }
}

/// Result of resolving one completed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expansion {
    pub released: usize,
    pub enqueued: usize,
    pub generators: usize,
}

/// Decides which jobs become runnable when a generator completes.
#[derive(Debug, Clone)]
pub struct Resolver {
    workers: usize,
    dynamic: Option<DynamicFrames>,
}

impl Resolver {
    pub fn new(workers: usize, dynamic: Option<DynamicFrames>) -> Self {
        Self {
            workers: workers.max(1),
            dynamic,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn dynamic(&self) -> Option<&DynamicFrames> {
        self.dynamic.as_ref()
    }

    pub fn resolve(
        &self,
        job: &Job,
        produced: bool,
        queue: &mut JobQueue,
        counter: &mut DependencyCounter,
    ) -> Result<Expansion> {
        let mut expansion = Expansion::default();

        match job {
            Job::Prep => {
                counter.decrement(JobKind::Prep)?;
                expansion.released = 1;

                if produced {
                    for start in 0..self.workers {
                        queue.enqueue_job(Job::ShardPrep(Partition::new(start, self.workers)));
                    }
                    counter.increment(self.workers);
                    expansion.enqueued = self.workers;
                    expansion.generators = self.workers;
                } else {
                    log::warn!("Prep left no artifact, skipping timeslice preparation");
                }
            }
            Job::ShardPrep(partition) => {
                counter.decrement(JobKind::ShardPrep)?;
                expansion.released = 1;

                if produced {
                    let frames = self.dynamic.as_ref()
                        .map(|d| d.ready_frames(partition))
                        .unwrap_or_default();
                    expansion.enqueued = frames.len();
                    queue.enqueue_all(frames.into_iter().map(Job::Render).collect());
                }
            }
            Job::Render(_) => {}
        }

        Ok(expansion)
    }

    /// Releases the dependency held by a job whose completion will never be resolved.
    pub fn abandon(&self, job: &Job, counter: &mut DependencyCounter) -> Result<Expansion> {
        if job.is_generator() {
            counter.decrement(job.kind())?;
            return Ok(Expansion {
                released: 1,
                ..Default::default()
            });
        }
        Ok(Expansion::default())
    }
}

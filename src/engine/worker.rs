// Tue Jan 13 2026 - Alex

use crate::engine::error::{HandlerError, Result};
use crate::engine::handler::{Artifact, JobHandler};
use crate::engine::job::Job;
use crate::engine::protocol::{Outcome, Reply};
use crate::engine::result::{LogEntry, WorkerReport};
use crate::engine::transport::WorkerEndpoint;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Pull-based executor: asks for work, runs it, asks again.
pub struct Worker<H: JobHandler> {
    endpoint: WorkerEndpoint,
    handler: H,
    backoff: Duration,
    report: WorkerReport,
}

impl<H: JobHandler> Worker<H> {
    pub fn new(endpoint: WorkerEndpoint, handler: H) -> Self {
        let report = WorkerReport::new(endpoint.id());
        Self {
            endpoint,
            handler,
            backoff: DEFAULT_BACKOFF,
            report,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn id(&self) -> usize {
        self.endpoint.id()
    }

    pub fn run(mut self) -> Result<WorkerReport> {
        let id = self.id();
        let mut outcome = Outcome::Ready;

        loop {
            let reply = match self.endpoint.request(outcome)? {
                Ok(reply) => reply,
                Err(e) => {
                    log::warn!("Worker {} ignoring unreadable reply: {}", id, e);
                    outcome = Outcome::Ready;
                    continue;
                }
            };

            outcome = match reply {
                Reply::Wait => {
                    let t0 = Instant::now();
                    thread::sleep(self.backoff);
                    self.report.record(LogEntry::wait(t0.elapsed()));
                    Outcome::Ready
                }
                Reply::Stop => break,
                Reply::Job(job) => self.execute(&job),
            };
        }

        log::debug!("Worker {} stopping after {} jobs", id, self.report.jobs_executed());
        self.endpoint.report(&self.report)?;
        Ok(self.report)
    }

    fn execute(&mut self, job: &Job) -> Outcome {
        let t0 = Instant::now();
        let result = self.dispatch(job);
        let entry = LogEntry::job(job.kind(), job.frame().and_then(|f| f.seq), t0.elapsed());

        match result {
            Ok(artifact) => {
                self.report.record(entry);
                Outcome::Done {
                    produced: artifact.is_produced(),
                }
            }
            Err(e) => {
                log::error!("Worker {} failed {}: {}", self.id(), job, e);
                self.report.record(entry.with_failed(true));
                Outcome::Failed { reason: e.to_string() }
            }
        }
    }

    fn dispatch(&mut self, job: &Job) -> std::result::Result<Artifact, HandlerError> {
        match job {
            Job::Prep => self.handler.prep(),
            Job::ShardPrep(partition) => self.handler.shard_prep(partition),
            Job::Render(frame) => self.handler.render(frame),
        }
    }
}

// Tue Jan 13 2026 - Alex

use crate::engine::error::{Result, SchedulerError};
use crate::engine::job::{Job, JobKind};
use crate::engine::protocol::{Inbound, Outcome, Reply};
use crate::engine::queue::{DependencyCounter, Expansion, JobQueue, Resolver};
use crate::engine::result::{DispatchStats, JobFailure, RunReport, WorkerReport};
use crate::engine::stage::{PipelineStage, StageTracker};
use crate::engine::termination::Termination;
use crate::engine::transport::CoordinatorEndpoint;
use crate::ui::progress::RenderProgress;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// What to do when a worker reports a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure, release its dependency and carry on.
    #[default]
    DropDependency,
    /// Stop handing out work and fail the run once every worker has stopped.
    Abort,
}

/// The job a worker was last given.
#[derive(Debug, Clone, Default)]
pub struct WorkerSlot {
    pub worker_id: usize,
    pub job_in_flight: Option<Job>,
    pub stopped: bool,
}

/// Single owner of the queue, the dependency counter and the worker slots.
///
/// All mutation happens in [`Coordinator::handle`], between receiving a request
/// and sending its reply, so nothing here is shared or locked.
pub struct Coordinator {
    queue: JobQueue,
    counter: DependencyCounter,
    resolver: Resolver,
    slots: Vec<WorkerSlot>,
    termination: Termination,
    policy: FailurePolicy,
    aborted: Option<JobFailure>,
    failures: Vec<JobFailure>,
    stats: DispatchStats,
    tracker: StageTracker,
    progress: RenderProgress,
    watchdog: Option<Duration>,
}

impl Coordinator {
    /// Every generator already in `queue` counts as one outstanding dependency.
    pub fn new(queue: JobQueue, resolver: Resolver) -> Self {
        let workers = resolver.workers();
        let counter = DependencyCounter::new(queue.generators());
        let prep_planned = queue.peek().and_then(|e| e.job()).map_or(false, |j| *j == Job::Prep);

        Self {
            queue,
            counter,
            resolver,
            slots: (0..workers)
                .map(|worker_id| WorkerSlot { worker_id, ..Default::default() })
                .collect(),
            termination: Termination::new(workers),
            policy: FailurePolicy::default(),
            aborted: None,
            failures: Vec::new(),
            stats: DispatchStats::default(),
            tracker: StageTracker::new(prep_planned),
            progress: RenderProgress::hidden(),
            watchdog: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: RenderProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Fails `run` with `Stalled` once the whole run has taken longer than `limit`.
    pub fn with_watchdog(mut self, limit: Duration) -> Self {
        self.watchdog = Some(limit);
        self
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn counter(&self) -> DependencyCounter {
        self.counter
    }

    pub fn slot(&self, worker_id: usize) -> Option<&WorkerSlot> {
        self.slots.get(worker_id)
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn failures(&self) -> &[JobFailure] {
        &self.failures
    }

    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.job_in_flight.is_some()).count()
    }

    pub fn stage(&self) -> PipelineStage {
        self.tracker.stage(self.queue.pending_jobs(), self.in_flight())
    }

    /// One request/reply step for `worker_id`.
    pub fn handle(&mut self, worker_id: usize, outcome: Outcome) -> Result<Reply> {
        let slot = self.slots.get_mut(worker_id).ok_or_else(|| SchedulerError::Protocol {
            worker_id,
            detail: "unknown worker".to_string(),
        })?;
        if slot.stopped {
            return Err(SchedulerError::Protocol {
                worker_id,
                detail: "request after stop".to_string(),
            });
        }

        match slot.job_in_flight.take() {
            Some(finished) => self.complete(worker_id, finished, outcome)?,
            None if outcome != Outcome::Ready => {
                log::warn!("Worker {} reported {:?} with nothing in flight", worker_id, outcome);
            }
            None => {}
        }

        if self.queue.is_empty() {
            if self.counter.is_zero() || self.aborted.is_some() {
                self.queue.enqueue(Reply::Stop);
            } else {
                self.queue.enqueue(Reply::Wait);
            }
        }

        let reply = self.queue.dequeue().unwrap_or(Reply::Wait);
        match &reply {
            Reply::Job(job) => {
                log::debug!("Dispatching {} to worker {}", job, worker_id);
                self.stats.jobs += 1;
                self.slots[worker_id].job_in_flight = Some(job.clone());
            }
            Reply::Wait => {
                self.stats.waits += 1;
            }
            Reply::Stop => {
                self.termination.stop_sent(worker_id)?;
                self.stats.stops += 1;
                self.slots[worker_id].stopped = true;
                log::debug!("Stopping worker {} ({})", worker_id, self.termination);
            }
        }

        Ok(reply)
    }

    fn complete(&mut self, worker_id: usize, job: Job, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::Done { produced } => {
                let expansion = if self.aborted.is_some() {
                    Expansion::default()
                } else {
                    self.resolver.resolve(&job, produced, &mut self.queue, &mut self.counter)?
                };
                self.tracker.completed(&job, &expansion);

                if job.kind() == JobKind::Render {
                    self.progress.frame_done();
                } else {
                    log::info!(
                        "Worker {} finished {}: {} jobs enqueued, {} dependencies outstanding",
                        worker_id,
                        job,
                        expansion.enqueued,
                        self.counter.get()
                    );
                    if job.kind() == JobKind::ShardPrep {
                        self.progress.add_frames(expansion.enqueued);
                    }
                    self.progress.set_message(self.stage().to_string());
                }
                Ok(())
            }
            Outcome::Failed { reason } => self.fail(worker_id, job, reason),
            Outcome::Ready => self.fail(worker_id, job, "reply not understood by worker".to_string()),
        }
    }

    fn fail(&mut self, worker_id: usize, job: Job, reason: String) -> Result<()> {
        log::warn!("Worker {} failed {}: {}", worker_id, job, reason);

        let failure = JobFailure {
            worker_id,
            kind: job.kind(),
            job: job.to_string(),
            reason,
        };
        self.failures.push(failure.clone());

        if self.aborted.is_some() {
            return Ok(());
        }

        match self.policy {
            FailurePolicy::DropDependency => {
                let expansion = self.resolver.abandon(&job, &mut self.counter)?;
                self.tracker.completed(&job, &expansion);
            }
            FailurePolicy::Abort => {
                log::error!("Aborting run, {} queued entries dropped", self.queue.len());
                self.queue.clear();
                self.aborted = Some(failure);
            }
        }
        Ok(())
    }

    /// Serves requests until every worker has been stopped, then gathers
    /// one report per worker.
    pub fn run(mut self, endpoint: &CoordinatorEndpoint) -> Result<RunReport> {
        let start = Instant::now();
        let deadline = self.watchdog.map(|limit| (start + limit, limit));
        let mut reports: Vec<Option<WorkerReport>> = vec![None; self.slots.len()];

        log::info!(
            "Coordinator serving {} workers, {} jobs queued, {} dependencies",
            self.slots.len(),
            self.queue.len(),
            self.counter.get()
        );

        while !self.termination.is_all_stopped() {
            match Self::next_message(endpoint, deadline)? {
                Inbound::Request(request) => {
                    let reply = self.handle(request.worker_id, request.outcome)?;
                    endpoint.send(request.worker_id, &reply)?;
                }
                Inbound::Report(report) => self.stash(&mut reports, report)?,
            }
        }

        log::info!("All workers stopped, gathering reports");
        while reports.iter().any(Option::is_none) {
            match Self::next_message(endpoint, deadline)? {
                Inbound::Report(report) => self.stash(&mut reports, report)?,
                Inbound::Request(request) => {
                    return Err(SchedulerError::Protocol {
                        worker_id: request.worker_id,
                        detail: "request after stop".to_string(),
                    });
                }
            }
        }
        self.progress.finish();

        if let Some(failure) = self.aborted.take() {
            return Err(SchedulerError::JobFailed {
                kind: failure.kind,
                reason: failure.reason,
            });
        }

        Ok(RunReport {
            workers: reports.into_iter().flatten().collect(),
            dispatch: self.stats,
            failures: self.failures,
            elapsed: start.elapsed(),
        })
    }

    fn next_message(endpoint: &CoordinatorEndpoint, deadline: Option<(Instant, Duration)>) -> Result<Inbound> {
        let Some((deadline, limit)) = deadline else {
            return endpoint.recv();
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        match endpoint.recv_timeout(remaining)? {
            Some(message) => Ok(message),
            None => {
                log::error!("Watchdog expired after {:?}, abandoning run", limit);
                Err(SchedulerError::Stalled(limit))
            }
        }
    }

    /// Only workers that have been sent Stop may report.
    fn stash(&self, reports: &mut [Option<WorkerReport>], report: WorkerReport) -> Result<()> {
        let worker_id = report.worker_id;
        let stopped = self.slots.get(worker_id).map_or(false, |s| s.stopped);
        match reports.get_mut(worker_id) {
            Some(slot) if stopped && slot.is_none() => {
                *slot = Some(report);
                Ok(())
            }
            _ => Err(SchedulerError::Protocol {
                worker_id,
                detail: "unexpected report".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::job::{Frame, Partition};
    use crate::engine::queue::DynamicFrames;
    use crate::engine::transport::channel_set;
    use std::collections::HashSet;
    use std::thread;

    fn render(seq: u32) -> Job {
        let mut frame = Frame::still(180.0, 90.0, 40.0);
        frame.seq = Some(seq);
        Job::Render(frame)
    }

    fn dynamic(frame_count: usize, nt: usize) -> DynamicFrames {
        DynamicFrames {
            frame_count,
            framerate: 1.0,
            dt: 1.0,
            nt,
            first_seq: 50,
            t_frames: 2,
            azimuth: 200.0,
            tilt: 45.0,
            transparency: 40.0,
        }
    }

    fn done() -> Outcome {
        Outcome::Done { produced: true }
    }

    #[test]
    fn test_scenario_independent_renders() {
        let queue = JobQueue::from_jobs((0..10).map(render).collect());
        let mut coordinator = Coordinator::new(queue, Resolver::new(3, None));

        let mut dispatched = Vec::new();
        let mut stops = vec![0; 3];
        let mut outcomes = vec![Outcome::Ready, Outcome::Ready, Outcome::Ready];
        let mut replies = 0;

        while !coordinator.termination().is_all_stopped() {
            for w in 0..3 {
                if stops[w] > 0 {
                    continue;
                }
                let reply = coordinator.handle(w, outcomes[w].clone()).unwrap();
                replies += 1;
                match reply {
                    Reply::Job(job) => {
                        dispatched.push(job.frame().and_then(|f| f.seq).unwrap());
                        outcomes[w] = done();
                    }
                    Reply::Stop => stops[w] += 1,
                    Reply::Wait => panic!("no dependencies, nothing to wait for"),
                }
            }
        }

        assert_eq!(dispatched, (0..10).collect::<Vec<_>>());
        assert_eq!(stops, vec![1, 1, 1]);
        assert_eq!(replies, 13);
        assert_eq!(coordinator.stats().total_replies(), 13);
        assert!(coordinator.queue().is_empty());
    }

    #[test]
    fn test_scenario_fan_out_gating() {
        let queue = JobQueue::from_jobs(vec![Job::Prep]);
        let resolver = Resolver::new(2, Some(dynamic(6, 6)));
        let mut coordinator = Coordinator::new(queue, resolver);

        assert_eq!(coordinator.handle(0, Outcome::Ready).unwrap(), Reply::Job(Job::Prep));
        assert_eq!(coordinator.stage(), PipelineStage::PendingStageA);
        assert_eq!(coordinator.handle(1, Outcome::Ready).unwrap(), Reply::Wait);

        let shard0 = coordinator.handle(0, done()).unwrap();
        assert_eq!(shard0, Reply::Job(Job::ShardPrep(Partition::new(0, 2))));
        assert_eq!(coordinator.counter().get(), 2);

        let shard1 = coordinator.handle(1, Outcome::Ready).unwrap();
        assert_eq!(shard1, Reply::Job(Job::ShardPrep(Partition::new(1, 2))));
        assert_eq!(coordinator.stage(), PipelineStage::StageBInFlight(2));

        let next = coordinator.handle(0, done()).unwrap();
        assert_eq!(coordinator.counter().get(), 1);
        let seq = next.job().and_then(|j| j.frame()).and_then(|f| f.seq);
        assert_eq!(seq, Some(50));
        assert_eq!(coordinator.queue().pending_jobs(), 2);

        coordinator.handle(1, done()).unwrap();
        assert!(coordinator.counter().is_zero());
        assert_eq!(coordinator.stage(), PipelineStage::FramesEnqueued);
    }

    #[test]
    fn test_scenario_empty_expansion() {
        let queue = JobQueue::from_jobs(vec![Job::ShardPrep(Partition::new(3, 4))]);
        let resolver = Resolver::new(1, Some(dynamic(3, 3)));
        let mut coordinator = Coordinator::new(queue, resolver);

        coordinator.handle(0, Outcome::Ready).unwrap();
        let len_before = coordinator.queue().len();
        let reply = coordinator.handle(0, done()).unwrap();

        assert!(coordinator.counter().is_zero());
        assert_eq!(len_before, 0);
        assert_eq!(reply, Reply::Stop);
        assert!(coordinator.termination().is_all_stopped());
    }

    #[test]
    fn test_queued_generator_counts_as_dependency() {
        let queue = JobQueue::from_jobs(vec![Job::Prep]);
        let mut coordinator = Coordinator::new(queue, Resolver::new(2, None));
        assert_eq!(coordinator.counter().get(), 1);

        assert_eq!(coordinator.handle(0, Outcome::Ready).unwrap(), Reply::Job(Job::Prep));
        // the second worker must not be stopped while Prep can still expand
        assert_eq!(coordinator.handle(1, Outcome::Ready).unwrap(), Reply::Wait);

        let reply = coordinator.handle(0, Outcome::Done { produced: false }).unwrap();
        assert_eq!(reply, Reply::Stop);
        assert!(coordinator.counter().is_zero());
        assert_eq!(coordinator.handle(1, Outcome::Ready).unwrap(), Reply::Stop);
    }

    #[test]
    fn test_at_most_one_job_in_flight() {
        let queue = JobQueue::from_jobs((0..4).map(render).collect());
        let mut coordinator = Coordinator::new(queue, Resolver::new(1, None));

        coordinator.handle(0, Outcome::Ready).unwrap();
        assert_eq!(coordinator.in_flight(), 1);
        coordinator.handle(0, done()).unwrap();
        assert_eq!(coordinator.in_flight(), 1);
        assert_eq!(
            coordinator.slot(0).and_then(|s| s.job_in_flight.clone()),
            Some(render(1))
        );
    }

    #[test]
    fn test_request_after_stop_is_rejected() {
        let mut coordinator = Coordinator::new(JobQueue::new(), Resolver::new(2, None));

        assert_eq!(coordinator.handle(0, Outcome::Ready).unwrap(), Reply::Stop);
        assert!(matches!(
            coordinator.handle(0, Outcome::Ready),
            Err(SchedulerError::Protocol { worker_id: 0, .. })
        ));
        assert!(coordinator.handle(7, Outcome::Ready).is_err());
    }

    #[test]
    fn test_failed_generator_drops_dependency() {
        let queue = JobQueue::from_jobs(vec![Job::Prep]);
        let mut coordinator = Coordinator::new(queue, Resolver::new(1, None));

        coordinator.handle(0, Outcome::Ready).unwrap();
        let reply = coordinator
            .handle(0, Outcome::Failed { reason: "missing input".to_string() })
            .unwrap();

        assert_eq!(reply, Reply::Stop);
        assert_eq!(coordinator.failures().len(), 1);
        assert_eq!(coordinator.failures()[0].kind, JobKind::Prep);
    }

    #[test]
    fn test_abort_policy_stops_everyone() {
        let mut jobs = vec![Job::Prep];
        jobs.extend((0..5).map(render));
        let mut coordinator = Coordinator::new(
            JobQueue::from_jobs(jobs),
            Resolver::new(2, None),
        )
        .with_policy(FailurePolicy::Abort);

        coordinator.handle(0, Outcome::Ready).unwrap();
        coordinator.handle(1, Outcome::Ready).unwrap();
        let reply = coordinator
            .handle(0, Outcome::Failed { reason: "boom".to_string() })
            .unwrap();
        assert_eq!(reply, Reply::Stop);

        // the render still in flight completes but nothing new is handed out
        assert_eq!(coordinator.handle(1, done()).unwrap(), Reply::Stop);
        assert!(coordinator.termination().is_all_stopped());
        assert_eq!(coordinator.stats().jobs, 2);
    }

    #[test]
    fn test_unacknowledged_job_counts_as_failure() {
        let queue = JobQueue::from_jobs(vec![render(0)]);
        let mut coordinator = Coordinator::new(queue, Resolver::new(1, None));

        coordinator.handle(0, Outcome::Ready).unwrap();
        coordinator.handle(0, Outcome::Ready).unwrap();
        assert_eq!(coordinator.failures().len(), 1);
    }

    #[test]
    fn test_counter_never_negative_under_random_completions() {
        let resolver = Resolver::new(3, Some(dynamic(12, 12)));
        let mut coordinator = Coordinator::new(
            JobQueue::from_jobs(vec![Job::Prep]),
            resolver,
        );
        let mut outcomes = vec![Outcome::Ready; 3];
        let mut stopped = HashSet::new();
        let order = [2, 0, 1, 1, 2, 0, 0, 0, 1, 2];
        let mut rounds = 0;

        while !coordinator.termination().is_all_stopped() {
            let w = order[rounds % order.len()];
            rounds += 1;
            if stopped.contains(&w) {
                continue;
            }
            match coordinator.handle(w, outcomes[w].clone()).unwrap() {
                Reply::Job(_) => outcomes[w] = done(),
                Reply::Wait => outcomes[w] = Outcome::Ready,
                Reply::Stop => {
                    stopped.insert(w);
                }
            }
            assert!(rounds < 1000, "pipeline did not drain");
        }

        assert_eq!(coordinator.stats().jobs, 1 + 3 + 12);
        assert_eq!(coordinator.stats().stops, 3);
    }

    #[test]
    fn test_run_gathers_reports() {
        let (endpoint, workers) = channel_set(2);
        let coordinator = Coordinator::new(
            JobQueue::from_jobs(vec![render(0), render(1), render(2)]),
            Resolver::new(2, None),
        );

        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| {
                thread::spawn(move || {
                    let mut report = WorkerReport::new(worker.id());
                    let mut outcome = Outcome::Ready;
                    loop {
                        match worker.request(outcome.clone()).unwrap().unwrap() {
                            Reply::Stop => break,
                            Reply::Job(job) => {
                                report.record(crate::engine::result::LogEntry::job(
                                    job.kind(),
                                    job.frame().and_then(|f| f.seq),
                                    std::time::Duration::from_millis(1),
                                ));
                                outcome = Outcome::Done { produced: true };
                            }
                            Reply::Wait => outcome = Outcome::Ready,
                        }
                    }
                    worker.report(&report).unwrap();
                })
            })
            .collect();

        let report = coordinator.run(&endpoint).unwrap();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(report.workers.len(), 2);
        assert_eq!(report.dispatch.jobs, 3);
        assert_eq!(report.dispatch.stops, 2);
        assert_eq!(report.rendered_frames(), vec![0, 1, 2]);
    }

    #[test]
    fn test_report_before_stop_is_rejected() {
        let (endpoint, workers) = channel_set(1);
        let coordinator = Coordinator::new(JobQueue::from_jobs(vec![render(0)]), Resolver::new(1, None));

        workers[0].report(&WorkerReport::new(0)).unwrap();
        assert!(matches!(
            coordinator.run(&endpoint),
            Err(SchedulerError::Protocol { worker_id: 0, .. })
        ));
    }

    #[test]
    fn test_watchdog_expires_on_silent_workers() {
        let (endpoint, _workers) = channel_set(2);
        let coordinator = Coordinator::new(JobQueue::from_jobs(vec![render(0)]), Resolver::new(2, None))
            .with_watchdog(Duration::from_millis(50));

        let started = Instant::now();
        assert!(matches!(coordinator.run(&endpoint), Err(SchedulerError::Stalled(_))));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}

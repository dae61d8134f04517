// Tue Jan 13 2026 - Alex

use crate::engine::coordinator::{Coordinator, FailurePolicy};
use crate::engine::error::{Result, SchedulerError};
use crate::engine::handler::JobHandler;
use crate::engine::job::{Job, JobKind};
use crate::engine::queue::{DynamicFrames, JobQueue, Resolver};
use crate::engine::result::{RunReport, WorkerReport};
use crate::engine::transport::channel_set;
use crate::engine::worker::{Worker, DEFAULT_BACKOFF};
use crate::ui::progress::RenderProgress;
use crate::utils::logging::scoped_timer;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Initial contents of a run.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub jobs: Vec<Job>,
    pub dynamic: Option<DynamicFrames>,
}

impl Schedule {
    pub fn initial_renders(&self) -> usize {
        self.jobs.iter().filter(|j| j.kind() == JobKind::Render).count()
    }

    /// Generators that must complete before the run can drain.
    pub fn dependencies(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_generator()).count()
    }
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub workers: usize,
    pub backoff: Duration,
    pub policy: FailurePolicy,
    pub watchdog: Option<Duration>,
    pub progress: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            backoff: DEFAULT_BACKOFF,
            policy: FailurePolicy::default(),
            watchdog: None,
            progress: false,
        }
    }
}

/// Spawns the worker pool and drives the coordinator until termination.
pub struct FarmRunner {
    options: RunnerOptions,
    schedule: Schedule,
}

impl FarmRunner {
    pub fn new(options: RunnerOptions, schedule: Schedule) -> Self {
        Self { options, schedule }
    }

    pub fn workers(&self) -> usize {
        self.options.workers.max(1)
    }

    /// Runs the coordinator on the calling thread.
    ///
    /// Workers are joined after a clean run. After a failed run (a stall, an
    /// abort, a protocol error) they are detached instead: the coordinator's
    /// channels are closed by then, so each worker exits with `ChannelClosed`
    /// on its next request. A handler that never returns keeps its thread.
    pub fn run<H, F>(self, mut make_handler: F) -> Result<RunReport>
    where
        H: JobHandler + 'static,
        F: FnMut(usize) -> H,
    {
        let _timer = scoped_timer("frame farm run");
        let workers = self.workers();
        let (endpoint, worker_endpoints) = channel_set(workers);

        let handles: Vec<JoinHandle<Result<WorkerReport>>> = worker_endpoints
            .into_iter()
            .map(|worker_endpoint| {
                let handler = make_handler(worker_endpoint.id());
                let worker = Worker::new(worker_endpoint, handler).with_backoff(self.options.backoff);
                thread::spawn(move || worker.run())
            })
            .collect();

        let result = self.coordinator(workers).run(&endpoint);
        drop(endpoint);

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Run failed, detaching {} worker threads", handles.len());
                return Err(e);
            }
        };

        let mut panicked = None;
        for (id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => log::warn!("Worker {} ended with error: {}", id, e),
                Err(_) => {
                    log::error!("Worker {} panicked", id);
                    panicked.get_or_insert(id);
                }
            }
        }

        match panicked {
            Some(id) => Err(SchedulerError::WorkerPanicked(id)),
            None => Ok(report),
        }
    }

    fn coordinator(&self, workers: usize) -> Coordinator {
        let progress = RenderProgress::new(self.schedule.initial_renders(), self.options.progress);

        let coordinator = Coordinator::new(
            JobQueue::from_jobs(self.schedule.jobs.clone()),
            Resolver::new(workers, self.schedule.dynamic.clone()),
        )
        .with_policy(self.options.policy)
        .with_progress(progress);

        match self.options.watchdog {
            Some(limit) => coordinator.with_watchdog(limit),
            None => coordinator,
        }
    }
}

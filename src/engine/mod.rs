// Tue Jan 13 2026 - Alex

pub mod coordinator;
pub mod error;
pub mod handler;
pub mod job;
pub mod protocol;
pub mod queue;
pub mod result;
pub mod runner;
pub mod stage;
pub mod termination;
pub mod transport;
pub mod worker;

pub use coordinator::{Coordinator, FailurePolicy, WorkerSlot};
pub use error::{HandlerError, SchedulerError};
pub use handler::{Artifact, ArtifactHandler, ArtifactPaths, CommandHandler, JobHandler, Timeslices};
pub use job::{Frame, Job, JobKind, Partition};
pub use protocol::{Inbound, Outcome, Reply, Request};
pub use queue::{DependencyCounter, DynamicFrames, JobQueue, Resolver};
pub use result::{LogEntry, RunReport, WorkerReport};
pub use runner::{FarmRunner, RunnerOptions, Schedule};
pub use stage::PipelineStage;
pub use termination::Termination;
pub use worker::Worker;

// Tue Jan 15 2026 - Alex

pub mod animation;
pub mod config;
pub mod engine;
pub mod ui;
pub mod utils;

pub use animation::{AnimationPlan, Scene, SequenceFinalizer};
pub use config::Config;
pub use engine::{Coordinator, FarmRunner, Worker};

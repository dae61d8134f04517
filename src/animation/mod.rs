// Tue Jan 13 2026 - Alex

pub mod plan;
pub mod scene;
pub mod sequence;

pub use plan::AnimationPlan;
pub use scene::{GroundMotion, Scene, SceneError};
pub use sequence::{FinalSequence, SequenceError, SequenceFinalizer};

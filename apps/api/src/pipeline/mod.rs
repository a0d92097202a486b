//! Sequential stage execution with declared context edges.
//!
//! Each stage names the earlier stages it reads; the engine hands it exactly
//! those outputs, persists what it returns, and stops at the first failure.

pub mod engine;
pub mod stage;

pub use engine::{Pipeline, PipelineError, ProgressReporter};
pub use stage::{Stage, StageContext, StageDescriptor, StageError, StageOutput};

// Transformation job interface
// Dispatcher for the external process and the single-flight client gate

pub mod dispatcher;
pub mod job;

pub use dispatcher::{derive_output_path, Dispatcher, TransformError, TransformOutcome};
pub use job::{JobGate, JobState};

//! Broadcasting modules for real-time event streaming.
//!
//! Event streams are consumed by UIs or any other embedder; the pipeline
//! itself only talks to the `ProgressReporter` seam.

pub mod job_events;

pub use job_events::{JobProgressBroadcaster, JobProgressEvent, JobProgressTracker};

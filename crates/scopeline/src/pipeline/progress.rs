//! Progress reporting seam between the orchestrator and event streaming.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::job_events::{JobProgressEvent, JobProgressTracker};
use crate::job::JobStatus;

/// Events emitted by the pipeline while it drives a job.
pub enum ProgressEvent {
    Stage { status: JobStatus, message: String },
    Failed { status: JobStatus, error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests and fire-and-forget callers.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events onto the job progress broadcast channel.
pub struct BroadcastProgress {
    tracker: JobProgressTracker,
}

impl BroadcastProgress {
    pub fn new(
        job_id: &str,
        project_name: &str,
        sender: Arc<broadcast::Sender<JobProgressEvent>>,
    ) -> Self {
        Self {
            tracker: JobProgressTracker::from_sender(job_id, project_name, sender),
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Stage { status, message } => {
                self.tracker.update(status, &message);
            }
            ProgressEvent::Failed { status, error } => {
                self.tracker.failed(status, &error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::JobProgressBroadcaster;

    #[test]
    fn test_broadcast_progress_forwards_events() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();
        let progress = BroadcastProgress::new("job-1", "Demo", broadcaster.sender());

        progress.report(ProgressEvent::Stage {
            status: JobStatus::GenerationInProgress,
            message: "Working...".to_string(),
        });
        let event = rx.try_recv().unwrap();
        assert_eq!(event.status, JobStatus::GenerationInProgress);

        progress.report(ProgressEvent::Failed {
            status: JobStatus::FailedGeneration,
            error: "boom".to_string(),
        });
        let event = rx.try_recv().unwrap();
        assert_eq!(event.error.as_deref(), Some("boom"));
    }
}

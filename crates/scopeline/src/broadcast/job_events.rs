//! Job progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::JobStatus;

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Project name, for display.
    pub project_name: String,
    /// Status the job holds (or is moving through) at this point.
    pub status: JobStatus,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
    /// Error message (set on failure events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    /// Creates a new progress event.
    pub fn new(job_id: &str, project_name: &str, status: JobStatus, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            project_name: project_name.to_string(),
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Creates a failure event.
    pub fn failed(job_id: &str, project_name: &str, status: JobStatus, error: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            project_name: project_name.to_string(),
            status,
            message: "Stage failed".to_string(),
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker bound to one job.
    pub fn tracker(&self, job_id: &str, project_name: &str) -> JobProgressTracker {
        JobProgressTracker {
            job_id: job_id.to_string(),
            project_name: project_name.to_string(),
            sender: Arc::clone(&self.sender),
        }
    }

    /// Gets the inner sender for creating trackers elsewhere.
    pub fn sender(&self) -> Arc<broadcast::Sender<JobProgressEvent>> {
        Arc::clone(&self.sender)
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Tracks progress for a single job.
pub struct JobProgressTracker {
    job_id: String,
    project_name: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressTracker {
    pub fn from_sender(
        job_id: &str,
        project_name: &str,
        sender: Arc<broadcast::Sender<JobProgressEvent>>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            project_name: project_name.to_string(),
            sender,
        }
    }

    /// Reports the job moving through a status.
    pub fn update(&self, status: JobStatus, message: &str) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(JobProgressEvent::new(
            &self.job_id,
            &self.project_name,
            status,
            message,
        ));
    }

    /// Reports a stage failure.
    pub fn failed(&self, status: JobStatus, error: &str) {
        let _ = self.sender.send(JobProgressEvent::failed(
            &self.job_id,
            &self.project_name,
            status,
            error,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let tracker = broadcaster.tracker("job-1", "Demo");
        tracker.update(JobStatus::GenerationInProgress, "Extracting document...");

        let received = rx.try_recv().unwrap();
        assert_eq!(received.job_id, "job-1");
        assert_eq!(received.status, JobStatus::GenerationInProgress);
        assert_eq!(received.message, "Extracting document...");
        assert!(received.error.is_none());
    }

    #[test]
    fn test_failure_event_carries_error() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        broadcaster
            .tracker("job-2", "Demo")
            .failed(JobStatus::FailedEstimation, "gateway timed out");

        let received = rx.try_recv().unwrap();
        assert_eq!(received.status, JobStatus::FailedEstimation);
        assert_eq!(received.error.as_deref(), Some("gateway timed out"));
    }

    #[test]
    fn test_send_without_receivers_is_fine() {
        let broadcaster = JobProgressBroadcaster::new(10);
        broadcaster
            .tracker("job-3", "Demo")
            .update(JobStatus::Pending, "Queued");
    }

    #[test]
    fn test_default_capacity() {
        let broadcaster = JobProgressBroadcaster::default();
        let _rx = broadcaster.subscribe();
    }
}

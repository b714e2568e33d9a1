use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::sync::broadcast;

use crate::broadcast::job_events::JobProgressEvent;
use crate::cancel::CancelFlag;
use crate::job::JobStatus;
use crate::pipeline::{BroadcastProgress, NoopProgress, Orchestrator, ProgressReporter};

/// What to do with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Start,
    Resume,
}

/// A unit of work for the pool. The caller keeps a clone of the cancel flag
/// to abort the invocation; cancellation leaves the job resumable.
#[derive(Debug, Clone)]
pub struct JobCommand {
    pub job_id: String,
    pub action: JobAction,
    pub cancel: CancelFlag,
}

impl JobCommand {
    pub fn start(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            action: JobAction::Start,
            cancel: CancelFlag::new(),
        }
    }

    pub fn resume(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            action: JobAction::Resume,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Outcome of one pool invocation.
#[derive(Debug)]
pub struct JobRunResult {
    pub job_id: String,
    pub action: JobAction,
    /// The job's status after the invocation, when the job was reachable.
    pub status: Option<JobStatus>,
    /// Caller-facing error (not found, concurrent modification, illegal
    /// entry point) — stage failures land on the job itself instead.
    pub error: Option<String>,
}

/// Thread pool running pipeline invocations for independent jobs in
/// parallel. Per-job serialization comes from the store's compare-and-set,
/// not from the pool.
pub struct WorkerPool {
    command_sender: Sender<JobCommand>,
    result_receiver: Receiver<JobRunResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(orchestrator: Arc<Orchestrator>, worker_count: usize) -> Self {
        Self::with_progress_sender(orchestrator, worker_count, None)
    }

    /// Creates a new worker pool with an optional job progress broadcaster.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn with_progress_sender(
        orchestrator: Arc<Orchestrator>,
        worker_count: usize,
        progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
    ) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (command_sender, command_receiver) = bounded::<JobCommand>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<JobRunResult>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let command_rx = command_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_orchestrator = Arc::clone(&orchestrator);
            let sender = progress_sender.clone();

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    command_rx,
                    result_tx,
                    shutdown_flag,
                    worker_orchestrator,
                    sender,
                );
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            command_sender,
            result_receiver,
            workers,
            shutdown,
        }
    }

    pub fn submit(&self, command: JobCommand) -> Result<(), crate::error::WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(crate::error::WorkerError::ChannelClosed);
        }

        self.command_sender
            .send(command)
            .map_err(|_| crate::error::WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<JobRunResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobRunResult> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.command_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    command_receiver: Receiver<JobCommand>,
    result_sender: Sender<JobRunResult>,
    shutdown: Arc<AtomicBool>,
    orchestrator: Arc<Orchestrator>,
    progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match command_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(command) => {
                debug!(
                    "Worker {} running {:?} for job {}",
                    worker_id, command.action, command.job_id
                );

                let result = run_command(&orchestrator, &command, progress_sender.as_ref());

                if let Err(e) = result_sender.send(result) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} command channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

fn run_command(
    orchestrator: &Orchestrator,
    command: &JobCommand,
    progress_sender: Option<&Arc<broadcast::Sender<JobProgressEvent>>>,
) -> JobRunResult {
    // The project name for progress events comes from the job itself.
    let progress: Box<dyn ProgressReporter> = match progress_sender {
        Some(sender) => match orchestrator.store().get(&command.job_id) {
            Ok(job) => Box::new(BroadcastProgress::new(
                &job.id,
                &job.project_name,
                Arc::clone(sender),
            )),
            Err(_) => Box::new(NoopProgress),
        },
        None => Box::new(NoopProgress),
    };

    let outcome = match command.action {
        JobAction::Start => orchestrator.start(&command.job_id, &command.cancel, progress.as_ref()),
        JobAction::Resume => {
            orchestrator.resume(&command.job_id, &command.cancel, progress.as_ref())
        }
    };

    match outcome {
        Ok(job) => JobRunResult {
            job_id: command.job_id.clone(),
            action: command.action,
            status: Some(job.status),
            error: None,
        },
        Err(e) => JobRunResult {
            job_id: command.job_id.clone(),
            action: command.action,
            status: None,
            error: Some(e.to_string()),
        },
    }
}

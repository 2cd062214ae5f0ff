//! Fixed-size pool of tokio workers draining one bounded job queue.

use embedbatch_core::JobId;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::JobsConfig;
use crate::error::JobsError;
use crate::processor::JobProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            queue_capacity: 100,
        }
    }
}

impl From<&JobsConfig> for WorkerPoolConfig {
    fn from(config: &JobsConfig) -> Self {
        Self {
            worker_count: config.worker_count,
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Runs `worker_count` tasks that each take the next job id from a shared FIFO.
///
/// `enqueue` waits while the queue is full. `shutdown` lets running jobs finish
/// and their callbacks go out; ids still waiting in the queue are left `queued`.
pub struct WorkerPool {
    sender: mpsc::Sender<JobId>,
    processor: Arc<JobProcessor>,
    shutdown_tx: watch::Sender<bool>,
    workers: Mutex<JoinSet<()>>,
    worker_count: usize,
}

impl WorkerPool {
    /// Spawns the workers on the current tokio runtime.
    pub fn start(config: WorkerPoolConfig, processor: Arc<JobProcessor>) -> Self {
        let worker_count = config.worker_count.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let receiver = Arc::clone(&receiver);
            let shutdown_rx = shutdown_rx.clone();
            let processor = Arc::clone(&processor);
            workers.spawn(run_worker(worker_id, receiver, shutdown_rx, processor));
        }

        info!(
            workers = worker_count,
            queue_capacity = config.queue_capacity,
            "Worker pool started"
        );

        Self {
            sender,
            processor,
            shutdown_tx,
            workers: Mutex::new(workers),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Pushes a job id, waiting for queue capacity.
    pub async fn enqueue(&self, job_id: JobId) -> Result<(), JobsError> {
        if self.is_closed() {
            return Err(JobsError::PoolClosed);
        }
        self.sender
            .send(job_id)
            .await
            .map_err(|_| JobsError::PoolClosed)?;
        debug!(job_id = %job_id, "Job enqueued");
        Ok(())
    }

    /// Stops idle workers, waits for busy ones to finish their current job,
    /// then waits for pending callback deliveries.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        info!("Worker pool shutting down");

        let mut workers = self.workers.lock().await;
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Worker task panicked");
            }
        }
        drop(workers);

        self.processor.callbacks().drain().await;
        info!("Worker pool stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<JobId>>>,
    mut shutdown_rx: watch::Receiver<bool>,
    processor: Arc<JobProcessor>,
) {
    debug!(worker_id, "Worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let next = tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                // The pool itself is gone
                if changed.is_err() {
                    break;
                }
                continue;
            }
            job_id = async { receiver.lock().await.recv().await } => job_id,
        };

        match next {
            Some(job_id) => processor.process(worker_id, job_id).await,
            None => break,
        }
    }
    debug!(worker_id, "Worker stopped");
}

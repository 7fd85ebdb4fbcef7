//! Bounded worker pool for asynchronous dispatch

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::debug;

use sprocket_core::TaskResult;

use crate::error::EngineError;

/// Configuration for the dispatch pool.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Fixed number of workers, engine-wide and shared across all task
    /// types. Submissions beyond this run queue FIFO.
    pub worker_count: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { worker_count: 10 }
    }
}

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Submission failed because the pool was shut down.
#[derive(Debug, thiserror::Error)]
#[error("dispatch pool is shut down")]
pub struct DispatchClosed;

/// Fixed-size worker pool draining a FIFO queue of execution jobs.
///
/// At most `worker_count` jobs run concurrently; the queue itself is
/// unbounded, so excess submissions wait rather than spawning new tasks.
/// There is no priority and no preemption, and a job is never cancelled
/// once a worker has picked it up.
pub struct DispatchPool {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl DispatchPool {
    /// Spawn the worker set. Must be called from within a tokio runtime.
    pub fn new(config: DispatchConfig) -> Self {
        let worker_count = config.worker_count.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(AsyncMutex::new(receiver));

        let workers = (0..worker_count)
            .map(|slot| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(Self::worker_loop(slot, receiver))
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            worker_count,
        }
    }

    async fn worker_loop(slot: usize, receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<Job>>>) {
        debug!(slot, "dispatch worker started");
        loop {
            // Hold the lock only while pulling; the job itself runs
            // unlocked so the other workers keep draining the queue.
            let job = {
                let mut receiver = receiver.lock().await;
                receiver.recv().await
            };
            match job {
                Some(job) => job.await,
                None => break,
            }
        }
        debug!(slot, "dispatch worker stopped");
    }

    /// Enqueue a job. FIFO relative to other submissions.
    pub fn submit<F>(&self, future: F) -> Result<(), DispatchClosed>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match sender.as_ref() {
            Some(sender) => sender.send(Box::pin(future)).map_err(|_| DispatchClosed),
            None => Err(DispatchClosed),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Close the queue and wait for in-flight and queued jobs to finish.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);

        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self
                .workers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// Awaitable handle for one dispatched execution attempt.
///
/// Resolves to exactly the outcome the synchronous path would have
/// returned. Dropping the handle detaches the waiter; it does not cancel
/// the attempt.
#[derive(Debug)]
pub struct ExecutionHandle {
    execution_id: String,
    task_type: String,
    receiver: oneshot::Receiver<Result<TaskResult, EngineError>>,
}

impl ExecutionHandle {
    pub(crate) fn new(
        execution_id: String,
        task_type: String,
        receiver: oneshot::Receiver<Result<TaskResult, EngineError>>,
    ) -> Self {
        Self {
            execution_id,
            task_type,
            receiver,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Wait for the attempt to finish and take its outcome.
    pub async fn join(self) -> Result<TaskResult, EngineError> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(EngineError::Unexpected {
                task_type: self.task_type,
                execution_id: self.execution_id,
                details: "execution was dropped before completing".to_string(),
            }),
        }
    }
}

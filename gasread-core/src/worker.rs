//! Worker pool for CPU-bound recognition jobs

use crate::error::{OcrError, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Message sent to workers
enum WorkerMessage {
    Job(Job),
    Shutdown,
}

/// Fixed set of OS threads consuming one shared job queue.
///
/// Jobs run to completion even when the caller stops waiting for them. A
/// panicking job is caught and reported to its caller as an engine failure;
/// the worker keeps serving.
///
/// ```rust
/// use gasread::worker::WorkerPool;
///
/// # tokio_test_block_on(async {
/// let pool = WorkerPool::new(2).unwrap();
/// let answer = pool.run(|| 6 * 7).await.unwrap();
/// assert_eq!(answer, 42);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct WorkerPool {
    workers: Vec<Worker>,
    sender: Option<mpsc::Sender<WorkerMessage>>,
}

impl WorkerPool {
    /// Start `num_workers` threads (at least one)
    pub fn new(num_workers: usize) -> Result<Self> {
        let num_workers = num_workers.max(1);
        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            workers.push(Worker::new(id, Arc::clone(&receiver))?);
        }
        debug!(workers = num_workers, "Started worker pool");

        Ok(Self {
            workers,
            sender: Some(sender),
        })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue `job` and hand back the channel its outcome arrives on
    pub fn submit<F, T>(&self, job: F) -> Result<oneshot::Receiver<Result<T>>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| OcrError::Engine("worker pool is shut down".to_string()))?;

        let (reply, outcome) = oneshot::channel();
        let wrapped: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                error!("OCR job panicked: {message}");
                OcrError::Engine(format!("OCR job panicked: {message}"))
            });
            // The caller may have gone away; the result is simply dropped
            let _ = reply.send(result);
        });

        sender
            .send(WorkerMessage::Job(wrapped))
            .map_err(|_| OcrError::Engine("worker pool is shut down".to_string()))?;
        Ok(outcome)
    }

    /// Run `job` on a worker and wait for it without blocking the executor.
    ///
    /// Dropping the returned future abandons the result, not the job.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let outcome = self.submit(job)?;
        outcome
            .await
            .map_err(|_| OcrError::Engine("worker exited before replying".to_string()))?
    }

    /// Ask every worker to stop after its current job and wait for them
    pub fn shutdown(mut self) {
        self.stop(true);
    }

    fn stop(&mut self, signal: bool) {
        if let Some(sender) = self.sender.take() {
            if signal {
                for _ in &self.workers {
                    let _ = sender.send(WorkerMessage::Shutdown);
                }
            }
        }
        for worker in &mut self.workers {
            worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop(false);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("open", &self.sender.is_some())
            .finish()
    }
}

/// Worker thread
struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<mpsc::Receiver<WorkerMessage>>>) -> Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("gasread-worker-{id}"))
            .spawn(move || loop {
                let message = match receiver.lock() {
                    Ok(receiver) => receiver.recv(),
                    Err(_) => break,
                };

                match message {
                    Ok(WorkerMessage::Job(job)) => job(),
                    Ok(WorkerMessage::Shutdown) | Err(_) => break,
                }
            })?;

        Ok(Self {
            id,
            thread: Some(thread),
        })
    }

    /// Wait for the worker to finish
    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(worker = self.id, "Worker thread panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Fixed-size worker pool for repository requests.
//!
//! Workers block on a shared FIFO queue with a bounded wait so the stop
//! flag is seen promptly after a burst. Each worker handles one request at
//! a time; a panicking request is answered with `InternalError` and the
//! worker keeps running.

use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::repository::Repository;
use crate::types::{DeleteStatus, GetStatus, PutStatus, Result, ThreadsError};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Repository operation carried by a request.
#[derive(Debug, Clone)]
pub enum Operation {
    Put { name: String, ttl: u64, body: Vec<u8> },
    Delete { name: String },
    Get { period: u64, lang_code: String, category: String },
}

impl Operation {
    fn method(&self) -> &'static str {
        match self {
            Operation::Put { .. } => "PUT",
            Operation::Delete { .. } => "DELETE",
            Operation::Get { .. } => "GET",
        }
    }

    fn failed(&self) -> Reply {
        match self {
            Operation::Put { .. } => Reply::Put(PutStatus::InternalError),
            Operation::Delete { .. } => Reply::Delete(DeleteStatus::InternalError),
            Operation::Get { .. } => Reply::Get(GetStatus::InternalError),
        }
    }
}

/// Outcome of one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Put(PutStatus),
    Delete(DeleteStatus),
    Get(GetStatus),
}

impl Reply {
    pub fn code(&self) -> u16 {
        match self {
            Reply::Put(status) => status.code(),
            Reply::Delete(status) => status.code(),
            Reply::Get(status) => status.code(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Reply::Put(status) => status.description(),
            Reply::Delete(status) => status.description(),
            Reply::Get(status) => status.description(),
        }
    }
}

/// Queued operation with the channel its reply goes to.
pub struct Request {
    pub operation: Operation,
    pub reply: Sender<Reply>,
}

/// Pool of serving threads.
pub struct WorkerPool {
    queue: Sender<Request>,
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` serving threads over `repository`.
    pub fn start(repository: Arc<Repository>, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(ThreadsError::config("Worker pool needs at least one worker"));
        }

        let (queue, requests) = unbounded::<Request>();
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let requests = requests.clone();
            let repository = Arc::clone(&repository);
            let stop = Arc::clone(&stop);
            let handle = thread::Builder::new()
                .name(format!("serve-{worker_id}"))
                .spawn(move || worker_loop(worker_id, requests, repository, stop))?;
            handles.push(handle);
        }

        info!(workers, "Worker pool started");
        Ok(Self { queue, stop, handles })
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Queue an operation; the reply arrives on the returned receiver.
    pub fn submit(&self, operation: Operation) -> Result<Receiver<Reply>> {
        let (reply, receiver) = bounded(1);
        self.queue
            .send(Request { operation, reply })
            .map_err(|_| ThreadsError::WorkerError("Request queue closed".to_string()))?;
        Ok(receiver)
    }

    /// Queue an operation and wait for its reply.
    pub fn call(&self, operation: Operation) -> Result<Reply> {
        self.submit(operation)?
            .recv()
            .map_err(|_| ThreadsError::WorkerError("Worker dropped the request".to_string()))
    }

    /// Set the stop flag and join every worker.
    ///
    /// Requests still queued are dropped; their callers see a closed reply channel.
    pub fn shutdown(self) {
        let Self { queue, stop, handles } = self;
        stop.store(true, Ordering::SeqCst);
        drop(queue);
        for handle in handles {
            if handle.join().is_err() {
                error!("Serving worker panicked outside a request");
            }
        }
        info!("Worker pool stopped");
    }
}

fn worker_loop(worker_id: usize, requests: Receiver<Request>, repository: Arc<Repository>, stop: Arc<AtomicBool>) {
    debug!(worker_id, "Serving worker started");
    while !stop.load(Ordering::SeqCst) {
        let request = match requests.recv_timeout(POLL_INTERVAL) {
            Ok(request) => request,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let method = request.operation.method();
        let reply = panic::catch_unwind(AssertUnwindSafe(|| handle(&repository, &request.operation)))
            .unwrap_or_else(|_| {
                error!(worker_id, method, "Request panicked");
                request.operation.failed()
            });

        if request.reply.send(reply).is_err() {
            warn!(worker_id, method, "Requester went away before the reply");
        }
    }
    debug!(worker_id, "Serving worker stopped");
}

fn handle(repository: &Repository, operation: &Operation) -> Reply {
    match operation {
        Operation::Put { name, ttl, body } => Reply::Put(repository.put(name, *ttl, body)),
        Operation::Delete { name } => Reply::Delete(repository.delete(name)),
        Operation::Get {
            period,
            lang_code,
            category,
        } => Reply::Get(repository.get(*period, lang_code, category)),
    }
}

//! Background status computation.
//!
//! A single worker thread consumes a FIFO queue of status requests so that
//! blocking repository queries never run on the UI-bound context. Results
//! are handed to a callback on the worker thread; [`StatusWorker::with_channel`]
//! installs the usual callback, which posts them on a channel the UI side
//! drains on its own schedule.

use crate::repo_status::error::StatusError;
use crate::repo_status::status::StatusResult;
use crate::repo_status::vcs::RepositoryHandle;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Callback receiving results on the worker thread.
pub type ResultCallback = Box<dyn FnMut(StatusResult) + Send>;

/// A queued status request.
#[derive(Debug, Clone)]
pub struct WorkQueueEntry {
    /// Repository that answers the query.
    pub repository: RepositoryHandle,
    /// Absolute path to query.
    pub path: PathBuf,
    /// Monotonic request id, unique per worker.
    pub request: u64,
    /// Generation at submission; entries from older generations are dropped.
    pub generation: u64,
}

enum WorkerMessage {
    Request(WorkQueueEntry),
    Shutdown,
}

/// State shared between the handle and the worker thread.
#[derive(Default)]
struct Shared {
    generation: AtomicU64,
    stop: AtomicBool,
    pending: AtomicUsize,
}

/// Handle to the background status worker.
pub struct StatusWorker {
    tx: Sender<WorkerMessage>,
    shared: Arc<Shared>,
    next_request: u64,
    thread: Option<JoinHandle<()>>,
}

impl StatusWorker {
    /// Start a worker that hands every result to `callback`.
    pub fn spawn(thread_name: &str, callback: ResultCallback) -> Result<Self, StatusError> {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);

        let thread = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run(rx, worker_shared, callback))?;

        Ok(Self {
            tx,
            shared,
            next_request: 0,
            thread: Some(thread),
        })
    }

    /// Start a worker whose results are posted on a channel.
    ///
    /// # Returns
    /// A tuple of (worker, receiver) where receiver gets every result.
    pub fn with_channel(thread_name: &str) -> Result<(Self, Receiver<StatusResult>), StatusError> {
        let (result_tx, result_rx) = mpsc::channel();
        let worker = Self::spawn(
            thread_name,
            Box::new(move |result| {
                let _ = result_tx.send(result);
            }),
        )?;
        Ok((worker, result_rx))
    }

    /// Queue a status request for `path`. Never blocks.
    ///
    /// Without a repository there is nothing to ask, so the request is
    /// dropped. Returns the request id when queued.
    pub fn push(&mut self, repository: Option<&RepositoryHandle>, path: &Path) -> Option<u64> {
        let repository = repository?;
        if self.thread.is_none() {
            return None;
        }

        let request = self.next_request;
        self.next_request += 1;

        let entry = WorkQueueEntry {
            repository: repository.clone(),
            path: path.to_path_buf(),
            request,
            generation: self.generation(),
        };

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(WorkerMessage::Request(entry)).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Status worker is gone, dropping request for {}", path.display());
            return None;
        }
        Some(request)
    }

    /// Discard every queued request. Never blocks.
    ///
    /// A request already being computed still completes; its result carries
    /// the previous generation so the receiver can tell it is stale.
    pub fn clear(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Current generation, bumped by every [`clear`](Self::clear).
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Requests queued or running that have not been delivered or dropped.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Whether the worker thread is still alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the worker and wait for its thread to exit.
    ///
    /// Queued requests are abandoned. A computation in progress runs to
    /// completion but its result is not delivered, so no callback fires
    /// once this returns.
    pub fn terminate(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.shared.stop.store(true, Ordering::SeqCst);
        let _ = self.tx.send(WorkerMessage::Shutdown);

        if thread.join().is_err() {
            tracing::warn!("Status worker panicked");
        }
        self.shared.pending.store(0, Ordering::SeqCst);
    }
}

impl Drop for StatusWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// The worker thread's main loop.
fn run(rx: Receiver<WorkerMessage>, shared: Arc<Shared>, mut callback: ResultCallback) {
    let mut queue: VecDeque<WorkQueueEntry> = VecDeque::new();
    // Latest queued request per path, for coalescing
    let mut latest: HashMap<PathBuf, u64> = HashMap::new();

    'outer: loop {
        if queue.is_empty() {
            match rx.recv() {
                Ok(WorkerMessage::Request(entry)) => enqueue(&mut queue, &mut latest, entry),
                Ok(WorkerMessage::Shutdown) | Err(_) => break,
            }
        }

        for message in rx.try_iter() {
            match message {
                WorkerMessage::Request(entry) => enqueue(&mut queue, &mut latest, entry),
                WorkerMessage::Shutdown => break 'outer,
            }
        }

        let Some(entry) = queue.pop_front() else {
            continue;
        };

        if shared.stop.load(Ordering::SeqCst) {
            break;
        }

        let superseded = latest.get(&entry.path) != Some(&entry.request);
        if !superseded {
            latest.remove(&entry.path);
        }

        if superseded || entry.generation != shared.generation.load(Ordering::SeqCst) {
            tracing::trace!("Skipping stale request {} for {}", entry.request, entry.path.display());
            shared.pending.fetch_sub(1, Ordering::SeqCst);
            continue;
        }

        let result = entry.repository.status(&entry.path);

        if shared.stop.load(Ordering::SeqCst) {
            break;
        }

        // A failed query still answers the request, as "unknown"
        let flags = match result {
            Ok(flags) => Some(flags),
            Err(e) => {
                tracing::debug!("Status query failed for {}: {}", entry.path.display(), e);
                None
            }
        };
        callback(StatusResult {
            path: entry.path,
            flags,
            request: entry.request,
            generation: entry.generation,
        });
        shared.pending.fetch_sub(1, Ordering::SeqCst);
    }

    tracing::debug!("Status worker exiting, {} requests abandoned", queue.len());
}

fn enqueue(
    queue: &mut VecDeque<WorkQueueEntry>,
    latest: &mut HashMap<PathBuf, u64>,
    entry: WorkQueueEntry,
) {
    latest.insert(entry.path.clone(), entry.request);
    queue.push_back(entry);
}

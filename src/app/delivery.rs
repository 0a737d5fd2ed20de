// LogCore - app/delivery.rs
//
// Ordered, unbounded, multi-producer / single-consumer delivery queue.
//
// Architecture:
//   - `DeliveryQueue` is shared by every producer. `enqueue` appends under
//     the queue mutex, signals the condition variable and returns at once.
//   - `run_delivery_worker` runs on the one dedicated thread. It sleeps on
//     the condition variable while idle and drains in FIFO order when
//     woken. The mutex is released around every action, so file I/O never
//     blocks a producer.
//   - The worker owns the `LevelFileRouter`; nothing else touches file
//     handles.
//
// Lifecycle: Idle <-> Draining, then Stopped once shutdown has been
// requested AND the queue is empty. Shutdown is graceful: everything
// accepted before it is executed, and nothing is accepted after it.
//
// The queue has no depth bound; sustained overload grows memory rather than
// blocking or dropping at the producer.

use crate::app::config_store::ConfigStore;
use crate::app::router::LevelFileRouter;
use crate::core::model::{LogRecord, SourceLocation};
use crate::util::constants::DELIVERY_THREAD_NAME;
use crate::util::error::DeliveryError;
use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

// =============================================================================
// Actions
// =============================================================================

/// Arbitrary work run on the delivery thread with access to the router.
pub type DeliveryTask = Box<dyn FnOnce(&mut LevelFileRouter) + Send>;

/// One unit of deferred work, consumed exactly once by the worker.
pub enum DeliveryAction {
    /// Append to the WARNING/ERROR/FATAL file for the record's level.
    LevelRecord(LogRecord),
    /// Append to the module's own log file.
    ModuleRecord {
        record: LogRecord,
        append: bool,
        location: Option<SourceLocation>,
    },
    /// Print a pre-formatted line.
    Console { line: String, to_stderr: bool },
    /// Run a closure against the router.
    Task(DeliveryTask),
    /// Signal the sender once everything queued before it has run.
    Barrier(mpsc::Sender<()>),
}

impl DeliveryAction {
    pub fn task<F>(f: F) -> Self
    where
        F: FnOnce(&mut LevelFileRouter) + Send + 'static,
    {
        Self::Task(Box::new(f))
    }
}

impl fmt::Debug for DeliveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LevelRecord(record) => f.debug_tuple("LevelRecord").field(record).finish(),
            Self::ModuleRecord {
                record,
                append,
                location,
            } => f
                .debug_struct("ModuleRecord")
                .field("record", record)
                .field("append", append)
                .field("location", location)
                .finish(),
            Self::Console { line, to_stderr } => f
                .debug_struct("Console")
                .field("line", line)
                .field("to_stderr", to_stderr)
                .finish(),
            Self::Task(_) => f.write_str("Task(..)"),
            Self::Barrier(_) => f.write_str("Barrier"),
        }
    }
}

// =============================================================================
// Shared state
// =============================================================================

struct QueueState {
    actions: VecDeque<DeliveryAction>,
    /// Cleared by shutdown; the worker exits once this is false and
    /// `actions` is empty.
    accepting: bool,
    /// Sequence number handed to the next accepted action.
    next_seq: u64,
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// DeliveryQueue
// =============================================================================

/// Handle to the delivery queue and its worker thread.
///
/// Dropping the handle shuts the worker down gracefully.
pub struct DeliveryQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl DeliveryQueue {
    /// Start a worker whose router writes to the real filesystem using the
    /// paths in `store`.
    pub fn new(store: Arc<ConfigStore>) -> Result<Self, DeliveryError> {
        Self::with_router(LevelFileRouter::new(store))
    }

    /// Start a worker that owns `router`.
    pub fn with_router(router: LevelFileRouter) -> Result<Self, DeliveryError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                actions: VecDeque::new(),
                accepting: true,
                next_seq: 0,
            }),
            wake: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(DELIVERY_THREAD_NAME.to_string())
            .spawn(move || run_delivery_worker(worker_shared, router))
            .map_err(|source| DeliveryError::WorkerSpawn { source })?;

        tracing::debug!(thread = DELIVERY_THREAD_NAME, "Delivery worker started");

        Ok(Self {
            shared,
            worker_id: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Append `action` to the tail of the queue and wake the worker.
    ///
    /// Returns the action's sequence number: actions run in exactly this
    /// order. Fails with [`DeliveryError::Stopped`] once shutdown has been
    /// requested.
    pub fn enqueue(&self, action: DeliveryAction) -> Result<u64, DeliveryError> {
        let seq = {
            let mut state = self.shared.lock();
            if !state.accepting {
                return Err(DeliveryError::Stopped);
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.actions.push_back(action);
            seq
        };
        self.shared.wake.notify_one();
        Ok(seq)
    }

    /// Append `actions` as one contiguous run: either all are accepted or,
    /// after shutdown, none are.
    ///
    /// Returns the sequence numbers assigned to them, in order.
    pub fn enqueue_all(&self, actions: Vec<DeliveryAction>) -> Result<Range<u64>, DeliveryError> {
        let seqs = {
            let mut state = self.shared.lock();
            if !state.accepting {
                return Err(DeliveryError::Stopped);
            }
            let start = state.next_seq;
            state.next_seq += actions.len() as u64;
            state.actions.extend(actions);
            start..state.next_seq
        };
        if !seqs.is_empty() {
            self.shared.wake.notify_one();
        }
        Ok(seqs)
    }

    /// Enqueue a closure to run on the delivery thread.
    pub fn run<F>(&self, f: F) -> Result<u64, DeliveryError>
    where
        F: FnOnce(&mut LevelFileRouter) + Send + 'static,
    {
        self.enqueue(DeliveryAction::task(f))
    }

    /// Block until every action enqueued before this call has executed.
    ///
    /// Called from a delivery task it returns at once: the worker is busy
    /// running that task and could never reach the barrier.
    pub fn flush(&self) -> Result<(), DeliveryError> {
        if self.on_worker_thread() {
            tracing::debug!("flush called from the delivery thread; not waiting");
            return Ok(());
        }
        let (tx, rx) = mpsc::channel();
        self.enqueue(DeliveryAction::Barrier(tx))?;
        rx.recv().map_err(|_| DeliveryError::WorkerPanicked)
    }

    /// Number of actions waiting to execute.
    pub fn pending(&self) -> usize {
        self.shared.lock().actions.len()
    }

    /// `false` once shutdown has been requested.
    pub fn is_running(&self) -> bool {
        self.shared.lock().accepting
    }

    /// Stop accepting actions, let the worker drain what is queued, and join
    /// it.
    ///
    /// Returns `Ok(true)` if this call joined the worker and `Ok(false)` if
    /// the queue was already stopped (or the call comes from the worker
    /// itself, which cannot join its own thread).
    pub fn shutdown(&self) -> Result<bool, DeliveryError> {
        {
            let mut state = self.shared.lock();
            state.accepting = false;
        }
        self.shared.wake.notify_all();

        if self.on_worker_thread() {
            return Ok(false);
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handle {
            Some(handle) => {
                handle.join().map_err(|_| DeliveryError::WorkerPanicked)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl DeliveryQueue {
    fn on_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }
}

impl Drop for DeliveryQueue {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "Delivery worker did not shut down cleanly");
        }
    }
}

// =============================================================================
// Worker thread
// =============================================================================

/// Entry point of the delivery thread.
fn run_delivery_worker(shared: Arc<Shared>, mut router: LevelFileRouter) {
    let mut executed: u64 = 0;
    let mut state = shared.lock();

    loop {
        state = shared
            .wake
            .wait_while(state, |s| s.accepting && s.actions.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        if !state.accepting && state.actions.is_empty() {
            break;
        }

        loop {
            let Some(action) = state.actions.pop_front() else {
                break;
            };
            // Producers may enqueue while this action performs I/O.
            drop(state);
            execute_action(action, &mut router);
            executed += 1;
            state = shared.lock();
        }
    }
    drop(state);

    router.close_all();
    tracing::debug!(executed, stats = ?router.stats(), "Delivery worker stopped");
}

fn execute_action(action: DeliveryAction, router: &mut LevelFileRouter) {
    match action {
        DeliveryAction::LevelRecord(record) => {
            router.write_record(&record);
        }
        DeliveryAction::ModuleRecord {
            record,
            append,
            location,
        } => {
            router.write_module_record(&record, append, location);
        }
        DeliveryAction::Console { line, to_stderr } => router.write_console(&line, to_stderr),
        DeliveryAction::Task(task) => {
            if panic::catch_unwind(AssertUnwindSafe(|| task(router))).is_err() {
                tracing::error!("Delivery task panicked; worker continues");
            }
        }
        DeliveryAction::Barrier(done) => {
            // The waiter may have given up; nothing to do then.
            let _ = done.send(());
        }
    }
}

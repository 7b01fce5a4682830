//! Per-target lifecycle scheduler.
//!
//! A single worker thread drains one shared FIFO of extract and undo jobs,
//! strictly one at a time. Each target has at most one queued or running
//! job; a second request against a busy target is rejected at enqueue time.
//! Progress, log lines and state changes are delivered as
//! [`SchedulerEvent`]s on the channel returned by [`Scheduler::new`].
//! Progress is coalesced to at most one event per progress interval and
//! phase, plus the final snapshot of each phase.

use std::any::Any;
use std::collections::VecDeque;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use crate::CancellationToken;
use crate::ExtractConfig;
use crate::ExtractionReport;
use crate::LogLevel;
use crate::LogSink;
use crate::Outcome;
use crate::Phase;
use crate::ProgressCallback;
use crate::ProgressSnapshot;
use crate::Result;
use crate::UndoReport;
use crate::VfsxError;
use crate::api;
use crate::formats::ArchiveProvider;
use crate::types::Target;
use crate::types::TargetKey;
use crate::types::TargetState;

/// Kind of scheduled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Extract matching entries.
    Extract,
    /// Undo a previous extraction.
    Undo,
}

/// How a scheduled operation ended.
#[derive(Debug, Clone)]
pub enum JobResult {
    /// Extraction completed.
    Extracted(ExtractionReport),
    /// Undo completed.
    Undone(UndoReport),
    /// The operation observed cancellation.
    Cancelled,
    /// The operation failed.
    ///
    /// The error is shared so the result stays cloneable.
    Failed(Arc<VfsxError>),
}

/// Notification emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A target moved to a new lifecycle state.
    StateChanged {
        /// Target root.
        root: PathBuf,
        /// New state.
        state: TargetState,
    },
    /// Progress of the running operation.
    Progress {
        /// Target root.
        root: PathBuf,
        /// Latest snapshot.
        snapshot: ProgressSnapshot,
    },
    /// Message from the running operation.
    Log {
        /// Target root.
        root: PathBuf,
        /// Severity.
        level: LogLevel,
        /// Human-readable text.
        message: String,
    },
    /// The archive produced its first entry after building its index.
    Indexed {
        /// Target root.
        root: PathBuf,
        /// Time spent indexing.
        elapsed: Duration,
    },
    /// An operation ended.
    Finished {
        /// Target root.
        root: PathBuf,
        /// Operation kind.
        kind: JobKind,
        /// How it ended.
        result: JobResult,
    },
}

/// A registered target together with its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetStatus {
    /// The target.
    pub target: Target,
    /// Its lifecycle state.
    pub state: TargetState,
}

struct Slot {
    target: Target,
    state: TargetState,
}

struct Job {
    key: TargetKey,
    kind: JobKind,
    token: CancellationToken,
}

struct Running {
    key: TargetKey,
    token: CancellationToken,
}

#[derive(Default)]
struct State {
    slots: Vec<Slot>,
    queue: VecDeque<Job>,
    running: Option<Running>,
    shutdown: bool,
}

impl State {
    fn slot(&self, key: &TargetKey) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.target.key() == *key)
    }

    fn slot_mut(&mut self, key: &TargetKey) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| slot.target.key() == *key)
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.running.is_none()
    }
}

struct Inner {
    state: Mutex<State>,
    work: Condvar,
    idle: Condvar,
    events: Sender<SchedulerEvent>,
    provider: Arc<dyn ArchiveProvider>,
    config: ExtractConfig,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SchedulerEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(event);
    }

    fn set_state(&self, slot: &mut Slot, state: TargetState) {
        slot.state = state;
        self.emit(SchedulerEvent::StateChanged {
            root: slot.target.root.clone(),
            state,
        });
    }
}

/// Queues extract and undo operations over a set of targets.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vfsx_core::ExtractConfig;
/// use vfsx_core::Scheduler;
/// use vfsx_core::Target;
/// use vfsx_core::formats::ZipProvider;
///
/// # fn main() -> vfsx_core::Result<()> {
/// let config = ExtractConfig::new(["data:sound/"]);
/// let (scheduler, events) = Scheduler::new(Arc::new(ZipProvider::default()), config)?;
///
/// scheduler.add_target(Target::new("one", "/games/one"))?;
/// scheduler.enqueue_extract("/games/one".as_ref())?;
/// scheduler.wait_idle();
///
/// for event in events.try_iter() {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Scheduler {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Creates a scheduler and starts its worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::InvalidConfig`] if `config` fails validation, or
    /// [`VfsxError::Io`] if the worker thread cannot be spawned.
    pub fn new(
        provider: Arc<dyn ArchiveProvider>,
        config: ExtractConfig,
    ) -> Result<(Self, Receiver<SchedulerEvent>)> {
        config.validate()?;
        let (events, receiver) = mpsc::channel();
        let inner = Arc::new(Inner {
            state: Mutex::new(State::default()),
            work: Condvar::new(),
            idle: Condvar::new(),
            events,
            provider,
            config,
        });

        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("vfsx-worker".into())
            .spawn(move || worker_loop(&worker_inner))?;

        Ok((
            Self {
                inner,
                worker: Some(worker),
            },
            receiver,
        ))
    }

    /// Registers a target, deriving its initial state from its manifest.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::DuplicateTarget`] if the root is already
    /// registered.
    pub fn add_target(&self, target: Target) -> Result<TargetState> {
        let key = target.key();
        let mut state = self.inner.lock();
        if state.slot(&key).is_some() {
            return Err(VfsxError::DuplicateTarget { root: target.root });
        }

        let initial = api::evaluate_state(&target);
        tracing::debug!(name = %target.name, state = %initial, "target added");
        self.inner.emit(SchedulerEvent::StateChanged {
            root: target.root.clone(),
            state: initial,
        });
        state.slots.push(Slot {
            target,
            state: initial,
        });
        Ok(initial)
    }

    /// Unregisters an idle target.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::UnknownTarget`] or [`VfsxError::TargetBusy`].
    pub fn remove_target(&self, root: &Path) -> Result<Target> {
        let key = TargetKey::new(root);
        let mut state = self.inner.lock();
        let index = state
            .slots
            .iter()
            .position(|slot| slot.target.key() == key)
            .ok_or_else(|| unknown(root))?;
        if state.slots[index].state.is_busy() {
            return Err(VfsxError::TargetBusy {
                root: root.to_path_buf(),
            });
        }
        Ok(state.slots.remove(index).target)
    }

    /// Registered targets in registration order.
    #[must_use]
    pub fn targets(&self) -> Vec<TargetStatus> {
        self.inner
            .lock()
            .slots
            .iter()
            .map(|slot| TargetStatus {
                target: slot.target.clone(),
                state: slot.state,
            })
            .collect()
    }

    /// Current state of one target.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::UnknownTarget`].
    pub fn status(&self, root: &Path) -> Result<TargetState> {
        self.inner
            .lock()
            .slot(&TargetKey::new(root))
            .map(|slot| slot.state)
            .ok_or_else(|| unknown(root))
    }

    /// Queues an extraction.
    ///
    /// A target holding an incomplete extraction is cleaned up by the worker
    /// before extracting afresh.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::UnknownTarget`], [`VfsxError::TargetBusy`],
    /// [`VfsxError::AlreadyExtracted`] or [`VfsxError::SchedulerShutDown`].
    pub fn enqueue_extract(&self, root: &Path) -> Result<()> {
        self.enqueue(root, JobKind::Extract)
    }

    /// Queues an undo.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::UnknownTarget`], [`VfsxError::TargetBusy`],
    /// [`VfsxError::NothingToUndo`] or [`VfsxError::SchedulerShutDown`].
    pub fn enqueue_undo(&self, root: &Path) -> Result<()> {
        self.enqueue(root, JobKind::Undo)
    }

    /// Queues an extraction for every eligible target and returns their
    /// roots. Busy and already extracted targets are skipped, and nothing is
    /// queued after shutdown.
    pub fn extract_all(&self) -> Vec<PathBuf> {
        self.enqueue_all(JobKind::Extract)
    }

    /// Queues an undo for every eligible target and returns their roots.
    /// Busy targets and targets with nothing to undo are skipped, and nothing
    /// is queued after shutdown.
    pub fn undo_all(&self) -> Vec<PathBuf> {
        self.enqueue_all(JobKind::Undo)
    }

    /// Cancels the target's queued or running operation.
    ///
    /// A queued job is dropped without ever starting and the target's state
    /// is re-read from disk. A running job is signalled and stops at its next
    /// cancellation point. Returns `false` if the target was idle.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::UnknownTarget`].
    pub fn cancel(&self, root: &Path) -> Result<bool> {
        let key = TargetKey::new(root);
        let mut state = self.inner.lock();
        if state.slot(&key).is_none() {
            return Err(unknown(root));
        }

        if let Some(running) = state.running.as_ref().filter(|r| r.key == key) {
            running.token.cancel();
            tracing::info!(root = %root.display(), "cancellation requested");
            return Ok(true);
        }

        let before = state.queue.len();
        state.queue.retain(|job| job.key != key);
        if state.queue.len() == before {
            return Ok(false);
        }
        self.restore_from_disk(&mut state, &key);
        if state.is_idle() {
            self.inner.idle.notify_all();
        }
        Ok(true)
    }

    /// Cancels the running operation and drops every queued one, restoring
    /// the dropped targets' states from disk.
    pub fn cancel_all(&self) {
        let mut state = self.inner.lock();
        self.drain(&mut state);
    }

    /// Blocks until the queue is empty and nothing is running.
    pub fn wait_idle(&self) {
        let mut state = self.inner.lock();
        while !state.is_idle() {
            state = self
                .inner
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Cancels all work, stops the worker and waits for it to exit.
    ///
    /// Called automatically on drop.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.inner.lock();
            state.shutdown = true;
            self.drain(&mut state);
        }
        self.inner.work.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("scheduler worker panicked");
            }
        }
    }

    fn enqueue(&self, root: &Path, kind: JobKind) -> Result<()> {
        let key = TargetKey::new(root);
        let mut state = self.inner.lock();
        if state.shutdown {
            return Err(VfsxError::SchedulerShutDown);
        }
        let slot = state.slot_mut(&key).ok_or_else(|| unknown(root))?;
        check_eligible(slot, kind)?;

        self.inner.set_state(slot, TargetState::Queued);
        state.queue.push_back(Job {
            key,
            kind,
            token: CancellationToken::new(),
        });
        drop(state);
        self.inner.work.notify_one();
        Ok(())
    }

    fn enqueue_all(&self, kind: JobKind) -> Vec<PathBuf> {
        let mut state = self.inner.lock();
        if state.shutdown {
            tracing::warn!(kind = ?kind, "scheduler is shut down, nothing queued");
            return Vec::new();
        }
        let mut jobs = Vec::new();
        let mut roots = Vec::new();
        for slot in &mut state.slots {
            if check_eligible(slot, kind).is_err() {
                continue;
            }
            self.inner.set_state(slot, TargetState::Queued);
            roots.push(slot.target.root.clone());
            jobs.push(Job {
                key: slot.target.key(),
                kind,
                token: CancellationToken::new(),
            });
        }
        state.queue.extend(jobs);
        drop(state);

        if !roots.is_empty() {
            self.inner.work.notify_one();
        }
        roots
    }

    fn drain(&self, state: &mut State) {
        if let Some(running) = &state.running {
            running.token.cancel();
        }
        let dropped: Vec<TargetKey> = state.queue.drain(..).map(|job| job.key).collect();
        if !dropped.is_empty() {
            tracing::info!(count = dropped.len(), "queued operations dropped");
        }
        for key in &dropped {
            self.restore_from_disk(state, key);
        }
        if state.is_idle() {
            self.inner.idle.notify_all();
        }
    }

    fn restore_from_disk(&self, state: &mut State, key: &TargetKey) {
        if let Some(slot) = state.slot_mut(key) {
            let restored = api::evaluate_state(&slot.target);
            self.inner.set_state(slot, restored);
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn unknown(root: &Path) -> VfsxError {
    VfsxError::UnknownTarget {
        root: root.to_path_buf(),
    }
}

/// Checks whether `slot` may take a job of `kind`.
///
/// `Cancelled` and `Error` say how the last run ended, not what is on disk,
/// so those targets are judged by their manifest.
fn check_eligible(slot: &Slot, kind: JobKind) -> Result<()> {
    let root = || slot.target.root.clone();
    if slot.state.is_busy() {
        return Err(VfsxError::TargetBusy { root: root() });
    }
    let current = match slot.state {
        TargetState::Cancelled | TargetState::Error => api::evaluate_state(&slot.target),
        state => state,
    };
    match (kind, current) {
        (JobKind::Extract, TargetState::Extracted) => Err(VfsxError::AlreadyExtracted { root: root() }),
        (JobKind::Undo, TargetState::Ready) => Err(VfsxError::NothingToUndo { root: root() }),
        _ => Ok(()),
    }
}

fn worker_loop(inner: &Inner) {
    loop {
        let (job, target) = {
            let mut state = inner.lock();
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(job) = state.queue.pop_front() {
                    if let Some(slot) = state.slot_mut(&job.key) {
                        let target = slot.target.clone();
                        inner.set_state(slot, TargetState::Running);
                        state.running = Some(Running {
                            key: job.key.clone(),
                            token: job.token.clone(),
                        });
                        break (job, target);
                    }
                    continue;
                }
                state = inner.work.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
        };

        // The slot must leave Running even if the engine panics.
        let result = panic::catch_unwind(AssertUnwindSafe(|| run_job(inner, &target, &job)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(name = %target.name, kind = ?job.kind, %message, "operation panicked");
                JobResult::Failed(Arc::new(VfsxError::OperationPanicked {
                    root: target.root.clone(),
                    message,
                }))
            });

        let mut state = inner.lock();
        state.running = None;
        let next = match &result {
            JobResult::Extracted(_) => TargetState::Extracted,
            JobResult::Undone(_) => TargetState::Ready,
            JobResult::Cancelled => TargetState::Cancelled,
            JobResult::Failed(_) => TargetState::Error,
        };
        if let Some(slot) = state.slot_mut(&job.key) {
            inner.set_state(slot, next);
        }
        inner.emit(SchedulerEvent::Finished {
            root: target.root.clone(),
            kind: job.kind,
            result,
        });
        if state.is_idle() {
            inner.idle.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn run_job(inner: &Inner, target: &Target, job: &Job) -> JobResult {
    let interval = inner.config.scan.progress_interval;
    let mut progress = EventSink::new(inner.events.clone(), &target.root, interval);
    let mut log = EventSink::new(inner.events.clone(), &target.root, interval);

    let outcome = match job.kind {
        JobKind::Extract => api::extract_target(
            inner.provider.as_ref(),
            target,
            &inner.config,
            &mut progress,
            &mut log,
            &job.token,
        )
        .map(|outcome| match outcome {
            Outcome::Completed(done) => JobResult::Extracted(done.report),
            Outcome::Cancelled => JobResult::Cancelled,
        }),
        JobKind::Undo => api::undo_target(target, &inner.config, &mut progress, &mut log, &job.token)
            .map(|outcome| match outcome {
                Outcome::Completed(report) => JobResult::Undone(report),
                Outcome::Cancelled => JobResult::Cancelled,
            }),
    };

    outcome.unwrap_or_else(|e| {
        tracing::error!(name = %target.name, kind = ?job.kind, error = %e, "operation failed");
        log.log(LogLevel::Warning, &e.to_string());
        JobResult::Failed(Arc::new(e))
    })
}

/// Forwards engine callbacks to the event channel.
///
/// Transfer and delete loops report every entry, so progress is forwarded
/// only on a phase change, once per `interval`, and for the snapshot that
/// completes a known total.
struct EventSink {
    events: Sender<SchedulerEvent>,
    root: PathBuf,
    interval: Duration,
    last_progress: Option<(Phase, Instant)>,
}

impl EventSink {
    fn new(events: Sender<SchedulerEvent>, root: &Path, interval: Duration) -> Self {
        Self {
            events,
            root: root.to_path_buf(),
            interval,
            last_progress: None,
        }
    }

    fn progress_due(&self, snapshot: &ProgressSnapshot, now: Instant) -> bool {
        let complete = snapshot.total_files > 0 && snapshot.files_processed >= snapshot.total_files;
        match self.last_progress {
            None => true,
            Some((phase, at)) => {
                phase != snapshot.phase || complete || now.duration_since(at) >= self.interval
            }
        }
    }
}

impl ProgressCallback for EventSink {
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) {
        let now = Instant::now();
        if !self.progress_due(snapshot, now) {
            return;
        }
        self.last_progress = Some((snapshot.phase, now));
        let _ = self.events.send(SchedulerEvent::Progress {
            root: self.root.clone(),
            snapshot: snapshot.clone(),
        });
    }

    fn on_indexed(&mut self, elapsed: Duration) {
        let _ = self.events.send(SchedulerEvent::Indexed {
            root: self.root.clone(),
            elapsed,
        });
    }
}

impl LogSink for EventSink {
    fn log(&mut self, level: LogLevel, message: &str) {
        let _ = self.events.send(SchedulerEvent::Log {
            root: self.root.clone(),
            level,
            message: message.to_string(),
        });
    }
}

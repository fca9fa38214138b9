//! Cancellable scheduled wakeups.
//!
//! A scheduler never calls back into its owner. Each due task is reported as
//! its [`TaskId`]; the owner routes the id to whichever component scheduled it
//! and ignores ids it no longer holds. Cancelling therefore works by identity:
//! a wakeup from a cancelled task that was already queued is simply dropped by
//! the owner, and a newer task of the same kind is never affected.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::debug;

/// Identity of one scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Schedules periodic and one-shot wakeups.
pub trait Scheduler {
    /// Wakes every `period`, starting one period from now.
    fn schedule_repeating(&self, period: Duration) -> TaskId;

    /// Wakes once after `delay`.
    fn schedule_once(&self, delay: Duration) -> TaskId;

    /// Cancels exactly the task with this id. Unknown ids are ignored.
    fn cancel(&self, id: TaskId);
}

#[derive(Debug, Default)]
struct IdSource(AtomicU64);

impl IdSource {
    fn next(&self) -> TaskId {
        TaskId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ============================================================================
// TokioScheduler
// ============================================================================

/// Scheduler backed by tokio timers.
///
/// Wakeups are delivered on the receiver returned by [`TokioScheduler::new`].
/// Must be used from within a tokio runtime.
pub struct TokioScheduler {
    ids: IdSource,
    wakeup_tx: mpsc::UnboundedSender<TaskId>,
    tasks: Mutex<HashMap<TaskId, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskId>) {
        let (wakeup_tx, wakeup_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            ids: IdSource::default(),
            wakeup_tx,
            tasks: Mutex::new(HashMap::new()),
        };
        (scheduler, wakeup_rx)
    }

    /// Number of tasks not yet finished or cancelled.
    pub fn active_count(&self) -> usize {
        let mut tasks = self.lock_tasks();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.len()
    }

    fn insert(&self, id: TaskId, handle: JoinHandle<()>) {
        let mut tasks = self.lock_tasks();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.insert(id, handle);
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, JoinHandle<()>>> {
        self.tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration) -> TaskId {
        let id = self.ids.next();
        let tx = self.wakeup_tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(id).is_err() {
                    break;
                }
            }
        });
        self.insert(id, handle);
        debug!("Scheduled repeating {} every {:?}", id, period);
        id
    }

    fn schedule_once(&self, delay: Duration) -> TaskId {
        let id = self.ids.next();
        let tx = self.wakeup_tx.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(id);
        });
        self.insert(id, handle);
        debug!("Scheduled {} in {:?}", id, delay);
        id
    }

    fn cancel(&self, id: TaskId) {
        if let Some(handle) = self.lock_tasks().remove(&id) {
            handle.abort();
            debug!("Cancelled {}", id);
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.lock_tasks().drain() {
            handle.abort();
        }
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("tasks", &self.lock_tasks().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ManualScheduler
// ============================================================================

/// A task recorded by [`ManualScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub period: Duration,
    pub repeating: bool,
}

/// Scheduler that only records tasks; tests fire them explicitly.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    ids: IdSource,
    active: Mutex<Vec<ScheduledTask>>,
    cancelled: Mutex<Vec<TaskId>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks scheduled and not cancelled, in scheduling order.
    pub fn active(&self) -> Vec<ScheduledTask> {
        self.active.lock().unwrap().clone()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn is_active(&self, id: TaskId) -> bool {
        self.active.lock().unwrap().iter().any(|t| t.id == id)
    }

    /// Every id passed to `cancel` that was active at the time.
    pub fn cancelled(&self) -> Vec<TaskId> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Marks a one-shot task as fired so it stops counting as active.
    ///
    /// Repeating tasks stay active. Returns false if the id is not active.
    pub fn fire(&self, id: TaskId) -> bool {
        let mut active = self.active.lock().unwrap();
        let Some(pos) = active.iter().position(|t| t.id == id) else {
            return false;
        };
        if !active[pos].repeating {
            active.remove(pos);
        }
        true
    }

    fn push(&self, period: Duration, repeating: bool) -> TaskId {
        let id = self.ids.next();
        self.active.lock().unwrap().push(ScheduledTask {
            id,
            period,
            repeating,
        });
        id
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration) -> TaskId {
        self.push(period, true)
    }

    fn schedule_once(&self, delay: Duration) -> TaskId {
        self.push(delay, false)
    }

    fn cancel(&self, id: TaskId) {
        let mut active = self.active.lock().unwrap();
        if let Some(pos) = active.iter().position(|t| t.id == id) {
            active.remove(pos);
            self.cancelled.lock().unwrap().push(id);
        }
    }
}

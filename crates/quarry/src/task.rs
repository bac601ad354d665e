//! Tracked background tasks.
//!
//! Every async request made through the asset loader gets a [`TaskId`] and a
//! record holding the executor task handle plus a completion latch that
//! callers can poll or wait on.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_executor::Task;
use parking_lot::{Condvar, Mutex};
use quarry_assets::ResourceType;
use quarry_core::alloc::HashMap;

/// Identifier of a loader task. `0` is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Returned when a request was refused before any task was created.
    pub const INVALID: TaskId = TaskId(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Running,
    Done,
}

/// Completion latch shared between a task body and its record.
#[derive(Debug)]
pub(crate) struct TaskSignal {
    phase: Mutex<Phase>,
    done: Condvar,
    cancelled: AtomicBool,
}

impl TaskSignal {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            phase: Mutex::new(Phase::Pending),
            done: Condvar::new(),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Move to `Running`. Returns `false` (and completes) if already cancelled.
    pub(crate) fn begin(&self) -> bool {
        let mut phase = self.phase.lock();
        if self.is_cancelled() {
            *phase = Phase::Done;
            self.done.notify_all();
            return false;
        }
        *phase = Phase::Running;
        true
    }

    pub(crate) fn finish(&self) {
        *self.phase.lock() = Phase::Done;
        self.done.notify_all();
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn is_done(&self) -> bool {
        *self.phase.lock() == Phase::Done
    }

    pub(crate) fn is_running(&self) -> bool {
        *self.phase.lock() == Phase::Running
    }

    /// Block until done or `timeout` elapses. Returns whether it is done.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut phase = self.phase.lock();
        while *phase != Phase::Done {
            if self.done.wait_until(&mut phase, deadline).timed_out() {
                return *phase == Phase::Done;
            }
        }
        true
    }
}

/// What a task is loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Single {
        path: String,
        resource_type: ResourceType,
    },
    Batch {
        count: usize,
    },
    Manifest {
        path: String,
    },
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Single {
                path,
                resource_type,
            } => write!(f, "{} '{}'", resource_type, path),
            TaskKind::Batch { count } => write!(f, "batch of {}", count),
            TaskKind::Manifest { path } => write!(f, "manifest '{}'", path),
        }
    }
}

/// Snapshot of a tracked task.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    pub kind: TaskKind,
    pub completed: bool,
    pub elapsed: Duration,
}

pub(crate) struct TaskRecord {
    kind: TaskKind,
    signal: Arc<TaskSignal>,
    /// Dropping the handle would cancel the task, so it lives here until
    /// the record is reaped or detached.
    handle: Option<Task<()>>,
    started_at: Instant,
}

/// Table of tracked tasks, guarded by one mutex.
pub(crate) struct TaskTable {
    records: Mutex<HashMap<TaskId, TaskRecord>>,
    next_id: AtomicU64,
}

impl TaskTable {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn allocate_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(
        &self,
        id: TaskId,
        kind: TaskKind,
        signal: Arc<TaskSignal>,
        handle: Task<()>,
    ) {
        self.records.lock().insert(
            id,
            TaskRecord {
                kind,
                signal,
                handle: Some(handle),
                started_at: Instant::now(),
            },
        );
    }

    /// Unknown IDs count as completed.
    pub(crate) fn is_completed(&self, id: TaskId) -> bool {
        self.records
            .lock()
            .get(&id)
            .is_none_or(|record| record.signal.is_done())
    }

    pub(crate) fn signal(&self, id: TaskId) -> Option<Arc<TaskSignal>> {
        self.records
            .lock()
            .get(&id)
            .map(|record| Arc::clone(&record.signal))
    }

    /// Remove an in-flight task and detach its handle so it can finish
    /// unobserved. Completed and unknown tasks are left alone.
    pub(crate) fn detach(&self, id: TaskId) -> Option<Arc<TaskSignal>> {
        let mut records = self.records.lock();
        if records.get(&id)?.signal.is_done() {
            return None;
        }
        let mut record = records.remove(&id)?;
        drop(records);

        record.signal.cancel();
        if let Some(handle) = record.handle.take() {
            handle.detach();
        }
        Some(record.signal)
    }

    /// Remove every record, cancelling and detaching in-flight tasks.
    pub(crate) fn detach_all(&self) -> Vec<(TaskId, Arc<TaskSignal>)> {
        let drained: Vec<_> = self.records.lock().drain().collect();
        drained
            .into_iter()
            .map(|(id, mut record)| {
                record.signal.cancel();
                if let Some(handle) = record.handle.take() {
                    handle.detach();
                }
                (id, record.signal)
            })
            .collect()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.records
            .lock()
            .values()
            .filter(|record| !record.signal.is_done())
            .count()
    }

    /// Drop the records of completed tasks. Returns how many were removed.
    pub(crate) fn reap_completed(&self) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| !record.signal.is_done());
        before - records.len()
    }

    pub(crate) fn info(&self, id: TaskId) -> Option<TaskInfo> {
        self.records.lock().get(&id).map(|record| TaskInfo {
            id,
            kind: record.kind.clone(),
            completed: record.signal.is_done(),
            elapsed: record.started_at.elapsed(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId(3).to_string(), "task#3");
        assert!(!TaskId::INVALID.is_valid());
    }

    #[test]
    fn test_signal_lifecycle() {
        let signal = TaskSignal::new();
        assert!(!signal.is_done());
        assert!(!signal.wait(Duration::from_millis(5)));

        assert!(signal.begin());
        assert!(signal.is_running());
        signal.finish();
        assert!(signal.is_done());
        assert!(signal.wait(Duration::ZERO));
    }

    #[test]
    fn test_cancelled_signal_never_runs() {
        let signal = TaskSignal::new();
        signal.cancel();
        assert!(!signal.begin());
        assert!(signal.is_done());
    }

    #[test]
    fn test_wait_wakes_on_finish() {
        let signal = TaskSignal::new();
        let worker = Arc::clone(&signal);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            worker.finish();
        });
        assert!(signal.wait(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_ids_are_monotonic() {
        let table = TaskTable::new();
        let a = table.allocate_id();
        let b = table.allocate_id();
        assert!(a.is_valid());
        assert!(b > a);
        assert!(table.is_completed(TaskId(999)));
    }
}

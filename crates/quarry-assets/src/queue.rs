//! Priority queue of pending worker-pool loads.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::resource::{LoadCallback, Resource};
use crate::types::LoadPriority;

/// A load waiting for a worker.
pub(crate) struct QueuedLoad {
    pub priority: LoadPriority,
    pub sequence: u64,
    pub resource: Arc<Resource>,
    /// Whether the resource was inserted into the cache when queued.
    pub cached: bool,
    pub callback: Option<LoadCallback>,
}

impl PartialEq for QueuedLoad {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedLoad {}

impl PartialOrd for QueuedLoad {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedLoad {
    // Max-heap: higher priority first, then lower sequence (FIFO).
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Queue state guarded by the manager's queue mutex.
#[derive(Default)]
pub(crate) struct LoadQueue {
    heap: BinaryHeap<QueuedLoad>,
    next_sequence: u64,
    /// Set by shutdown; workers exit and new loads are refused.
    pub stopping: bool,
}

impl LoadQueue {
    pub fn push(
        &mut self,
        resource: Arc<Resource>,
        priority: LoadPriority,
        cached: bool,
        callback: Option<LoadCallback>,
    ) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(QueuedLoad {
            priority,
            sequence,
            resource,
            cached,
            callback,
        });
    }

    pub fn pop(&mut self) -> Option<QueuedLoad> {
        self.heap.pop()
    }

    /// Remove every pending load, in dequeue order.
    pub fn drain(&mut self) -> Vec<QueuedLoad> {
        let mut drained = Vec::with_capacity(self.heap.len());
        while let Some(task) = self.heap.pop() {
            drained.push(task);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

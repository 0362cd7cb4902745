//! Change ordering
//!
//! Permission files first, so later transfers run under current access rules;
//! then smallest first; then path order for determinism.

use crate::change::ChangeRecord;
use crate::types::RelativePath;
use parking_lot::Mutex;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Coarse priority class. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityClass {
    Permission = 0,
    File = 1,
}

/// Full sort key for a change. Smaller keys are processed first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChangePriority {
    pub class: PriorityClass,
    pub size: u64,
    pub path: RelativePath,
}

impl ChangePriority {
    pub fn of(change: &ChangeRecord) -> Self {
        ChangePriority {
            class: if change.is_permission_file {
                PriorityClass::Permission
            } else {
                PriorityClass::File
            },
            size: change.file_size.max(1),
            path: change.path.clone(),
        }
    }
}

/// Return `changes` in processing order. Stable; the input is untouched.
pub fn prioritize(changes: &[ChangeRecord]) -> Vec<ChangeRecord> {
    let mut ordered = changes.to_vec();
    ordered.sort_by_cached_key(ChangePriority::of);
    ordered
}

struct QueueItem {
    priority: ChangePriority,
    seq: u64,
    record: ChangeRecord,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    /// Same priority: earlier insertion first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct QueueInner {
    heap: BinaryHeap<Reverse<QueueItem>>,
    /// Latest sequence number per path; heap entries with an older one are stale.
    latest: HashMap<RelativePath, u64>,
    next_seq: u64,
}

/// Thread-safe priority queue of pending changes.
///
/// Pushing a change for a path that is already queued replaces the queued one.
#[derive(Default)]
pub struct SyncQueue {
    inner: Mutex<QueueInner>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: ChangeRecord) {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.latest.insert(record.path.clone(), seq);
        inner.heap.push(Reverse(QueueItem {
            priority: ChangePriority::of(&record),
            seq,
            record,
        }));
    }

    pub fn extend(&self, records: impl IntoIterator<Item = ChangeRecord>) {
        for record in records {
            self.push(record);
        }
    }

    /// Highest-priority change, if any.
    pub fn pop(&self) -> Option<ChangeRecord> {
        let mut inner = self.inner.lock();
        while let Some(Reverse(item)) = inner.heap.pop() {
            if inner.latest.get(&item.record.path) == Some(&item.seq) {
                inner.latest.remove(&item.record.path);
                return Some(item.record);
            }
        }
        None
    }

    /// Pop everything in priority order.
    pub fn drain(&self) -> Vec<ChangeRecord> {
        std::iter::from_fn(|| self.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

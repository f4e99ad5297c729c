//! Output data models populated by the event handlers

use crate::time::Timestamp;
use crate::types::{SizeDelta, ThreadId};
use derive_more::Display;
use std::collections::BTreeMap;

/// One normalized memory usage record: a signed allocation-size change
/// attributed to a thread at a point in time. Immutable once appended.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display(fmt = "[{timestamp}]:{thread_id}:{size_delta}")]
pub struct MemoryRecord {
    pub timestamp: Timestamp,
    pub thread_id: ThreadId,
    pub size_delta: SizeDelta,
}

/// Append-only, insertion-ordered ledger of memory usage records.
///
/// Record order reflects processing order, which follows the delivery order
/// of the source stream, not necessarily global timestamp order. Created
/// empty at the start of a processing session and read-only once the session
/// completes.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct MemoryUsageModel {
    records: Vec<MemoryRecord>,
}

impl MemoryUsageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. O(1) amortized, never fails, preserves call order.
    pub fn append(&mut self, timestamp: Timestamp, thread_id: ThreadId, size_delta: SizeDelta) {
        self.records.push(MemoryRecord {
            timestamp,
            thread_id,
            size_delta,
        });
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Net tracked allocation change over the whole ledger
    pub fn net_change(&self) -> SizeDelta {
        self.records.iter().map(|r| r.size_delta).sum()
    }

    /// Net tracked allocation change per thread, in thread-id order
    pub fn net_change_by_thread(&self) -> BTreeMap<ThreadId, SizeDelta> {
        let mut per_thread: BTreeMap<ThreadId, SizeDelta> = BTreeMap::new();
        for r in &self.records {
            *per_thread.entry(r.thread_id).or_insert(SizeDelta::ZERO) += r.size_delta;
        }
        per_thread
    }
}

impl<'a> IntoIterator for &'a MemoryUsageModel {
    type Item = &'a MemoryRecord;
    type IntoIter = std::slice::Iter<'a, MemoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rec(model: &mut MemoryUsageModel, ts: u64, tid: u32, delta: i64) {
        model.append(ts.into(), tid.into(), delta.into());
    }

    #[test]
    fn append_preserves_call_order() {
        let mut model = MemoryUsageModel::new();
        // Deliberately non-monotonic timestamps; stream order wins
        rec(&mut model, 30, 1, 100);
        rec(&mut model, 10, 1, -100);
        rec(&mut model, 20, 2, 7);
        let timestamps: Vec<u64> = model.iter().map(|r| r.timestamp.nanos()).collect();
        assert_eq!(timestamps, vec![30, 10, 20]);
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn net_change_sums_the_ledger() {
        let mut model = MemoryUsageModel::new();
        rec(&mut model, 1, 1, 50);
        rec(&mut model, 2, 2, 30);
        rec(&mut model, 3, 1, -50);
        assert_eq!(model.net_change().get_raw(), 30);

        let per_thread = model.net_change_by_thread();
        assert_eq!(per_thread[&ThreadId::from(1)].get_raw(), 0);
        assert_eq!(per_thread[&ThreadId::from(2)].get_raw(), 30);
    }

    #[test]
    fn empty_model() {
        let model = MemoryUsageModel::new();
        assert!(model.is_empty());
        assert_eq!(model.net_change(), SizeDelta::ZERO);
        assert!(model.net_change_by_thread().is_empty());
    }
}

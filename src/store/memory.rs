//! In-memory store.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::CoordResult;
use crate::store::{HealthSnapshot, HealthStore, RecordId, RequestRecord};

/// A thread-safe, process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: DashMap<Uuid, HealthSnapshot>,
    latest: RwLock<Option<Uuid>>,
    /// Records keyed by id, tagged with an insertion sequence.
    records: DashMap<RecordId, (u64, RequestRecord)>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, oldest first.
    pub fn records(&self) -> Vec<RequestRecord> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|(seq, _)| *seq);
        records.into_iter().map(|(_, record)| record).collect()
    }

    fn insert_record(&self, record: RequestRecord) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.records.insert(record.id, (seq, record));
    }

    /// All snapshots plus the id of the current one.
    pub(crate) fn dump(&self) -> (Vec<HealthSnapshot>, Option<Uuid>) {
        let snapshots = self.snapshots.iter().map(|r| r.value().clone()).collect();
        (snapshots, *self.latest.read())
    }

    /// Restore previously dumped state.
    pub(crate) fn restore(
        &self,
        snapshots: Vec<HealthSnapshot>,
        latest: Option<Uuid>,
        records: Vec<RequestRecord>,
    ) {
        for snapshot in snapshots {
            self.snapshots.insert(snapshot.id, snapshot);
        }
        for record in records {
            self.insert_record(record);
        }
        *self.latest.write() = latest;
    }
}

impl HealthStore for MemoryStore {
    fn load_latest_health(&self) -> CoordResult<Option<HealthSnapshot>> {
        let latest = *self.latest.read();
        Ok(latest.and_then(|id| self.snapshots.get(&id).map(|r| r.value().clone())))
    }

    fn save_health(&self, snapshot: &HealthSnapshot) -> CoordResult<()> {
        let created = self.snapshots.insert(snapshot.id, snapshot.clone()).is_none();
        if created {
            *self.latest.write() = Some(snapshot.id);
        }
        Ok(())
    }

    fn save_record(&self, record: &RequestRecord) -> CoordResult<()> {
        self.insert_record(record.clone());
        Ok(())
    }

    fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HealthFlag;

    #[test]
    fn test_latest_is_most_recently_created() {
        let store = MemoryStore::new();
        assert!(store.load_latest_health().unwrap().is_none());

        let first = HealthSnapshot::new();
        store.save_health(&first).unwrap();
        let second = HealthSnapshot::new();
        store.save_health(&second).unwrap();

        // Updating an older snapshot does not make it current again.
        let mut first_updated = first.clone();
        first_updated.flag = Some(HealthFlag::Crashed);
        store.save_health(&first_updated).unwrap();

        assert_eq!(store.load_latest_health().unwrap().unwrap().id, second.id);
    }

    #[test]
    fn test_records_are_kept_in_creation_order() {
        let store = MemoryStore::new();
        let snapshot = HealthSnapshot::new();
        store.save_record(&RequestRecord::new("a", snapshot.id)).unwrap();
        store.save_record(&RequestRecord::new("b", snapshot.id)).unwrap();

        let payloads: Vec<_> = store.records().into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, vec!["a", "b"]);
        assert_eq!(store.record_count(), 2);
    }
}

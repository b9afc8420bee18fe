//! A simple, volatile, in-memory implementation of [`KVStore`] with repeatable-read transactions.

use std::{
    collections::{HashMap, HashSet},
    mem,
    sync::{Arc, Mutex},
};

use persistent_grades::storage::pluggables::{KVGet, KVStore, KVTransaction, KVWriteError};

/// An in-memory implementation of [`KVStore`].
///
/// Every committed value is kept with the version of the commit that wrote it, so that a transaction
/// can keep reading the state as of the moment it began.
#[derive(Clone)]
pub(crate) struct MemDB(Arc<Mutex<MemDBState>>);

pub(crate) struct MemDBState {
    /// Latest commit version.
    version: u64,
    /// Committed values of each key, oldest first.
    committed: HashMap<Vec<u8>, Vec<(u64, Vec<u8>)>>,
    /// Keys inserted by transactions that have not committed or rolled back yet.
    reserved: HashSet<Vec<u8>>,
    sequences: HashMap<Vec<u8>, u64>,
}

impl MemDB {
    /// Create a new, empty `MemDB`.
    pub(crate) fn new() -> MemDB {
        MemDB(Arc::new(Mutex::new(MemDBState {
            version: 0,
            committed: HashMap::new(),
            reserved: HashSet::new(),
            sequences: HashMap::new(),
        })))
    }

    /// Count the committed keys that start with `prefix`.
    pub(crate) fn count_keys(&self, prefix: &[u8]) -> usize {
        self.0
            .lock()
            .unwrap()
            .committed
            .keys()
            .filter(|key| key.starts_with(prefix))
            .count()
    }
}

impl KVStore for MemDB {
    type Transaction<'a> = MemTransaction<'a>;

    fn begin(&self) -> MemTransaction<'_> {
        MemTransaction {
            db: self,
            snapshot: self.0.lock().unwrap().version,
            writes: HashMap::new(),
            reservations: HashSet::new(),
        }
    }
}

/// A transaction on a [`MemDB`]. Rolled back on drop unless committed.
pub(crate) struct MemTransaction<'a> {
    db: &'a MemDB,
    snapshot: u64,
    writes: HashMap<Vec<u8>, Vec<u8>>,
    reservations: HashSet<Vec<u8>>,
}

impl KVGet for MemTransaction<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(value) = self.writes.get(key) {
            return Some(value.clone());
        }

        let state = self.db.0.lock().unwrap();
        state.committed.get(key).and_then(|versions| {
            versions
                .iter()
                .rev()
                .find(|(version, _)| *version <= self.snapshot)
                .map(|(_, value)| value.clone())
        })
    }
}

impl KVTransaction for MemTransaction<'_> {
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVWriteError> {
        if self.writes.contains_key(key) {
            return Err(KVWriteError::KeyExists);
        }

        let mut state = self.db.0.lock().unwrap();
        if state.committed.contains_key(key) || state.reserved.contains(key) {
            return Err(KVWriteError::KeyExists);
        }
        state.reserved.insert(key.to_vec());
        drop(state);

        self.reservations.insert(key.to_vec());
        self.writes.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVWriteError> {
        self.writes.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn next_sequence(&mut self, sequence: &[u8]) -> Result<u64, KVWriteError> {
        let mut state = self.db.0.lock().unwrap();
        let next = state.sequences.entry(sequence.to_vec()).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    fn commit(mut self) -> Result<(), KVWriteError> {
        let mut state = self.db.0.lock().unwrap();
        state.version += 1;
        let version = state.version;
        for (key, value) in mem::take(&mut self.writes) {
            state.committed.entry(key).or_default().push((version, value));
        }
        for key in mem::take(&mut self.reservations) {
            state.reserved.remove(&key);
        }
        Ok(())
    }
}

impl Drop for MemTransaction<'_> {
    fn drop(&mut self) {
        if self.reservations.is_empty() {
            return;
        }
        if let Ok(mut state) = self.db.0.lock() {
            for key in self.reservations.drain() {
                state.reserved.remove(&key);
            }
        }
    }
}

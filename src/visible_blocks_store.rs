/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Content-addressed store of [visible blocks](VisibleBlocks).
//!
//! Every distinct set of visible blocks is stored exactly once, under its
//! [content hash](VisibleBlocks::to_content_hash), as its canonical JSON. Entries are append-only:
//! once inserted, an entry is never updated or deleted.
//!
//! ## Concurrent creators
//!
//! Two transactions may try to insert the same set at once. The store's unique inserts make sure only
//! one of them succeeds. The other one sees [`KVWriteError::KeyExists`](crate::storage::pluggables::KVWriteError::KeyExists)
//! and, since an entry with the same hash necessarily has the same content, treats the conflict as
//! success: it returns an entry built from its own input without reading the row back. Reading it
//! back would not work anyway, since under repeatable reads the winner's row is invisible to the loser
//! until the loser's transaction ends.
//!
//! Most code should go through [`VisibleBlocksStore`], which runs each call in its own transaction.
//! The `*_in` functions run inside a transaction owned by the caller.

use std::{
    fmt::{self, Display, Formatter},
    sync::mpsc::Sender,
    time::SystemTime,
};

use typed_builder::TypedBuilder;

use crate::{
    config::Configuration,
    error::GradesError,
    events::{Event, InsertVisibleBlocksEvent, VisibleBlocksConflictEvent},
    storage::{
        pluggables::{KVGet, KVStore, KVTransaction, Key},
        transaction::{GradesTransaction, KVSetError},
    },
    types::{
        block_record::BlockRecordError,
        visible_blocks::{BlocksHash, VisibleBlocks},
    },
};

/// A stored set of visible blocks: its content hash, and its canonical JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleBlocksEntry {
    hash: BlocksHash,
    blocks_json: String,
}

impl VisibleBlocksEntry {
    pub(crate) fn new(hash: BlocksHash, blocks_json: String) -> VisibleBlocksEntry {
        VisibleBlocksEntry { hash, blocks_json }
    }

    pub fn hash(&self) -> &BlocksHash {
        &self.hash
    }

    pub fn blocks_json(&self) -> &str {
        &self.blocks_json
    }

    /// Parse the stored JSON back into the set of visible blocks it encodes.
    ///
    /// Re-encoding the result does not necessarily give back the stored bytes. Entries written by
    /// earlier deployments may spell integral scores without a fractional part (`"max_score":10`),
    /// which the current encoding writes as `10.0`. The stored [`hash`](Self::hash) therefore names
    /// this entry, and must never be recomputed from `blocks()`.
    pub fn blocks(&self) -> Result<VisibleBlocks, BlockRecordError> {
        VisibleBlocks::from_canonical_json(&self.blocks_json)
    }
}

impl Display for VisibleBlocksEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VisibleBlocks - hash:{}, raw json:'{}'",
            self.hash, self.blocks_json
        )
    }
}

/// Outcome of looking up, and if necessary inserting, the entry of a set of visible blocks in a
/// transaction.
#[derive(Clone, Debug)]
pub(crate) enum Resolution {
    /// The entry is visible to the transaction.
    Found(VisibleBlocksEntry),

    /// The entry was not visible to the transaction, so the transaction inserted it.
    Created(VisibleBlocksEntry),

    /// The entry was not visible to the transaction, but its hash was taken by a row committed or being
    /// inserted by another transaction. The entry is built from the input set.
    Conflicted(VisibleBlocksEntry),
}

impl Resolution {
    pub(crate) fn entry(&self) -> &VisibleBlocksEntry {
        match self {
            Resolution::Found(entry)
            | Resolution::Created(entry)
            | Resolution::Conflicted(entry) => entry,
        }
    }

    pub(crate) fn hash(&self) -> &BlocksHash {
        self.entry().hash()
    }

    pub(crate) fn into_entry(self) -> VisibleBlocksEntry {
        match self {
            Resolution::Found(entry)
            | Resolution::Created(entry)
            | Resolution::Conflicted(entry) => entry,
        }
    }

    /// Get the event that records this resolution, if it changed, or tried to change, the store.
    pub(crate) fn event(&self) -> Option<Event> {
        match self {
            Resolution::Found(_) => None,
            Resolution::Created(entry) => {
                Some(Event::InsertVisibleBlocks(InsertVisibleBlocksEvent {
                    timestamp: SystemTime::now(),
                    hash: entry.hash().clone(),
                }))
            }
            Resolution::Conflicted(entry) => {
                Some(Event::VisibleBlocksConflict(VisibleBlocksConflictEvent {
                    timestamp: SystemTime::now(),
                    hash: entry.hash().clone(),
                }))
            }
        }
    }
}

/// Find the entry of `blocks` in `transaction`, inserting it if it is not visible.
pub(crate) fn resolve_in<T: KVTransaction>(
    transaction: &mut T,
    blocks: &VisibleBlocks,
) -> Result<Resolution, GradesError> {
    let hash = blocks.to_content_hash()?;
    if let Some(entry) = transaction.visible_blocks_entry(hash)? {
        return Ok(Resolution::Found(entry));
    }

    let entry = VisibleBlocksEntry::new(hash.clone(), blocks.to_canonical_json()?.to_string());
    match GradesTransaction::new(transaction).insert_visible_blocks(&entry) {
        Ok(()) => Ok(Resolution::Created(entry)),
        Err(KVSetError::KeyExists { .. }) => Ok(Resolution::Conflicted(entry)),
        Err(err) => Err(err.into()),
    }
}

/// Get the entry of `blocks`, inserting it in `transaction` if it is not already stored.
///
/// A concurrent insert of the same entry is not an error. See the [module-level docs](self).
pub fn get_or_create_in<T: KVTransaction>(
    transaction: &mut T,
    blocks: &VisibleBlocks,
) -> Result<VisibleBlocksEntry, GradesError> {
    resolve_in(transaction, blocks).map(Resolution::into_entry)
}

/// Get the entry with content hash `hash`, failing with [`GradesError::NotFound`] if it is not visible
/// to `transaction`.
pub fn get_in<T: KVGet>(
    transaction: &T,
    hash: &BlocksHash,
) -> Result<VisibleBlocksEntry, GradesError> {
    transaction
        .visible_blocks_entry(hash)?
        .ok_or_else(|| GradesError::NotFound {
            key: Key::VisibleBlocks { hash: hash.clone() },
        })
}

/// Handle on a [`KVStore`] that runs each visible blocks operation in a transaction of its own.
#[derive(Clone, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [VisibleBlocksStore].

    Required:
    - `.kv_store(...)`
    - `.configuration(...)`

    Optional:
    - `.event_publisher(...)`
"))]
pub struct VisibleBlocksStore<K: KVStore> {
    kv_store: K,
    configuration: Configuration,
    #[builder(default, setter(strip_option))]
    event_publisher: Option<Sender<Event>>,
}

impl<K: KVStore> VisibleBlocksStore<K> {
    /// Get the entry of `blocks`, inserting it if it is not already stored.
    pub fn get_or_create(&self, blocks: &VisibleBlocks) -> Result<VisibleBlocksEntry, GradesError> {
        let mut transaction = self.kv_store.begin();
        let resolution = resolve_in(&mut transaction, blocks)?;
        transaction.commit()?;

        if let Some(event) = resolution.event() {
            event.emit(self.configuration.log_events, &self.event_publisher);
        }
        Ok(resolution.into_entry())
    }

    /// Get the entry with content hash `hash`, failing with [`GradesError::NotFound`] if there is none.
    pub fn get(&self, hash: &BlocksHash) -> Result<VisibleBlocksEntry, GradesError> {
        get_in(&self.kv_store.begin(), hash)
    }
}

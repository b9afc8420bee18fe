/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable persistence.
//!
//! Library users provide a transactional key-value store by implementing [`KVStore`],
//! [`KVTransaction`], and [`KVGet`]. The store must provide:
//! 1. **Repeatable reads**: a transaction sees the state committed before it began, plus its own
//!    writes, and nothing committed by other transactions since.
//! 2. **Unique inserts**: [`KVTransaction::insert`] fails with [`KVWriteError::KeyExists`] if the key
//!    exists in the latest committed state (visible to the transaction or not), was written earlier in
//!    the same transaction, or is being inserted by another transaction that has not finished yet.
//! 3. **Atomic commits**: [`KVTransaction::commit`] applies all of a transaction's writes or none of
//!    them. Dropping a transaction without committing it rolls it back.

use std::fmt::{self, Display, Formatter};

use borsh::BorshDeserialize;

use crate::{
    grades::types::PersistentSubsectionGrade,
    types::{
        data_types::{CourseKey, UsageKey, UserId},
        visible_blocks::BlocksHash,
    },
    visible_blocks_store::VisibleBlocksEntry,
};

use super::variables;

pub trait KVStore: Clone + Send + 'static {
    type Transaction<'a>: 'a + KVTransaction
    where
        Self: 'a;

    fn begin(&self) -> Self::Transaction<'_>;
}

pub trait KVTransaction: KVGet {
    /// Write `value` at `key`, failing if `key` is taken. See the [module-level docs](self).
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVWriteError>;

    /// Write `value` at `key`, overwriting any existing value.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVWriteError>;

    /// Allocate the next value of the sequence named `sequence`, starting at 1.
    ///
    /// Allocations are not rolled back when the transaction is.
    fn next_sequence(&mut self, sequence: &[u8]) -> Result<u64, KVWriteError>;

    fn commit(self) -> Result<(), KVWriteError>;
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /* ↓↓↓ Visible Blocks ↓↓↓ */

    fn visible_blocks_entry(
        &self,
        hash: &BlocksHash,
    ) -> Result<Option<VisibleBlocksEntry>, KVGetError> {
        if let Some(bytes) = self.get(&variables::visible_blocks_key(hash)) {
            let blocks_json = String::from_utf8(bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::VisibleBlocks { hash: hash.clone() },
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
                }
            })?;
            Ok(Some(VisibleBlocksEntry::new(hash.clone(), blocks_json)))
        } else {
            Ok(None)
        }
    }

    /* ↓↓↓ Subsection Grades ↓↓↓ */

    fn subsection_grade(
        &self,
        user_id: UserId,
        course_key: &CourseKey,
        usage_key: &UsageKey,
    ) -> Result<Option<PersistentSubsectionGrade>, KVGetError> {
        let to_get_error = |err| KVGetError::DeserializeValueError {
            key: Key::SubsectionGrade {
                user_id,
                usage_key: usage_key.clone(),
            },
            source: err,
        };
        let key =
            variables::subsection_grade_key(user_id, course_key, usage_key).map_err(to_get_error)?;
        if let Some(bytes) = self.get(&key) {
            Ok(Some(
                PersistentSubsectionGrade::deserialize(&mut bytes.as_slice())
                    .map_err(to_get_error)?,
            ))
        } else {
            Ok(None)
        }
    }
}

/// Error when trying to read a value corresponding to a given key from the [key value store][KVStore].
#[derive(Debug)]
pub enum KVGetError {
    /// The value corresponding to a given key cannot be deserialized into its expected type.
    DeserializeValueError { key: Key, source: std::io::Error },
}

impl Display for KVGetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KVGetError::DeserializeValueError { key, source } => {
                write!(f, "Could not deserialize {}: {}", key, source)
            }
        }
    }
}

impl std::error::Error for KVGetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KVGetError::DeserializeValueError { source, .. } => Some(source),
        }
    }
}

/// Error returned by the user-provided [key value store][KVStore] when a write fails.
#[derive(Debug)]
pub enum KVWriteError {
    /// [`KVTransaction::insert`] was called with a key that is taken.
    KeyExists,

    /// The store failed for a reason of its own.
    Backend { reason: String },
}

impl Display for KVWriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KVWriteError::KeyExists => write!(f, "Key already exists"),
            KVWriteError::Backend { reason } => write!(f, "Storage backend failure: {}", reason),
        }
    }
}

impl std::error::Error for KVWriteError {}

/// Logical rows of the key value store, used to report errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    VisibleBlocks {
        hash: BlocksHash,
    },
    SubsectionGrade {
        user_id: UserId,
        usage_key: UsageKey,
    },
    SubsectionGradeIds,
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Key::VisibleBlocks { hash } => write!(f, "Visible Blocks for hash {}", hash),
            Key::SubsectionGrade { user_id, usage_key } => {
                write!(f, "Subsection Grade of user {} for {}", user_id, usage_key)
            }
            Key::SubsectionGradeIds => write!(f, "Subsection Grade Ids"),
        }
    }
}

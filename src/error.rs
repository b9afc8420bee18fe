/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The error type returned by the [visible blocks store](crate::visible_blocks_store) and the
//! [subsection grades service](crate::grades).
//!
//! Every error is propagated to the caller. The only failure this crate absorbs is a unique-key
//! conflict while inserting a visible blocks entry in
//! [`get_or_create`](crate::visible_blocks_store::get_or_create_in), since an entry with the same hash
//! necessarily has the same content.

use std::fmt::{self, Display, Formatter};

use crate::{
    grades::pluggables::CourseLookupError,
    storage::{
        pluggables::{KVGetError, KVWriteError, Key},
        transaction::KVSetError,
    },
    types::{block_record::BlockRecordError, visible_blocks::BlocksHash},
};

#[derive(Debug)]
pub enum GradesError {
    /// A caller-supplied value is malformed: a non-finite score, a blank or oversized key, or a usage
    /// key whose course cannot be determined. Not worth retrying.
    InvalidInput { reason: String },

    /// A row read back from storage could not be decoded. Indicates data corruption.
    MalformedData { reason: String },

    /// No row exists for `key`.
    NotFound { key: Key },

    /// [`create`](crate::grades::SubsectionGrades::create) was called for a user and subsection that
    /// already have a grade.
    DuplicateKey { key: Key },

    /// While updating a grade, the visible blocks entry with `hash` was found to have been inserted by
    /// a concurrent transaction that this transaction cannot see. The grade was not written.
    ///
    /// Retrying the whole operation in a fresh transaction may succeed.
    RaceCondition { hash: BlocksHash },

    /// The store failed to write a row.
    KVSetError(KVSetError),

    /// The store failed to commit a transaction.
    KVWriteError(KVWriteError),
}

impl Display for GradesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GradesError::InvalidInput { reason } => write!(f, "Invalid input: {}", reason),
            GradesError::MalformedData { reason } => write!(f, "Malformed data: {}", reason),
            GradesError::NotFound { key } => write!(f, "{} not found", key),
            GradesError::DuplicateKey { key } => write!(f, "{} already exists", key),
            GradesError::RaceCondition { hash } => write!(
                f,
                "Race condition on Visible Blocks {}: inserted by a concurrent transaction",
                hash
            ),
            GradesError::KVSetError(err) => Display::fmt(err, f),
            GradesError::KVWriteError(err) => Display::fmt(err, f),
        }
    }
}

impl std::error::Error for GradesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GradesError::KVSetError(err) => Some(err),
            GradesError::KVWriteError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BlockRecordError> for GradesError {
    fn from(value: BlockRecordError) -> Self {
        match value {
            BlockRecordError::NonFiniteScore { .. } | BlockRecordError::Serialize { .. } => {
                GradesError::InvalidInput {
                    reason: value.to_string(),
                }
            }
            BlockRecordError::MalformedJson { .. } | BlockRecordError::UnknownHashScheme { .. } => {
                GradesError::MalformedData {
                    reason: value.to_string(),
                }
            }
        }
    }
}

impl From<KVGetError> for GradesError {
    fn from(value: KVGetError) -> Self {
        GradesError::MalformedData {
            reason: value.to_string(),
        }
    }
}

impl From<KVSetError> for GradesError {
    fn from(value: KVSetError) -> Self {
        match value {
            KVSetError::KeyExists { key } => GradesError::DuplicateKey { key },
            other => GradesError::KVSetError(other),
        }
    }
}

impl From<KVWriteError> for GradesError {
    fn from(value: KVWriteError) -> Self {
        GradesError::KVWriteError(value)
    }
}

impl From<CourseLookupError> for GradesError {
    fn from(value: CourseLookupError) -> Self {
        GradesError::InvalidInput {
            reason: value.to_string(),
        }
    }
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Typed read-and-write handle over a [`KVTransaction`].
//!
//! Code in this crate never forms keys or serializes rows itself. It wraps a transaction in a
//! [`GradesTransaction`], which puts each row at the right [key](super::variables) and reports
//! failures against the logical [`Key`] that was being written.

use std::fmt::{self, Display, Formatter};

use borsh::BorshSerialize;

use crate::{
    grades::types::PersistentSubsectionGrade, types::data_types::RowId,
    visible_blocks_store::VisibleBlocksEntry,
};

use super::{
    pluggables::{KVGet, KVTransaction, KVWriteError, Key},
    variables,
};

/// Borrowed, typed view of a transaction. Committing remains the responsibility of the transaction's
/// owner.
pub struct GradesTransaction<'t, T: KVTransaction>(&'t mut T);

impl<'t, T: KVTransaction> GradesTransaction<'t, T> {
    pub fn new(transaction: &'t mut T) -> Self {
        GradesTransaction(transaction)
    }

    /* ↓↓↓ Visible Blocks ↓↓↓ */

    /// Insert `entry`, failing with [`KVSetError::KeyExists`] if an entry with the same hash exists,
    /// whether or not this transaction can see it.
    pub fn insert_visible_blocks(&mut self, entry: &VisibleBlocksEntry) -> Result<(), KVSetError> {
        let key = Key::VisibleBlocks {
            hash: entry.hash().clone(),
        };
        self.0
            .insert(
                &variables::visible_blocks_key(entry.hash()),
                entry.blocks_json().as_bytes(),
            )
            .map_err(|err| KVSetError::from_write(key, err))
    }

    /* ↓↓↓ Subsection Grades ↓↓↓ */

    /// Insert `grade`, failing with [`KVSetError::KeyExists`] if a grade for the same user and
    /// subsection exists.
    pub fn insert_subsection_grade(
        &mut self,
        grade: &PersistentSubsectionGrade,
    ) -> Result<(), KVSetError> {
        let (key, value) = Self::subsection_grade_row(grade)?;
        self.0
            .insert(&key, &value)
            .map_err(|err| KVSetError::from_write(grade.key(), err))
    }

    /// Overwrite the stored grade for `grade`'s user and subsection.
    pub fn put_subsection_grade(
        &mut self,
        grade: &PersistentSubsectionGrade,
    ) -> Result<(), KVSetError> {
        let (key, value) = Self::subsection_grade_row(grade)?;
        self.0
            .put(&key, &value)
            .map_err(|err| KVSetError::from_write(grade.key(), err))
    }

    pub fn next_subsection_grade_id(&mut self) -> Result<RowId, KVSetError> {
        self.0
            .next_sequence(&variables::SUBSECTION_GRADE_IDS)
            .map(RowId::new)
            .map_err(|err| KVSetError::from_write(Key::SubsectionGradeIds, err))
    }

    fn subsection_grade_row(
        grade: &PersistentSubsectionGrade,
    ) -> Result<(Vec<u8>, Vec<u8>), KVSetError> {
        let to_set_error = |err| KVSetError::SerializeValueError {
            key: grade.key(),
            source: err,
        };
        let key =
            variables::subsection_grade_key(grade.user_id, &grade.course_key, &grade.usage_key)
                .map_err(to_set_error)?;
        let value = grade.try_to_vec().map_err(to_set_error)?;
        Ok((key, value))
    }
}

impl<T: KVTransaction> KVGet for GradesTransaction<'_, T> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.get(key)
    }
}

/// Error when trying to write a row into the key value store.
#[derive(Debug)]
pub enum KVSetError {
    /// The row could not be serialized.
    SerializeValueError { key: Key, source: std::io::Error },

    /// A unique insert found its key taken.
    KeyExists { key: Key },

    /// The store failed to write the row.
    WriteFailed { key: Key, reason: String },
}

impl KVSetError {
    fn from_write(key: Key, err: KVWriteError) -> Self {
        match err {
            KVWriteError::KeyExists => KVSetError::KeyExists { key },
            KVWriteError::Backend { reason } => KVSetError::WriteFailed { key, reason },
        }
    }
}

impl Display for KVSetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KVSetError::SerializeValueError { key, source } => {
                write!(f, "Could not serialize {}: {}", key, source)
            }
            KVSetError::KeyExists { key } => write!(f, "{} already exists", key),
            KVSetError::WriteFailed { key, reason } => {
                write!(f, "Could not write {}: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for KVSetError {}

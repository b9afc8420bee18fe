/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes that specify where each table is stored in the user-provided key-value store.
//!
//! # List of tables
//!
//! |Table|Key|Value|
//! |---|---|---|
//! |Visible Blocks|[`BlocksHash`](crate::types::visible_blocks::BlocksHash)|The canonical JSON of the [`VisibleBlocks`](crate::types::visible_blocks::VisibleBlocks) with that hash, as raw UTF-8 bytes. Entries are inserted once and never updated or deleted.|
//! |Subsection Grades|(`UserId`, `CourseKey`, `UsageKey`)|The Borsh-serialized [`PersistentSubsectionGrade`](crate::grades::types::PersistentSubsectionGrade) for that student and subsection.|
//! |Subsection Grade Ids|-|Sequence that allocates the row ids of subsection grades.|
//!
//! # Keys
//!
//! Every key is the concatenation of the table's one-byte prefix and the row's key:
//! - Visible blocks: [`VISIBLE_BLOCKS`] + the UTF-8 bytes of the hash.
//! - Subsection grades: [`SUBSECTION_GRADES`] + the Borsh serialization of the
//!   `(user_id, course_key, usage_key)` tuple, i.e., `user_id` as 8 little-endian bytes, followed by
//!   each string as a 4-byte little-endian length and its UTF-8 bytes.
//! - The id sequence is named by [`SUBSECTION_GRADE_IDS`] alone.
//!
//! Uniqueness of these keys is what enforces "at most one visible blocks entry per content hash" and
//! "at most one grade per student per subsection". Both are enforced by the store's
//! [`insert`](super::pluggables::KVTransaction::insert).

use std::io;

use borsh::BorshSerialize;

use crate::types::{
    data_types::{CourseKey, UsageKey, UserId},
    visible_blocks::BlocksHash,
};

// Tables
pub const VISIBLE_BLOCKS: [u8; 1] = [0];
pub const SUBSECTION_GRADES: [u8; 1] = [1];
pub const SUBSECTION_GRADE_IDS: [u8; 1] = [2];

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}

/// Key of the visible blocks entry with `hash`.
pub fn visible_blocks_key(hash: &BlocksHash) -> Vec<u8> {
    concat(&VISIBLE_BLOCKS, hash.as_str().as_bytes())
}

/// Key of the subsection grade of `user_id` for `usage_key` in `course_key`.
pub fn subsection_grade_key(
    user_id: UserId,
    course_key: &CourseKey,
    usage_key: &UsageKey,
) -> io::Result<Vec<u8>> {
    Ok(concat(
        &SUBSECTION_GRADES,
        &(user_id, course_key.clone(), usage_key.clone()).try_to_vec()?,
    ))
}

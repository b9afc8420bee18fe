/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The set of block records visible at the time a grade was computed, and its content hash.
//!
//! # Canonical JSON and content hash
//!
//! A [`VisibleBlocks`] is an order-independent, duplicate-free set of [`BlockRecord`]s. It has exactly
//! one canonical JSON encoding: the array of its records sorted by locator, each written as described
//! in [`block_record`](super::block_record), with no insignificant whitespace (see
//! [`canonical_json`](super::canonical_json) for the exact bytes).
//!
//! The set's [`BlocksHash`] is the standard base64 encoding of the SHA-256 digest of those bytes. Two
//! sets built from the same records, in whatever order and with whatever duplication, therefore have
//! byte-identical canonical JSON and content hashes. This is what lets the
//! [visible blocks store](crate::visible_blocks_store) deduplicate sets by hash.
//!
//! Both values are computed on first use and cached for the lifetime of the `VisibleBlocks`.

use std::{
    collections::{btree_set, BTreeSet},
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    sync::OnceLock,
};

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    block_record::{BlockRecord, BlockRecordError},
    canonical_json::to_canonical_string,
    crypto_primitives::{base64_standard, sha256},
};

/// Immutable, duplicate-free, order-independent collection of [`BlockRecord`]s.
///
/// Equality and hashing are defined by member records only, which is equivalent to comparing the
/// canonical JSON bytes.
#[derive(Clone)]
pub struct VisibleBlocks {
    records: BTreeSet<BlockRecord>,
    json: OnceLock<String>,
    hash: OnceLock<BlocksHash>,
}

impl VisibleBlocks {
    /// Build a `VisibleBlocks` out of `records`, collapsing records that are equal by value.
    ///
    /// Fails with [`BlockRecordError::NonFiniteScore`] if any record has a NaN or infinite score.
    pub fn new<I>(records: I) -> Result<VisibleBlocks, BlockRecordError>
    where
        I: IntoIterator<Item = BlockRecord>,
    {
        let records = records
            .into_iter()
            .map(|record| record.validate().map(|_| record))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(VisibleBlocks {
            records,
            json: OnceLock::new(),
            hash: OnceLock::new(),
        })
    }

    /// Parse a `VisibleBlocks` out of a JSON array of block records.
    ///
    /// The input does not have to be canonical: key order, whitespace, and record order are not
    /// significant.
    pub fn from_canonical_json(json: &str) -> Result<VisibleBlocks, BlockRecordError> {
        let records: Vec<BlockRecord> = serde_json::from_str(json)
            .map_err(|source| BlockRecordError::MalformedJson { source })?;
        VisibleBlocks::new(records)
    }

    /// Get the canonical JSON encoding of this set.
    pub fn to_canonical_json(&self) -> Result<&str, BlockRecordError> {
        if let Some(json) = self.json.get() {
            return Ok(json);
        }
        // `BTreeSet` iterates in `BlockRecord` order, i.e., sorted by locator.
        let records: Vec<&BlockRecord> = self.records.iter().collect();
        let json = to_canonical_string(&records)
            .map_err(|source| BlockRecordError::Serialize { source })?;
        Ok(self.json.get_or_init(|| json))
    }

    /// Get the content hash of this set.
    ///
    /// The hash is versioned. See [`BlocksHash::scheme`].
    pub fn to_content_hash(&self) -> Result<&BlocksHash, BlockRecordError> {
        if let Some(hash) = self.hash.get() {
            return Ok(hash);
        }
        let hash = BlocksHash::sha256_of(self.to_canonical_json()?.as_bytes());
        Ok(self.hash.get_or_init(|| hash))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, record: &BlockRecord) -> bool {
        self.records.contains(record)
    }

    /// Iterate through the records in this set, sorted by locator.
    pub fn iter(&self) -> btree_set::Iter<'_, BlockRecord> {
        self.records.iter()
    }
}

impl PartialEq for VisibleBlocks {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Eq for VisibleBlocks {}

impl Hash for VisibleBlocks {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.records.hash(state)
    }
}

impl Debug for VisibleBlocks {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.records.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a VisibleBlocks {
    type Item = &'a BlockRecord;
    type IntoIter = btree_set::Iter<'a, BlockRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Algorithm used to produce a [`BlocksHash`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashScheme {
    /// Base64 of the SHA-256 digest of the canonical JSON. Hashes of this scheme carry no label.
    Sha256,
}

/// Content hash of a [`VisibleBlocks`], used as the key of its entry in the visible blocks store.
///
/// A hash read back from storage is an opaque key. It was computed over the bytes stored at the time
/// of insertion, which may differ from the current canonical encoding of the same records (see
/// [`VisibleBlocksEntry::blocks`](crate::visible_blocks_store::VisibleBlocksEntry::blocks)), so it is
/// never recomputed.
///
/// # Versioning
///
/// Hashes are versioned by an optional algorithm label followed by `$`, e.g.,
/// `sha1$witfkXg0JglCjW9RssWvTAveakI=`. A hash without a label was produced by
/// [`HashScheme::Sha256`], which is the only scheme this version produces. The standard base64
/// alphabet never contains `$`, so a label can always be told apart from an unlabelled digest.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct BlocksHash(String);

impl BlocksHash {
    pub(crate) const LABEL_SEPARATOR: char = '$';

    /// Hash `canonical_json` with the current scheme.
    pub(crate) fn sha256_of(canonical_json: &[u8]) -> BlocksHash {
        BlocksHash(base64_standard(&sha256(canonical_json)))
    }

    /// Wrap a hash that was read back from storage or received from a caller.
    pub fn new(hash: impl Into<String>) -> BlocksHash {
        BlocksHash(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the scheme that produced this hash.
    pub fn scheme(&self) -> Result<HashScheme, BlockRecordError> {
        match self.0.split_once(Self::LABEL_SEPARATOR) {
            None => Ok(HashScheme::Sha256),
            Some((label, _)) => Err(BlockRecordError::UnknownHashScheme {
                label: label.to_string(),
            }),
        }
    }

    /// Get the first seven characters of this hash, for printing.
    pub fn abbreviated(&self) -> &str {
        match self.0.char_indices().nth(7) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl Display for BlocksHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for BlocksHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "BlocksHash({})", self.0)
    }
}

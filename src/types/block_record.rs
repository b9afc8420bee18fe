/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'block record' type, a snapshot of one content block's contribution to a grade
//! computation.
//!
//! # Canonical field set
//!
//! A `BlockRecord` encodes as a JSON object with exactly three keys, written in lexicographic order:
//!
//! ```text
//! {"locator":"block-v1:edX+DemoX+2024+type@problem+block@p1","max_score":10.0,"weight":1.0}
//! ```
//!
//! Decoding rejects objects with missing or unknown keys.

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};

/// Snapshot of a content block: its locator, its weight, and the maximum score obtainable on it.
///
/// Two `BlockRecord`s are equal if and only if all three fields are equal. Floats are compared by
/// their total order, so `0.0` and `-0.0` are distinct records, matching the fact that they encode
/// to different bytes.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockRecord {
    pub locator: String,
    pub weight: f64,
    pub max_score: f64,
}

impl BlockRecord {
    pub fn new(locator: impl Into<String>, weight: f64, max_score: f64) -> Self {
        BlockRecord {
            locator: locator.into(),
            weight,
            max_score,
        }
    }

    /// Check that this record has a canonical encoding, i.e., that both of its scores are finite.
    pub fn validate(&self) -> Result<(), BlockRecordError> {
        for (field, value) in [("weight", self.weight), ("max_score", self.max_score)] {
            if !value.is_finite() {
                return Err(BlockRecordError::NonFiniteScore {
                    locator: self.locator.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Serialize for BlockRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Field order here is the canonical key order.
        let mut record = serializer.serialize_struct("BlockRecord", 3)?;
        record.serialize_field("locator", &self.locator)?;
        record.serialize_field("max_score", &self.max_score)?;
        record.serialize_field("weight", &self.weight)?;
        record.end()
    }
}

impl PartialEq for BlockRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BlockRecord {}

impl PartialOrd for BlockRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Records are ordered by locator first. Ties are broken by weight and then by max score, so that
/// records sharing a locator still have a deterministic position.
impl Ord for BlockRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.locator
            .cmp(&other.locator)
            .then_with(|| self.weight.total_cmp(&other.weight))
            .then_with(|| self.max_score.total_cmp(&other.max_score))
    }
}

impl Hash for BlockRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.locator.hash(state);
        self.weight.to_bits().hash(state);
        self.max_score.to_bits().hash(state);
    }
}

impl Display for BlockRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockRecord(locator={}, weight={}, max_score={})",
            self.locator, self.weight, self.max_score
        )
    }
}

/// Error when building, encoding, or decoding block records and sets of them.
#[derive(Debug)]
pub enum BlockRecordError {
    /// A record's weight or max score is NaN or infinite, and so has no canonical encoding.
    NonFiniteScore {
        locator: String,
        field: &'static str,
        value: f64,
    },

    /// Canonical JSON could not be produced for a set of records.
    Serialize { source: serde_json::Error },

    /// Stored canonical JSON is not an array of well-formed block records.
    MalformedJson { source: serde_json::Error },

    /// A content hash carries an algorithm label that this version does not know.
    UnknownHashScheme { label: String },
}

impl Display for BlockRecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BlockRecordError::NonFiniteScore {
                locator,
                field,
                value,
            } => write!(f, "Block record {} has non-finite {}: {}", locator, field, value),
            BlockRecordError::Serialize { source } => {
                write!(f, "Could not serialize block records: {}", source)
            }
            BlockRecordError::MalformedJson { source } => {
                write!(f, "Malformed block records JSON: {}", source)
            }
            BlockRecordError::UnknownHashScheme { label } => {
                write!(f, "Unknown content hash scheme: {}", label)
            }
        }
    }
}

impl std::error::Error for BlockRecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlockRecordError::Serialize { source } | BlockRecordError::MalformedJson { source } => {
                Some(source)
            }
            _ => None,
        }
    }
}

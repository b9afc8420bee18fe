/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types specific to subsection grades: the persisted grade record and the arguments used to write one.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use typed_builder::TypedBuilder;

use crate::{
    error::GradesError,
    storage::pluggables::Key,
    types::{
        data_types::{CourseKey, CourseVersion, RowId, Timestamp, UsageKey, UserId},
        visible_blocks::{BlocksHash, VisibleBlocks},
    },
};

/// The latest grade of one student on one subsection.
///
/// A `PersistentSubsectionGrade` is a plain record. All of its writes go through
/// [`SubsectionGrades`](super::SubsectionGrades), which keeps `(user_id, course_key, usage_key)` unique
/// and makes sure that `visible_blocks_hash` always names an existing
/// [visible blocks entry](crate::visible_blocks_store::VisibleBlocksEntry).
///
/// `possible_* >= earned_* >= 0` is expected of the scores but not enforced here: grades arrive
/// pre-computed.
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct PersistentSubsectionGrade {
    pub id: RowId,

    // Identity.
    pub user_id: UserId,
    pub course_key: CourseKey,
    pub usage_key: UsageKey,

    // State of the content when the grade was computed.
    pub subtree_edited_date: Timestamp,
    pub course_version: CourseVersion,

    // Points achieved and available, over all problems and over graded problems only.
    pub earned_all: f64,
    pub possible_all: f64,
    pub earned_graded: f64,
    pub possible_graded: f64,

    pub visible_blocks_hash: BlocksHash,

    pub created: Timestamp,
    pub modified: Timestamp,
}

impl PersistentSubsectionGrade {
    /// Get the logical key of this grade.
    pub fn key(&self) -> Key {
        Key::SubsectionGrade {
            user_id: self.user_id,
            usage_key: self.usage_key.clone(),
        }
    }

    /// Overwrite every score, provenance, and reference field with those of `params`, and bump the
    /// modification time.
    pub(crate) fn overwrite(
        &mut self,
        params: &SubsectionGradeParams,
        visible_blocks_hash: BlocksHash,
        now: Timestamp,
    ) {
        self.course_version = params.course_version.clone();
        self.subtree_edited_date = params.subtree_edited_date;
        self.earned_all = params.earned_all;
        self.possible_all = params.possible_all;
        self.earned_graded = params.earned_graded;
        self.possible_graded = params.possible_graded;
        self.visible_blocks_hash = visible_blocks_hash;
        self.modified = now;
    }
}

impl Display for PersistentSubsectionGrade {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PersistentSubsectionGrade user:{}, subsection {}. {}/{} graded, {}/{} all",
            self.user_id,
            self.usage_key,
            self.earned_graded,
            self.possible_graded,
            self.earned_all,
            self.possible_all
        )
    }
}

/// Arguments of [`create`](super::SubsectionGrades::create),
/// [`update`](super::SubsectionGrades::update), and
/// [`save_grade`](super::SubsectionGrades::save_grade).
///
/// The course of the grade is not an argument: it is derived from `usage_key`.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building [SubsectionGradeParams]. All of the following are required:
    - `.user_id(...)`
    - `.usage_key(...)`
    - `.course_version(...)`
    - `.subtree_edited_date(...)`
    - `.earned_all(...)`
    - `.possible_all(...)`
    - `.earned_graded(...)`
    - `.possible_graded(...)`
    - `.visible_blocks(...)`
"))]
pub struct SubsectionGradeParams {
    #[builder(setter(into))]
    pub user_id: UserId,
    #[builder(setter(into))]
    pub usage_key: UsageKey,
    #[builder(setter(into))]
    pub course_version: CourseVersion,
    #[builder(setter(into))]
    pub subtree_edited_date: Timestamp,
    pub earned_all: f64,
    pub possible_all: f64,
    pub earned_graded: f64,
    pub possible_graded: f64,
    pub visible_blocks: VisibleBlocks,
}

impl SubsectionGradeParams {
    /// Check the fields that will be written for a grade in `course_key`: keys and the course version
    /// must be non-blank and at most `max_key_length` bytes long, and scores must be finite.
    pub(crate) fn validate(
        &self,
        course_key: &CourseKey,
        max_key_length: usize,
    ) -> Result<(), GradesError> {
        for (field, value) in [
            ("course_key", course_key.as_str()),
            ("usage_key", self.usage_key.as_str()),
            ("course_version", self.course_version.as_str()),
        ] {
            if value.is_empty() {
                return Err(GradesError::InvalidInput {
                    reason: format!("{} must not be blank", field),
                });
            }
            if value.len() > max_key_length {
                return Err(GradesError::InvalidInput {
                    reason: format!(
                        "{} is {} bytes long, more than the maximum of {}",
                        field,
                        value.len(),
                        max_key_length
                    ),
                });
            }
        }

        for (field, score) in [
            ("earned_all", self.earned_all),
            ("possible_all", self.possible_all),
            ("earned_graded", self.earned_graded),
            ("possible_graded", self.possible_graded),
        ] {
            if !score.is_finite() {
                return Err(GradesError::InvalidInput {
                    reason: format!("{} is not finite: {}", field, score),
                });
            }
        }

        Ok(())
    }
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The subsection grades service. See [`SubsectionGrades`].

use std::{
    sync::{mpsc::Sender, Arc},
    time::SystemTime,
};

use typed_builder::TypedBuilder;

use crate::{
    config::Configuration,
    error::GradesError,
    events::{Event, InsertSubsectionGradeEvent, RaceConditionEvent, UpdateSubsectionGradeEvent},
    storage::{
        pluggables::{KVGet, KVStore, KVTransaction, Key},
        transaction::GradesTransaction,
    },
    types::{
        data_types::{CourseKey, UsageKey, UserId},
        visible_blocks::VisibleBlocks,
    },
    visible_blocks_store::{self, Resolution},
};

use super::{
    pluggables::{Clock, CourseLookup, SystemClock},
    types::{PersistentSubsectionGrade, SubsectionGradeParams},
};

/// The only write path of [`PersistentSubsectionGrade`]s.
///
/// ## Operations
///
/// For a given user and subsection, a grade moves from absent to present through
/// [`create`](Self::create) and stays present through [`update`](Self::update). `create` on a present
/// grade fails with [`GradesError::DuplicateKey`], and `update` on an absent one fails with
/// [`GradesError::NotFound`]. [`save_grade`](Self::save_grade) does whichever of the two applies.
///
/// Each write resolves the grade's [visible blocks entry](crate::visible_blocks_store) and writes the
/// grade row in a single transaction.
///
/// ## Race condition in `update`
///
/// `update` resolves the visible blocks entry twice. If the second resolution still cannot see the
/// entry, the entry was inserted by a concurrent transaction that this transaction cannot read under
/// repeatable reads. The update then fails with [`GradesError::RaceCondition`] rather than write a
/// reference to a row it cannot confirm exists. Retrying in a fresh transaction may succeed; this
/// service never retries by itself.
#[derive(Clone, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [SubsectionGrades] service.

    Required:
    - `.kv_store(...)`
    - `.course_lookup(...)`
    - `.configuration(...)`

    Optional:
    - `.clock(...)` (default: [SystemClock])
    - `.event_publisher(...)`
"))]
pub struct SubsectionGrades<K: KVStore, C: CourseLookup> {
    kv_store: K,
    course_lookup: C,
    configuration: Configuration,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
    #[builder(default, setter(strip_option))]
    event_publisher: Option<Sender<Event>>,
}

impl<K: KVStore, C: CourseLookup> SubsectionGrades<K, C> {
    /* ↓↓↓ Reads ↓↓↓ */

    /// Get the grade of `user_id` on `usage_key`, failing with [`GradesError::NotFound`] if there is
    /// none.
    pub fn read(
        &self,
        user_id: UserId,
        usage_key: &UsageKey,
    ) -> Result<PersistentSubsectionGrade, GradesError> {
        self.read_in(&self.kv_store.begin(), user_id, usage_key)
    }

    /// Like [`read`](Self::read), but reads through `transaction`.
    pub fn read_in<T: KVGet>(
        &self,
        transaction: &T,
        user_id: UserId,
        usage_key: &UsageKey,
    ) -> Result<PersistentSubsectionGrade, GradesError> {
        let course_key = self.course_lookup.course_key(usage_key)?;
        transaction
            .subsection_grade(user_id, &course_key, usage_key)?
            .ok_or_else(|| GradesError::NotFound {
                key: Key::SubsectionGrade {
                    user_id,
                    usage_key: usage_key.clone(),
                },
            })
    }

    /// Get the visible blocks that `grade` was computed over.
    pub fn visible_blocks(
        &self,
        grade: &PersistentSubsectionGrade,
    ) -> Result<VisibleBlocks, GradesError> {
        let entry =
            visible_blocks_store::get_in(&self.kv_store.begin(), &grade.visible_blocks_hash)?;
        Ok(entry.blocks()?)
    }

    /* ↓↓↓ Writes ↓↓↓ */

    /// Insert a new grade described by `params`, failing with [`GradesError::DuplicateKey`] if the user
    /// already has a grade on the subsection.
    pub fn create(
        &self,
        params: &SubsectionGradeParams,
    ) -> Result<PersistentSubsectionGrade, GradesError> {
        let mut transaction = self.kv_store.begin();
        let (grade, events) = self.insert_grade(&mut transaction, params)?;
        transaction.commit()?;

        self.emit_all(events);
        Ok(grade)
    }

    /// Like [`create`](Self::create), but writes into `transaction`, which the caller commits.
    pub fn create_in<T: KVTransaction>(
        &self,
        transaction: &mut T,
        params: &SubsectionGradeParams,
    ) -> Result<PersistentSubsectionGrade, GradesError> {
        let (grade, events) = self.insert_grade(transaction, params)?;
        self.emit_all(events);
        Ok(grade)
    }

    /// Overwrite the existing grade of the user on the subsection with `params`, failing with
    /// [`GradesError::NotFound`] if there is none.
    ///
    /// Fails with [`GradesError::RaceCondition`] as described in the
    /// [type-level docs](SubsectionGrades#race-condition-in-update).
    pub fn update(
        &self,
        params: &SubsectionGradeParams,
    ) -> Result<PersistentSubsectionGrade, GradesError> {
        let mut transaction = self.kv_store.begin();
        let (grade, events) = self.overwrite_grade(&mut transaction, params)?;
        transaction.commit()?;

        self.emit_all(events);
        Ok(grade)
    }

    /// Like [`update`](Self::update), but writes into `transaction`, which the caller commits.
    pub fn update_in<T: KVTransaction>(
        &self,
        transaction: &mut T,
        params: &SubsectionGradeParams,
    ) -> Result<PersistentSubsectionGrade, GradesError> {
        let (grade, events) = self.overwrite_grade(transaction, params)?;
        self.emit_all(events);
        Ok(grade)
    }

    /// Update the grade of the user on the subsection, or create it if there is none.
    ///
    /// The update and the create run in separate transactions. If another writer creates the grade
    /// between the two, this fails with [`GradesError::DuplicateKey`] and may be retried.
    pub fn save_grade(
        &self,
        params: &SubsectionGradeParams,
    ) -> Result<PersistentSubsectionGrade, GradesError> {
        match self.update(params) {
            Err(GradesError::NotFound { .. }) => self.create(params),
            result => result,
        }
    }

    /* ↓↓↓ Protocols ↓↓↓ */

    fn insert_grade<T: KVTransaction>(
        &self,
        transaction: &mut T,
        params: &SubsectionGradeParams,
    ) -> Result<(PersistentSubsectionGrade, Vec<Event>), GradesError> {
        let course_key = self.validated_course_key(params)?;

        // Checked up front so that a duplicate does not consume a row id.
        if transaction
            .subsection_grade(params.user_id, &course_key, &params.usage_key)?
            .is_some()
        {
            return Err(GradesError::DuplicateKey {
                key: Key::SubsectionGrade {
                    user_id: params.user_id,
                    usage_key: params.usage_key.clone(),
                },
            });
        }

        let resolution = visible_blocks_store::resolve_in(transaction, &params.visible_blocks)?;

        let mut grades_transaction = GradesTransaction::new(transaction);
        let now = self.clock.now();
        let grade = PersistentSubsectionGrade {
            id: grades_transaction.next_subsection_grade_id()?,
            user_id: params.user_id,
            course_key,
            usage_key: params.usage_key.clone(),
            subtree_edited_date: params.subtree_edited_date,
            course_version: params.course_version.clone(),
            earned_all: params.earned_all,
            possible_all: params.possible_all,
            earned_graded: params.earned_graded,
            possible_graded: params.possible_graded,
            visible_blocks_hash: resolution.hash().clone(),
            created: now,
            modified: now,
        };
        grades_transaction.insert_subsection_grade(&grade)?;

        let mut events: Vec<Event> = resolution.event().into_iter().collect();
        events.push(Event::InsertSubsectionGrade(InsertSubsectionGradeEvent {
            timestamp: SystemTime::now(),
            user_id: grade.user_id,
            usage_key: grade.usage_key.clone(),
            visible_blocks_hash: grade.visible_blocks_hash.clone(),
        }));
        Ok((grade, events))
    }

    fn overwrite_grade<T: KVTransaction>(
        &self,
        transaction: &mut T,
        params: &SubsectionGradeParams,
    ) -> Result<(PersistentSubsectionGrade, Vec<Event>), GradesError> {
        let course_key = self.validated_course_key(params)?;
        let mut grade = self.read_in(&*transaction, params.user_id, &params.usage_key)?;

        // The first resolution inserts the entry if no other transaction has. The second one must
        // then see it; if it does not, the entry belongs to a concurrent transaction.
        let speculative = visible_blocks_store::resolve_in(transaction, &params.visible_blocks)?;
        let resolution = visible_blocks_store::resolve_in(transaction, &params.visible_blocks)?;
        if let Resolution::Conflicted(entry) = &resolution {
            log::error!(
                "Race condition hit in robust grading data model. Unrecoverable repeatable-read issue. \
                 user: {}, course: {}, subsection: {}, visible blocks: {}",
                params.user_id,
                course_key,
                params.usage_key,
                entry.hash()
            );
            self.emit(Event::RaceCondition(RaceConditionEvent {
                timestamp: SystemTime::now(),
                user_id: params.user_id,
                usage_key: params.usage_key.clone(),
                hash: entry.hash().clone(),
            }));
            return Err(GradesError::RaceCondition {
                hash: entry.hash().clone(),
            });
        }

        grade.overwrite(params, resolution.hash().clone(), self.clock.now());
        GradesTransaction::new(transaction).put_subsection_grade(&grade)?;

        let mut events: Vec<Event> = speculative.event().into_iter().collect();
        events.push(Event::UpdateSubsectionGrade(UpdateSubsectionGradeEvent {
            timestamp: SystemTime::now(),
            user_id: grade.user_id,
            usage_key: grade.usage_key.clone(),
            visible_blocks_hash: grade.visible_blocks_hash.clone(),
        }));
        Ok((grade, events))
    }

    fn validated_course_key(
        &self,
        params: &SubsectionGradeParams,
    ) -> Result<CourseKey, GradesError> {
        let course_key = self.course_lookup.course_key(&params.usage_key)?;
        params.validate(&course_key, self.configuration.max_key_length)?;
        Ok(course_key)
    }

    /* ↓↓↓ Events ↓↓↓ */

    fn emit(&self, event: Event) {
        event.emit(self.configuration.log_events, &self.event_publisher)
    }

    fn emit_all(&self, events: Vec<Event>) {
        for event in events {
            self.emit(event)
        }
    }
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the
//! [configuration](crate::config::Configuration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an [InsertSubsectionGrade](crate::events::InsertSubsectionGradeEvent) is printed:
//!
//! ```text
//! InsertSubsectionGrade, 1701329264, 42, block-v1:edX+DemoX+2024+type@sequential+block@seq1, Id5u7f6
//! ```
//!
//! In the snippet:
//! - The third value is the id of the student.
//! - The fourth value is the usage key of the subsection.
//! - The fifth value is the first seven characters of the content hash of the visible blocks the grade
//!   references.
//!
//! Independently of the configuration, a [race condition](crate::error::GradesError::RaceCondition)
//! is always logged at error level.

use std::time::{Duration, SystemTime};

use log;

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const INSERT_VISIBLE_BLOCKS: &str = "InsertVisibleBlocks";
pub const VISIBLE_BLOCKS_CONFLICT: &str = "VisibleBlocksConflict";

pub const INSERT_SUBSECTION_GRADE: &str = "InsertSubsectionGrade";
pub const UPDATE_SUBSECTION_GRADE: &str = "UpdateSubsectionGrade";

pub const RACE_CONDITION: &str = "RaceCondition";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for InsertVisibleBlocksEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |insert_visible_blocks_event: &InsertVisibleBlocksEvent| {
            log::info!(
                "{}, {}, {}",
                INSERT_VISIBLE_BLOCKS,
                secs_since_unix_epoch(insert_visible_blocks_event.timestamp),
                insert_visible_blocks_event.hash.abbreviated()
            )
        };
        Box::new(logger)
    }
}

impl Logger for VisibleBlocksConflictEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |visible_blocks_conflict_event: &VisibleBlocksConflictEvent| {
            log::info!(
                "{}, {}, {}",
                VISIBLE_BLOCKS_CONFLICT,
                secs_since_unix_epoch(visible_blocks_conflict_event.timestamp),
                visible_blocks_conflict_event.hash.abbreviated()
            )
        };
        Box::new(logger)
    }
}

impl Logger for InsertSubsectionGradeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |insert_subsection_grade_event: &InsertSubsectionGradeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                INSERT_SUBSECTION_GRADE,
                secs_since_unix_epoch(insert_subsection_grade_event.timestamp),
                insert_subsection_grade_event.user_id,
                insert_subsection_grade_event.usage_key,
                insert_subsection_grade_event.visible_blocks_hash.abbreviated()
            )
        };
        Box::new(logger)
    }
}

impl Logger for UpdateSubsectionGradeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |update_subsection_grade_event: &UpdateSubsectionGradeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                UPDATE_SUBSECTION_GRADE,
                secs_since_unix_epoch(update_subsection_grade_event.timestamp),
                update_subsection_grade_event.user_id,
                update_subsection_grade_event.usage_key,
                update_subsection_grade_event.visible_blocks_hash.abbreviated()
            )
        };
        Box::new(logger)
    }
}

impl Logger for RaceConditionEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |race_condition_event: &RaceConditionEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                RACE_CONDITION,
                secs_since_unix_epoch(race_condition_event.timestamp),
                race_condition_event.user_id,
                race_condition_event.usage_key,
                race_condition_event.hash.abbreviated()
            )
        };
        Box::new(logger)
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by the visible blocks store and the subsection grades service.
//!
//! An event for a given action indicates that the action has been completed. Events of writes made
//! by the crate's own transactions are emitted after the transaction commits. Events of writes made
//! into a caller's transaction (the `*_in` functions) are emitted as soon as the write is made, and
//! say nothing about whether the caller later commits.
//!
//! Events are [logged](crate::logging) if [`Configuration::log_events`](crate::config::Configuration)
//! is set, and are sent to the event publisher if one was registered.

use std::{sync::mpsc::Sender, time::SystemTime};

use crate::{
    logging::Logger,
    types::{
        data_types::{UsageKey, UserId},
        visible_blocks::BlocksHash,
    },
};

pub enum Event {
    // Events that change the visible blocks store.
    InsertVisibleBlocks(InsertVisibleBlocksEvent),
    VisibleBlocksConflict(VisibleBlocksConflictEvent),
    // Events that change subsection grades.
    InsertSubsectionGrade(InsertSubsectionGradeEvent),
    UpdateSubsectionGrade(UpdateSubsectionGradeEvent),
    // Failures.
    RaceCondition(RaceConditionEvent),
}

impl Event {
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            // The receiving end may have hung up. That should not fail a write.
            let _ = event_publisher.send(event);
        }
    }

    /// Log this event if `log_events`, then publish it.
    pub(crate) fn emit(self, log_events: bool, event_publisher: &Option<Sender<Event>>) {
        if log_events {
            match &self {
                Event::InsertVisibleBlocks(event) => {
                    (InsertVisibleBlocksEvent::get_logger())(event)
                }
                Event::VisibleBlocksConflict(event) => {
                    (VisibleBlocksConflictEvent::get_logger())(event)
                }
                Event::InsertSubsectionGrade(event) => {
                    (InsertSubsectionGradeEvent::get_logger())(event)
                }
                Event::UpdateSubsectionGrade(event) => {
                    (UpdateSubsectionGradeEvent::get_logger())(event)
                }
                Event::RaceCondition(event) => (RaceConditionEvent::get_logger())(event),
            }
        }
        Event::publish(event_publisher, self)
    }
}

/// A new visible blocks entry was inserted.
pub struct InsertVisibleBlocksEvent {
    pub timestamp: SystemTime,
    pub hash: BlocksHash,
}

/// Inserting a visible blocks entry found its hash already taken, and the entry was assumed to exist.
pub struct VisibleBlocksConflictEvent {
    pub timestamp: SystemTime,
    pub hash: BlocksHash,
}

pub struct InsertSubsectionGradeEvent {
    pub timestamp: SystemTime,
    pub user_id: UserId,
    pub usage_key: UsageKey,
    pub visible_blocks_hash: BlocksHash,
}

pub struct UpdateSubsectionGradeEvent {
    pub timestamp: SystemTime,
    pub user_id: UserId,
    pub usage_key: UsageKey,
    pub visible_blocks_hash: BlocksHash,
}

/// An update of a subsection grade was abandoned because the visible blocks entry it would reference
/// was inserted by a concurrent transaction whose writes it cannot see.
pub struct RaceConditionEvent {
    pub timestamp: SystemTime,
    pub user_id: UserId,
    pub usage_key: UsageKey,
    pub hash: BlocksHash,
}

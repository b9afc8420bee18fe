/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Collaborators of the [subsection grades service](super::SubsectionGrades) that library users may
//! replace.

use std::{
    fmt::{self, Display, Formatter},
    time::SystemTime,
};

use crate::types::data_types::{CourseKey, Timestamp, UsageKey};

/// Maps a subsection's usage key to the key of the course that owns it.
pub trait CourseLookup {
    fn course_key(&self, usage_key: &UsageKey) -> Result<CourseKey, CourseLookupError>;
}

/// [`CourseLookup`] that reads the course out of an opaque `block-v1:` usage key.
///
/// A usage key of the form `block-v1:ORG+COURSE+RUN[+branch@B][+version@V]+type@TYPE+block@ID` belongs
/// to the course `course-v1:ORG+COURSE+RUN[+branch@B][+version@V]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpaqueKeyLookup;

impl OpaqueKeyLookup {
    const USAGE_PREFIX: &'static str = "block-v1:";
    const COURSE_PREFIX: &'static str = "course-v1:";
    const TYPE_SEPARATOR: &'static str = "+type@";
}

impl CourseLookup for OpaqueKeyLookup {
    fn course_key(&self, usage_key: &UsageKey) -> Result<CourseKey, CourseLookupError> {
        let unrecognized = || CourseLookupError::UnrecognizedUsageKey {
            usage_key: usage_key.clone(),
        };

        let body = usage_key
            .as_str()
            .strip_prefix(Self::USAGE_PREFIX)
            .ok_or_else(unrecognized)?;
        let (course, _block) = body
            .split_once(Self::TYPE_SEPARATOR)
            .ok_or_else(unrecognized)?;

        // Org, course, and run, before any `branch@`/`version@` parts.
        let identity: Vec<&str> = course
            .split('+')
            .take_while(|part| !part.contains('@'))
            .collect();
        if identity.len() != 3 || identity.iter().any(|part| part.is_empty()) {
            return Err(unrecognized());
        }

        Ok(CourseKey::new(format!("{}{}", Self::COURSE_PREFIX, course)))
    }
}

#[derive(Debug)]
pub enum CourseLookupError {
    UnrecognizedUsageKey { usage_key: UsageKey },
}

impl Display for CourseLookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CourseLookupError::UnrecognizedUsageKey { usage_key } => {
                write!(f, "Cannot determine the course of usage key {:?}", usage_key.as_str())
            }
        }
    }
}

impl std::error::Error for CourseLookupError {}

/// Source of the audit timestamps of grade records.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// [`Clock`] that reads the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from(SystemTime::now())
    }
}

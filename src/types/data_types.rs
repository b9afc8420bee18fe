/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to identify things or carry a scalar, and do not have any major "active"
//! behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    time::{Duration, SystemTime},
};

use borsh::{BorshDeserialize, BorshSerialize};

/// Number that identifies a student.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct UserId(i64);

impl UserId {
    /// Create a new `UserId` with an `int` value.
    pub const fn new(int: i64) -> Self {
        Self(int)
    }

    /// Get the `i64` value of this `UserId`.
    pub const fn int(&self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(int: i64) -> Self {
        UserId(int)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Serialized identifier of a course run, e.g., `course-v1:edX+DemoX+2024`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct CourseKey(String);

impl CourseKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CourseKey {
    fn from(value: &str) -> Self {
        CourseKey(value.to_string())
    }
}

impl From<String> for CourseKey {
    fn from(value: String) -> Self {
        CourseKey(value)
    }
}

impl Display for CourseKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialized identifier of a subsection, the granularity at which grades are persisted.
///
/// The owning course of a `UsageKey` is resolved through a
/// [`CourseLookup`](crate::grades::pluggables::CourseLookup).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct UsageKey(String);

impl UsageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UsageKey {
    fn from(value: &str) -> Self {
        UsageKey(value.to_string())
    }
}

impl From<String> for UsageKey {
    fn from(value: String) -> Self {
        UsageKey(value)
    }
}

impl Display for UsageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token identifying the state of course content at the time a grade was computed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct CourseVersion(String);

impl CourseVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CourseVersion {
    fn from(value: &str) -> Self {
        CourseVersion(value.to_string())
    }
}

impl From<String> for CourseVersion {
    fn from(value: String) -> Self {
        CourseVersion(value)
    }
}

impl Display for CourseVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point in time, stored as the number of microseconds since the Unix Epoch.
///
/// Instants before the Unix Epoch are clamped to the Epoch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new `Timestamp` that is `micros` microseconds after the Unix Epoch.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Get the number of microseconds since the Unix Epoch.
    pub const fn micros(&self) -> u64 {
        self.0
    }

    /// Get the number of whole seconds since the Unix Epoch.
    pub const fn secs(&self) -> u64 {
        self.0 / 1_000_000
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        let micros = time
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_micros();
        Timestamp(u64::try_from(micros).unwrap_or(u64::MAX))
    }
}

impl From<Timestamp> for SystemTime {
    fn from(timestamp: Timestamp) -> Self {
        SystemTime::UNIX_EPOCH + Duration::from_micros(timestamp.0)
    }
}

impl Debug for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}.{:06})", self.secs(), self.0 % 1_000_000)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs(), self.0 % 1_000_000)
    }
}

/// Row id assigned to a grade record when it is first inserted.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct RowId(u64);

impl RowId {
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A Rust library for persisting per-student, per-subsection grade snapshots.
//!
//! A grade is only meaningful next to the content it was computed over, and course content keeps
//! changing after a grade is recorded. So alongside each grade, this crate stores the set of content
//! blocks that were visible to the student when the grade was computed: each block's locator, weight,
//! and maximum score.
//!
//! Sets of visible blocks repeat a lot between students, so they are stored once per distinct set in a
//! content-addressed [store](visible_blocks_store), keyed by the SHA-256 hash of the set's
//! [canonical JSON](types::visible_blocks::VisibleBlocks::to_canonical_json). Grades
//! [reference](grades::types::PersistentSubsectionGrade::visible_blocks_hash) their set by hash.
//!
//! ## Getting started
//!
//! 1. Implement the [pluggable key-value store](storage::pluggables) on top of your database.
//! 2. Pick a [`CourseLookup`](grades::pluggables::CourseLookup), for example
//!    [`OpaqueKeyLookup`](grades::pluggables::OpaqueKeyLookup).
//! 3. Build a [`SubsectionGrades`](grades::SubsectionGrades) service with a
//!    [`Configuration`](config::Configuration), and call
//!    [`save_grade`](grades::SubsectionGrades::save_grade) whenever a grade is computed.
//!
//! Writers in any number of threads or processes may share one store. Their only coordination is
//! through the store's unique inserts and transaction isolation, as described in the
//! [`storage`] module.

pub mod config;

pub mod error;

pub mod events;

pub mod grades;

pub mod logging;

pub mod storage;

pub mod types;

pub mod visible_blocks_store;

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Persistent subsection grades.
//!
//! A [`PersistentSubsectionGrade`](types::PersistentSubsectionGrade) records the latest grade of one
//! student on one subsection, together with a reference to the set of
//! [visible blocks](crate::visible_blocks_store) it was computed over. Grades are read and written
//! only through [`SubsectionGrades`], which resolves the course of each subsection through a
//! [`CourseLookup`](pluggables::CourseLookup) and stamps audit times from a
//! [`Clock`](pluggables::Clock).

pub mod implementation;
pub use implementation::SubsectionGrades;

pub mod pluggables;

pub mod types;

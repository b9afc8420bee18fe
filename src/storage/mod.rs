//! The persistent state of the crate.
//!
//! # Pluggable persistence
//!
//! - Grades and visible blocks are kept in persistent storage, most probably a relational database.
//! - Library users get to choose how exactly this is done.
//! - This crate merely requires that whatever the user provides as a persistence mechanism implements
//!   the abstract functionality of a key-value store with repeatable-read transactions, unique inserts,
//!   and atomic commits.
//! - This abstract functionality is made concrete by the traits defined in the [`pluggables`] module.
//!
//! # Accessing storage
//!
//! - Transactions obtained from the pluggable store get wrapped inside a
//!   [`GradesTransaction`](transaction::GradesTransaction).
//! - This puts rows in the right places in the store (see [`variables`]) and reports errors against
//!   logical [keys](pluggables::Key).
//!
//! Serialization between concurrent writers, including writers in different processes, is achieved
//! purely through unique inserts and transaction isolation. Nothing in this crate takes an in-process
//! lock.

pub mod pluggables;

pub mod transaction;

pub mod variables;

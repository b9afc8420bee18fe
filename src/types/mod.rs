//! Types that are used across multiple components of the crate.
//!
//! Types specific to a single component, like the [grade record](crate::grades::types), are defined
//! in that component's own "types" submodule.

pub mod block_record;

pub mod canonical_json;

pub mod crypto_primitives;

pub mod data_types;

pub mod visible_blocks;

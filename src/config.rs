/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Configuration of the [subsection grades service](crate::grades::SubsectionGrades).
//!
//! The configuration is defined using the builder pattern, for example:
//!
//! ```
//! # use persistent_grades::config::Configuration;
//! let configuration = Configuration::builder()
//!     .log_events(true)
//!     .max_key_length(255)
//!     .build();
//! # assert_eq!(configuration.max_key_length, 255);
//! ```

use typed_builder::TypedBuilder;

/// Stores the user-defined parameters of the grades service, that is:
/// 1. The "Log Events" flag. If set to "true", every [event](crate::events) is printed through the
///    [log](https://docs.rs/log/latest/log/) crate as described in [`logging`](crate::logging).
/// 2. The maximum length, in bytes, of a course key, usage key, or course version. Grades with longer
///    values are rejected as invalid input instead of being truncated by the storage engine.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.log_events(...)`

    Optional:
    - `.max_key_length(...)` (default: 255)
"))]
pub struct Configuration {
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
    #[builder(
        default = 255,
        setter(doc = "Set the maximum length of keys and course versions, in bytes. Optional.")
    )]
    pub max_key_length: usize,
}

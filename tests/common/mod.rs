pub(crate) mod collaborators;

pub(crate) mod logging;

pub(crate) mod mem_db;

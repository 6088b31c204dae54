//! Command handlers.

pub(crate) mod symlink;

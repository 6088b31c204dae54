#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::redundant_pub_crate)]

//! Operator CLI for provisioning remote symlinks.
//!
//! Layout:
//! - `cli.rs`: argument parsing, configuration layering and dispatch
//! - `commands/`: command handlers
//! - `client.rs`: shared HTTP client, errors, and telemetry helpers
//! - `output.rs`: report renderers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;

pub use cli::run;

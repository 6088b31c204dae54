#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! rsync-over-ssh transfers between local staging and an application server.
//!
//! Layout: `invocation.rs` (argument vectors and display quoting), `rsync.rs`
//! (argument builders per operation), `runner.rs` (process execution),
//! `gateway.rs` (download, delete and upload), `error.rs`.

pub mod error;
pub mod gateway;
pub mod invocation;
pub mod rsync;
pub mod runner;

pub use error::{TransferError, TransferResult};
pub use gateway::{DeleteScratch, TransferGateway};
pub use invocation::Invocation;
pub use runner::{CommandOutput, CommandRunner, DryRunRunner, ProcessRunner};

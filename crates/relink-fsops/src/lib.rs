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

//! Local filesystem side of remote symlink provisioning.
//!
//! Layout: `staging.rs` (per-invocation staging session), `classify.rs`
//! (staged node classification), `link.rs` (relative link targets and local
//! symlink creation), `error.rs` (structured errors).

pub mod classify;
pub mod error;
pub mod link;
pub mod staging;

pub use classify::{Classification, classify_node};
pub use error::{FsOpsError, FsOpsResult};
pub use link::{create_symlink, link_target};
pub use staging::{PlaceholderKind, StagingSession};

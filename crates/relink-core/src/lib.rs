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

//! Core domain types shared by the relink workspace.
//!
//! Layout: `model/` (requests, resolved context, remote nodes and endpoints),
//! `path.rs` (source path normalisation and relative link prefixes),
//! `service/` (hosting API trait and its records), `error.rs` (validation and
//! hosting errors).

pub mod error;
pub mod model;
pub mod path;
pub mod service;

pub use error::{CoreError, CoreResult, HostingError, HostingResult};
pub use model::{
    NodeKind, ProvisioningRequest, RemoteEndpoint, RemoteNode, ResolvedContext, SiteEnvironment,
};
pub use path::{DestinationName, SourcePath, relative_prefix};
pub use service::{
    ConnectionInfo, EnvironmentRecord, HostingApi, ModeChange, SiteRecord, WorkflowHandle,
    WorkflowProgress, WorkflowState,
};

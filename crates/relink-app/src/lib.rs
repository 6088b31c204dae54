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

//! Remote symlink provisioning workflow.
//!
//! Layout: `guard.rs` (environment safety and connection mode),
//! `orchestrator.rs` (the provisioning state machine and its report),
//! `error.rs` (operator-facing error taxonomy).

pub mod error;
pub mod guard;
pub mod orchestrator;

pub use error::{ProvisionError, ProvisionResult};
pub use guard::EnvironmentGuard;
pub use orchestrator::{
    OrchestratorSettings, ProvisionReport, ProvisionState, StepRecord, StepStatus,
    SymlinkOrchestrator,
};

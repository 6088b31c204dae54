#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Layered configuration for the relink CLI.
//!
//! Layout: `model.rs` (typed settings), `defaults.rs` (built-in values),
//! `loader.rs` (defaults, JSON file, then `RELINK_*` environment overrides),
//! `validate.rs` (consistency checks run after loading).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use model::{
    ApiSettings, GuardSettings, LayoutSettings, RelinkConfig, TransferSettings, Verbosity,
};
pub use validate::validate;

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! HTTP client for the hosting platform API.
//!
//! Layout: `client.rs` (the [`HttpHostingApi`] implementation of
//! [`relink_core::HostingApi`]).

pub mod client;

pub use client::HttpHostingApi;

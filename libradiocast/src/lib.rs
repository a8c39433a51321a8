//! Radiocast - a fragment-swapping shell for a radio station site
//!
//! This library loads section fragments into a host page, runs each
//! section's one-time setup, fetches the programme card feed and renders it,
//! and starts radio streams. The host page is reached through the
//! [`document::Document`] trait; [`document::HeadlessDocument`] provides an
//! in-memory implementation.

pub mod config;
pub mod document;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod initializer;
pub mod loader;
pub mod logging;
pub mod media;
pub mod render;
pub mod shell;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{RadiocastError, Result};
pub use loader::{Continuation, FragmentLoader, LoadOutcome, LoadToken};
pub use shell::Shell;
pub use types::{CardRecord, SectionId};

//! Core types for the tagbridge NFC session layer.
//!
//! This crate defines the portable data model shared by every other crate in
//! the workspace: technology-tagged tag descriptors, NDEF records, command
//! request/response shapes, the native reader-error taxonomy with its
//! transient/terminal classification, and the caller-facing error type.
//!
//! Everything here is plain data. Hardware capabilities live in
//! `tagbridge-hardware`; the session state machine and command dispatch live
//! in `tagbridge-session`.

pub mod error;
pub mod reader;
pub mod types;

pub use error::{Error, Result};
pub use reader::{ErrorCode, PortableError, ReaderError, Severity};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Hardware abstraction layer for NFC tag readers.
//!
//! This crate defines the capability traits a detected tag exposes, the
//! reader and VAS session surfaces that deliver tags as asynchronous event
//! streams, and scripted mock implementations for development and testing.
//!
//! # Design Philosophy
//!
//! - **Async-first**: all tag and session I/O uses native `async fn` in
//!   traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **One trait per technology**: a tag implements exactly one of
//!   [`MiFareTagOps`], [`Iso15693TagOps`], [`Iso7816TagOps`] or
//!   [`FeliCaTagOps`], plus the shared [`NdefTag`] surface.
//! - **Enum dispatch**: the traits are not object-safe, so heterogeneous
//!   storage goes through the wrappers in [`tags`], with [`TagConnection`]
//!   as the technology-tagged union the session layer routes on.
//! - **Native errors**: every fallible operation returns
//!   `Result<T, ReaderError>`; classification into transient and terminal
//!   failures happens in `tagbridge-core`.
//!
//! # Examples
//!
//! Reading an NDEF message through the shared surface:
//!
//! ```
//! use tagbridge_hardware::mock::{MockMiFareTag, MockNdef};
//! use tagbridge_hardware::traits::NdefTag;
//! use tagbridge_core::types::{MiFareFamily, NdefMessage};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04; 4])
//!     .with_ndef(MockNdef::read_write(137).with_message(NdefMessage::empty()));
//!
//! let message = tag.read_ndef().await.unwrap();
//! assert!(message.is_empty());
//! # }
//! ```

pub mod mock;
pub mod session;
pub mod tags;
pub mod traits;

pub use session::{ReaderEvent, ReaderSession, SessionProvider, VasEvent, VasSession};
pub use tags::{AnyFeliCaTag, AnyIso7816Tag, AnyIso15693Tag, AnyMiFareTag, TagConnection};
pub use traits::{FeliCaTagOps, Iso7816TagOps, Iso15693TagOps, MiFareTagOps, NdefTag};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

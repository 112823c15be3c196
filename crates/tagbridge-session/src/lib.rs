//! Session lifecycle and command dispatch for NFC tag readers.
//!
//! This crate ties the portable data model of `tagbridge-core` to the
//! hardware surfaces of `tagbridge-hardware`. It owns at most one session
//! at a time, converts detected tags into portable descriptors, hands out
//! opaque handles through the [`TagRegistry`], and routes per-technology
//! commands back to the live connection behind a handle.
//!
//! # Layout
//!
//! - [`manager`]: the [`SessionManager`] state machine. Lifecycle methods
//!   are request/response; hardware events are drained one at a time by
//!   [`SessionManager::pump`] and surface as [`SessionEvent`]
//!   notifications.
//! - [`registry`]: handle-to-connection map. Handles are generated here
//!   and never accepted from outside.
//! - [`convert`]: turns a freshly connected tag into its identity snapshot
//!   and optional NDEF info block.
//! - [`dispatch`]: one method per tag command, implemented on the manager.
//!
//! # Examples
//!
//! Driving a single-read discovery session against the mock provider:
//!
//! ```
//! use tagbridge_core::types::{MiFareFamily, PollingOption};
//! use tagbridge_hardware::mock::{MockMiFareTag, MockNdef, MockProvider, MockReaderSession};
//! use tagbridge_hardware::tags::{AnyMiFareTag, TagConnection};
//! use tagbridge_session::{SessionEvent, SessionManager};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (provider, provider_handle) = MockProvider::new();
//! let (session, reader_handle) = MockReaderSession::new();
//! provider_handle.push_reader(session);
//!
//! let (mut manager, mut events) = SessionManager::new(provider);
//! manager
//!     .begin_tag_discovery(&[PollingOption::Iso14443], Some("Hold near tag"), true)
//!     .await
//!     .unwrap();
//!
//! let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04; 4])
//!     .with_ndef(MockNdef::read_write(137));
//! reader_handle
//!     .present_tags(vec![TagConnection::MiFare(AnyMiFareTag::Mock(tag))])
//!     .await
//!     .unwrap();
//!
//! manager.pump().await; // session became active
//! manager.pump().await; // tag detected and registered
//!
//! assert!(matches!(events.try_recv(), Ok(SessionEvent::TagSessionActive)));
//! assert!(matches!(events.try_recv(), Ok(SessionEvent::TagDetected(_))));
//! # }
//! ```

pub mod convert;
pub mod dispatch;
pub mod manager;
pub mod registry;

pub use convert::convert_tag;
pub use manager::{InvalidationHandle, ReadMode, SessionEvent, SessionManager};
pub use registry::TagRegistry;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

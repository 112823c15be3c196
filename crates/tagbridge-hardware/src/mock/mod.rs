//! Mock tag and session implementations for testing and development.
//!
//! Mock tags are configured up front with builder methods and scripted
//! response queues, then handed to a [`MockReaderSession`] for presentation.
//! Controlling handles let tests drive detection and invalidation from the
//! outside and observe what the session was asked to do.

mod provider;
mod session;
mod tags;
mod vas;

pub use provider::{MockProvider, MockProviderHandle};
pub use session::{MockReaderHandle, MockReaderSession};
pub use tags::{MockFeliCaTag, MockIso7816Tag, MockIso15693Tag, MockMiFareTag, MockNdef};
pub use vas::{MockVasHandle, MockVasSession};

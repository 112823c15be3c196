//! Caller-facing error taxonomy for session and command operations.

use thiserror::Error;

use crate::reader::{PortableError, ReaderError};

/// Result type alias for session-layer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the immediate caller of a session or dispatch
/// operation.
///
/// Precondition failures (`SessionAlreadyExists`, `NoActiveSession`,
/// `TagNotFound`) are reported synchronously and never retried. Hardware
/// failures cross as a classified `(code, message)` pair. Registry lookups
/// themselves never produce errors — absence is an `Option`, and the
/// dispatcher turns it into `TagNotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A begin was requested while another session (of either kind) is
    /// active.
    #[error("Multiple sessions cannot be active at the same time")]
    SessionAlreadyExists,

    /// The operation requires an active session.
    #[error("Session is not active")]
    NoActiveSession,

    /// The handle resolves to no tag, or to a tag of a different technology
    /// family. Callers cannot distinguish the two cases.
    #[error("Tag not found. The session may have ended")]
    TagNotFound,

    /// A reader failure surfaced directly by a lifecycle operation.
    #[error("Reader error: {0}")]
    Reader(PortableError),

    /// A technology-specific command failed.
    #[error("Command failed: {0}")]
    Command(PortableError),
}

impl Error {
    /// Wrap a native reader error as a lifecycle failure.
    pub fn reader(error: &ReaderError) -> Self {
        Self::Reader(error.to_portable())
    }

    /// Wrap a native reader error as a command failure.
    pub fn command(error: &ReaderError) -> Self {
        Self::Command(error.to_portable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ErrorCode;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::SessionAlreadyExists.to_string(),
            "Multiple sessions cannot be active at the same time"
        );
        assert_eq!(Error::NoActiveSession.to_string(), "Session is not active");
        assert_eq!(
            Error::TagNotFound.to_string(),
            "Tag not found. The session may have ended"
        );
    }

    #[test]
    fn command_wrapping_carries_portable_code() {
        let error = Error::command(&ReaderError::TagResponseError);
        match error {
            Error::Command(portable) => {
                assert_eq!(portable.code, ErrorCode::ReaderTransceiveErrorTagResponseError);
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }
}

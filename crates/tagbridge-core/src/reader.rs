//! Native reader-error taxonomy and its portable classification.
//!
//! The reader hardware reports failures from a closed set of conditions. Two
//! decisions hang off every such failure: whether the session layer should
//! retry (restart polling) or terminate, and which portable error code the
//! caller sees when a session ends. Both mappings are total — an error the
//! taxonomy does not know about is carried through [`ReaderError::Other`] and
//! fails closed into [`ErrorCode::UnsupportedFeature`] rather than aborting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed caller-facing message for a lost tag connection.
pub const TAG_CONNECTION_LOST_MESSAGE: &str = "Tag connection lost";

/// Fixed caller-facing message for a tag that is not NDEF writable.
pub const TAG_NOT_WRITABLE_MESSAGE: &str = "Tag not NDEF formatted / writable";

/// Error reported by the reader hardware layer.
///
/// Covers session invalidation causes, NDEF capability failures, and
/// RF transceive faults. [`ReaderError::Other`] carries anything the
/// hardware reports outside this taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    #[error("Session invalidated after first NDEF tag read")]
    FirstNdefTagRead,

    #[error("Session terminated unexpectedly")]
    SessionTerminatedUnexpectedly,

    #[error("Session timed out")]
    SessionTimeout,

    #[error("Reader system is busy")]
    SystemIsBusy,

    #[error("Session canceled by user")]
    UserCanceled,

    #[error("Tag is not writable")]
    TagNotWritable,

    #[error("Tag capacity is too small for the message")]
    TagSizeTooSmall,

    #[error("Tag update failed")]
    TagUpdateFailure,

    #[error("Tag contains a zero-length NDEF message")]
    ZeroLengthMessage,

    #[error("Transceive retry limit exceeded")]
    RetryExceeded,

    #[error("Tag connection lost")]
    TagConnectionLost,

    #[error("Tag is not connected")]
    TagNotConnected,

    #[error("Tag response error")]
    TagResponseError,

    #[error("Session was invalidated during transceive")]
    SessionInvalidated,

    #[error("Command packet too long")]
    PacketTooLong,

    #[error("Invalid tag command configuration parameters")]
    InvalidCommandParameters,

    #[error("Unsupported feature")]
    UnsupportedFeature,

    #[error("Invalid parameter")]
    InvalidParameter,

    #[error("Invalid parameter length")]
    InvalidParameterLength,

    #[error("Parameter out of bound")]
    ParameterOutOfBound,

    #[error("Radio is disabled")]
    RadioDisabled,

    #[error("Security violation")]
    SecurityViolation,

    /// Error outside the known reader taxonomy.
    #[error("{message}")]
    Other { message: String },
}

/// Retry classification for a reader error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable RF-layer hiccup. Restart polling instead of ending
    /// the session.
    Transient,

    /// Failure that ends the session.
    Terminal,
}

impl ReaderError {
    /// Create an out-of-taxonomy error from an arbitrary message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Classify this error as transient (repoll) or terminal (invalidate).
    ///
    /// The transient set is exactly the RF transceive faults that clear on
    /// their own when the tag re-enters the field: connection lost, tag not
    /// connected, retry exceeded, and tag response errors.
    pub fn severity(&self) -> Severity {
        match self {
            Self::TagConnectionLost
            | Self::TagNotConnected
            | Self::RetryExceeded
            | Self::TagResponseError => Severity::Transient,
            _ => Severity::Terminal,
        }
    }

    /// Whether this error should trigger a repoll instead of ending the
    /// session.
    pub fn is_transient(&self) -> bool {
        self.severity() == Severity::Transient
    }

    /// Map this error into the portable (code, message) pair that crosses
    /// the transport boundary.
    ///
    /// Two conditions carry fixed messages overriding the native text; an
    /// error outside the taxonomy maps to [`ErrorCode::UnsupportedFeature`]
    /// with its original message verbatim.
    pub fn to_portable(&self) -> PortableError {
        match self {
            Self::TagConnectionLost => PortableError::new(
                ErrorCode::ReaderTransceiveErrorTagConnectionLost,
                TAG_CONNECTION_LOST_MESSAGE,
            ),
            Self::TagNotWritable => PortableError::new(
                ErrorCode::NdefReaderSessionErrorTagNotWritable,
                TAG_NOT_WRITABLE_MESSAGE,
            ),
            Self::Other { message } => {
                PortableError::new(ErrorCode::ReaderErrorUnsupportedFeature, message)
            }
            other => PortableError::new(other.code(), other.to_string()),
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            Self::FirstNdefTagRead => ErrorCode::ReaderSessionInvalidationErrorFirstNdefTagRead,
            Self::SessionTerminatedUnexpectedly => {
                ErrorCode::ReaderSessionInvalidationErrorSessionTerminatedUnexpectedly
            }
            Self::SessionTimeout => ErrorCode::ReaderSessionInvalidationErrorSessionTimeout,
            Self::SystemIsBusy => ErrorCode::ReaderSessionInvalidationErrorSystemIsBusy,
            Self::UserCanceled => ErrorCode::ReaderSessionInvalidationErrorUserCanceled,
            Self::TagNotWritable => ErrorCode::NdefReaderSessionErrorTagNotWritable,
            Self::TagSizeTooSmall => ErrorCode::NdefReaderSessionErrorTagSizeTooSmall,
            Self::TagUpdateFailure => ErrorCode::NdefReaderSessionErrorTagUpdateFailure,
            Self::ZeroLengthMessage => ErrorCode::NdefReaderSessionErrorZeroLengthMessage,
            Self::RetryExceeded => ErrorCode::ReaderTransceiveErrorRetryExceeded,
            Self::TagConnectionLost => ErrorCode::ReaderTransceiveErrorTagConnectionLost,
            Self::TagNotConnected => ErrorCode::ReaderTransceiveErrorTagNotConnected,
            Self::TagResponseError => ErrorCode::ReaderTransceiveErrorTagResponseError,
            Self::SessionInvalidated => ErrorCode::ReaderTransceiveErrorSessionInvalidated,
            Self::PacketTooLong => ErrorCode::ReaderTransceiveErrorPacketTooLong,
            Self::InvalidCommandParameters => {
                ErrorCode::TagCommandConfigurationErrorInvalidParameters
            }
            Self::UnsupportedFeature => ErrorCode::ReaderErrorUnsupportedFeature,
            Self::InvalidParameter => ErrorCode::ReaderErrorInvalidParameter,
            Self::InvalidParameterLength => ErrorCode::ReaderErrorInvalidParameterLength,
            Self::ParameterOutOfBound => ErrorCode::ReaderErrorParameterOutOfBound,
            Self::RadioDisabled => ErrorCode::ReaderErrorRadioDisabled,
            Self::SecurityViolation => ErrorCode::ReaderErrorSecurityViolation,
            Self::Other { .. } => ErrorCode::ReaderErrorUnsupportedFeature,
        }
    }
}

/// Portable reader error code, a closed enumeration shared with the host
/// application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ReaderSessionInvalidationErrorFirstNdefTagRead,
    ReaderSessionInvalidationErrorSessionTerminatedUnexpectedly,
    ReaderSessionInvalidationErrorSessionTimeout,
    ReaderSessionInvalidationErrorSystemIsBusy,
    ReaderSessionInvalidationErrorUserCanceled,
    NdefReaderSessionErrorTagNotWritable,
    NdefReaderSessionErrorTagSizeTooSmall,
    NdefReaderSessionErrorTagUpdateFailure,
    NdefReaderSessionErrorZeroLengthMessage,
    ReaderTransceiveErrorRetryExceeded,
    ReaderTransceiveErrorTagConnectionLost,
    ReaderTransceiveErrorTagNotConnected,
    ReaderTransceiveErrorTagResponseError,
    ReaderTransceiveErrorSessionInvalidated,
    ReaderTransceiveErrorPacketTooLong,
    TagCommandConfigurationErrorInvalidParameters,
    ReaderErrorUnsupportedFeature,
    ReaderErrorInvalidParameter,
    ReaderErrorInvalidParameterLength,
    ReaderErrorParameterOutOfBound,
    ReaderErrorRadioDisabled,
    ReaderErrorSecurityViolation,
}

/// Portable (code, message) pair surfaced to the caller when a session
/// invalidates or a command fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableError {
    /// Stable error code.
    pub code: ErrorCode,

    /// Human-readable message.
    pub message: String,
}

impl PortableError {
    /// Create a new portable error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PortableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_set_is_exactly_the_rf_faults() {
        let transient = [
            ReaderError::TagConnectionLost,
            ReaderError::TagNotConnected,
            ReaderError::RetryExceeded,
            ReaderError::TagResponseError,
        ];
        for error in &transient {
            assert!(error.is_transient(), "{error:?} should be transient");
        }

        let terminal = [
            ReaderError::SessionTimeout,
            ReaderError::UserCanceled,
            ReaderError::RadioDisabled,
            ReaderError::TagNotWritable,
            ReaderError::UnsupportedFeature,
            ReaderError::other("firmware glitch"),
        ];
        for error in &terminal {
            assert!(!error.is_transient(), "{error:?} should be terminal");
        }
    }

    #[test]
    fn connection_lost_uses_fixed_message() {
        let portable = ReaderError::TagConnectionLost.to_portable();
        assert_eq!(
            portable.code,
            ErrorCode::ReaderTransceiveErrorTagConnectionLost
        );
        assert_eq!(portable.message, TAG_CONNECTION_LOST_MESSAGE);
    }

    #[test]
    fn tag_not_writable_uses_fixed_message() {
        let portable = ReaderError::TagNotWritable.to_portable();
        assert_eq!(portable.code, ErrorCode::NdefReaderSessionErrorTagNotWritable);
        assert_eq!(portable.message, TAG_NOT_WRITABLE_MESSAGE);
    }

    #[test]
    fn unknown_error_fails_closed_with_verbatim_message() {
        let portable = ReaderError::other("vendor error 0x42").to_portable();
        assert_eq!(portable.code, ErrorCode::ReaderErrorUnsupportedFeature);
        assert_eq!(portable.message, "vendor error 0x42");
    }

    #[test]
    fn every_variant_maps_to_a_portable_code() {
        let all = [
            ReaderError::FirstNdefTagRead,
            ReaderError::SessionTerminatedUnexpectedly,
            ReaderError::SessionTimeout,
            ReaderError::SystemIsBusy,
            ReaderError::UserCanceled,
            ReaderError::TagNotWritable,
            ReaderError::TagSizeTooSmall,
            ReaderError::TagUpdateFailure,
            ReaderError::ZeroLengthMessage,
            ReaderError::RetryExceeded,
            ReaderError::TagConnectionLost,
            ReaderError::TagNotConnected,
            ReaderError::TagResponseError,
            ReaderError::SessionInvalidated,
            ReaderError::PacketTooLong,
            ReaderError::InvalidCommandParameters,
            ReaderError::UnsupportedFeature,
            ReaderError::InvalidParameter,
            ReaderError::InvalidParameterLength,
            ReaderError::ParameterOutOfBound,
            ReaderError::RadioDisabled,
            ReaderError::SecurityViolation,
            ReaderError::other("anything"),
        ];
        for error in &all {
            let portable = error.to_portable();
            assert!(!portable.message.is_empty());
        }
    }

    #[test]
    fn portable_error_serialization_round_trip() {
        let portable = PortableError::new(
            ErrorCode::ReaderSessionInvalidationErrorSessionTimeout,
            "Session timed out",
        );
        let json = serde_json::to_string(&portable).unwrap();
        assert!(json.contains("reader_session_invalidation_error_session_timeout"));

        let back: PortableError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, portable);
    }
}

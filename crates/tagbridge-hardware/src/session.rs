//! Reader and VAS session abstractions.
//!
//! A [`ReaderSession`] drives RF polling and reports discovered tags as an
//! asynchronous event stream; a [`VasSession`] runs a preconfigured batch of
//! value-added-service commands against whatever tag enters the field. A
//! [`SessionProvider`] constructs both and reports radio availability, so
//! the session layer never touches a concrete driver type.

#![allow(async_fn_in_trait)]

use tagbridge_core::reader::ReaderError;
use tagbridge_core::types::{PollingOption, VasCommandConfig, VasResponse};

use crate::tags::TagConnection;

/// Event emitted by a reader session.
#[derive(Debug)]
pub enum ReaderEvent {
    /// RF polling has started; the radio is live.
    BecameActive,

    /// One or more tags entered the field during a polling pass.
    Detected(Vec<TagConnection>),

    /// The session ended and will emit no further events.
    Invalidated(ReaderError),
}

/// Tag discovery session.
///
/// Not object-safe (RPITIT); use generic parameters or a concrete type.
pub trait ReaderSession: Send {
    /// Start RF polling. Emits [`ReaderEvent::BecameActive`] once the radio
    /// is live.
    ///
    /// # Errors
    ///
    /// Returns an error if the radio cannot start, for example because it
    /// is disabled or held by another process.
    async fn begin(&mut self) -> Result<(), ReaderError>;

    /// End the session. An error message, when given, is surfaced to the
    /// operator by the platform before teardown. Safe to call more than
    /// once.
    async fn invalidate(&mut self, error_message: Option<&str>);

    /// Resume polling after a detection pause. Tags connected before the
    /// restart are no longer reachable.
    async fn restart_polling(&mut self);

    /// Update the operator-facing prompt text.
    fn set_prompt(&mut self, text: &str);

    /// Establish the RF link to one of the tags reported by the last
    /// [`ReaderEvent::Detected`].
    ///
    /// # Errors
    ///
    /// Returns an error if the tag has left the field or the link cannot
    /// be negotiated.
    async fn connect(&mut self, tag: &TagConnection) -> Result<(), ReaderError>;

    /// Wait for the next session event. Returns `None` once the underlying
    /// driver is gone; callers must treat that as an unexpected
    /// termination.
    async fn next_event(&mut self) -> Option<ReaderEvent>;
}

/// Event emitted by a VAS session.
#[derive(Debug)]
pub enum VasEvent {
    /// The session started.
    BecameActive,

    /// A batch of command results arrived. Results are forwarded in
    /// configuration order and never stored.
    ResponsesReceived(Vec<VasResponse>),

    /// The session ended and will emit no further events.
    Invalidated(ReaderError),
}

/// Value-added-service session.
pub trait VasSession: Send {
    /// Start the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the radio cannot start.
    async fn begin(&mut self) -> Result<(), ReaderError>;

    /// End the session, optionally showing an error message first. Safe to
    /// call more than once.
    async fn invalidate(&mut self, error_message: Option<&str>);

    /// Update the operator-facing prompt text.
    fn set_prompt(&mut self, text: &str);

    /// Wait for the next session event. `None` means the driver is gone.
    async fn next_event(&mut self) -> Option<VasEvent>;
}

/// Factory for reader and VAS sessions.
///
/// Availability checks are synchronous snapshots of radio state; a `true`
/// answer does not guarantee a later `begin` succeeds.
pub trait SessionProvider: Send {
    type Reader: ReaderSession;
    type Vas: VasSession;

    /// Whether tag discovery is supported on this device right now.
    fn tag_reading_available(&self) -> bool;

    /// Whether VAS reading is supported on this device right now.
    fn vas_reading_available(&self) -> bool;

    /// Create a tag discovery session polling for the given technologies.
    ///
    /// # Errors
    ///
    /// Returns an error if the radio is unavailable.
    async fn tag_session(
        &mut self,
        options: &[PollingOption],
    ) -> Result<Self::Reader, ReaderError>;

    /// Create a VAS session running the given command batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the radio is unavailable.
    async fn vas_session(
        &mut self,
        configs: &[VasCommandConfig],
    ) -> Result<Self::Vas, ReaderError>;
}

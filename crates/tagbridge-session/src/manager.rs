//! Session lifecycle state machine.
//!
//! A [`SessionManager`] owns the session provider, the current session (at
//! most one, of either kind), and the tag registry. Callers drive it from a
//! single task: lifecycle methods are synchronous request/response, while
//! hardware events are consumed by [`SessionManager::pump`] one at a time,
//! so a detection is fully resolved before the next event is looked at.
//!
//! # Threading contract
//!
//! The manager is single-owner and holds `&mut self` for every operation.
//! It is deliberately not shared behind a lock: mutual exclusion between
//! sessions is a state check, not a mutex. Code running outside the owning
//! task requests invalidation through an [`InvalidationHandle`], which
//! redispatches onto the manager's event pump.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tagbridge_core::error::{Error, Result};
use tagbridge_core::reader::{PortableError, ReaderError};
use tagbridge_core::types::{PollingOption, TagDescriptor, VasCommandConfig, VasResponse};
use tagbridge_hardware::session::{
    ReaderEvent, ReaderSession, SessionProvider, VasEvent, VasSession,
};
use tagbridge_hardware::tags::TagConnection;

use crate::convert::convert_tag;
use crate::registry::TagRegistry;

const EVENT_CHANNEL_CAPACITY: usize = 32;
const REMOTE_CHANNEL_CAPACITY: usize = 8;

const NO_TAG_DETECTED_MESSAGE: &str = "No tag detected.";

/// Outward notification emitted by the manager.
///
/// Notifications are one-way and carry only portable data; callers never
/// receive a live tag connection.
#[derive(Debug)]
pub enum SessionEvent {
    /// Tag discovery started polling.
    TagSessionActive,

    /// A tag was connected, converted, and registered.
    TagDetected(TagDescriptor),

    /// The tag session ended for a reason other than a caller request.
    TagSessionInvalidated(PortableError),

    /// The VAS session started.
    VasSessionActive,

    /// A batch of VAS results arrived. Forwarded, never stored.
    VasResponses(Vec<VasResponse>),

    /// The VAS session ended for a reason other than a caller request.
    VasSessionInvalidated(PortableError),
}

/// Detection policy for a tag discovery session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Stop after the first successfully delivered tag; detection errors
    /// terminate the session.
    Single,

    /// Keep polling after every detection; detection errors restart
    /// polling silently.
    Multi,
}

#[derive(Debug)]
enum SessionState<R, V> {
    Idle,
    TagDiscovery {
        session: R,
        mode: ReadMode,
    },
    Vas {
        session: V,
    },
}

// Manual impl: the derive would demand R: Default and V: Default.
impl<R, V> Default for SessionState<R, V> {
    fn default() -> Self {
        Self::Idle
    }
}

#[derive(Debug)]
struct InvalidationRequest {
    alert_message: Option<String>,
    error_message: Option<String>,
}

/// Clonable handle that requests invalidation from outside the owning
/// task.
///
/// Requests are fire-and-forget: they are queued onto the manager's pump
/// and honored in arrival order. A request racing a session teardown is
/// simply a no-op.
#[derive(Debug, Clone)]
pub struct InvalidationHandle {
    tx: mpsc::Sender<InvalidationRequest>,
}

impl InvalidationHandle {
    /// Queue an invalidation request.
    pub async fn invalidate(
        &self,
        alert_message: Option<String>,
        error_message: Option<String>,
    ) {
        let _ = self
            .tx
            .send(InvalidationRequest {
                alert_message,
                error_message,
            })
            .await;
    }
}

enum Wake {
    Reader(Option<ReaderEvent>),
    Vas(Option<VasEvent>),
    Remote(Option<InvalidationRequest>),
}

/// Owns the session lifecycle, the tag registry, and the outward
/// notification channel.
pub struct SessionManager<P: SessionProvider> {
    provider: P,
    state: SessionState<P::Reader, P::Vas>,
    pub(crate) registry: TagRegistry,
    events: mpsc::Sender<SessionEvent>,
    remote_tx: mpsc::Sender<InvalidationRequest>,
    remote_rx: mpsc::Receiver<InvalidationRequest>,
}

impl<P: SessionProvider> SessionManager<P> {
    /// Create a manager and the receiving end of its notification channel.
    pub fn new(provider: P) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (remote_tx, remote_rx) = mpsc::channel(REMOTE_CHANNEL_CAPACITY);

        let manager = Self {
            provider,
            state: SessionState::Idle,
            registry: TagRegistry::new(),
            events,
            remote_tx,
            remote_rx,
        };
        (manager, events_rx)
    }

    /// Whether tag discovery is supported on this device.
    pub fn tag_reading_available(&self) -> bool {
        self.provider.tag_reading_available()
    }

    /// Whether VAS reading is supported on this device.
    pub fn vas_reading_available(&self) -> bool {
        self.provider.vas_reading_available()
    }

    /// Handle for requesting invalidation from other tasks.
    pub fn invalidation_handle(&self) -> InvalidationHandle {
        InvalidationHandle {
            tx: self.remote_tx.clone(),
        }
    }

    /// Start a tag discovery session.
    ///
    /// `invalidate_after_first_read` selects [`ReadMode::Single`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyExists`] when any session is active,
    /// or [`Error::Reader`] when the radio refuses to start.
    pub async fn begin_tag_discovery(
        &mut self,
        options: &[PollingOption],
        alert_message: Option<&str>,
        invalidate_after_first_read: bool,
    ) -> Result<()> {
        if !matches!(self.state, SessionState::Idle) {
            return Err(Error::SessionAlreadyExists);
        }

        let mode = if invalidate_after_first_read {
            ReadMode::Single
        } else {
            ReadMode::Multi
        };

        let mut session = self
            .provider
            .tag_session(options)
            .await
            .map_err(|e| Error::reader(&e))?;
        if let Some(text) = alert_message {
            session.set_prompt(text);
        }
        session.begin().await.map_err(|e| Error::reader(&e))?;

        info!(?options, ?mode, "tag discovery session started");
        self.registry.clear();
        self.state = SessionState::TagDiscovery { session, mode };
        Ok(())
    }

    /// Start a VAS session running the given command batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyExists`] when any session is active,
    /// or [`Error::Reader`] when the radio refuses to start.
    pub async fn begin_vas(
        &mut self,
        configs: &[VasCommandConfig],
        alert_message: Option<&str>,
    ) -> Result<()> {
        if !matches!(self.state, SessionState::Idle) {
            return Err(Error::SessionAlreadyExists);
        }

        let mut session = self
            .provider
            .vas_session(configs)
            .await
            .map_err(|e| Error::reader(&e))?;
        if let Some(text) = alert_message {
            session.set_prompt(text);
        }
        session.begin().await.map_err(|e| Error::reader(&e))?;

        info!(commands = configs.len(), "vas session started");
        self.state = SessionState::Vas { session };
        Ok(())
    }

    /// End whichever session is active.
    ///
    /// Idempotent: a call while idle does nothing. The local state and the
    /// registry are cleared unconditionally, even if the underlying close
    /// misbehaves, and no invalidated notification is emitted for a
    /// caller-driven stop.
    pub async fn invalidate(&mut self, alert_message: Option<&str>, error_message: Option<&str>) {
        match std::mem::take(&mut self.state) {
            SessionState::Idle => {}
            SessionState::TagDiscovery { mut session, .. } => {
                if let Some(text) = alert_message {
                    session.set_prompt(text);
                }
                session.invalidate(error_message).await;
                info!("tag discovery session invalidated by caller");
            }
            SessionState::Vas { mut session } => {
                if let Some(text) = alert_message {
                    session.set_prompt(text);
                }
                session.invalidate(error_message).await;
                info!("vas session invalidated by caller");
            }
        }
        self.registry.clear();
    }

    /// Resume polling in the active tag discovery session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveSession`] unless a tag discovery session
    /// is active.
    pub async fn restart_polling(&mut self) -> Result<()> {
        match &mut self.state {
            SessionState::TagDiscovery { session, .. } => {
                session.restart_polling().await;
                Ok(())
            }
            _ => Err(Error::NoActiveSession),
        }
    }

    /// Update the operator prompt on the active session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveSession`] while idle.
    pub fn set_prompt(&mut self, text: &str) -> Result<()> {
        match &mut self.state {
            SessionState::Idle => Err(Error::NoActiveSession),
            SessionState::TagDiscovery { session, .. } => {
                session.set_prompt(text);
                Ok(())
            }
            SessionState::Vas { session } => {
                session.set_prompt(text);
                Ok(())
            }
        }
    }

    /// Process exactly one pending event: a hardware event from the active
    /// session, or a queued remote invalidation request. Blocks until one
    /// arrives.
    pub async fn pump(&mut self) {
        let wake = match &mut self.state {
            SessionState::Idle => Wake::Remote(self.remote_rx.recv().await),
            SessionState::TagDiscovery { session, .. } => tokio::select! {
                event = session.next_event() => Wake::Reader(event),
                request = self.remote_rx.recv() => Wake::Remote(request),
            },
            SessionState::Vas { session } => tokio::select! {
                event = session.next_event() => Wake::Vas(event),
                request = self.remote_rx.recv() => Wake::Remote(request),
            },
        };

        match wake {
            Wake::Reader(Some(ReaderEvent::BecameActive)) => {
                self.emit(SessionEvent::TagSessionActive).await;
            }
            Wake::Reader(Some(ReaderEvent::Detected(tags))) => {
                self.handle_detection(tags).await;
            }
            Wake::Reader(Some(ReaderEvent::Invalidated(error))) => {
                self.handle_reader_invalidated(error).await;
            }
            Wake::Reader(None) => {
                warn!("reader event stream closed unexpectedly");
                self.handle_reader_invalidated(ReaderError::SessionTerminatedUnexpectedly)
                    .await;
            }
            Wake::Vas(Some(VasEvent::BecameActive)) => {
                self.emit(SessionEvent::VasSessionActive).await;
            }
            Wake::Vas(Some(VasEvent::ResponsesReceived(responses))) => {
                self.emit(SessionEvent::VasResponses(responses)).await;
            }
            Wake::Vas(Some(VasEvent::Invalidated(error))) => {
                self.handle_vas_invalidated(error).await;
            }
            Wake::Vas(None) => {
                warn!("vas event stream closed unexpectedly");
                self.handle_vas_invalidated(ReaderError::SessionTerminatedUnexpectedly)
                    .await;
            }
            Wake::Remote(Some(request)) => {
                debug!("remote invalidation request");
                self.invalidate(
                    request.alert_message.as_deref(),
                    request.error_message.as_deref(),
                )
                .await;
            }
            // All invalidation handles dropped; nothing to do.
            Wake::Remote(None) => {}
        }
    }

    /// Pump events until the notification receiver is dropped.
    pub async fn run(&mut self) {
        while !self.events.is_closed() {
            self.pump().await;
        }
    }

    async fn handle_detection(&mut self, tags: Vec<TagConnection>) {
        let mode = match &self.state {
            SessionState::TagDiscovery { mode, .. } => *mode,
            // Detection racing a teardown; the tags are already gone.
            _ => return,
        };

        let Some(tag) = tags.into_iter().next() else {
            debug!("polling pass found no tags");
            self.repoll_or_terminate(mode, ReaderError::other(NO_TAG_DETECTED_MESSAGE))
                .await;
            return;
        };

        if let Err(error) = self.session_connect(&tag).await {
            warn!(%error, "tag connect failed");
            self.repoll_or_terminate(mode, error).await;
            return;
        }

        match convert_tag(tag).await {
            Ok((tag, tech, ndef)) => {
                let handle = self.registry.insert(tag);
                debug!(handle = %handle, "tag detected");
                self.emit(SessionEvent::TagDetected(TagDescriptor {
                    handle,
                    tech,
                    ndef,
                }))
                .await;
                if mode == ReadMode::Multi {
                    self.session_restart().await;
                }
            }
            Err(error) if error.is_transient() => {
                // The tag brushed the field and left; poll for it again
                // even in single-read mode.
                debug!(%error, "transient conversion failure, repolling");
                self.session_restart().await;
            }
            Err(error) => {
                warn!(%error, "tag conversion failed");
                self.repoll_or_terminate(mode, error).await;
            }
        }
    }

    async fn repoll_or_terminate(&mut self, mode: ReadMode, error: ReaderError) {
        match mode {
            ReadMode::Multi => self.session_restart().await,
            ReadMode::Single => self.terminate_with(error).await,
        }
    }

    /// Close the tag session with an error message and notify exactly
    /// once.
    async fn terminate_with(&mut self, error: ReaderError) {
        let portable = error.to_portable();
        if let SessionState::TagDiscovery { mut session, .. } =
            std::mem::take(&mut self.state)
        {
            session.invalidate(Some(&portable.message)).await;
        }
        self.registry.clear();
        info!(code = ?portable.code, "tag discovery session terminated");
        self.emit(SessionEvent::TagSessionInvalidated(portable)).await;
    }

    async fn handle_reader_invalidated(&mut self, error: ReaderError) {
        self.state = SessionState::Idle;
        self.registry.clear();
        let portable = error.to_portable();
        info!(code = ?portable.code, "tag discovery session invalidated");
        self.emit(SessionEvent::TagSessionInvalidated(portable)).await;
    }

    async fn handle_vas_invalidated(&mut self, error: ReaderError) {
        self.state = SessionState::Idle;
        let portable = error.to_portable();
        info!(code = ?portable.code, "vas session invalidated");
        self.emit(SessionEvent::VasSessionInvalidated(portable)).await;
    }

    async fn session_connect(&mut self, tag: &TagConnection) -> std::result::Result<(), ReaderError> {
        match &mut self.state {
            SessionState::TagDiscovery { session, .. } => session.connect(tag).await,
            _ => Ok(()),
        }
    }

    async fn session_restart(&mut self) {
        if let SessionState::TagDiscovery { session, .. } = &mut self.state {
            session.restart_polling().await;
        }
    }

    async fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagbridge_core::reader::ErrorCode;
    use tagbridge_core::types::{MiFareFamily, VasMode, VasStatus};
    use tagbridge_hardware::mock::{
        MockMiFareTag, MockNdef, MockProvider, MockProviderHandle, MockReaderHandle,
        MockReaderSession, MockVasHandle, MockVasSession,
    };
    use tagbridge_hardware::tags::AnyMiFareTag;

    type Manager = SessionManager<MockProvider>;

    fn setup_with_reader() -> (
        Manager,
        mpsc::Receiver<SessionEvent>,
        MockReaderHandle,
        MockProviderHandle,
    ) {
        let (provider, provider_handle) = MockProvider::new();
        let (session, reader_handle) = MockReaderSession::new();
        provider_handle.push_reader(session);
        let (manager, events) = SessionManager::new(provider);
        (manager, events, reader_handle, provider_handle)
    }

    fn setup_with_vas() -> (
        Manager,
        mpsc::Receiver<SessionEvent>,
        MockVasHandle,
        MockProviderHandle,
    ) {
        let (provider, provider_handle) = MockProvider::new();
        let (session, vas_handle) = MockVasSession::new();
        provider_handle.push_vas(session);
        let (manager, events) = SessionManager::new(provider);
        (manager, events, vas_handle, provider_handle)
    }

    fn formatted_tag() -> TagConnection {
        let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04, 0x01, 0x02, 0x03])
            .with_ndef(MockNdef::read_write(137));
        TagConnection::MiFare(AnyMiFareTag::Mock(tag))
    }

    fn broken_tag(error: ReaderError) -> TagConnection {
        let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04, 0x01, 0x02, 0x03])
            .with_ndef(MockNdef::read_write(137).with_query_error(error));
        TagConnection::MiFare(AnyMiFareTag::Mock(tag))
    }

    async fn begin_single(manager: &mut Manager) {
        manager
            .begin_tag_discovery(&[PollingOption::Iso14443], Some("Hold near tag"), true)
            .await
            .unwrap();
    }

    async fn begin_multi(manager: &mut Manager) {
        manager
            .begin_tag_discovery(&[PollingOption::Iso14443], None, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sessions_are_mutually_exclusive() {
        let (mut manager, _events, _reader, provider_handle) = setup_with_reader();
        let (vas, _vas_handle) = MockVasSession::new();
        provider_handle.push_vas(vas);

        begin_single(&mut manager).await;

        let again = manager
            .begin_tag_discovery(&[PollingOption::Iso14443], None, true)
            .await;
        assert_eq!(again, Err(Error::SessionAlreadyExists));

        let vas = manager.begin_vas(&[], None).await;
        assert_eq!(vas, Err(Error::SessionAlreadyExists));
    }

    #[tokio::test]
    async fn begin_surfaces_radio_failure() {
        let (provider, _handle) = MockProvider::new();
        let (mut manager, _events) = SessionManager::new(provider);

        let result = manager
            .begin_tag_discovery(&[PollingOption::Iso14443], None, true)
            .await;
        match result {
            Err(Error::Reader(portable)) => {
                assert_eq!(
                    portable.code,
                    ErrorCode::ReaderSessionInvalidationErrorSystemIsBusy
                );
            }
            other => panic!("expected reader error, got {other:?}"),
        }
        // The failed begin leaves the manager idle.
        assert_eq!(manager.restart_polling().await, Err(Error::NoActiveSession));
    }

    #[tokio::test]
    async fn activation_is_forwarded() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        assert_eq!(reader_handle.prompt(), "Hold near tag");

        manager.pump().await;
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::TagSessionActive)
        ));
    }

    #[tokio::test]
    async fn single_read_detection_registers_and_pauses() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        reader_handle.present_tags(vec![formatted_tag()]).await.unwrap();

        manager.pump().await; // active
        manager.pump().await; // detection
        events.try_recv().unwrap(); // TagSessionActive

        match events.try_recv() {
            Ok(SessionEvent::TagDetected(descriptor)) => {
                let info = descriptor.ndef.unwrap();
                assert_eq!(info.capacity, 137);
                assert_eq!(info.cached_message, None);
            }
            other => panic!("expected detection, got {other:?}"),
        }
        assert_eq!(manager.registry.len(), 1);
        assert_eq!(reader_handle.connect_count(), 1);
        // Single-read mode leaves polling paused for the command phase.
        assert_eq!(reader_handle.restart_count(), 0);
    }

    #[tokio::test]
    async fn multi_read_restarts_after_detection() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_multi(&mut manager).await;
        reader_handle.present_tags(vec![formatted_tag()]).await.unwrap();

        manager.pump().await;
        manager.pump().await;
        events.try_recv().unwrap(); // active
        assert!(matches!(events.try_recv(), Ok(SessionEvent::TagDetected(_))));
        assert_eq!(reader_handle.restart_count(), 1);
    }

    #[tokio::test]
    async fn multi_read_accumulates_tags_across_polling_passes() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_multi(&mut manager).await;

        reader_handle.present_tags(vec![formatted_tag()]).await.unwrap();
        manager.pump().await; // active
        manager.pump().await; // first detection
        events.try_recv().unwrap(); // active
        let first = match events.try_recv() {
            Ok(SessionEvent::TagDetected(descriptor)) => descriptor.handle,
            other => panic!("expected detection, got {other:?}"),
        };

        reader_handle.present_tags(vec![formatted_tag()]).await.unwrap();
        manager.pump().await; // second detection
        let second = match events.try_recv() {
            Ok(SessionEvent::TagDetected(descriptor)) => descriptor.handle,
            other => panic!("expected detection, got {other:?}"),
        };

        // The earlier handle stays live alongside the new one.
        assert_ne!(first, second);
        assert_eq!(manager.registry.len(), 2);
        assert!(manager.registry.get_mut(&first).is_some());
        assert!(manager.registry.get_mut(&second).is_some());
        assert_eq!(reader_handle.restart_count(), 2);
    }

    #[tokio::test]
    async fn empty_pass_terminates_single_read() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        reader_handle.present_tags(Vec::new()).await.unwrap();

        manager.pump().await;
        manager.pump().await;
        events.try_recv().unwrap(); // active

        match events.try_recv() {
            Ok(SessionEvent::TagSessionInvalidated(portable)) => {
                assert_eq!(portable.message, "No tag detected.");
            }
            other => panic!("expected invalidation, got {other:?}"),
        }
        assert_eq!(
            reader_handle.invalidations(),
            vec![Some("No tag detected.".to_string())]
        );
        // Back to idle
        assert_eq!(manager.restart_polling().await, Err(Error::NoActiveSession));
    }

    #[tokio::test]
    async fn empty_pass_repolls_in_multi_read() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_multi(&mut manager).await;
        reader_handle.present_tags(Vec::new()).await.unwrap();

        manager.pump().await;
        manager.pump().await;
        events.try_recv().unwrap(); // active

        assert!(events.try_recv().is_err());
        assert_eq!(reader_handle.restart_count(), 1);
        assert!(reader_handle.invalidations().is_empty());
    }

    #[tokio::test]
    async fn transient_conversion_failure_repolls_even_in_single_read() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        reader_handle
            .present_tags(vec![broken_tag(ReaderError::TagConnectionLost)])
            .await
            .unwrap();

        manager.pump().await;
        manager.pump().await;
        events.try_recv().unwrap(); // active

        assert!(events.try_recv().is_err());
        assert_eq!(reader_handle.restart_count(), 1);
        assert!(reader_handle.invalidations().is_empty());
        assert_eq!(manager.registry.len(), 0);
    }

    #[tokio::test]
    async fn terminal_conversion_failure_ends_single_read() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        reader_handle
            .present_tags(vec![broken_tag(ReaderError::UnsupportedFeature)])
            .await
            .unwrap();

        manager.pump().await;
        manager.pump().await;
        events.try_recv().unwrap(); // active

        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::TagSessionInvalidated(_))
        ));
        assert_eq!(reader_handle.invalidations().len(), 1);
    }

    #[tokio::test]
    async fn terminal_conversion_failure_repolls_in_multi_read() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_multi(&mut manager).await;
        reader_handle
            .present_tags(vec![broken_tag(ReaderError::UnsupportedFeature)])
            .await
            .unwrap();

        manager.pump().await;
        manager.pump().await;
        events.try_recv().unwrap(); // active

        assert!(events.try_recv().is_err());
        assert_eq!(reader_handle.restart_count(), 1);
        assert!(reader_handle.invalidations().is_empty());
    }

    #[tokio::test]
    async fn connect_failure_follows_detection_policy() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        reader_handle.push_connect_error(ReaderError::TagConnectionLost);
        reader_handle.present_tags(vec![formatted_tag()]).await.unwrap();

        manager.pump().await;
        manager.pump().await;
        events.try_recv().unwrap(); // active

        match events.try_recv() {
            Ok(SessionEvent::TagSessionInvalidated(portable)) => {
                assert_eq!(portable.message, "Tag connection lost");
            }
            other => panic!("expected invalidation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hardware_invalidation_is_emitted_once_and_clears_state() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        reader_handle.present_tags(vec![formatted_tag()]).await.unwrap();

        manager.pump().await; // active
        manager.pump().await; // detection
        assert_eq!(manager.registry.len(), 1);

        reader_handle
            .fire_invalidation(ReaderError::SessionTimeout)
            .await
            .unwrap();
        manager.pump().await;

        events.try_recv().unwrap(); // active
        events.try_recv().unwrap(); // detected
        match events.try_recv() {
            Ok(SessionEvent::TagSessionInvalidated(portable)) => {
                assert_eq!(
                    portable.code,
                    ErrorCode::ReaderSessionInvalidationErrorSessionTimeout
                );
            }
            other => panic!("expected invalidation, got {other:?}"),
        }
        assert_eq!(manager.registry.len(), 0);
        assert_eq!(manager.restart_polling().await, Err(Error::NoActiveSession));
    }

    #[tokio::test]
    async fn closed_event_stream_counts_as_unexpected_termination() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        manager.pump().await; // active
        events.try_recv().unwrap();

        drop(reader_handle);
        manager.pump().await;

        match events.try_recv() {
            Ok(SessionEvent::TagSessionInvalidated(portable)) => {
                assert_eq!(
                    portable.code,
                    ErrorCode::ReaderSessionInvalidationErrorSessionTerminatedUnexpectedly
                );
            }
            other => panic!("expected invalidation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn caller_invalidation_is_silent_and_idempotent() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        reader_handle.present_tags(vec![formatted_tag()]).await.unwrap();
        manager.pump().await;
        manager.pump().await;

        manager.invalidate(Some("Done"), Some("stopped")).await;
        manager.invalidate(None, None).await; // no-op while idle

        assert_eq!(
            reader_handle.invalidations(),
            vec![Some("stopped".to_string())]
        );
        assert_eq!(reader_handle.prompt(), "Done");
        assert_eq!(manager.registry.len(), 0);

        events.try_recv().unwrap(); // active
        events.try_recv().unwrap(); // detected
        // No invalidated notification for a caller-driven stop
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn remote_invalidation_is_honored_by_the_pump() {
        let (mut manager, mut events, reader_handle, _provider) = setup_with_reader();
        begin_single(&mut manager).await;
        manager.pump().await; // active
        events.try_recv().unwrap();

        let handle = manager.invalidation_handle();
        handle.invalidate(None, Some("remote stop".to_string())).await;
        manager.pump().await;

        assert_eq!(
            reader_handle.invalidations(),
            vec![Some("remote stop".to_string())]
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn lifecycle_operations_require_an_active_session() {
        let (provider, _handle) = MockProvider::new();
        let (mut manager, _events) = SessionManager::new(provider);

        assert_eq!(manager.restart_polling().await, Err(Error::NoActiveSession));
        assert_eq!(manager.set_prompt("hello"), Err(Error::NoActiveSession));
    }

    #[tokio::test]
    async fn vas_session_forwards_responses() {
        let (mut manager, mut events, vas_handle, _provider) = setup_with_vas();
        manager
            .begin_vas(
                &[VasCommandConfig {
                    mode: VasMode::UrlOnly,
                    pass_identifier: "pass.example".to_string(),
                    url: Some("https://example.com".to_string()),
                }],
                Some("Hold near reader"),
            )
            .await
            .unwrap();
        assert_eq!(vas_handle.prompt(), "Hold near reader");

        vas_handle
            .send_responses(vec![VasResponse {
                status: VasStatus::Success,
                vas_data: vec![0x01],
                mobile_token: Vec::new(),
            }])
            .await
            .unwrap();

        manager.pump().await; // active
        manager.pump().await; // responses
        assert!(matches!(events.try_recv(), Ok(SessionEvent::VasSessionActive)));
        match events.try_recv() {
            Ok(SessionEvent::VasResponses(responses)) => {
                assert_eq!(responses.len(), 1);
                assert_eq!(responses[0].status, VasStatus::Success);
            }
            other => panic!("expected responses, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn vas_invalidation_returns_to_idle() {
        let (mut manager, mut events, vas_handle, provider_handle) = setup_with_vas();
        manager.begin_vas(&[], None).await.unwrap();
        manager.pump().await; // active
        events.try_recv().unwrap();

        vas_handle
            .fire_invalidation(ReaderError::UserCanceled)
            .await
            .unwrap();
        manager.pump().await;

        match events.try_recv() {
            Ok(SessionEvent::VasSessionInvalidated(portable)) => {
                assert_eq!(
                    portable.code,
                    ErrorCode::ReaderSessionInvalidationErrorUserCanceled
                );
            }
            other => panic!("expected invalidation, got {other:?}"),
        }

        // Idle again, a new tag session may begin
        let (session, _reader_handle) = MockReaderSession::new();
        provider_handle.push_reader(session);
        begin_single(&mut manager).await;
    }
}

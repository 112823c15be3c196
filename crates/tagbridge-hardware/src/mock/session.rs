//! Mock tag discovery session.
//!
//! The session consumes a `tokio::sync::mpsc` event channel fed by its
//! controlling handle, so tests drive detection and invalidation exactly the
//! way a hardware driver would. A shared probe records every request made of
//! the session for later assertions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use tagbridge_core::reader::ReaderError;

use crate::session::{ReaderEvent, ReaderSession};
use crate::tags::TagConnection;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct ReaderProbe {
    begun: AtomicBool,
    restart_count: AtomicUsize,
    connect_count: AtomicUsize,
    invalidations: Mutex<Vec<Option<String>>>,
    prompt: Mutex<String>,
    begin_error: Mutex<Option<ReaderError>>,
    connect_errors: Mutex<VecDeque<ReaderError>>,
}

/// Mock tag discovery session for testing and development.
///
/// # Examples
///
/// ```
/// use tagbridge_hardware::mock::{MockMiFareTag, MockReaderSession};
/// use tagbridge_hardware::session::{ReaderEvent, ReaderSession};
/// use tagbridge_hardware::tags::{AnyMiFareTag, TagConnection};
/// use tagbridge_core::types::MiFareFamily;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut session, handle) = MockReaderSession::new();
///     session.begin().await.unwrap();
///
///     let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04; 4]);
///     handle
///         .present_tags(vec![TagConnection::MiFare(AnyMiFareTag::Mock(tag))])
///         .await
///         .unwrap();
///
///     // BecameActive, then the detection
///     assert!(matches!(session.next_event().await, Some(ReaderEvent::BecameActive)));
///     assert!(matches!(session.next_event().await, Some(ReaderEvent::Detected(_))));
/// }
/// ```
#[derive(Debug)]
pub struct MockReaderSession {
    /// Used once to emit `BecameActive`, then dropped so the event stream
    /// closes when every handle is gone.
    activation_tx: Option<mpsc::Sender<ReaderEvent>>,
    event_rx: mpsc::Receiver<ReaderEvent>,
    probe: Arc<ReaderProbe>,
}

impl MockReaderSession {
    /// Create a session together with its controlling handle.
    pub fn new() -> (Self, MockReaderHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let probe = Arc::new(ReaderProbe::default());

        let session = Self {
            activation_tx: Some(event_tx.clone()),
            event_rx,
            probe: Arc::clone(&probe),
        };
        let handle = MockReaderHandle { event_tx, probe };

        (session, handle)
    }
}

impl ReaderSession for MockReaderSession {
    async fn begin(&mut self) -> Result<(), ReaderError> {
        if let Some(error) = lock(&self.probe.begin_error).take() {
            return Err(error);
        }
        self.probe.begun.store(true, Ordering::SeqCst);
        if let Some(tx) = self.activation_tx.take() {
            let _ = tx.send(ReaderEvent::BecameActive).await;
        }
        Ok(())
    }

    async fn invalidate(&mut self, error_message: Option<&str>) {
        lock(&self.probe.invalidations).push(error_message.map(str::to_string));
    }

    async fn restart_polling(&mut self) {
        self.probe.restart_count.fetch_add(1, Ordering::SeqCst);
    }

    fn set_prompt(&mut self, text: &str) {
        *lock(&self.probe.prompt) = text.to_string();
    }

    async fn connect(&mut self, _tag: &TagConnection) -> Result<(), ReaderError> {
        self.probe.connect_count.fetch_add(1, Ordering::SeqCst);
        match lock(&self.probe.connect_errors).pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn next_event(&mut self) -> Option<ReaderEvent> {
        self.event_rx.recv().await
    }
}

/// Handle for driving a [`MockReaderSession`] from the outside.
///
/// Dropping every handle closes the event stream, which the session layer
/// treats as an unexpected termination.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    event_tx: mpsc::Sender<ReaderEvent>,
    probe: Arc<ReaderProbe>,
}

impl MockReaderHandle {
    /// Present a batch of tags as one detection pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has been dropped.
    pub async fn present_tags(&self, tags: Vec<TagConnection>) -> Result<(), ReaderError> {
        self.event_tx
            .send(ReaderEvent::Detected(tags))
            .await
            .map_err(|_| ReaderError::other("reader event channel closed"))
    }

    /// Terminate the session from the hardware side.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has been dropped.
    pub async fn fire_invalidation(&self, error: ReaderError) -> Result<(), ReaderError> {
        self.event_tx
            .send(ReaderEvent::Invalidated(error))
            .await
            .map_err(|_| ReaderError::other("reader event channel closed"))
    }

    /// Make the next `begin` fail with the given error.
    pub fn set_begin_error(&self, error: ReaderError) {
        *lock(&self.probe.begin_error) = Some(error);
    }

    /// Make an upcoming `connect` fail with the given error.
    pub fn push_connect_error(&self, error: ReaderError) {
        lock(&self.probe.connect_errors).push_back(error);
    }

    /// Whether `begin` has run.
    pub fn begun(&self) -> bool {
        self.probe.begun.load(Ordering::SeqCst)
    }

    /// Number of `restart_polling` calls observed.
    pub fn restart_count(&self) -> usize {
        self.probe.restart_count.load(Ordering::SeqCst)
    }

    /// Number of `connect` calls observed.
    pub fn connect_count(&self) -> usize {
        self.probe.connect_count.load(Ordering::SeqCst)
    }

    /// Error messages passed to `invalidate`, in call order.
    pub fn invalidations(&self) -> Vec<Option<String>> {
        lock(&self.probe.invalidations).clone()
    }

    /// Last prompt text set on the session.
    pub fn prompt(&self) -> String {
        lock(&self.probe.prompt).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockMiFareTag;
    use crate::tags::AnyMiFareTag;
    use tagbridge_core::types::MiFareFamily;

    fn mifare_connection() -> TagConnection {
        let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04, 0x01, 0x02, 0x03]);
        TagConnection::MiFare(AnyMiFareTag::Mock(tag))
    }

    #[tokio::test]
    async fn begin_emits_became_active() {
        let (mut session, handle) = MockReaderSession::new();

        session.begin().await.unwrap();
        assert!(handle.begun());
        assert!(matches!(
            session.next_event().await,
            Some(ReaderEvent::BecameActive)
        ));
    }

    #[tokio::test]
    async fn begin_error_is_scripted() {
        let (mut session, handle) = MockReaderSession::new();
        handle.set_begin_error(ReaderError::RadioDisabled);

        assert_eq!(session.begin().await, Err(ReaderError::RadioDisabled));
        assert!(!handle.begun());
    }

    #[tokio::test]
    async fn presented_tags_arrive_as_detection() {
        let (mut session, handle) = MockReaderSession::new();
        session.begin().await.unwrap();
        handle.present_tags(vec![mifare_connection()]).await.unwrap();

        session.next_event().await; // BecameActive
        match session.next_event().await {
            Some(ReaderEvent::Detected(tags)) => assert_eq!(tags.len(), 1),
            other => panic!("expected detection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn probe_records_session_requests() {
        let (mut session, handle) = MockReaderSession::new();

        session.set_prompt("Hold near tag");
        session.restart_polling().await;
        session.restart_polling().await;
        session.invalidate(Some("stop")).await;
        session.invalidate(None).await;

        assert_eq!(handle.prompt(), "Hold near tag");
        assert_eq!(handle.restart_count(), 2);
        assert_eq!(
            handle.invalidations(),
            vec![Some("stop".to_string()), None]
        );
    }

    #[tokio::test]
    async fn connect_failures_are_scripted() {
        let (mut session, handle) = MockReaderSession::new();
        handle.push_connect_error(ReaderError::TagConnectionLost);

        let tag = mifare_connection();
        assert_eq!(
            session.connect(&tag).await,
            Err(ReaderError::TagConnectionLost)
        );
        session.connect(&tag).await.unwrap();
        assert_eq!(handle.connect_count(), 2);
    }

    #[tokio::test]
    async fn dropping_all_handles_closes_the_stream() {
        let (mut session, handle) = MockReaderSession::new();
        session.begin().await.unwrap();
        session.next_event().await; // BecameActive

        drop(handle);
        assert!(session.next_event().await.is_none());
    }
}

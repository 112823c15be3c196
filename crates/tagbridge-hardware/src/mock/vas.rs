//! Mock VAS session, mirroring the reader mock with a response stream
//! instead of detections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use tagbridge_core::reader::ReaderError;
use tagbridge_core::types::VasResponse;

use crate::mock::session::lock;
use crate::session::{VasEvent, VasSession};

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct VasProbe {
    begun: AtomicBool,
    invalidations: Mutex<Vec<Option<String>>>,
    prompt: Mutex<String>,
    begin_error: Mutex<Option<ReaderError>>,
}

/// Mock VAS session for testing and development.
#[derive(Debug)]
pub struct MockVasSession {
    activation_tx: Option<mpsc::Sender<VasEvent>>,
    event_rx: mpsc::Receiver<VasEvent>,
    probe: Arc<VasProbe>,
}

impl MockVasSession {
    /// Create a session together with its controlling handle.
    pub fn new() -> (Self, MockVasHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let probe = Arc::new(VasProbe::default());

        let session = Self {
            activation_tx: Some(event_tx.clone()),
            event_rx,
            probe: Arc::clone(&probe),
        };
        let handle = MockVasHandle { event_tx, probe };

        (session, handle)
    }
}

impl VasSession for MockVasSession {
    async fn begin(&mut self) -> Result<(), ReaderError> {
        if let Some(error) = lock(&self.probe.begin_error).take() {
            return Err(error);
        }
        self.probe.begun.store(true, Ordering::SeqCst);
        if let Some(tx) = self.activation_tx.take() {
            let _ = tx.send(VasEvent::BecameActive).await;
        }
        Ok(())
    }

    async fn invalidate(&mut self, error_message: Option<&str>) {
        lock(&self.probe.invalidations).push(error_message.map(str::to_string));
    }

    fn set_prompt(&mut self, text: &str) {
        *lock(&self.probe.prompt) = text.to_string();
    }

    async fn next_event(&mut self) -> Option<VasEvent> {
        self.event_rx.recv().await
    }
}

/// Handle for driving a [`MockVasSession`] from the outside.
#[derive(Debug, Clone)]
pub struct MockVasHandle {
    event_tx: mpsc::Sender<VasEvent>,
    probe: Arc<VasProbe>,
}

impl MockVasHandle {
    /// Deliver a batch of VAS command results.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has been dropped.
    pub async fn send_responses(&self, responses: Vec<VasResponse>) -> Result<(), ReaderError> {
        self.event_tx
            .send(VasEvent::ResponsesReceived(responses))
            .await
            .map_err(|_| ReaderError::other("vas event channel closed"))
    }

    /// Terminate the session from the hardware side.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has been dropped.
    pub async fn fire_invalidation(&self, error: ReaderError) -> Result<(), ReaderError> {
        self.event_tx
            .send(VasEvent::Invalidated(error))
            .await
            .map_err(|_| ReaderError::other("vas event channel closed"))
    }

    /// Make the next `begin` fail with the given error.
    pub fn set_begin_error(&self, error: ReaderError) {
        *lock(&self.probe.begin_error) = Some(error);
    }

    /// Whether `begin` has run.
    pub fn begun(&self) -> bool {
        self.probe.begun.load(Ordering::SeqCst)
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

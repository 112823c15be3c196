//! Mock session provider.
//!
//! Sessions are prepared ahead of time and handed out in order. The
//! controlling handle shares state with the provider, so tests can queue
//! sessions and flip radio availability even after the provider has been
//! moved into a session manager.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tagbridge_core::reader::ReaderError;
use tagbridge_core::types::{PollingOption, VasCommandConfig};

use crate::mock::session::lock;
use crate::mock::{MockReaderSession, MockVasSession};
use crate::session::SessionProvider;

#[derive(Debug, Default)]
struct ProviderState {
    readers: VecDeque<MockReaderSession>,
    vas_sessions: VecDeque<MockVasSession>,
    tag_unavailable: bool,
    vas_unavailable: bool,
    polling_requests: Vec<Vec<PollingOption>>,
    vas_requests: Vec<Vec<VasCommandConfig>>,
}

/// Mock session provider for testing and development.
///
/// # Examples
///
/// ```
/// use tagbridge_hardware::mock::{MockProvider, MockReaderSession};
/// use tagbridge_hardware::session::SessionProvider;
/// use tagbridge_core::types::PollingOption;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut provider, handle) = MockProvider::new();
///     let (session, _reader_handle) = MockReaderSession::new();
///     handle.push_reader(session);
///
///     let _reader = provider
///         .tag_session(&[PollingOption::Iso14443])
///         .await
///         .unwrap();
///     assert_eq!(handle.polling_requests().len(), 1);
/// }
/// ```
#[derive(Debug)]
pub struct MockProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockProvider {
    /// Create a provider together with its controlling handle. Both radio
    /// capabilities start out available.
    pub fn new() -> (Self, MockProviderHandle) {
        let state = Arc::new(Mutex::new(ProviderState::default()));
        let provider = Self {
            state: Arc::clone(&state),
        };
        (provider, MockProviderHandle { state })
    }
}

impl SessionProvider for MockProvider {
    type Reader = MockReaderSession;
    type Vas = MockVasSession;

    fn tag_reading_available(&self) -> bool {
        !lock(&self.state).tag_unavailable
    }

    fn vas_reading_available(&self) -> bool {
        !lock(&self.state).vas_unavailable
    }

    async fn tag_session(
        &mut self,
        options: &[PollingOption],
    ) -> Result<Self::Reader, ReaderError> {
        let mut state = lock(&self.state);
        state.polling_requests.push(options.to_vec());
        state
            .readers
            .pop_front()
            .ok_or(ReaderError::SystemIsBusy)
    }

    async fn vas_session(
        &mut self,
        configs: &[VasCommandConfig],
    ) -> Result<Self::Vas, ReaderError> {
        let mut state = lock(&self.state);
        state.vas_requests.push(configs.to_vec());
        state
            .vas_sessions
            .pop_front()
            .ok_or(ReaderError::SystemIsBusy)
    }
}

/// Handle for configuring and observing a [`MockProvider`].
#[derive(Debug, Clone)]
pub struct MockProviderHandle {
    state: Arc<Mutex<ProviderState>>,
}

impl MockProviderHandle {
    /// Queue a prepared reader session.
    pub fn push_reader(&self, session: MockReaderSession) {
        lock(&self.state).readers.push_back(session);
    }

    /// Queue a prepared VAS session.
    pub fn push_vas(&self, session: MockVasSession) {
        lock(&self.state).vas_sessions.push_back(session);
    }

    /// Simulate a device without tag reading support.
    pub fn set_tag_reading_available(&self, available: bool) {
        lock(&self.state).tag_unavailable = !available;
    }

    /// Simulate a device without VAS support.
    pub fn set_vas_reading_available(&self, available: bool) {
        lock(&self.state).vas_unavailable = !available;
    }

    /// Polling options requested from the provider, in call order.
    pub fn polling_requests(&self) -> Vec<Vec<PollingOption>> {
        lock(&self.state).polling_requests.clone()
    }

    /// VAS configurations requested from the provider, in call order.
    pub fn vas_requests(&self) -> Vec<Vec<VasCommandConfig>> {
        lock(&self.state).vas_requests.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_handed_out_in_order() {
        let (mut provider, handle) = MockProvider::new();
        let (first, first_handle) = MockReaderSession::new();
        let (second, second_handle) = MockReaderSession::new();
        handle.push_reader(first);
        handle.push_reader(second);

        let mut a = provider.tag_session(&[PollingOption::Iso14443]).await.unwrap();
        let mut b = provider.tag_session(&[PollingOption::Iso15693]).await.unwrap();

        use crate::session::ReaderSession;
        a.begin().await.unwrap();
        assert!(first_handle.begun());
        assert!(!second_handle.begun());
        b.begin().await.unwrap();
        assert!(second_handle.begun());

        assert_eq!(
            handle.polling_requests(),
            vec![vec![PollingOption::Iso14443], vec![PollingOption::Iso15693]]
        );
    }

    #[tokio::test]
    async fn exhausted_queue_reports_busy() {
        let (mut provider, _handle) = MockProvider::new();
        let result = provider.tag_session(&[PollingOption::Iso18092]).await;
        assert!(matches!(result, Err(ReaderError::SystemIsBusy)));
    }

    #[tokio::test]
    async fn availability_flags_flip() {
        let (provider, handle) = MockProvider::new();
        assert!(provider.tag_reading_available());
        assert!(provider.vas_reading_available());

        handle.set_tag_reading_available(false);
        handle.set_vas_reading_available(false);
        assert!(!provider.tag_reading_available());
        assert!(!provider.vas_reading_available());
    }
}

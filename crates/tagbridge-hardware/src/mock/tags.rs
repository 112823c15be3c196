//! Scripted mock tags.
//!
//! Each mock tag pairs fixed identity attributes with a [`MockNdef`]
//! component and per-operation response queues. Queues are consumed front to
//! back; a drained queue answers [`ReaderError::TagResponseError`], which
//! doubles as the "tag left the field" failure in tests.

use std::collections::VecDeque;

use tagbridge_core::reader::ReaderError;
use tagbridge_core::types::{
    CommandApdu, FeliCaPollingRequestCode, FeliCaPollingResponse, FeliCaPollingTimeSlot,
    FeliCaReadWithoutEncryptionResponse, FeliCaRequestServiceV2Response,
    FeliCaSpecificationVersionResponse, FeliCaStatusFlag, Iso15693SystemInfo, MiFareFamily,
    NdefMessage, NdefStatus,
};

use crate::traits::{FeliCaTagOps, Iso7816TagOps, Iso15693TagOps, MiFareTagOps, NdefTag};

/// Scripted NDEF behavior shared by all mock tags.
///
/// # Examples
///
/// ```
/// use tagbridge_hardware::mock::MockNdef;
/// use tagbridge_core::types::NdefMessage;
///
/// let blank = MockNdef::read_write(512);
/// let stored = MockNdef::read_write(512).with_message(NdefMessage::empty());
/// let none = MockNdef::not_supported();
/// ```
#[derive(Debug, Clone)]
pub struct MockNdef {
    status: NdefStatus,
    capacity: usize,
    message: Option<NdefMessage>,
    query_error: Option<ReaderError>,
    read_error: Option<ReaderError>,
    write_error: Option<ReaderError>,
    lock_error: Option<ReaderError>,
}

impl MockNdef {
    /// Tag without NDEF support.
    pub fn not_supported() -> Self {
        Self::with_status(NdefStatus::NotSupported, 0)
    }

    /// Writable NDEF tag with the given capacity and no stored message.
    pub fn read_write(capacity: usize) -> Self {
        Self::with_status(NdefStatus::ReadWrite, capacity)
    }

    /// Read-only NDEF tag with the given capacity.
    pub fn read_only(capacity: usize) -> Self {
        Self::with_status(NdefStatus::ReadOnly, capacity)
    }

    fn with_status(status: NdefStatus, capacity: usize) -> Self {
        Self {
            status,
            capacity,
            message: None,
            query_error: None,
            read_error: None,
            write_error: None,
            lock_error: None,
        }
    }

    /// Store a message on the tag.
    pub fn with_message(mut self, message: NdefMessage) -> Self {
        self.message = Some(message);
        self
    }

    /// Fail the next and all following status queries.
    pub fn with_query_error(mut self, error: ReaderError) -> Self {
        self.query_error = Some(error);
        self
    }

    /// Fail reads.
    pub fn with_read_error(mut self, error: ReaderError) -> Self {
        self.read_error = Some(error);
        self
    }

    /// Fail writes.
    pub fn with_write_error(mut self, error: ReaderError) -> Self {
        self.write_error = Some(error);
        self
    }

    /// Fail lock attempts.
    pub fn with_lock_error(mut self, error: ReaderError) -> Self {
        self.lock_error = Some(error);
        self
    }

    fn query(&self) -> Result<(NdefStatus, usize), ReaderError> {
        match &self.query_error {
            Some(error) => Err(error.clone()),
            None => Ok((self.status, self.capacity)),
        }
    }

    fn read(&self) -> Result<NdefMessage, ReaderError> {
        if let Some(error) = &self.read_error {
            return Err(error.clone());
        }
        if self.status == NdefStatus::NotSupported {
            return Err(ReaderError::UnsupportedFeature);
        }
        match &self.message {
            Some(message) => Ok(message.clone()),
            None => Err(ReaderError::ZeroLengthMessage),
        }
    }

    fn write(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        if let Some(error) = &self.write_error {
            return Err(error.clone());
        }
        match self.status {
            NdefStatus::NotSupported => Err(ReaderError::UnsupportedFeature),
            NdefStatus::ReadOnly => Err(ReaderError::TagNotWritable),
            NdefStatus::ReadWrite => {
                self.message = Some(message.clone());
                Ok(())
            }
        }
    }

    fn lock(&mut self) -> Result<(), ReaderError> {
        if let Some(error) = &self.lock_error {
            return Err(error.clone());
        }
        if self.status == NdefStatus::NotSupported {
            return Err(ReaderError::UnsupportedFeature);
        }
        self.status = NdefStatus::ReadOnly;
        Ok(())
    }
}

fn pop_data<T>(queue: &mut VecDeque<Result<T, ReaderError>>) -> Result<T, ReaderError> {
    queue.pop_front().unwrap_or(Err(ReaderError::TagResponseError))
}

fn pop_unit(queue: &mut VecDeque<Result<(), ReaderError>>) -> Result<(), ReaderError> {
    // Unit operations default to success so tests only script failures.
    queue.pop_front().unwrap_or(Ok(()))
}

/// Mock ISO 14443 (MiFare) tag.
///
/// # Examples
///
/// ```
/// use tagbridge_hardware::mock::{MockMiFareTag, MockNdef};
/// use tagbridge_core::types::MiFareFamily;
///
/// let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04, 0x01, 0x02, 0x03])
///     .with_ndef(MockNdef::read_write(137))
///     .with_mifare_response(Ok(vec![0x00]));
/// ```
#[derive(Debug, Clone)]
pub struct MockMiFareTag {
    family: MiFareFamily,
    identifier: Vec<u8>,
    historical_bytes: Option<Vec<u8>>,
    ndef: MockNdef,
    mifare_responses: VecDeque<Result<Vec<u8>, ReaderError>>,
    iso7816_responses: VecDeque<Result<(Vec<u8>, u8, u8), ReaderError>>,
}

impl MockMiFareTag {
    pub fn new(family: MiFareFamily, identifier: Vec<u8>) -> Self {
        Self {
            family,
            identifier,
            historical_bytes: None,
            ndef: MockNdef::not_supported(),
            mifare_responses: VecDeque::new(),
            iso7816_responses: VecDeque::new(),
        }
    }

    pub fn with_historical_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.historical_bytes = Some(bytes);
        self
    }

    pub fn with_ndef(mut self, ndef: MockNdef) -> Self {
        self.ndef = ndef;
        self
    }

    /// Queue a response for the next `send_mifare_command`.
    pub fn with_mifare_response(mut self, response: Result<Vec<u8>, ReaderError>) -> Self {
        self.mifare_responses.push_back(response);
        self
    }

    /// Queue a response for the next `send_iso7816_command`.
    pub fn with_iso7816_response(
        mut self,
        response: Result<(Vec<u8>, u8, u8), ReaderError>,
    ) -> Self {
        self.iso7816_responses.push_back(response);
        self
    }
}

impl NdefTag for MockMiFareTag {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        self.ndef.query()
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        self.ndef.read()
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        self.ndef.write(message)
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        self.ndef.lock()
    }
}

impl MiFareTagOps for MockMiFareTag {
    fn mifare_family(&self) -> MiFareFamily {
        self.family
    }

    fn identifier(&self) -> &[u8] {
        &self.identifier
    }

    fn historical_bytes(&self) -> Option<&[u8]> {
        self.historical_bytes.as_deref()
    }

    async fn send_mifare_command(&mut self, _packet: &[u8]) -> Result<Vec<u8>, ReaderError> {
        pop_data(&mut self.mifare_responses)
    }

    async fn send_iso7816_command(
        &mut self,
        _apdu: &CommandApdu,
    ) -> Result<(Vec<u8>, u8, u8), ReaderError> {
        pop_data(&mut self.iso7816_responses)
    }
}

/// Mock ISO 7816 smart-card tag.
#[derive(Debug, Clone)]
pub struct MockIso7816Tag {
    initial_selected_aid: String,
    identifier: Vec<u8>,
    historical_bytes: Option<Vec<u8>>,
    application_data: Option<Vec<u8>>,
    proprietary_application_data_coding: bool,
    ndef: MockNdef,
    responses: VecDeque<Result<(Vec<u8>, u8, u8), ReaderError>>,
}

impl MockIso7816Tag {
    pub fn new(initial_selected_aid: impl Into<String>, identifier: Vec<u8>) -> Self {
        Self {
            initial_selected_aid: initial_selected_aid.into(),
            identifier,
            historical_bytes: None,
            application_data: None,
            proprietary_application_data_coding: false,
            ndef: MockNdef::not_supported(),
            responses: VecDeque::new(),
        }
    }

    pub fn with_historical_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.historical_bytes = Some(bytes);
        self
    }

    pub fn with_application_data(mut self, data: Vec<u8>, proprietary: bool) -> Self {
        self.application_data = Some(data);
        self.proprietary_application_data_coding = proprietary;
        self
    }

    pub fn with_ndef(mut self, ndef: MockNdef) -> Self {
        self.ndef = ndef;
        self
    }

    /// Queue a response for the next `send_command`.
    pub fn with_response(mut self, response: Result<(Vec<u8>, u8, u8), ReaderError>) -> Self {
        self.responses.push_back(response);
        self
    }
}

impl NdefTag for MockIso7816Tag {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        self.ndef.query()
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        self.ndef.read()
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        self.ndef.write(message)
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        self.ndef.lock()
    }
}

impl Iso7816TagOps for MockIso7816Tag {
    fn initial_selected_aid(&self) -> &str {
        &self.initial_selected_aid
    }

    fn identifier(&self) -> &[u8] {
        &self.identifier
    }

    fn historical_bytes(&self) -> Option<&[u8]> {
        self.historical_bytes.as_deref()
    }

    fn application_data(&self) -> Option<&[u8]> {
        self.application_data.as_deref()
    }

    fn proprietary_application_data_coding(&self) -> bool {
        self.proprietary_application_data_coding
    }

    async fn send_command(
        &mut self,
        _apdu: &CommandApdu,
    ) -> Result<(Vec<u8>, u8, u8), ReaderError> {
        pop_data(&mut self.responses)
    }
}

/// Mock ISO 15693 vicinity tag.
///
/// Unit operations (select, locks, writes and so on) share one result queue
/// and succeed by default; data operations each draw from a typed queue.
#[derive(Debug, Clone)]
pub struct MockIso15693Tag {
    ic_manufacturer_code: u8,
    ic_serial_number: Vec<u8>,
    identifier: Vec<u8>,
    ndef: MockNdef,
    unit_results: VecDeque<Result<(), ReaderError>>,
    block_responses: VecDeque<Result<Vec<u8>, ReaderError>>,
    multi_block_responses: VecDeque<Result<Vec<Vec<u8>>, ReaderError>>,
    system_info_responses: VecDeque<Result<Iso15693SystemInfo, ReaderError>>,
}

impl MockIso15693Tag {
    pub fn new(ic_manufacturer_code: u8, ic_serial_number: Vec<u8>, identifier: Vec<u8>) -> Self {
        Self {
            ic_manufacturer_code,
            ic_serial_number,
            identifier,
            ndef: MockNdef::not_supported(),
            unit_results: VecDeque::new(),
            block_responses: VecDeque::new(),
            multi_block_responses: VecDeque::new(),
            system_info_responses: VecDeque::new(),
        }
    }

    pub fn with_ndef(mut self, ndef: MockNdef) -> Self {
        self.ndef = ndef;
        self
    }

    /// Queue a result for the next unit operation.
    pub fn with_unit_result(mut self, result: Result<(), ReaderError>) -> Self {
        self.unit_results.push_back(result);
        self
    }

    /// Queue a payload for the next single-block read, security-status
    /// query, or custom command.
    pub fn with_block_response(mut self, response: Result<Vec<u8>, ReaderError>) -> Self {
        self.block_responses.push_back(response);
        self
    }

    /// Queue a payload for the next multi-block read.
    pub fn with_multi_block_response(
        mut self,
        response: Result<Vec<Vec<u8>>, ReaderError>,
    ) -> Self {
        self.multi_block_responses.push_back(response);
        self
    }

    /// Queue a response for the next system-info query.
    pub fn with_system_info(mut self, response: Result<Iso15693SystemInfo, ReaderError>) -> Self {
        self.system_info_responses.push_back(response);
        self
    }
}

impl NdefTag for MockIso15693Tag {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        self.ndef.query()
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        self.ndef.read()
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        self.ndef.write(message)
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        self.ndef.lock()
    }
}

impl Iso15693TagOps for MockIso15693Tag {
    fn ic_manufacturer_code(&self) -> u8 {
        self.ic_manufacturer_code
    }

    fn ic_serial_number(&self) -> &[u8] {
        &self.ic_serial_number
    }

    fn identifier(&self) -> &[u8] {
        &self.identifier
    }

    async fn stay_quiet(&mut self) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn read_single_block(
        &mut self,
        _request_flags: u8,
        _block_number: u8,
    ) -> Result<Vec<u8>, ReaderError> {
        pop_data(&mut self.block_responses)
    }

    async fn write_single_block(
        &mut self,
        _request_flags: u8,
        _block_number: u8,
        _data_block: &[u8],
    ) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn lock_block(
        &mut self,
        _request_flags: u8,
        _block_number: u8,
    ) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn read_multiple_blocks(
        &mut self,
        _request_flags: u8,
        _block_number: u8,
        _number_of_blocks: u8,
    ) -> Result<Vec<Vec<u8>>, ReaderError> {
        pop_data(&mut self.multi_block_responses)
    }

    async fn write_multiple_blocks(
        &mut self,
        _request_flags: u8,
        _block_number: u8,
        _data_blocks: &[Vec<u8>],
    ) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn select(&mut self, _request_flags: u8) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn reset_to_ready(&mut self, _request_flags: u8) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn write_afi(&mut self, _request_flags: u8, _afi: u8) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn lock_afi(&mut self, _request_flags: u8) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn write_dsfid(&mut self, _request_flags: u8, _dsfid: u8) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn lock_dsfid(&mut self, _request_flags: u8) -> Result<(), ReaderError> {
        pop_unit(&mut self.unit_results)
    }

    async fn get_system_info(
        &mut self,
        _request_flags: u8,
    ) -> Result<Iso15693SystemInfo, ReaderError> {
        pop_data(&mut self.system_info_responses)
    }

    async fn get_multiple_block_security_status(
        &mut self,
        _request_flags: u8,
        _block_number: u8,
        _number_of_blocks: u8,
    ) -> Result<Vec<u8>, ReaderError> {
        pop_data(&mut self.block_responses)
    }

    async fn custom_command(
        &mut self,
        _request_flags: u8,
        _command_code: u8,
        _parameters: &[u8],
    ) -> Result<Vec<u8>, ReaderError> {
        pop_data(&mut self.block_responses)
    }
}

/// Mock FeliCa tag.
#[derive(Debug, Clone)]
pub struct MockFeliCaTag {
    current_system_code: Vec<u8>,
    current_idm: Vec<u8>,
    ndef: MockNdef,
    polling_responses: VecDeque<Result<FeliCaPollingResponse, ReaderError>>,
    node_list_responses: VecDeque<Result<Vec<Vec<u8>>, ReaderError>>,
    mode_responses: VecDeque<Result<u8, ReaderError>>,
    read_responses: VecDeque<Result<FeliCaReadWithoutEncryptionResponse, ReaderError>>,
    status_responses: VecDeque<Result<FeliCaStatusFlag, ReaderError>>,
    service_v2_responses: VecDeque<Result<FeliCaRequestServiceV2Response, ReaderError>>,
    version_responses: VecDeque<Result<FeliCaSpecificationVersionResponse, ReaderError>>,
    raw_responses: VecDeque<Result<Vec<u8>, ReaderError>>,
}

impl MockFeliCaTag {
    pub fn new(current_system_code: Vec<u8>, current_idm: Vec<u8>) -> Self {
        Self {
            current_system_code,
            current_idm,
            ndef: MockNdef::not_supported(),
            polling_responses: VecDeque::new(),
            node_list_responses: VecDeque::new(),
            mode_responses: VecDeque::new(),
            read_responses: VecDeque::new(),
            status_responses: VecDeque::new(),
            service_v2_responses: VecDeque::new(),
            version_responses: VecDeque::new(),
            raw_responses: VecDeque::new(),
        }
    }

    pub fn with_ndef(mut self, ndef: MockNdef) -> Self {
        self.ndef = ndef;
        self
    }

    pub fn with_polling_response(
        mut self,
        response: Result<FeliCaPollingResponse, ReaderError>,
    ) -> Self {
        self.polling_responses.push_back(response);
        self
    }

    /// Queue a node-code or system-code list (request_service and
    /// request_system_code share this queue).
    pub fn with_node_list_response(
        mut self,
        response: Result<Vec<Vec<u8>>, ReaderError>,
    ) -> Self {
        self.node_list_responses.push_back(response);
        self
    }

    pub fn with_mode_response(mut self, response: Result<u8, ReaderError>) -> Self {
        self.mode_responses.push_back(response);
        self
    }

    pub fn with_read_response(
        mut self,
        response: Result<FeliCaReadWithoutEncryptionResponse, ReaderError>,
    ) -> Self {
        self.read_responses.push_back(response);
        self
    }

    /// Queue a status-flag pair (write_without_encryption and reset_mode
    /// share this queue).
    pub fn with_status_response(
        mut self,
        response: Result<FeliCaStatusFlag, ReaderError>,
    ) -> Self {
        self.status_responses.push_back(response);
        self
    }

    pub fn with_service_v2_response(
        mut self,
        response: Result<FeliCaRequestServiceV2Response, ReaderError>,
    ) -> Self {
        self.service_v2_responses.push_back(response);
        self
    }

    pub fn with_version_response(
        mut self,
        response: Result<FeliCaSpecificationVersionResponse, ReaderError>,
    ) -> Self {
        self.version_responses.push_back(response);
        self
    }

    pub fn with_raw_response(mut self, response: Result<Vec<u8>, ReaderError>) -> Self {
        self.raw_responses.push_back(response);
        self
    }
}

impl NdefTag for MockFeliCaTag {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        self.ndef.query()
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        self.ndef.read()
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        self.ndef.write(message)
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        self.ndef.lock()
    }
}

impl FeliCaTagOps for MockFeliCaTag {
    fn current_system_code(&self) -> &[u8] {
        &self.current_system_code
    }

    fn current_idm(&self) -> &[u8] {
        &self.current_idm
    }

    async fn polling(
        &mut self,
        _system_code: &[u8],
        _request_code: FeliCaPollingRequestCode,
        _time_slot: FeliCaPollingTimeSlot,
    ) -> Result<FeliCaPollingResponse, ReaderError> {
        pop_data(&mut self.polling_responses)
    }

    async fn request_service(
        &mut self,
        _node_code_list: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, ReaderError> {
        pop_data(&mut self.node_list_responses)
    }

    async fn request_response(&mut self) -> Result<u8, ReaderError> {
        pop_data(&mut self.mode_responses)
    }

    async fn read_without_encryption(
        &mut self,
        _service_code_list: &[Vec<u8>],
        _block_list: &[Vec<u8>],
    ) -> Result<FeliCaReadWithoutEncryptionResponse, ReaderError> {
        pop_data(&mut self.read_responses)
    }

    async fn write_without_encryption(
        &mut self,
        _service_code_list: &[Vec<u8>],
        _block_list: &[Vec<u8>],
        _block_data: &[Vec<u8>],
    ) -> Result<FeliCaStatusFlag, ReaderError> {
        pop_data(&mut self.status_responses)
    }

    async fn request_system_code(&mut self) -> Result<Vec<Vec<u8>>, ReaderError> {
        pop_data(&mut self.node_list_responses)
    }

    async fn request_service_v2(
        &mut self,
        _node_code_list: &[Vec<u8>],
    ) -> Result<FeliCaRequestServiceV2Response, ReaderError> {
        pop_data(&mut self.service_v2_responses)
    }

    async fn request_specification_version(
        &mut self,
    ) -> Result<FeliCaSpecificationVersionResponse, ReaderError> {
        pop_data(&mut self.version_responses)
    }

    async fn reset_mode(&mut self) -> Result<FeliCaStatusFlag, ReaderError> {
        pop_data(&mut self.status_responses)
    }

    async fn send_felica_command(&mut self, _packet: &[u8]) -> Result<Vec<u8>, ReaderError> {
        pop_data(&mut self.raw_responses)
    }
}

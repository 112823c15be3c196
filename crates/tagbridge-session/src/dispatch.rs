//! Technology command dispatch.
//!
//! One method per tag operation, routed through the registry by handle.
//! Every method follows the same contract: typed lookup (absence and family
//! mismatch both answer [`Error::TagNotFound`]), checked narrowing of
//! portable `i64` parameters, capability invocation, then widening of
//! numeric results back to `i64`. Hardware failures surface as
//! [`Error::Command`] with the classified portable error.
//!
//! Dispatch never touches session state or the registry contents: a failed
//! command is reported and nothing else happens.

use tagbridge_core::error::{Error, Result};
use tagbridge_core::reader::ReaderError;
use tagbridge_core::types::{
    ApduResponse, CommandApdu, FeliCaPollingRequestCode, FeliCaPollingResponse,
    FeliCaPollingTimeSlot, FeliCaReadWithoutEncryptionResponse, FeliCaRequestServiceV2Response,
    FeliCaSpecificationVersionResponse, FeliCaStatusFlag, Iso15693RequestFlag,
    Iso15693SystemInfo, NdefMessage, NdefQueryResult, TagHandle, request_flag_bits,
};
use tagbridge_hardware::session::SessionProvider;
use tagbridge_hardware::traits::{FeliCaTagOps, Iso7816TagOps, Iso15693TagOps, MiFareTagOps, NdefTag};

use crate::manager::SessionManager;

/// Checked narrowing of a portable integer into a command byte.
fn narrow(value: i64) -> Result<u8> {
    u8::try_from(value).map_err(|_| Error::command(&ReaderError::ParameterOutOfBound))
}

fn command_error(error: &ReaderError) -> Error {
    Error::command(error)
}

fn apdu_response(payload: Vec<u8>, sw1: u8, sw2: u8) -> ApduResponse {
    ApduResponse {
        payload,
        status_word1: i64::from(sw1),
        status_word2: i64::from(sw2),
    }
}

impl<P: SessionProvider> SessionManager<P> {
    // --- NDEF (any technology family) ---

    /// Query NDEF status and capacity on the tag behind `handle`.
    pub async fn ndef_query_status(&mut self, handle: &TagHandle) -> Result<NdefQueryResult> {
        let tag = self.registry.get_mut(handle).ok_or(Error::TagNotFound)?;
        let (status, capacity) = tag.query_ndef_status().await.map_err(|e| command_error(&e))?;
        Ok(NdefQueryResult {
            status,
            capacity: i64::try_from(capacity).unwrap_or(i64::MAX),
        })
    }

    /// Read the current NDEF message. A formatted but blank tag answers
    /// `Ok(None)`.
    pub async fn ndef_read(&mut self, handle: &TagHandle) -> Result<Option<NdefMessage>> {
        let tag = self.registry.get_mut(handle).ok_or(Error::TagNotFound)?;
        match tag.read_ndef().await {
            Ok(message) => Ok(Some(message)),
            Err(ReaderError::ZeroLengthMessage) => Ok(None),
            Err(error) => Err(command_error(&error)),
        }
    }

    /// Write an NDEF message.
    pub async fn ndef_write(&mut self, handle: &TagHandle, message: &NdefMessage) -> Result<()> {
        let tag = self.registry.get_mut(handle).ok_or(Error::TagNotFound)?;
        tag.write_ndef(message).await.map_err(|e| command_error(&e))
    }

    /// Permanently lock the tag read-only.
    pub async fn ndef_write_lock(&mut self, handle: &TagHandle) -> Result<()> {
        let tag = self.registry.get_mut(handle).ok_or(Error::TagNotFound)?;
        tag.write_lock().await.map_err(|e| command_error(&e))
    }

    // --- MiFare ---

    /// Send a raw MiFare command packet.
    pub async fn mifare_send_command(
        &mut self,
        handle: &TagHandle,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        let tag = self.registry.mifare_mut(handle).ok_or(Error::TagNotFound)?;
        tag.send_mifare_command(data)
            .await
            .map_err(|e| command_error(&e))
    }

    /// Send an ISO 7816 APDU over the ISO 14443-4 layer.
    pub async fn mifare_send_iso7816_command(
        &mut self,
        handle: &TagHandle,
        apdu: &CommandApdu,
    ) -> Result<ApduResponse> {
        let tag = self.registry.mifare_mut(handle).ok_or(Error::TagNotFound)?;
        let (payload, sw1, sw2) = tag
            .send_iso7816_command(apdu)
            .await
            .map_err(|e| command_error(&e))?;
        Ok(apdu_response(payload, sw1, sw2))
    }

    /// Parse `data` as a short-form APDU and send it over the ISO 14443-4
    /// layer.
    pub async fn mifare_send_iso7816_command_raw(
        &mut self,
        handle: &TagHandle,
        data: &[u8],
    ) -> Result<ApduResponse> {
        let apdu = CommandApdu::parse(data).map_err(|e| command_error(&e))?;
        self.mifare_send_iso7816_command(handle, &apdu).await
    }

    // --- ISO 7816 ---

    /// Send an APDU to a smart-card tag.
    pub async fn iso7816_send_command(
        &mut self,
        handle: &TagHandle,
        apdu: &CommandApdu,
    ) -> Result<ApduResponse> {
        let tag = self.registry.iso7816_mut(handle).ok_or(Error::TagNotFound)?;
        let (payload, sw1, sw2) = tag.send_command(apdu).await.map_err(|e| command_error(&e))?;
        Ok(apdu_response(payload, sw1, sw2))
    }

    /// Parse `data` as a short-form APDU and send it.
    pub async fn iso7816_send_command_raw(
        &mut self,
        handle: &TagHandle,
        data: &[u8],
    ) -> Result<ApduResponse> {
        let apdu = CommandApdu::parse(data).map_err(|e| command_error(&e))?;
        self.iso7816_send_command(handle, &apdu).await
    }

    // --- ISO 15693 ---

    pub async fn iso15693_stay_quiet(&mut self, handle: &TagHandle) -> Result<()> {
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.stay_quiet().await.map_err(|e| command_error(&e))
    }

    pub async fn iso15693_read_single_block(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        block_number: i64,
    ) -> Result<Vec<u8>> {
        let block_number = narrow(block_number)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.read_single_block(request_flag_bits(flags), block_number)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_write_single_block(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        block_number: i64,
        data_block: &[u8],
    ) -> Result<()> {
        let block_number = narrow(block_number)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.write_single_block(request_flag_bits(flags), block_number, data_block)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_lock_block(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        block_number: i64,
    ) -> Result<()> {
        let block_number = narrow(block_number)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.lock_block(request_flag_bits(flags), block_number)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_read_multiple_blocks(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        block_number: i64,
        number_of_blocks: i64,
    ) -> Result<Vec<Vec<u8>>> {
        let block_number = narrow(block_number)?;
        let number_of_blocks = narrow(number_of_blocks)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.read_multiple_blocks(request_flag_bits(flags), block_number, number_of_blocks)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_write_multiple_blocks(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        block_number: i64,
        data_blocks: &[Vec<u8>],
    ) -> Result<()> {
        let block_number = narrow(block_number)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.write_multiple_blocks(request_flag_bits(flags), block_number, data_blocks)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_select(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
    ) -> Result<()> {
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.select(request_flag_bits(flags))
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_reset_to_ready(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
    ) -> Result<()> {
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.reset_to_ready(request_flag_bits(flags))
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_write_afi(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        afi: i64,
    ) -> Result<()> {
        let afi = narrow(afi)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.write_afi(request_flag_bits(flags), afi)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_lock_afi(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
    ) -> Result<()> {
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.lock_afi(request_flag_bits(flags))
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_write_dsf_id(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        dsf_id: i64,
    ) -> Result<()> {
        let dsf_id = narrow(dsf_id)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.write_dsfid(request_flag_bits(flags), dsf_id)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_lock_dsf_id(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
    ) -> Result<()> {
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.lock_dsfid(request_flag_bits(flags))
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_get_system_info(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
    ) -> Result<Iso15693SystemInfo> {
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.get_system_info(request_flag_bits(flags))
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn iso15693_get_multiple_block_security_status(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        block_number: i64,
        number_of_blocks: i64,
    ) -> Result<Vec<i64>> {
        let block_number = narrow(block_number)?;
        let number_of_blocks = narrow(number_of_blocks)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        let statuses = tag
            .get_multiple_block_security_status(
                request_flag_bits(flags),
                block_number,
                number_of_blocks,
            )
            .await
            .map_err(|e| command_error(&e))?;
        Ok(statuses.into_iter().map(i64::from).collect())
    }

    pub async fn iso15693_custom_command(
        &mut self,
        handle: &TagHandle,
        flags: &[Iso15693RequestFlag],
        command_code: i64,
        parameters: &[u8],
    ) -> Result<Vec<u8>> {
        let command_code = narrow(command_code)?;
        let tag = self.registry.iso15693_mut(handle).ok_or(Error::TagNotFound)?;
        tag.custom_command(request_flag_bits(flags), command_code, parameters)
            .await
            .map_err(|e| command_error(&e))
    }

    // --- FeliCa ---

    pub async fn felica_polling(
        &mut self,
        handle: &TagHandle,
        system_code: &[u8],
        request_code: FeliCaPollingRequestCode,
        time_slot: FeliCaPollingTimeSlot,
    ) -> Result<FeliCaPollingResponse> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.polling(system_code, request_code, time_slot)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn felica_request_service(
        &mut self,
        handle: &TagHandle,
        node_code_list: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.request_service(node_code_list)
            .await
            .map_err(|e| command_error(&e))
    }

    /// Current operating mode, widened to the portable integer type.
    pub async fn felica_request_response(&mut self, handle: &TagHandle) -> Result<i64> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        let mode = tag.request_response().await.map_err(|e| command_error(&e))?;
        Ok(i64::from(mode))
    }

    pub async fn felica_read_without_encryption(
        &mut self,
        handle: &TagHandle,
        service_code_list: &[Vec<u8>],
        block_list: &[Vec<u8>],
    ) -> Result<FeliCaReadWithoutEncryptionResponse> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.read_without_encryption(service_code_list, block_list)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn felica_write_without_encryption(
        &mut self,
        handle: &TagHandle,
        service_code_list: &[Vec<u8>],
        block_list: &[Vec<u8>],
        block_data: &[Vec<u8>],
    ) -> Result<FeliCaStatusFlag> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.write_without_encryption(service_code_list, block_list, block_data)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn felica_request_system_code(
        &mut self,
        handle: &TagHandle,
    ) -> Result<Vec<Vec<u8>>> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.request_system_code().await.map_err(|e| command_error(&e))
    }

    pub async fn felica_request_service_v2(
        &mut self,
        handle: &TagHandle,
        node_code_list: &[Vec<u8>],
    ) -> Result<FeliCaRequestServiceV2Response> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.request_service_v2(node_code_list)
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn felica_request_specification_version(
        &mut self,
        handle: &TagHandle,
    ) -> Result<FeliCaSpecificationVersionResponse> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.request_specification_version()
            .await
            .map_err(|e| command_error(&e))
    }

    pub async fn felica_reset_mode(&mut self, handle: &TagHandle) -> Result<FeliCaStatusFlag> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.reset_mode().await.map_err(|e| command_error(&e))
    }

    pub async fn felica_send_felica_command(
        &mut self,
        handle: &TagHandle,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        let tag = self.registry.felica_mut(handle).ok_or(Error::TagNotFound)?;
        tag.send_felica_command(data)
            .await
            .map_err(|e| command_error(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::SessionEvent;
    use tagbridge_core::reader::ErrorCode;
    use tagbridge_core::types::{MiFareFamily, NdefStatus, PollingOption};
    use tagbridge_hardware::mock::{
        MockFeliCaTag, MockIso7816Tag, MockIso15693Tag, MockMiFareTag, MockNdef, MockProvider,
        MockReaderSession,
    };
    use tagbridge_hardware::tags::{
        AnyFeliCaTag, AnyIso7816Tag, AnyIso15693Tag, AnyMiFareTag, TagConnection,
    };

    type Manager = SessionManager<MockProvider>;

    /// Run a tag through detection and hand back the manager plus the
    /// registered handle.
    async fn detect(tag: TagConnection) -> (Manager, TagHandle) {
        let (provider, provider_handle) = MockProvider::new();
        let (session, reader_handle) = MockReaderSession::new();
        provider_handle.push_reader(session);

        let (mut manager, mut events) = SessionManager::new(provider);
        manager
            .begin_tag_discovery(&[PollingOption::Iso14443], None, true)
            .await
            .unwrap();
        reader_handle.present_tags(vec![tag]).await.unwrap();
        manager.pump().await; // active
        manager.pump().await; // detection

        events.try_recv().unwrap(); // TagSessionActive
        let handle = match events.try_recv().unwrap() {
            SessionEvent::TagDetected(descriptor) => descriptor.handle,
            other => panic!("expected detection, got {other:?}"),
        };
        (manager, handle)
    }

    fn assert_command_code(error: Error, code: ErrorCode) {
        match error {
            Error::Command(portable) => assert_eq!(portable.code, code),
            other => panic!("expected command error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ndef_read_maps_blank_tag_to_none() {
        let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04; 4])
            .with_ndef(MockNdef::read_write(137));
        let (mut manager, handle) = detect(TagConnection::MiFare(AnyMiFareTag::Mock(tag))).await;

        assert_eq!(manager.ndef_read(&handle).await.unwrap(), None);

        let status = manager.ndef_query_status(&handle).await.unwrap();
        assert_eq!(status.status, NdefStatus::ReadWrite);
        assert_eq!(status.capacity, 137);
    }

    #[tokio::test]
    async fn ndef_write_round_trips_through_any_family() {
        let tag = MockIso15693Tag::new(0x04, vec![0x01; 6], vec![0xE0; 8])
            .with_ndef(MockNdef::read_write(512));
        let (mut manager, handle) =
            detect(TagConnection::Iso15693(AnyIso15693Tag::Mock(tag))).await;

        let message = NdefMessage::empty();
        manager.ndef_write(&handle, &message).await.unwrap();
        assert_eq!(manager.ndef_read(&handle).await.unwrap(), Some(message));

        manager.ndef_write_lock(&handle).await.unwrap();
        let status = manager.ndef_query_status(&handle).await.unwrap();
        assert_eq!(status.status, NdefStatus::ReadOnly);
    }

    #[tokio::test]
    async fn unknown_handle_and_family_mismatch_look_identical() {
        let tag = MockFeliCaTag::new(vec![0x88, 0xB4], vec![0x01; 8]);
        let (mut manager, handle) = detect(TagConnection::FeliCa(AnyFeliCaTag::Mock(tag))).await;

        // Wrong family
        assert_eq!(
            manager.mifare_send_command(&handle, &[0x30, 0x00]).await,
            Err(Error::TagNotFound)
        );
        // Unknown handle
        assert_eq!(
            manager.felica_request_response(&TagHandle::generate()).await,
            Err(Error::TagNotFound)
        );
    }

    #[tokio::test]
    async fn mifare_command_surfaces_hardware_failure() {
        let tag = MockMiFareTag::new(MiFareFamily::Desfire, vec![0x04; 7])
            .with_mifare_response(Ok(vec![0x00, 0x11]))
            .with_mifare_response(Err(ReaderError::TagConnectionLost));
        let (mut manager, handle) = detect(TagConnection::MiFare(AnyMiFareTag::Mock(tag))).await;

        assert_eq!(
            manager.mifare_send_command(&handle, &[0x30, 0x04]).await.unwrap(),
            vec![0x00, 0x11]
        );
        let error = manager
            .mifare_send_command(&handle, &[0x30, 0x04])
            .await
            .unwrap_err();
        assert_command_code(error, ErrorCode::ReaderTransceiveErrorTagConnectionLost);
    }

    #[tokio::test]
    async fn raw_apdu_is_parsed_and_status_words_widened() {
        let tag = MockMiFareTag::new(MiFareFamily::Desfire, vec![0x04; 7])
            .with_iso7816_response(Ok((vec![0x6F, 0x10], 0x90, 0x00)));
        let (mut manager, handle) = detect(TagConnection::MiFare(AnyMiFareTag::Mock(tag))).await;

        let response = manager
            .mifare_send_iso7816_command_raw(&handle, &[0x00, 0xA4, 0x04, 0x00])
            .await
            .unwrap();
        assert_eq!(response.payload, vec![0x6F, 0x10]);
        assert_eq!(response.status_word1, 0x90);
        assert_eq!(response.status_word2, 0x00);

        // Malformed raw APDU is rejected before touching the tag
        let error = manager
            .mifare_send_iso7816_command_raw(&handle, &[0x00])
            .await
            .unwrap_err();
        assert_command_code(error, ErrorCode::ReaderErrorInvalidParameter);
    }

    #[tokio::test]
    async fn iso7816_send_command_routes_and_widens() {
        let tag = MockIso7816Tag::new("A000000003", vec![0x08; 4])
            .with_response(Ok((Vec::new(), 0x6A, 0x82)));
        let (mut manager, handle) =
            detect(TagConnection::Iso7816(AnyIso7816Tag::Mock(tag))).await;

        let apdu = CommandApdu::parse(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        let response = manager.iso7816_send_command(&handle, &apdu).await.unwrap();
        assert_eq!(response.status_word1, 0x6A);
        assert_eq!(response.status_word2, 0x82);
    }

    #[tokio::test]
    async fn iso15693_parameters_narrow_checked() {
        let tag = MockIso15693Tag::new(0x04, vec![0x01; 6], vec![0xE0; 8])
            .with_block_response(Ok(vec![0xDE, 0xAD]));
        let (mut manager, handle) =
            detect(TagConnection::Iso15693(AnyIso15693Tag::Mock(tag))).await;

        let flags = [Iso15693RequestFlag::HighDataRate];
        assert_eq!(
            manager
                .iso15693_read_single_block(&handle, &flags, 7)
                .await
                .unwrap(),
            vec![0xDE, 0xAD]
        );

        // Out-of-range block number never reaches the tag
        let error = manager
            .iso15693_read_single_block(&handle, &flags, 256)
            .await
            .unwrap_err();
        assert_command_code(error, ErrorCode::ReaderErrorParameterOutOfBound);

        let error = manager
            .iso15693_write_afi(&handle, &flags, -1)
            .await
            .unwrap_err();
        assert_command_code(error, ErrorCode::ReaderErrorParameterOutOfBound);
    }

    #[tokio::test]
    async fn iso15693_unit_and_data_operations_route() {
        let tag = MockIso15693Tag::new(0x04, vec![0x01; 6], vec![0xE0; 8])
            .with_block_response(Ok(vec![0x00, 0x01]))
            .with_system_info(Ok(Iso15693SystemInfo {
                data_storage_format_identifier: 1,
                application_family_identifier: 2,
                block_size: 4,
                total_blocks: 64,
                ic_reference: 3,
            }));
        let (mut manager, handle) =
            detect(TagConnection::Iso15693(AnyIso15693Tag::Mock(tag))).await;

        let flags = [Iso15693RequestFlag::HighDataRate, Iso15693RequestFlag::Address];
        manager.iso15693_stay_quiet(&handle).await.unwrap();
        manager.iso15693_select(&handle, &flags).await.unwrap();
        manager
            .iso15693_write_single_block(&handle, &flags, 3, &[0x01, 0x02, 0x03, 0x04])
            .await
            .unwrap();
        manager.iso15693_lock_dsf_id(&handle, &flags).await.unwrap();

        let statuses = manager
            .iso15693_get_multiple_block_security_status(&handle, &flags, 0, 2)
            .await
            .unwrap();
        assert_eq!(statuses, vec![0_i64, 1_i64]);

        let info = manager.iso15693_get_system_info(&handle, &flags).await.unwrap();
        assert_eq!(info.total_blocks, 64);
    }

    #[tokio::test]
    async fn felica_operations_route_and_widen() {
        let tag = MockFeliCaTag::new(vec![0x88, 0xB4], vec![0x01; 8])
            .with_mode_response(Ok(0x01))
            .with_status_response(Ok(FeliCaStatusFlag {
                status_flag1: 0,
                status_flag2: 0,
            }))
            .with_read_response(Ok(FeliCaReadWithoutEncryptionResponse {
                status_flag1: 0,
                status_flag2: 0,
                block_data: vec![vec![0xAA; 16]],
            }));
        let (mut manager, handle) = detect(TagConnection::FeliCa(AnyFeliCaTag::Mock(tag))).await;

        assert_eq!(manager.felica_request_response(&handle).await.unwrap(), 1);

        let read = manager
            .felica_read_without_encryption(&handle, &[vec![0x09, 0x00]], &[vec![0x80, 0x00]])
            .await
            .unwrap();
        assert_eq!(read.block_data.len(), 1);

        let status = manager
            .felica_write_without_encryption(
                &handle,
                &[vec![0x09, 0x00]],
                &[vec![0x80, 0x00]],
                &[vec![0x00; 16]],
            )
            .await
            .unwrap();
        assert_eq!(status.status_flag1, 0);
    }

    #[tokio::test]
    async fn failed_command_leaves_session_and_registry_untouched() {
        let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04; 4]);
        let (mut manager, handle) = detect(TagConnection::MiFare(AnyMiFareTag::Mock(tag))).await;

        // Drained queue means every command fails
        let error = manager
            .mifare_send_command(&handle, &[0x30, 0x00])
            .await
            .unwrap_err();
        assert_command_code(error, ErrorCode::ReaderTransceiveErrorTagResponseError);

        // The handle still resolves and the session is still active
        assert_eq!(manager.registry.len(), 1);
        manager.set_prompt("still here").unwrap();
    }
}

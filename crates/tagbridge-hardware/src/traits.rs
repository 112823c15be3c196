//! Capability traits for NFC tag technologies and reader sessions.
//!
//! Each detected tag exposes exactly one technology-family trait plus the
//! shared [`NdefTag`] surface. All command operations are asynchronous and
//! return `Result<T, ReaderError>` with the native error taxonomy; identity
//! accessors are synchronous and infallible because the values are captured
//! at detection time.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT), eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use tagbridge_core::reader::ReaderError;
use tagbridge_core::types::{
    CommandApdu, FeliCaPollingRequestCode, FeliCaPollingResponse, FeliCaPollingTimeSlot,
    FeliCaReadWithoutEncryptionResponse, FeliCaRequestServiceV2Response,
    FeliCaSpecificationVersionResponse, FeliCaStatusFlag, Iso15693SystemInfo, MiFareFamily,
    NdefMessage, NdefStatus,
};

/// Shared NDEF surface every tag technology exposes.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future` (Edition 2024 RPITIT). You cannot use `Box<dyn NdefTag>`.
/// For dynamic dispatch, use the enum wrappers in the
/// [`tags`](crate::tags) module.
pub trait NdefTag: Send + Sync {
    /// Query NDEF support, read/write state, and capacity in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag stops responding or the status command
    /// fails on the tag.
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError>;

    /// Read the current NDEF message.
    ///
    /// A formatted but blank tag reports
    /// [`ReaderError::ZeroLengthMessage`]; callers that treat blank tags as
    /// readable must map that variant to an empty message themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag does not support NDEF, the read fails,
    /// or the tag holds no message.
    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError>;

    /// Write an NDEF message to the tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is read-only, too small for the message,
    /// or the write fails mid-transfer.
    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError>;

    /// Permanently transition the tag to read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag does not support locking or the lock
    /// command fails.
    async fn write_lock(&mut self) -> Result<(), ReaderError>;
}

/// ISO 14443 contactless tag (MiFare and derivatives).
pub trait MiFareTagOps: NdefTag {
    /// MiFare product family detected during anticollision.
    fn mifare_family(&self) -> MiFareFamily;

    /// Tag UID.
    fn identifier(&self) -> &[u8];

    /// Historical bytes from the answer-to-select, when present.
    fn historical_bytes(&self) -> Option<&[u8]>;

    /// Send a raw MiFare command packet and return the response payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet exceeds the transceive limit or the
    /// tag rejects the command.
    async fn send_mifare_command(&mut self, packet: &[u8]) -> Result<Vec<u8>, ReaderError>;

    /// Send an ISO 7816 APDU over the ISO 14443-4 layer.
    ///
    /// Returns the response payload together with the SW1/SW2 status words.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag does not speak ISO 14443-4 or the
    /// exchange fails.
    async fn send_iso7816_command(
        &mut self,
        apdu: &CommandApdu,
    ) -> Result<(Vec<u8>, u8, u8), ReaderError>;
}

/// ISO 7816 smart-card tag.
pub trait Iso7816TagOps: NdefTag {
    /// Application identifier selected when the tag was detected.
    fn initial_selected_aid(&self) -> &str;

    /// Tag UID.
    fn identifier(&self) -> &[u8];

    /// Historical bytes (type A), when present.
    fn historical_bytes(&self) -> Option<&[u8]>;

    /// Application data (type B), when present.
    fn application_data(&self) -> Option<&[u8]>;

    /// Whether the application data uses a proprietary coding.
    fn proprietary_application_data_coding(&self) -> bool;

    /// Send an APDU and return the response payload with SW1/SW2.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the tag leaves the field.
    async fn send_command(&mut self, apdu: &CommandApdu) -> Result<(Vec<u8>, u8, u8), ReaderError>;
}

/// ISO 15693 vicinity tag.
///
/// Every operation takes the on-wire request flag byte assembled with
/// [`request_flag_bits`](tagbridge_core::types::request_flag_bits).
pub trait Iso15693TagOps: NdefTag {
    /// IC manufacturer code from the UID.
    fn ic_manufacturer_code(&self) -> u8;

    /// IC serial number from the UID.
    fn ic_serial_number(&self) -> &[u8];

    /// Full tag UID.
    fn identifier(&self) -> &[u8];

    async fn stay_quiet(&mut self) -> Result<(), ReaderError>;

    async fn read_single_block(
        &mut self,
        request_flags: u8,
        block_number: u8,
    ) -> Result<Vec<u8>, ReaderError>;

    async fn write_single_block(
        &mut self,
        request_flags: u8,
        block_number: u8,
        data_block: &[u8],
    ) -> Result<(), ReaderError>;

    async fn lock_block(&mut self, request_flags: u8, block_number: u8)
    -> Result<(), ReaderError>;

    async fn read_multiple_blocks(
        &mut self,
        request_flags: u8,
        block_number: u8,
        number_of_blocks: u8,
    ) -> Result<Vec<Vec<u8>>, ReaderError>;

    async fn write_multiple_blocks(
        &mut self,
        request_flags: u8,
        block_number: u8,
        data_blocks: &[Vec<u8>],
    ) -> Result<(), ReaderError>;

    async fn select(&mut self, request_flags: u8) -> Result<(), ReaderError>;

    async fn reset_to_ready(&mut self, request_flags: u8) -> Result<(), ReaderError>;

    async fn write_afi(&mut self, request_flags: u8, afi: u8) -> Result<(), ReaderError>;

    async fn lock_afi(&mut self, request_flags: u8) -> Result<(), ReaderError>;

    async fn write_dsfid(&mut self, request_flags: u8, dsfid: u8) -> Result<(), ReaderError>;

    async fn lock_dsfid(&mut self, request_flags: u8) -> Result<(), ReaderError>;

    async fn get_system_info(&mut self, request_flags: u8)
    -> Result<Iso15693SystemInfo, ReaderError>;

    /// Security status byte per block, starting at `block_number`.
    async fn get_multiple_block_security_status(
        &mut self,
        request_flags: u8,
        block_number: u8,
        number_of_blocks: u8,
    ) -> Result<Vec<u8>, ReaderError>;

    /// Manufacturer custom command; returns the raw response payload.
    async fn custom_command(
        &mut self,
        request_flags: u8,
        command_code: u8,
        parameters: &[u8],
    ) -> Result<Vec<u8>, ReaderError>;
}

/// FeliCa memory-card tag.
pub trait FeliCaTagOps: NdefTag {
    /// System code selected at detection time.
    fn current_system_code(&self) -> &[u8];

    /// Manufacture identifier (IDm) for the selected system.
    fn current_idm(&self) -> &[u8];

    async fn polling(
        &mut self,
        system_code: &[u8],
        request_code: FeliCaPollingRequestCode,
        time_slot: FeliCaPollingTimeSlot,
    ) -> Result<FeliCaPollingResponse, ReaderError>;

    /// Key versions for the given node code list.
    async fn request_service(
        &mut self,
        node_code_list: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, ReaderError>;

    /// Current operating mode byte.
    async fn request_response(&mut self) -> Result<u8, ReaderError>;

    async fn read_without_encryption(
        &mut self,
        service_code_list: &[Vec<u8>],
        block_list: &[Vec<u8>],
    ) -> Result<FeliCaReadWithoutEncryptionResponse, ReaderError>;

    async fn write_without_encryption(
        &mut self,
        service_code_list: &[Vec<u8>],
        block_list: &[Vec<u8>],
        block_data: &[Vec<u8>],
    ) -> Result<FeliCaStatusFlag, ReaderError>;

    async fn request_system_code(&mut self) -> Result<Vec<Vec<u8>>, ReaderError>;

    async fn request_service_v2(
        &mut self,
        node_code_list: &[Vec<u8>],
    ) -> Result<FeliCaRequestServiceV2Response, ReaderError>;

    async fn request_specification_version(
        &mut self,
    ) -> Result<FeliCaSpecificationVersionResponse, ReaderError>;

    async fn reset_mode(&mut self) -> Result<FeliCaStatusFlag, ReaderError>;

    /// Send a raw FeliCa command packet (without the length prefix) and
    /// return the raw response.
    async fn send_felica_command(&mut self, packet: &[u8]) -> Result<Vec<u8>, ReaderError>;
}

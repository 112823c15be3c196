//! Enum wrappers for tag dispatch.
//!
//! Native `async fn` in traits (RPITIT, Edition 2024) are not object-safe,
//! so detected tags cannot be stored as `Box<dyn NdefTag>`. These enum
//! wrappers provide concrete-type dispatch at compile time: one wrapper per
//! technology family, plus [`TagConnection`] as the tagged union the session
//! layer stores and routes commands through.
//!
//! # Examples
//!
//! ```
//! use tagbridge_hardware::tags::{AnyMiFareTag, TagConnection};
//! use tagbridge_hardware::mock::MockMiFareTag;
//! use tagbridge_core::types::{MiFareFamily, TagFamily};
//!
//! let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04, 0x01, 0x02, 0x03]);
//! let connection = TagConnection::MiFare(AnyMiFareTag::Mock(tag));
//! assert_eq!(connection.family(), TagFamily::MiFare);
//! ```

use tagbridge_core::reader::ReaderError;
use tagbridge_core::types::{
    CommandApdu, FeliCaPollingRequestCode, FeliCaPollingResponse, FeliCaPollingTimeSlot,
    FeliCaReadWithoutEncryptionResponse, FeliCaRequestServiceV2Response,
    FeliCaSpecificationVersionResponse, FeliCaStatusFlag, Iso15693SystemInfo, MiFareFamily,
    NdefMessage, NdefStatus, TagFamily, TagTech,
};

use crate::mock::{MockFeliCaTag, MockIso7816Tag, MockIso15693Tag, MockMiFareTag};
use crate::traits::{FeliCaTagOps, Iso7816TagOps, Iso15693TagOps, MiFareTagOps, NdefTag};

/// Enum wrapper for ISO 14443 (MiFare) tag dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyMiFareTag {
    /// Mock tag for development and testing.
    Mock(MockMiFareTag),
}

impl NdefTag for AnyMiFareTag {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        match self {
            Self::Mock(tag) => tag.query_ndef_status().await,
        }
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        match self {
            Self::Mock(tag) => tag.read_ndef().await,
        }
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_ndef(message).await,
        }
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_lock().await,
        }
    }
}

impl MiFareTagOps for AnyMiFareTag {
    fn mifare_family(&self) -> MiFareFamily {
        match self {
            Self::Mock(tag) => tag.mifare_family(),
        }
    }

    fn identifier(&self) -> &[u8] {
        match self {
            Self::Mock(tag) => tag.identifier(),
        }
    }

    fn historical_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Mock(tag) => tag.historical_bytes(),
        }
    }

    async fn send_mifare_command(&mut self, packet: &[u8]) -> Result<Vec<u8>, ReaderError> {
        match self {
            Self::Mock(tag) => tag.send_mifare_command(packet).await,
        }
    }

    async fn send_iso7816_command(
        &mut self,
        apdu: &CommandApdu,
    ) -> Result<(Vec<u8>, u8, u8), ReaderError> {
        match self {
            Self::Mock(tag) => tag.send_iso7816_command(apdu).await,
        }
    }
}

/// Enum wrapper for ISO 7816 smart-card tag dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyIso7816Tag {
    /// Mock tag for development and testing.
    Mock(MockIso7816Tag),
}

impl NdefTag for AnyIso7816Tag {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        match self {
            Self::Mock(tag) => tag.query_ndef_status().await,
        }
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        match self {
            Self::Mock(tag) => tag.read_ndef().await,
        }
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_ndef(message).await,
        }
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_lock().await,
        }
    }
}

impl Iso7816TagOps for AnyIso7816Tag {
    fn initial_selected_aid(&self) -> &str {
        match self {
            Self::Mock(tag) => tag.initial_selected_aid(),
        }
    }

    fn identifier(&self) -> &[u8] {
        match self {
            Self::Mock(tag) => tag.identifier(),
        }
    }

    fn historical_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Mock(tag) => tag.historical_bytes(),
        }
    }

    fn application_data(&self) -> Option<&[u8]> {
        match self {
            Self::Mock(tag) => tag.application_data(),
        }
    }

    fn proprietary_application_data_coding(&self) -> bool {
        match self {
            Self::Mock(tag) => tag.proprietary_application_data_coding(),
        }
    }

    async fn send_command(&mut self, apdu: &CommandApdu) -> Result<(Vec<u8>, u8, u8), ReaderError> {
        match self {
            Self::Mock(tag) => tag.send_command(apdu).await,
        }
    }
}

/// Enum wrapper for ISO 15693 vicinity tag dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyIso15693Tag {
    /// Mock tag for development and testing.
    Mock(MockIso15693Tag),
}

impl NdefTag for AnyIso15693Tag {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        match self {
            Self::Mock(tag) => tag.query_ndef_status().await,
        }
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        match self {
            Self::Mock(tag) => tag.read_ndef().await,
        }
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_ndef(message).await,
        }
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_lock().await,
        }
    }
}

impl Iso15693TagOps for AnyIso15693Tag {
    fn ic_manufacturer_code(&self) -> u8 {
        match self {
            Self::Mock(tag) => tag.ic_manufacturer_code(),
        }
    }

    fn ic_serial_number(&self) -> &[u8] {
        match self {
            Self::Mock(tag) => tag.ic_serial_number(),
        }
    }

    fn identifier(&self) -> &[u8] {
        match self {
            Self::Mock(tag) => tag.identifier(),
        }
    }

    async fn stay_quiet(&mut self) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.stay_quiet().await,
        }
    }

    async fn read_single_block(
        &mut self,
        request_flags: u8,
        block_number: u8,
    ) -> Result<Vec<u8>, ReaderError> {
        match self {
            Self::Mock(tag) => tag.read_single_block(request_flags, block_number).await,
        }
    }

    async fn write_single_block(
        &mut self,
        request_flags: u8,
        block_number: u8,
        data_block: &[u8],
    ) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => {
                tag.write_single_block(request_flags, block_number, data_block)
                    .await
            }
        }
    }

    async fn lock_block(
        &mut self,
        request_flags: u8,
        block_number: u8,
    ) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.lock_block(request_flags, block_number).await,
        }
    }

    async fn read_multiple_blocks(
        &mut self,
        request_flags: u8,
        block_number: u8,
        number_of_blocks: u8,
    ) -> Result<Vec<Vec<u8>>, ReaderError> {
        match self {
            Self::Mock(tag) => {
                tag.read_multiple_blocks(request_flags, block_number, number_of_blocks)
                    .await
            }
        }
    }

    async fn write_multiple_blocks(
        &mut self,
        request_flags: u8,
        block_number: u8,
        data_blocks: &[Vec<u8>],
    ) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => {
                tag.write_multiple_blocks(request_flags, block_number, data_blocks)
                    .await
            }
        }
    }

    async fn select(&mut self, request_flags: u8) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.select(request_flags).await,
        }
    }

    async fn reset_to_ready(&mut self, request_flags: u8) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.reset_to_ready(request_flags).await,
        }
    }

    async fn write_afi(&mut self, request_flags: u8, afi: u8) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_afi(request_flags, afi).await,
        }
    }

    async fn lock_afi(&mut self, request_flags: u8) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.lock_afi(request_flags).await,
        }
    }

    async fn write_dsfid(&mut self, request_flags: u8, dsfid: u8) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_dsfid(request_flags, dsfid).await,
        }
    }

    async fn lock_dsfid(&mut self, request_flags: u8) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.lock_dsfid(request_flags).await,
        }
    }

    async fn get_system_info(
        &mut self,
        request_flags: u8,
    ) -> Result<Iso15693SystemInfo, ReaderError> {
        match self {
            Self::Mock(tag) => tag.get_system_info(request_flags).await,
        }
    }

    async fn get_multiple_block_security_status(
        &mut self,
        request_flags: u8,
        block_number: u8,
        number_of_blocks: u8,
    ) -> Result<Vec<u8>, ReaderError> {
        match self {
            Self::Mock(tag) => {
                tag.get_multiple_block_security_status(request_flags, block_number, number_of_blocks)
                    .await
            }
        }
    }

    async fn custom_command(
        &mut self,
        request_flags: u8,
        command_code: u8,
        parameters: &[u8],
    ) -> Result<Vec<u8>, ReaderError> {
        match self {
            Self::Mock(tag) => {
                tag.custom_command(request_flags, command_code, parameters)
                    .await
            }
        }
    }
}

/// Enum wrapper for FeliCa tag dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyFeliCaTag {
    /// Mock tag for development and testing.
    Mock(MockFeliCaTag),
}

impl NdefTag for AnyFeliCaTag {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        match self {
            Self::Mock(tag) => tag.query_ndef_status().await,
        }
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        match self {
            Self::Mock(tag) => tag.read_ndef().await,
        }
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_ndef(message).await,
        }
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        match self {
            Self::Mock(tag) => tag.write_lock().await,
        }
    }
}

impl FeliCaTagOps for AnyFeliCaTag {
    fn current_system_code(&self) -> &[u8] {
        match self {
            Self::Mock(tag) => tag.current_system_code(),
        }
    }

    fn current_idm(&self) -> &[u8] {
        match self {
            Self::Mock(tag) => tag.current_idm(),
        }
    }

    async fn polling(
        &mut self,
        system_code: &[u8],
        request_code: FeliCaPollingRequestCode,
        time_slot: FeliCaPollingTimeSlot,
    ) -> Result<FeliCaPollingResponse, ReaderError> {
        match self {
            Self::Mock(tag) => tag.polling(system_code, request_code, time_slot).await,
        }
    }

    async fn request_service(
        &mut self,
        node_code_list: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, ReaderError> {
        match self {
            Self::Mock(tag) => tag.request_service(node_code_list).await,
        }
    }

    async fn request_response(&mut self) -> Result<u8, ReaderError> {
        match self {
            Self::Mock(tag) => tag.request_response().await,
        }
    }

    async fn read_without_encryption(
        &mut self,
        service_code_list: &[Vec<u8>],
        block_list: &[Vec<u8>],
    ) -> Result<FeliCaReadWithoutEncryptionResponse, ReaderError> {
        match self {
            Self::Mock(tag) => {
                tag.read_without_encryption(service_code_list, block_list)
                    .await
            }
        }
    }

    async fn write_without_encryption(
        &mut self,
        service_code_list: &[Vec<u8>],
        block_list: &[Vec<u8>],
        block_data: &[Vec<u8>],
    ) -> Result<FeliCaStatusFlag, ReaderError> {
        match self {
            Self::Mock(tag) => {
                tag.write_without_encryption(service_code_list, block_list, block_data)
                    .await
            }
        }
    }

    async fn request_system_code(&mut self) -> Result<Vec<Vec<u8>>, ReaderError> {
        match self {
            Self::Mock(tag) => tag.request_system_code().await,
        }
    }

    async fn request_service_v2(
        &mut self,
        node_code_list: &[Vec<u8>],
    ) -> Result<FeliCaRequestServiceV2Response, ReaderError> {
        match self {
            Self::Mock(tag) => tag.request_service_v2(node_code_list).await,
        }
    }

    async fn request_specification_version(
        &mut self,
    ) -> Result<FeliCaSpecificationVersionResponse, ReaderError> {
        match self {
            Self::Mock(tag) => tag.request_specification_version().await,
        }
    }

    async fn reset_mode(&mut self) -> Result<FeliCaStatusFlag, ReaderError> {
        match self {
            Self::Mock(tag) => tag.reset_mode().await,
        }
    }

    async fn send_felica_command(&mut self, packet: &[u8]) -> Result<Vec<u8>, ReaderError> {
        match self {
            Self::Mock(tag) => tag.send_felica_command(packet).await,
        }
    }
}

/// A live tag connection, tagged by technology family.
///
/// The session layer stores one `TagConnection` per registered handle and
/// routes technology-specific commands by matching the variant. The shared
/// NDEF surface forwards to whichever variant is active.
#[derive(Debug, Clone)]
pub enum TagConnection {
    MiFare(AnyMiFareTag),
    Iso15693(AnyIso15693Tag),
    Iso7816(AnyIso7816Tag),
    FeliCa(AnyFeliCaTag),
}

impl TagConnection {
    /// Technology family of the connected tag.
    pub fn family(&self) -> TagFamily {
        match self {
            Self::MiFare(_) => TagFamily::MiFare,
            Self::Iso15693(_) => TagFamily::Iso15693,
            Self::Iso7816(_) => TagFamily::Iso7816,
            Self::FeliCa(_) => TagFamily::FeliCa,
        }
    }

    /// Snapshot the identity attributes captured at detection time.
    pub fn tech_snapshot(&self) -> TagTech {
        match self {
            Self::MiFare(tag) => TagTech::MiFare {
                family: tag.mifare_family(),
                identifier: tag.identifier().to_vec(),
                historical_bytes: tag.historical_bytes().map(<[u8]>::to_vec),
            },
            Self::Iso15693(tag) => TagTech::Iso15693 {
                ic_manufacturer_code: i64::from(tag.ic_manufacturer_code()),
                ic_serial_number: tag.ic_serial_number().to_vec(),
                identifier: tag.identifier().to_vec(),
            },
            Self::Iso7816(tag) => TagTech::Iso7816 {
                initial_selected_aid: tag.initial_selected_aid().to_string(),
                identifier: tag.identifier().to_vec(),
                historical_bytes: tag.historical_bytes().map(<[u8]>::to_vec),
                application_data: tag.application_data().map(<[u8]>::to_vec),
                proprietary_application_data_coding: tag.proprietary_application_data_coding(),
            },
            Self::FeliCa(tag) => TagTech::FeliCa {
                current_system_code: tag.current_system_code().to_vec(),
                current_idm: tag.current_idm().to_vec(),
            },
        }
    }
}

impl NdefTag for TagConnection {
    async fn query_ndef_status(&mut self) -> Result<(NdefStatus, usize), ReaderError> {
        match self {
            Self::MiFare(tag) => tag.query_ndef_status().await,
            Self::Iso15693(tag) => tag.query_ndef_status().await,
            Self::Iso7816(tag) => tag.query_ndef_status().await,
            Self::FeliCa(tag) => tag.query_ndef_status().await,
        }
    }

    async fn read_ndef(&mut self) -> Result<NdefMessage, ReaderError> {
        match self {
            Self::MiFare(tag) => tag.read_ndef().await,
            Self::Iso15693(tag) => tag.read_ndef().await,
            Self::Iso7816(tag) => tag.read_ndef().await,
            Self::FeliCa(tag) => tag.read_ndef().await,
        }
    }

    async fn write_ndef(&mut self, message: &NdefMessage) -> Result<(), ReaderError> {
        match self {
            Self::MiFare(tag) => tag.write_ndef(message).await,
            Self::Iso15693(tag) => tag.write_ndef(message).await,
            Self::Iso7816(tag) => tag.write_ndef(message).await,
            Self::FeliCa(tag) => tag.write_ndef(message).await,
        }
    }

    async fn write_lock(&mut self) -> Result<(), ReaderError> {
        match self {
            Self::MiFare(tag) => tag.write_lock().await,
            Self::Iso15693(tag) => tag.write_lock().await,
            Self::Iso7816(tag) => tag.write_lock().await,
            Self::FeliCa(tag) => tag.write_lock().await,
        }
    }
}

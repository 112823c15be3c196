//! Portable data model for tags, NDEF records, and command payloads.
//!
//! Every type here crosses the transport boundary: numeric fields are
//! widened to `i64`, binary payloads are opaque byte vectors, and
//! enumerations are closed sets of named values.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::reader::ReaderError;

/// Technology family of a detected tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagFamily {
    /// ISO 14443 contactless tags (MiFare and derivatives).
    MiFare,

    /// ISO 15693 vicinity tags.
    Iso15693,

    /// ISO 7816 smart-card tags.
    Iso7816,

    /// FeliCa memory-card tags.
    FeliCa,
}

impl fmt::Display for TagFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MiFare => "MiFare",
            Self::Iso15693 => "ISO15693",
            Self::Iso7816 => "ISO7816",
            Self::FeliCa => "FeliCa",
        };
        write!(f, "{name}")
    }
}

/// RF polling option requested when a discovery session begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingOption {
    /// Poll for ISO 14443 (type A/B) tags.
    Iso14443,

    /// Poll for ISO 15693 vicinity tags.
    Iso15693,

    /// Poll for ISO 18092 (FeliCa) tags.
    Iso18092,
}

/// Opaque identifier for a live tag connection.
///
/// Handles are generated by the registry, never constructed from caller
/// input, and stay valid only for the lifetime of the session that
/// discovered the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagHandle(String);

impl TagHandle {
    /// Generate a fresh globally-unique handle.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// NDEF support reported by a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NdefStatus {
    /// The tag does not support NDEF.
    NotSupported,

    /// The tag is NDEF readable and writable.
    ReadWrite,

    /// The tag is NDEF read-only.
    ReadOnly,
}

/// Type-name format of an NDEF record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNameFormat {
    Empty,
    WellKnown,
    Media,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
}

/// Single NDEF record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdefPayload {
    pub type_name_format: TypeNameFormat,
    pub record_type: Vec<u8>,
    pub identifier: Vec<u8>,
    pub payload: Vec<u8>,
}

/// NDEF message: an ordered list of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdefMessage {
    pub records: Vec<NdefPayload>,
}

impl NdefMessage {
    /// Message with no records.
    pub fn empty() -> Self {
        Self { records: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// MiFare product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiFareFamily {
    Unknown,
    Ultralight,
    Plus,
    Desfire,
}

/// Technology-specific snapshot of a detected tag.
///
/// Exactly one variant is populated for any given tag; dispatching on the
/// variant replaces runtime type probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagTech {
    MiFare {
        family: MiFareFamily,
        identifier: Vec<u8>,
        historical_bytes: Option<Vec<u8>>,
    },
    Iso15693 {
        ic_manufacturer_code: i64,
        ic_serial_number: Vec<u8>,
        identifier: Vec<u8>,
    },
    Iso7816 {
        initial_selected_aid: String,
        identifier: Vec<u8>,
        historical_bytes: Option<Vec<u8>>,
        application_data: Option<Vec<u8>>,
        proprietary_application_data_coding: bool,
    },
    FeliCa {
        current_system_code: Vec<u8>,
        current_idm: Vec<u8>,
    },
}

impl TagTech {
    /// Technology family of this snapshot.
    pub fn family(&self) -> TagFamily {
        match self {
            Self::MiFare { .. } => TagFamily::MiFare,
            Self::Iso15693 { .. } => TagFamily::Iso15693,
            Self::Iso7816 { .. } => TagFamily::Iso7816,
            Self::FeliCa { .. } => TagFamily::FeliCa,
        }
    }
}

/// NDEF capability snapshot taken at detection time.
///
/// Present on a descriptor iff the tag supports NDEF and the status query
/// succeeded. A readable-but-blank tag has `cached_message: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdefInfo {
    pub status: NdefStatus,
    pub capacity: i64,
    pub cached_message: Option<NdefMessage>,
}

/// Portable snapshot of a discovered tag, addressable by handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDescriptor {
    /// Registry handle for follow-up commands.
    pub handle: TagHandle,

    /// Technology-specific identity attributes.
    pub tech: TagTech,

    /// NDEF capability, if supported and queryable.
    pub ndef: Option<NdefInfo>,
}

/// Result of an explicit NDEF status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdefQueryResult {
    pub status: NdefStatus,
    pub capacity: i64,
}

// ---------------------------------------------------------------------------
// Alternate-service (VAS) session types
// ---------------------------------------------------------------------------

/// VAS command mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VasMode {
    Normal,
    UrlOnly,
}

/// One VAS command configuration; a session runs an ordered sequence of
/// these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VasCommandConfig {
    pub mode: VasMode,
    pub pass_identifier: String,
    pub url: Option<String>,
}

/// Status of a single VAS response.
///
/// `Unrecognized` absorbs status values outside the known set instead of
/// aborting on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VasStatus {
    Success,
    UserIntervention,
    DataNotActivated,
    DataNotFound,
    IncorrectData,
    UnsupportedApplicationVersion,
    WrongLcField,
    WrongParameters,
    Unrecognized,
}

/// One asynchronous VAS result record. Not stored; forwarded as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VasResponse {
    pub status: VasStatus,
    pub vas_data: Vec<u8>,
    pub mobile_token: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Command payloads
// ---------------------------------------------------------------------------

/// ISO 7816 command APDU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandApdu {
    pub instruction_class: u8,
    pub instruction_code: u8,
    pub p1_parameter: u8,
    pub p2_parameter: u8,
    pub data: Vec<u8>,
    /// Expected response length (Le); -1 when absent.
    pub expected_response_length: i64,
}

impl CommandApdu {
    /// Parse a raw short-form APDU: `CLA INS P1 P2 [Lc data] [Le]`.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::InvalidParameter`] when the buffer is shorter
    /// than a four-byte header, and [`ReaderError::InvalidParameterLength`]
    /// when the Lc field disagrees with the remaining length.
    pub fn parse(raw: &[u8]) -> Result<Self, ReaderError> {
        if raw.len() < 4 {
            return Err(ReaderError::InvalidParameter);
        }
        let (header, body) = raw.split_at(4);

        let (data, expected_response_length) = match body {
            [] => (Vec::new(), -1),
            [le] => (Vec::new(), le_to_length(*le)),
            [lc, rest @ ..] => {
                let lc = *lc as usize;
                if rest.len() == lc {
                    (rest.to_vec(), -1)
                } else if rest.len() == lc + 1 {
                    (rest[..lc].to_vec(), le_to_length(rest[lc]))
                } else {
                    return Err(ReaderError::InvalidParameterLength);
                }
            }
        };

        Ok(Self {
            instruction_class: header[0],
            instruction_code: header[1],
            p1_parameter: header[2],
            p2_parameter: header[3],
            data,
            expected_response_length,
        })
    }
}

/// Le = 0 means the maximum short-form length, 256.
fn le_to_length(le: u8) -> i64 {
    if le == 0 { 256 } else { i64::from(le) }
}

/// ISO 7816 response APDU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApduResponse {
    pub payload: Vec<u8>,
    pub status_word1: i64,
    pub status_word2: i64,
}

/// FeliCa polling request code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeliCaPollingRequestCode {
    NoRequest,
    SystemCode,
    CommunicationPerformance,
}

/// FeliCa polling time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeliCaPollingTimeSlot {
    Max1,
    Max2,
    Max4,
    Max8,
    Max16,
}

/// Response to a FeliCa polling command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeliCaPollingResponse {
    pub manufacturer_parameter: Vec<u8>,
    pub request_data: Vec<u8>,
}

/// FeliCa status flag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeliCaStatusFlag {
    pub status_flag1: i64,
    pub status_flag2: i64,
}

/// Response to a FeliCa read-without-encryption command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeliCaReadWithoutEncryptionResponse {
    pub status_flag1: i64,
    pub status_flag2: i64,
    pub block_data: Vec<Vec<u8>>,
}

/// Response to a FeliCa request-service-v2 command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeliCaRequestServiceV2Response {
    pub status_flag1: i64,
    pub status_flag2: i64,
    pub encryption_identifier: i64,
    pub node_key_version_list_aes: Vec<Vec<u8>>,
    pub node_key_version_list_des: Vec<Vec<u8>>,
}

/// Response to a FeliCa request-specification-version command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeliCaSpecificationVersionResponse {
    pub status_flag1: i64,
    pub status_flag2: i64,
    pub basic_version: Vec<u8>,
    pub option_version: Vec<u8>,
}

/// ISO 15693 request flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Iso15693RequestFlag {
    DualSubCarriers,
    HighDataRate,
    ProtocolExtension,
    Select,
    Address,
    Option,
}

impl Iso15693RequestFlag {
    /// Flag bit per the ISO 15693 request format.
    pub fn bit(self) -> u8 {
        match self {
            Self::DualSubCarriers => 0x01,
            Self::HighDataRate => 0x02,
            Self::ProtocolExtension => 0x08,
            Self::Select => 0x10,
            Self::Address => 0x20,
            Self::Option => 0x40,
        }
    }
}

/// Combine request flags into the on-wire flag byte.
pub fn request_flag_bits(flags: &[Iso15693RequestFlag]) -> u8 {
    flags.iter().fold(0, |bits, flag| bits | flag.bit())
}

/// ISO 15693 system information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iso15693SystemInfo {
    pub data_storage_format_identifier: i64,
    pub application_family_identifier: i64,
    pub block_size: i64,
    pub total_blocks: i64,
    pub ic_reference: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_handle_is_unique_and_opaque() {
        let a = TagHandle::generate();
        let b = TagHandle::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn tag_tech_family_matches_variant() {
        let tech = TagTech::FeliCa {
            current_system_code: vec![0x88, 0xB4],
            current_idm: vec![0x01; 8],
        };
        assert_eq!(tech.family(), TagFamily::FeliCa);

        let tech = TagTech::MiFare {
            family: MiFareFamily::Desfire,
            identifier: vec![0x04, 0xAB, 0xCD, 0xEF],
            historical_bytes: None,
        };
        assert_eq!(tech.family(), TagFamily::MiFare);
    }

    #[test]
    fn descriptor_serialization_round_trip() {
        let descriptor = TagDescriptor {
            handle: TagHandle::generate(),
            tech: TagTech::Iso15693 {
                ic_manufacturer_code: 0x04,
                ic_serial_number: vec![0xE0, 0x04, 0x01, 0x02],
                identifier: vec![0xE0, 0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
            },
            ndef: Some(NdefInfo {
                status: NdefStatus::ReadWrite,
                capacity: 512,
                cached_message: None,
            }),
        };

        let json = serde_json::to_string(&descriptor).unwrap();
        let back: TagDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn apdu_parse_header_only() {
        let apdu = CommandApdu::parse(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        assert_eq!(apdu.instruction_class, 0x00);
        assert_eq!(apdu.instruction_code, 0xA4);
        assert!(apdu.data.is_empty());
        assert_eq!(apdu.expected_response_length, -1);
    }

    #[test]
    fn apdu_parse_header_and_le() {
        let apdu = CommandApdu::parse(&[0x00, 0xB0, 0x00, 0x00, 0x10]).unwrap();
        assert_eq!(apdu.expected_response_length, 0x10);

        // Le of zero means 256 in short form
        let apdu = CommandApdu::parse(&[0x00, 0xB0, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(apdu.expected_response_length, 256);
    }

    #[test]
    fn apdu_parse_with_data() {
        let apdu = CommandApdu::parse(&[0x00, 0xA4, 0x04, 0x00, 0x02, 0x3F, 0x00]).unwrap();
        assert_eq!(apdu.data, vec![0x3F, 0x00]);
        assert_eq!(apdu.expected_response_length, -1);
    }

    #[test]
    fn apdu_parse_with_data_and_le() {
        let apdu = CommandApdu::parse(&[0x00, 0xA4, 0x04, 0x00, 0x02, 0x3F, 0x00, 0x08]).unwrap();
        assert_eq!(apdu.data, vec![0x3F, 0x00]);
        assert_eq!(apdu.expected_response_length, 8);
    }

    #[test]
    fn apdu_parse_rejects_short_and_inconsistent_input() {
        assert_eq!(
            CommandApdu::parse(&[0x00, 0xA4]),
            Err(ReaderError::InvalidParameter)
        );
        // Lc claims 4 bytes but only 2 follow
        assert_eq!(
            CommandApdu::parse(&[0x00, 0xA4, 0x04, 0x00, 0x04, 0x3F, 0x00]),
            Err(ReaderError::InvalidParameterLength)
        );
    }

    #[test]
    fn request_flag_bits_combine() {
        let bits = request_flag_bits(&[
            Iso15693RequestFlag::HighDataRate,
            Iso15693RequestFlag::Address,
        ]);
        assert_eq!(bits, 0x22);
        assert_eq!(request_flag_bits(&[]), 0);
    }
}

//! Conversion of a freshly connected tag into its portable descriptor
//! parts.

use tagbridge_core::reader::ReaderError;
use tagbridge_core::types::{NdefInfo, NdefStatus, TagTech};
use tagbridge_hardware::tags::TagConnection;
use tagbridge_hardware::traits::NdefTag;

/// Snapshot a connected tag's identity and NDEF capability.
///
/// Takes ownership of the connection and returns it alongside the snapshot
/// so the caller can register it. The NDEF probe runs against the live tag:
/// a tag without NDEF support yields `ndef: None`, a formatted but blank
/// tag yields an info block with no cached message.
///
/// # Errors
///
/// Returns the underlying reader error when the status query or the
/// initial read fails. `ZeroLengthMessage` is not a failure here.
pub async fn convert_tag(
    mut tag: TagConnection,
) -> Result<(TagConnection, TagTech, Option<NdefInfo>), ReaderError> {
    let tech = tag.tech_snapshot();

    let (status, capacity) = tag.query_ndef_status().await?;
    if status == NdefStatus::NotSupported {
        return Ok((tag, tech, None));
    }

    let cached_message = match tag.read_ndef().await {
        Ok(message) => Some(message),
        Err(ReaderError::ZeroLengthMessage) => None,
        Err(error) => return Err(error),
    };

    let ndef = NdefInfo {
        status,
        capacity: i64::try_from(capacity).unwrap_or(i64::MAX),
        cached_message,
    };
    Ok((tag, tech, Some(ndef)))
}

//! `.torrent` metainfo validation shared by backends that accept raw bytes
//! (§4.B "`add_transfer_by_bytes`").

use bendy::decoding::FromBencode;

use crate::error::{BackendError, BackendResult};

/// Default cap on an accepted `.torrent` payload (§4.B).
pub const DEFAULT_MAX_TORRENT_BYTES: usize = 10 * 1024 * 1024;

struct MetainfoEnvelope;

impl FromBencode for MetainfoEnvelope {
    fn decode_bencode_object(
        object: bendy::decoding::Object<'_, '_>,
    ) -> Result<Self, bendy::decoding::Error> {
        let mut dict = object.try_into_dictionary()?;
        let mut saw_info = false;
        while let Some((key, value)) = dict.next_pair()? {
            if key == b"info" {
                value.try_into_dictionary()?;
                saw_info = true;
            }
        }
        if saw_info {
            Ok(Self)
        } else {
            Err(bendy::decoding::Error::missing_field("info"))
        }
    }
}

/// Validate a candidate `.torrent` payload before handing it to a backend.
///
/// Checks, in order: filename suffix, size cap, and bencode well-formedness.
///
/// # Errors
///
/// Returns [`BackendError::InvalidContent`] describing the first check that
/// failed.
pub fn validate_torrent_bytes(
    content: &[u8],
    filename: &str,
    max_bytes: usize,
) -> BackendResult<()> {
    if !filename.to_ascii_lowercase().ends_with(".torrent") {
        return Err(BackendError::InvalidContent {
            operation: "add_transfer_by_bytes",
            reason: format!("filename '{filename}' does not end in .torrent"),
        });
    }

    if content.len() > max_bytes {
        return Err(BackendError::InvalidContent {
            operation: "add_transfer_by_bytes",
            reason: format!("payload exceeds {max_bytes} byte cap"),
        });
    }

    MetainfoEnvelope::from_bencode(content).map_err(|source| BackendError::InvalidContent {
        operation: "add_transfer_by_bytes",
        reason: format!("not a valid bencoded metainfo file: {source}"),
    })?;

    Ok(())
}

//! Reconstructed artifact format.
//!
//! ```text
//! [8 bytes: header length L, big-endian u64][L bytes: JSON header][payload]
//! ```
//!
//! The header is a JSON object of string values; the payload is the object's
//! parts in ascending part-number order.

use anyhow::Context;

use crate::error::{StorageError, StorageResult};
use crate::types::{FILENAME_KEY, Metadata};

/// Size of the big-endian header length prefix.
pub const LENGTH_PREFIX_LEN: usize = 8;

/// Pick the header entries for an artifact out of the object's metadata.
///
/// `filename` is carried over whenever present, requested or not. Requested
/// keys the object does not have are skipped.
#[must_use]
pub fn select_header(metadata: &Metadata, include_keys: &[&str]) -> Metadata {
    metadata
        .iter()
        .filter(|(key, _)| key.as_str() == FILENAME_KEY || include_keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Encode the length prefix followed by the JSON header.
pub fn encode_header(header: &Metadata) -> StorageResult<Vec<u8>> {
    let json = serde_json::to_vec(header).context("failed to encode artifact header")?;
    let mut out = Vec::with_capacity(LENGTH_PREFIX_LEN + json.len());
    out.extend_from_slice(&(json.len() as u64).to_be_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

/// Split an artifact into its header and payload.
///
/// # Examples
///
/// ```
/// use holydb_storage::Metadata;
/// use holydb_storage::artifact::{decode_artifact, encode_header};
///
/// let header = Metadata::from([("filename".to_owned(), "a.bin".to_owned())]);
/// let mut artifact = encode_header(&header).unwrap();
/// artifact.extend_from_slice(b"payload");
///
/// let (decoded, payload) = decode_artifact(&artifact).unwrap();
/// assert_eq!(decoded, header);
/// assert_eq!(payload, b"payload");
/// ```
pub fn decode_artifact(bytes: &[u8]) -> StorageResult<(Metadata, &[u8])> {
    if bytes.len() < LENGTH_PREFIX_LEN {
        return Err(StorageError::invalid(
            "artifact is shorter than its length prefix",
        ));
    }
    let (prefix, rest) = bytes.split_at(LENGTH_PREFIX_LEN);
    let mut len_bytes = [0u8; LENGTH_PREFIX_LEN];
    len_bytes.copy_from_slice(prefix);
    let header_len = usize::try_from(u64::from_be_bytes(len_bytes))
        .ok()
        .filter(|len| *len <= rest.len())
        .ok_or_else(|| StorageError::invalid("artifact header is truncated"))?;

    let (header, payload) = rest.split_at(header_len);
    let header: Metadata = serde_json::from_slice(header)
        .map_err(|e| StorageError::invalid(format!("artifact header is not a string map: {e}")))?;
    Ok((header, payload))
}

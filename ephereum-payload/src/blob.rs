//! EIP-4844 blob packing.
//!
//! Each 32-byte field element carries a leading `0x00` (keeping it below the
//! BLS modulus) and up to 31 data bytes. The first short chunk is followed
//! by a `0x80` terminator and packing stops there; data whose length is a
//! multiple of 31 gets one extra element holding only `0x00 0x80`.

use tracing::debug;

use ephereum_core::constants::{BYTES_PER_BLOB, BYTES_PER_FIELD_ELEMENT, FIELD_ELEMENTS_PER_BLOB};
use ephereum_core::error::{EphereumError, Result};

/// Most blobs a single transaction may carry.
pub const MAX_BLOBS_PER_TRANSACTION: usize = 6;

/// Data bytes per field element.
const CHUNK: usize = BYTES_PER_FIELD_ELEMENT - 1;

/// Terminator byte following the last chunk.
const TERMINATOR: u8 = 0x80;

/// Largest payload that fits in one transaction's blobs.
pub const MAX_BYTES_PER_TRANSACTION: usize =
    BYTES_PER_BLOB * MAX_BLOBS_PER_TRANSACTION - 1 - FIELD_ELEMENTS_PER_BLOB * MAX_BLOBS_PER_TRANSACTION;

/// Packs `data` into zero-padded 131072-byte blobs.
///
/// # Errors
/// `InvalidInput` for empty data or data over [`MAX_BYTES_PER_TRANSACTION`].
pub fn to_blobs(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    if data.is_empty() {
        return Err(EphereumError::InvalidInput("blob data is empty".into()));
    }
    if data.len() > MAX_BYTES_PER_TRANSACTION {
        return Err(EphereumError::InvalidInput(format!(
            "blob data is {} bytes, limit is {}",
            data.len(),
            MAX_BYTES_PER_TRANSACTION
        )));
    }

    let mut blobs = Vec::new();
    let mut position = 0;
    let mut active = true;

    while active {
        let mut blob = vec![0u8; BYTES_PER_BLOB];
        let mut cursor = 0;

        for _ in 0..FIELD_ELEMENTS_PER_BLOB {
            let end = (position + CHUNK).min(data.len());
            let chunk = &data[position..end];

            blob[cursor] = 0x00;
            cursor += 1;
            blob[cursor..cursor + chunk.len()].copy_from_slice(chunk);
            cursor += chunk.len();

            if chunk.len() < CHUNK {
                blob[cursor] = TERMINATOR;
                active = false;
                break;
            }
            position += CHUNK;
        }

        blobs.push(blob);
    }

    Ok(blobs)
}

/// Unpacks blobs produced by [`to_blobs`].
///
/// Skips the leading byte of every field element and cuts at the last
/// `0x80` of the stream.
pub fn from_blobs(blobs: &[Vec<u8>]) -> Vec<u8> {
    let stream: Vec<u8> = blobs.concat();
    let end = stream
        .iter()
        .rposition(|&b| b == TERMINATOR)
        .unwrap_or(stream.len());

    stream[..end]
        .iter()
        .enumerate()
        .filter(|(i, _)| i % BYTES_PER_FIELD_ELEMENT != 0)
        .map(|(_, &b)| b)
        .collect()
}

/// True if `bytes` looks like whole packed blobs: a positive multiple of
/// the blob size, every field element starting with `0x00`, and a
/// terminator present.
pub fn is_blob_encoded(bytes: &[u8]) -> bool {
    !bytes.is_empty()
        && bytes.len() % BYTES_PER_BLOB == 0
        && bytes.chunks(BYTES_PER_FIELD_ELEMENT).all(|element| element[0] == 0x00)
        && bytes.contains(&TERMINATOR)
}

/// Returns the frame carried by fetched blob bytes.
///
/// Well-formed blobs are unpacked; anything else is assumed to already be a
/// raw frame and returned unchanged.
pub fn decode_blob_payload(bytes: &[u8]) -> Vec<u8> {
    if !is_blob_encoded(bytes) {
        debug!(len = bytes.len(), "Treating blob bytes as a raw frame");
        return bytes.to_vec();
    }

    let blobs: Vec<Vec<u8>> = bytes.chunks(BYTES_PER_BLOB).map(<[u8]>::to_vec).collect();
    from_blobs(&blobs)
}

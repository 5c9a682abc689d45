//! Snapshot encoding and decoding

use crate::error::{CacheError, Result};
use crate::store::StoreMap;

/// Magic bytes at the start of every snapshot
pub const MAGIC: &[u8; 4] = b"CKVS";

/// Current snapshot format version
pub const VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + payload length (8) + crc (4)
pub const HEADER_SIZE: usize = 18;

/// Encode a full store mapping
pub fn encode_snapshot(map: &StoreMap) -> Result<Vec<u8>> {
    let payload =
        bincode::serialize(map).map_err(|e| CacheError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);

    Ok(bytes)
}

/// Decode a snapshot produced by `encode_snapshot`
pub fn decode_snapshot(bytes: &[u8]) -> Result<StoreMap> {
    if bytes.len() < HEADER_SIZE {
        return Err(CacheError::Decode(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(CacheError::Decode("Bad magic bytes".to_string()));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(CacheError::Decode(format!(
            "Unsupported snapshot version {}",
            version
        )));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[6..14]);
    let payload_len = u64::from_le_bytes(len_bytes);

    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[14..18]);
    let expected_crc = u32::from_le_bytes(crc_bytes);

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() as u64 != payload_len {
        return Err(CacheError::Decode(format!(
            "Payload length mismatch: header says {}, file has {}",
            payload_len,
            payload.len()
        )));
    }

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(CacheError::Decode(format!(
            "CRC mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    bincode::deserialize(payload).map_err(|e| CacheError::Decode(e.to_string()))
}

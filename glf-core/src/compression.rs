//! Compression adapter for image and blob payloads.
//!
//! Payloads are tagged with the transform that was applied before storage:
//!
//! | Tag | Meaning                                                   |
//! |-----|-----------------------------------------------------------|
//! | 0   | zlib, applied and reversed transparently by the store     |
//! | 1   | none, stored as-is                                        |
//! | 2   | H.264, compressed by the producer; stored and returned opaque |

use std::io::{Read, Write};

use enum_primitive_derive::Primitive;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use num_traits::FromPrimitive;

use crate::error::CompressionError;

/// Largest payload the store will restore, for images and blobs alike
pub const MAX_RAW_LEN: usize = 64 * 1024 * 1024;

/// Initial output buffer per input byte when inflating
const INFLATE_RESERVE_FACTOR: usize = 4;

#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionType {
    #[default]
    Zlib = 0,
    None = 1,
    /// Externally encoded video, never touched by the store
    H264 = 2,
}

impl CompressionType {
    /// Map an on-disk tag, rejecting tags we can't reverse
    pub fn from_tag(tag: u32) -> Result<Self, CompressionError> {
        Self::from_u32(tag).ok_or(CompressionError::UnsupportedCompression(tag))
    }

    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// Apply the transform selected by `kind` to `raw`
pub fn compress(kind: CompressionType, raw: &[u8]) -> Result<Vec<u8>, CompressionError> {
    if kind != CompressionType::H264 && raw.len() > MAX_RAW_LEN {
        return Err(CompressionError::TooLarge { limit: MAX_RAW_LEN });
    }
    match kind {
        CompressionType::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
            encoder.write_all(raw)?;
            Ok(encoder.finish()?)
        }
        CompressionType::None | CompressionType::H264 => Ok(raw.to_vec()),
    }
}

/// Reverse the transform named by `tag`.
///
/// When `expected_len` is given the restored payload must have exactly that
/// size. Output never grows past [`MAX_RAW_LEN`]. Externally encoded payloads
/// are returned unchanged and never checked.
pub fn decompress(
    tag: u32,
    data: &[u8],
    expected_len: Option<usize>,
) -> Result<Vec<u8>, CompressionError> {
    let kind = CompressionType::from_tag(tag)?;
    if kind == CompressionType::H264 {
        return Ok(data.to_vec());
    }
    if let Some(expected) = expected_len {
        if expected > MAX_RAW_LEN {
            return Err(CompressionError::TooLarge { limit: MAX_RAW_LEN });
        }
    }

    let raw = match kind {
        CompressionType::Zlib => {
            let limit = expected_len.unwrap_or(MAX_RAW_LEN);
            let reserve = limit.min(data.len().saturating_mul(INFLATE_RESERVE_FACTOR));
            let mut out = Vec::with_capacity(reserve);
            // Read one byte past the limit so oversize streams are detected
            ZlibDecoder::new(data)
                .take(limit as u64 + 1)
                .read_to_end(&mut out)?;
            if expected_len.is_none() && out.len() > MAX_RAW_LEN {
                return Err(CompressionError::TooLarge { limit: MAX_RAW_LEN });
            }
            out
        }
        CompressionType::None | CompressionType::H264 => data.to_vec(),
    };

    match expected_len {
        Some(expected) if raw.len() != expected => Err(CompressionError::SizeMismatch {
            expected,
            actual: raw.len(),
        }),
        _ => Ok(raw),
    }
}

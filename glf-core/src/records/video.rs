//! Compressed blob records, used for video frames.
//!
//! Body: `version u16, compression_type u32, (len u32, bytes)`.

use crate::compression::{self, CompressionType};
use crate::error::{DecodeError, EncodeError};
use crate::wire::{ByteReader, ByteWriter};

pub const BLOB_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct CompressedRecord {
    pub version: u16,
    pub compression: CompressionType,
    /// Payload as handed to the producer, before any store-side compression
    pub data: Vec<u8>,
}

impl CompressedRecord {
    pub fn new(compression: CompressionType, data: Vec<u8>) -> Self {
        Self {
            version: BLOB_VERSION,
            compression,
            data,
        }
    }

    pub(crate) fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u16(self.version);
        w.put_u32(self.compression.tag());
        let stored = compression::compress(self.compression, &self.data)?;
        w.put_len_prefixed("blob payload", &stored)
    }

    pub(crate) fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let version = r.u16()?;
        let tag = r.u32()?;
        let compression = CompressionType::from_tag(tag)?;
        let data = compression::decompress(tag, r.len_prefixed()?, None)?;
        Ok(Self {
            version,
            compression,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompressionError;

    fn roundtrip(rec: &CompressedRecord) -> CompressedRecord {
        let mut w = ByteWriter::with_capacity(64);
        rec.encode_body(&mut w).unwrap();
        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes);
        let decoded = CompressedRecord::decode_body(&mut r).unwrap();
        r.finish().unwrap();
        decoded
    }

    #[test]
    fn test_roundtrip_each_compression() {
        for kind in [
            CompressionType::Zlib,
            CompressionType::None,
            CompressionType::H264,
        ] {
            let rec = CompressedRecord::new(kind, vec![42; 300]);
            assert_eq!(roundtrip(&rec), rec);
        }
    }

    #[test]
    fn test_empty_blob() {
        let rec = CompressedRecord::new(CompressionType::None, Vec::new());
        assert_eq!(roundtrip(&rec), rec);
    }

    #[test]
    fn test_unknown_tag() {
        let mut w = ByteWriter::with_capacity(16);
        w.put_u16(1);
        w.put_u32(5);
        w.put_u32(0);
        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(
            CompressedRecord::decode_body(&mut r),
            Err(DecodeError::Compression(
                CompressionError::UnsupportedCompression(5)
            ))
        );
    }

    #[test]
    fn test_inflated_size_is_capped() {
        let mut w = ByteWriter::with_capacity(16);
        let stored = compression::tests::zero_stream(compression::MAX_RAW_LEN + 1);
        w.put_u16(BLOB_VERSION);
        w.put_u32(CompressionType::Zlib.tag());
        w.put_len_prefixed("blob payload", &stored).unwrap();
        let bytes = w.into_inner();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(
            CompressedRecord::decode_body(&mut r),
            Err(DecodeError::Compression(CompressionError::TooLarge {
                limit: compression::MAX_RAW_LEN
            }))
        );
    }
}

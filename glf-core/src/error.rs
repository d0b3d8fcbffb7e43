//! Error types for record encoding and decoding

use thiserror::Error;

/// Errors raised by the compression adapter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompressionError {
    /// The compression tag is not one the store knows how to reverse
    #[error("Unsupported compression type: {0}")]
    UnsupportedCompression(u32),

    /// Decompressed payload does not have the size the record declares
    #[error("Decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Restored payload would exceed the store's size ceiling
    #[error("Decompressed payload exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The underlying compressor failed (corrupt stream etc.)
    #[error("Compressor failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for CompressionError {
    fn from(e: std::io::Error) -> Self {
        CompressionError::Io(e.to_string())
    }
}

/// Errors that can occur when decoding a stored record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Not enough bytes for the field being read
    #[error("Record truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Header does not begin with the `*` start marker
    #[error("Invalid start marker: expected 0x2A, got {0:#04X}")]
    InvalidStartMarker(u8),

    /// Header length field doesn't match the bytes supplied
    #[error("Length mismatch: header says {header_len} bytes, record has {actual_len}")]
    LengthMismatch { header_len: usize, actual_len: usize },

    /// Fields are present but inconsistent with each other
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// Payload could not be decompressed
    #[error("{0}")]
    Compression(#[from] CompressionError),
}

impl From<bincode::Error> for DecodeError {
    fn from(e: bincode::Error) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

/// Errors that can occur when encoding a record for storage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// Variable-length fields disagree with the fixed fields that size them
    #[error("Inconsistent record: {0}")]
    Inconsistent(String),

    /// A field is too large for its on-disk length prefix
    #[error("Field '{field}' too large: {len} bytes (max {max})")]
    TooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Payload could not be compressed
    #[error("{0}")]
    Compression(#[from] CompressionError),
}

impl From<bincode::Error> for EncodeError {
    fn from(e: bincode::Error) -> Self {
        EncodeError::Inconsistent(e.to_string())
    }
}

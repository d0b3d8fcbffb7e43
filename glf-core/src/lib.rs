//! # GLF Core
//!
//! Platform-independent record codecs for GLF sonar and navigation logs.
//!
//! This crate contains pure encoding and decoding logic with **no file I/O and
//! no threads**. Everything that touches disk lives in `glf-store`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  glf-core (platform-independent, no I/O)                    │
//! │  ├── header       (21 byte common record header)            │
//! │  ├── records/     (image, generic, status, blob, points)    │
//! │  ├── compression  (zlib / none / external tags)             │
//! │  └── error        (DecodeError, EncodeError)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  glf-store              │
//!                 │  (writer, index, reader)│
//!                 └─────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`header`] - Common record header and data type tags
//! - [`records`] - Per data type body codecs and the [`Record`] envelope
//! - [`compression`] - Payload compression adapter
//! - [`error`] - Codec error types
//!
//! ## Example: Encoding a Status Record
//!
//! ```rust
//! use glf_core::{Record, RecordBody};
//! use glf_core::records::StatusRecord;
//!
//! let record = Record::status(1_700_000_000.0, 12, StatusRecord::default());
//! let bytes = record.encode().unwrap();
//!
//! let decoded = Record::decode(&bytes).unwrap();
//! assert_eq!(decoded.header.length as usize, bytes.len());
//! assert!(matches!(decoded.body, RecordBody::Status(_)));
//! ```

pub mod compression;
pub mod error;
pub mod header;
pub mod records;
mod wire;

// Re-export commonly used types
pub use compression::CompressionType;
pub use error::{CompressionError, DecodeError, EncodeError};
pub use header::{DataType, RecordHeader, HEADER_SIZE, START_MARKER};
pub use records::{Record, RecordBody};

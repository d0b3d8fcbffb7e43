//! Common record header prefixed to every stored record.
//!
//! ```text
//! offset  size  field
//!  0      1     start marker '*'
//!  1      1     header version
//!  2      4     total record length (header + body)
//!  6      8     timestamp, f64 seconds since the Unix epoch (UTC)
//! 14      1     data type
//! 15      2     device id
//! 17      2     node id
//! 19      2     spare
//! ```
//!
//! All fields are little endian and unpadded.

use std::time::{SystemTime, UNIX_EPOCH};

use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Start-of-record sentinel
pub const START_MARKER: u8 = b'*';

/// Header version written by this crate
pub const HEADER_VERSION: u8 = 2;

/// Size of the packed header in bytes
pub const HEADER_SIZE: usize = 21;

/// Record payload kinds, selected by the header `data_type` byte
#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Sonar ping image (main image + optional acoustic zoom)
    SonarImage = 0,
    V4 = 1,
    /// Compressed video frame
    AnalogVideo = 2,
    GeminiStatus = 3,
    RemoteV4 = 4,
    /// 3D point cloud ping
    PointData3d = 5,
    /// Raw serial sentence (GPS/compass ASCII)
    RawSerial = 98,
    Generic = 99,
}

impl DataType {
    /// True for tags that are stored with the generic V4 record layout
    pub fn is_generic(self) -> bool {
        matches!(
            self,
            DataType::V4 | DataType::RemoteV4 | DataType::RawSerial | DataType::Generic
        )
    }
}

/// Common interface header
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    /// Always `*` for a valid record
    pub start_marker: u8,
    /// Header format version
    pub version: u8,
    /// Total length of header and body in bytes
    pub length: u32,
    /// UTC time in seconds since the Unix epoch, millisecond resolution
    pub timestamp: f64,
    /// Raw data type tag, see [`DataType`]
    pub data_type: u8,
    /// Sonar id for images, incrementing per-source id for generic records
    pub device_id: u16,
    /// Logical routing node
    pub node_id: u16,
    /// Reserved
    pub spare: u16,
}

impl RecordHeader {
    /// Create a header for `data_type`; `length` is filled in at encode time
    pub fn new(data_type: DataType, timestamp: f64) -> Self {
        Self {
            start_marker: START_MARKER,
            version: HEADER_VERSION,
            length: 0,
            timestamp,
            data_type: data_type as u8,
            device_id: 0,
            node_id: 0,
            spare: 0,
        }
    }

    /// Builder-style device/node assignment
    pub fn with_ids(mut self, device_id: u16, node_id: u16) -> Self {
        self.device_id = device_id;
        self.node_id = node_id;
        self
    }

    /// The decoded data type, `None` for tags this crate doesn't know
    pub fn kind(&self) -> Option<DataType> {
        DataType::from_u8(self.data_type)
    }

    /// Number of body bytes following the header
    pub fn body_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_SIZE)
    }

    /// Parse and validate a header from the start of `data`
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < HEADER_SIZE {
            return Err(DecodeError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[0] != START_MARKER {
            return Err(DecodeError::InvalidStartMarker(data[0]));
        }

        let header: RecordHeader = bincode::deserialize(&data[..HEADER_SIZE])?;
        if (header.length as usize) < HEADER_SIZE {
            return Err(DecodeError::Malformed(format!(
                "record length {} is shorter than its header",
                header.length
            )));
        }
        Ok(header)
    }

    /// Serialize to the packed on-disk form
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.start_marker;
        buf[1] = self.version;
        buf[2..6].copy_from_slice(&self.length.to_le_bytes());
        buf[6..14].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[14] = self.data_type;
        buf[15..17].copy_from_slice(&self.device_id.to_le_bytes());
        buf[17..19].copy_from_slice(&self.node_id.to_le_bytes());
        buf[19..21].copy_from_slice(&self.spare.to_le_bytes());
        buf
    }
}

/// Convert a wall-clock time to a header timestamp (ms resolution)
pub fn unix_seconds(time: SystemTime) -> f64 {
    let millis = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    millis as f64 / 1000.0
}

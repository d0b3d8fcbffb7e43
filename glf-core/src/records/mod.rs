//! Record catalogue: one codec per header data type.
//!
//! | data_type        | body                    |
//! |------------------|-------------------------|
//! | 0                | [`ImageRecord`]         |
//! | 1, 4, 98, 99     | [`GenericRecord`]       |
//! | 2                | [`CompressedRecord`]    |
//! | 3                | [`StatusRecord`]        |
//! | 5                | [`PointCloudRecord`]    |
//! | anything else    | raw bytes, kept as-is   |

pub mod generic;
pub mod image;
pub mod navigation;
pub mod points;
pub mod status;
pub mod video;

pub use generic::{GenericMessageType, GenericPayload, GenericRecord, SerialSource};
pub use image::{ImageGeometry, ImageRecord, MainImage, ZoomImage};
pub use navigation::{CompassFix, CompassState, GpsFix, GpsValidity};
pub use points::{PointCloudRecord, PointDataHeader};
pub use status::{GeminiStatus, StatusRecord};
pub use video::CompressedRecord;

use crate::error::{DecodeError, EncodeError};
use crate::header::{DataType, RecordHeader, HEADER_SIZE};
use crate::wire::{checked_u32, ByteReader, ByteWriter};

/// Offset of the length field inside the header
const LENGTH_OFFSET: usize = 2;

/// Type-specific part of a record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    Image(ImageRecord),
    Generic(GenericRecord),
    Compressed(CompressedRecord),
    Status(StatusRecord),
    Points(PointCloudRecord),
    /// Body of a data type this crate has no codec for
    Unknown(Vec<u8>),
}

impl RecordBody {
    /// Whether this body is the one stored for `data_type`
    fn matches(&self, data_type: Option<DataType>) -> bool {
        match (self, data_type) {
            (RecordBody::Image(_), Some(DataType::SonarImage)) => true,
            (RecordBody::Generic(_), Some(kind)) => kind.is_generic(),
            (RecordBody::Compressed(_), Some(DataType::AnalogVideo)) => true,
            (RecordBody::Status(_), Some(DataType::GeminiStatus)) => true,
            (RecordBody::Points(_), Some(DataType::PointData3d)) => true,
            (RecordBody::Unknown(_), None) => true,
            _ => false,
        }
    }
}

/// A decoded record: common header plus typed body
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub header: RecordHeader,
    pub body: RecordBody,
}

impl Record {
    pub fn new(header: RecordHeader, body: RecordBody) -> Self {
        Self { header, body }
    }

    pub fn image(timestamp: f64, sonar_id: u16, image: ImageRecord) -> Self {
        Self::new(
            RecordHeader::new(DataType::SonarImage, timestamp).with_ids(sonar_id, 0),
            RecordBody::Image(image),
        )
    }

    pub fn status(timestamp: f64, sonar_id: u16, status: StatusRecord) -> Self {
        Self::new(
            RecordHeader::new(DataType::GeminiStatus, timestamp).with_ids(sonar_id, 0),
            RecordBody::Status(status),
        )
    }

    /// A generic record stored under one of the generic data types
    pub fn generic(data_type: DataType, timestamp: f64, generic: GenericRecord) -> Self {
        Self::new(
            RecordHeader::new(data_type, timestamp),
            RecordBody::Generic(generic),
        )
    }

    pub fn video(timestamp: f64, blob: CompressedRecord) -> Self {
        Self::new(
            RecordHeader::new(DataType::AnalogVideo, timestamp),
            RecordBody::Compressed(blob),
        )
    }

    pub fn points(timestamp: f64, points: PointCloudRecord) -> Self {
        Self::new(
            RecordHeader::new(DataType::PointData3d, timestamp),
            RecordBody::Points(points),
        )
    }

    pub fn kind(&self) -> Option<DataType> {
        self.header.kind()
    }

    pub fn is_image(&self) -> bool {
        matches!(self.body, RecordBody::Image(_))
    }

    /// Typed generic payload, `None` for non-generic records
    pub fn generic_payload(&self) -> Option<Result<GenericPayload<'_>, DecodeError>> {
        match (&self.body, self.kind()) {
            (RecordBody::Generic(generic), Some(kind)) => Some(generic.payload(kind)),
            _ => None,
        }
    }

    /// Source sensor of a raw serial record
    pub fn serial_source(&self) -> Option<SerialSource> {
        (self.kind() == Some(DataType::RawSerial))
            .then(|| SerialSource::from_node(self.header.node_id))
    }

    /// Encode header and body.
    ///
    /// The stored length is computed from the encoded body; `header.length`
    /// is ignored on input.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if !self.body.matches(self.kind()) {
            return Err(EncodeError::Inconsistent(format!(
                "data type {} does not match the record body",
                self.header.data_type
            )));
        }

        let mut w = ByteWriter::with_capacity(HEADER_SIZE + 64);
        w.put_bytes(&self.header.to_bytes());
        match &self.body {
            RecordBody::Image(image) => image.encode_body(&mut w)?,
            RecordBody::Generic(generic) => generic.encode_body(&mut w)?,
            RecordBody::Compressed(blob) => blob.encode_body(&mut w)?,
            RecordBody::Status(status) => status.encode_body(&mut w)?,
            RecordBody::Points(points) => points.encode_body(&mut w)?,
            RecordBody::Unknown(raw) => w.put_bytes(raw),
        }

        let length = checked_u32("record", w.len())?;
        w.patch_u32(LENGTH_OFFSET, length);
        Ok(w.into_inner())
    }

    /// Decode exactly one record; `data` must be exactly `header.length` bytes
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let header = RecordHeader::parse(data)?;
        let length = header.length as usize;
        if length > data.len() {
            return Err(DecodeError::Truncated {
                expected: length,
                actual: data.len(),
            });
        }
        if length < data.len() {
            return Err(DecodeError::LengthMismatch {
                header_len: length,
                actual_len: data.len(),
            });
        }

        let mut r = ByteReader::new(&data[HEADER_SIZE..]);
        let body = match header.kind() {
            Some(DataType::SonarImage) => RecordBody::Image(ImageRecord::decode_body(&mut r)?),
            Some(DataType::AnalogVideo) => {
                RecordBody::Compressed(CompressedRecord::decode_body(&mut r)?)
            }
            Some(DataType::GeminiStatus) => RecordBody::Status(StatusRecord::decode_body(&mut r)?),
            Some(DataType::PointData3d) => {
                RecordBody::Points(PointCloudRecord::decode_body(&mut r)?)
            }
            Some(kind) if kind.is_generic() => {
                RecordBody::Generic(GenericRecord::decode_body(&mut r)?)
            }
            _ => RecordBody::Unknown(r.take(r.remaining())?.to_vec()),
        };
        r.finish()?;

        Ok(Self { header, body })
    }
}

//! Generic (V4) records: a sub-typed, length-prefixed opaque payload.
//!
//! ```text
//! length   u16   payload bytes that follow msg_type
//! msg_type u8    see GenericMessageType
//! payload  [u8; length]
//! ```

use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;

use super::navigation::{CompassFix, GpsFix};
use crate::error::{DecodeError, EncodeError};
use crate::header::DataType;
use crate::wire::{ByteReader, ByteWriter};

/// Node id used by the acquisition layer for raw GPS serial input
pub const GPS_SERIAL_NODE: u16 = 245;

/// Sub-tags of the generic record (`msg_type`)
#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericMessageType {
    RawAscii = 0,
    Gps = 1,
    Compass = 2,
    /// SeaKing sonar
    RawV4Reply = 3,
    /// MicronNav
    ProcessedV4Reply = 4,
    BathyProfile = 5,
    /// Vehicle control data
    Vlbv = 6,
    Barometer = 7,
    RatReply = 8,
    Altimeter = 9,
    Depth = 10,
    Bathy = 13,
    NavDiver = 16,
    RawAhrs = 17,
    AltimeterMk2 = 18,
    AltimeterConfigMk2 = 19,
    RemoteV4Output1 = 106,
    RemoteV4Output2 = 107,
    RemoteV4Output3 = 108,
    RemoteV4Output4 = 109,
}

/// Typed view of a generic payload
#[derive(Debug, Clone, PartialEq)]
pub enum GenericPayload<'a> {
    Ascii(&'a [u8]),
    Gps(GpsFix),
    Compass(CompassFix),
    /// Any other message type, uninterpreted
    Opaque(&'a [u8]),
}

/// Which sensor produced a raw serial record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialSource {
    Gps,
    Compass,
}

impl SerialSource {
    pub fn from_node(node_id: u16) -> Self {
        if node_id == GPS_SERIAL_NODE {
            SerialSource::Gps
        } else {
            SerialSource::Compass
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenericRecord {
    /// Raw sub-tag, kept even when it is not one we know
    pub msg_type: u8,
    pub data: Vec<u8>,
}

impl GenericRecord {
    pub fn new(msg_type: GenericMessageType, data: Vec<u8>) -> Self {
        Self {
            msg_type: msg_type as u8,
            data,
        }
    }

    pub fn ascii(text: &str) -> Self {
        Self::new(GenericMessageType::RawAscii, text.as_bytes().to_vec())
    }

    pub fn gps(fix: &GpsFix) -> Self {
        Self::new(GenericMessageType::Gps, fix.to_bytes())
    }

    pub fn compass(fix: &CompassFix) -> Self {
        Self::new(GenericMessageType::Compass, fix.to_bytes())
    }

    pub fn message_type(&self) -> Option<GenericMessageType> {
        GenericMessageType::from_u8(self.msg_type)
    }

    /// Interpret the payload for a record stored under `data_type`.
    ///
    /// Raw serial records are always text regardless of `msg_type`.
    pub fn payload(&self, data_type: DataType) -> Result<GenericPayload<'_>, DecodeError> {
        if data_type == DataType::RawSerial {
            return Ok(GenericPayload::Ascii(&self.data));
        }
        Ok(match self.message_type() {
            Some(GenericMessageType::RawAscii) => GenericPayload::Ascii(&self.data),
            Some(GenericMessageType::Gps) => GenericPayload::Gps(GpsFix::parse(&self.data)?),
            Some(GenericMessageType::Compass) => {
                GenericPayload::Compass(CompassFix::parse(&self.data)?)
            }
            _ => GenericPayload::Opaque(&self.data),
        })
    }

    pub(crate) fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        let len = u16::try_from(self.data.len()).map_err(|_| EncodeError::TooLarge {
            field: "generic payload",
            len: self.data.len(),
            max: u16::MAX as usize,
        })?;
        w.put_u16(len);
        w.put_u8(self.msg_type);
        w.put_bytes(&self.data);
        Ok(())
    }

    pub(crate) fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let len = r.u16()? as usize;
        let msg_type = r.u8()?;
        let data = r.take(len)?.to_vec();
        Ok(Self { msg_type, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::navigation::source_label;

    #[test]
    fn test_body_layout() {
        let rec = GenericRecord::ascii("$GPGGA");
        let mut w = ByteWriter::with_capacity(16);
        rec.encode_body(&mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[..3], &[6, 0, 0]);
        assert_eq!(&bytes[3..], b"$GPGGA");

        let mut r = ByteReader::new(&bytes);
        assert_eq!(GenericRecord::decode_body(&mut r).unwrap(), rec);
        r.finish().unwrap();
    }

    #[test]
    fn test_typed_payloads() {
        let fix = GpsFix {
            latitude: -33.9,
            longitude: 18.4,
            source_name: source_label("deck"),
            ..Default::default()
        };
        let gps = GenericRecord::gps(&fix);
        assert_eq!(gps.message_type(), Some(GenericMessageType::Gps));
        assert_eq!(
            gps.payload(DataType::Generic).unwrap(),
            GenericPayload::Gps(fix)
        );

        let compass = GenericRecord::compass(&CompassFix::default());
        assert!(matches!(
            compass.payload(DataType::V4).unwrap(),
            GenericPayload::Compass(_)
        ));

        let depth = GenericRecord::new(GenericMessageType::Depth, vec![1, 2, 3]);
        assert_eq!(
            depth.payload(DataType::Generic).unwrap(),
            GenericPayload::Opaque(&[1, 2, 3])
        );
    }

    #[test]
    fn test_raw_serial_is_always_text() {
        // msg_type says GPS, but raw serial carries the sentence itself
        let rec = GenericRecord {
            msg_type: GenericMessageType::Gps as u8,
            data: b"$GPRMC,123519".to_vec(),
        };
        assert_eq!(
            rec.payload(DataType::RawSerial).unwrap(),
            GenericPayload::Ascii(b"$GPRMC,123519")
        );
        assert!(rec.payload(DataType::Generic).is_err());
    }

    #[test]
    fn test_serial_source() {
        assert_eq!(SerialSource::from_node(245), SerialSource::Gps);
        assert_eq!(SerialSource::from_node(3), SerialSource::Compass);
    }

    #[test]
    fn test_oversized_payload() {
        let rec = GenericRecord {
            msg_type: 0,
            data: vec![0; 70_000],
        };
        let mut w = ByteWriter::with_capacity(0);
        assert!(matches!(
            rec.encode_body(&mut w),
            Err(EncodeError::TooLarge { max: 65535, .. })
        ));
    }

    #[test]
    fn test_unknown_message_type_is_kept() {
        let rec = GenericRecord {
            msg_type: 200,
            data: vec![9],
        };
        assert_eq!(rec.message_type(), None);
        assert_eq!(
            rec.payload(DataType::Generic).unwrap(),
            GenericPayload::Opaque(&[9])
        );
    }
}

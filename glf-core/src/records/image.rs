//! Sonar ping image records.
//!
//! A record holds one mandatory main image and one zoom image. Main image body:
//!
//! ```text
//! image_version      u16
//! range_comp_used    u16
//! compression_type   u16
//! start_bearing      u32
//! end_bearing        u32
//! start_range        u32
//! end_range          u32
//! bearing count      u32   == end_bearing - start_bearing
//! bearing table      f64 * count
//! state_flags        u32
//! modulation_freq    u32
//! beam_form_aperture f32
//! tx_time            f64
//! ping_flags         u16
//! sos_at_xd          f32
//! percent_gain       i16
//! chirp              u8
//! sonar_type         u8
//! platform           u8
//! payload length     u32
//! payload            [u8]  (compressed per compression_type)
//! ```
//!
//! The zoom image always stores `active u8, id u16, magnitude f64`; the
//! geometry fields and payload follow only when `active` is set.

use crate::compression::{self, CompressionType};
use crate::error::{DecodeError, EncodeError};
use crate::wire::{ByteReader, ByteWriter};

/// Image format version written by this crate
pub const IMAGE_VERSION: u16 = 1;

const PING_FLAG_HIGH_FREQUENCY: u16 = 0x0100;
const PING_FLAG_SOS_USER_SELECTED: u16 = 0x8000;
const STATE_FLAG_INVERTED_MASK: u32 = 0xE000;

/// Fields shared by main and zoom images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageGeometry {
    pub image_version: u16,
    pub range_comp_used: u16,
    /// Raw compression tag, see [`CompressionType`]
    pub compression_type: u16,
    pub start_bearing: u32,
    pub end_bearing: u32,
    pub start_range: u32,
    pub end_range: u32,
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self {
            image_version: IMAGE_VERSION,
            range_comp_used: 0,
            compression_type: CompressionType::Zlib as u16,
            start_bearing: 0,
            end_bearing: 0,
            start_range: 0,
            end_range: 0,
        }
    }
}

impl ImageGeometry {
    pub fn new(beams: u32, range_lines: u32, compression: CompressionType) -> Self {
        Self {
            compression_type: compression as u16,
            end_bearing: beams,
            end_range: range_lines,
            ..Default::default()
        }
    }

    /// Number of beams, `None` when the bounds are inverted
    pub fn beam_count(&self) -> Option<u32> {
        self.end_bearing.checked_sub(self.start_bearing)
    }

    pub fn range_lines(&self) -> u32 {
        self.end_range
    }

    /// Uncompressed intensity payload size
    pub fn payload_len(&self) -> Option<usize> {
        (self.beam_count()? as usize).checked_mul(self.end_range as usize)
    }

    fn is_external(&self) -> bool {
        self.compression_type == CompressionType::H264 as u16
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.put_u16(self.image_version);
        w.put_u16(self.range_comp_used);
        w.put_u16(self.compression_type);
        w.put_u32(self.start_bearing);
        w.put_u32(self.end_bearing);
        w.put_u32(self.start_range);
        w.put_u32(self.end_range);
    }

    fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            image_version: r.u16()?,
            range_comp_used: r.u16()?,
            compression_type: r.u16()?,
            start_bearing: r.u32()?,
            end_bearing: r.u32()?,
            start_range: r.u32()?,
            end_range: r.u32()?,
        })
    }

    fn check_payload(&self, data: &[u8]) -> Result<(), EncodeError> {
        if self.is_external() {
            return Ok(());
        }
        let expected = self.payload_len().ok_or_else(|| {
            EncodeError::Inconsistent(format!(
                "bearing bounds {}..{} are inverted",
                self.start_bearing, self.end_bearing
            ))
        })?;
        if data.len() != expected {
            return Err(EncodeError::Inconsistent(format!(
                "image payload is {} bytes, geometry needs {expected}",
                data.len()
            )));
        }
        Ok(())
    }

    fn encode_payload(&self, w: &mut ByteWriter, data: &[u8]) -> Result<(), EncodeError> {
        self.check_payload(data)?;
        let kind = CompressionType::from_tag(self.compression_type as u32)?;
        let stored = compression::compress(kind, data)?;
        w.put_len_prefixed("image payload", &stored)
    }

    fn decode_payload(&self, r: &mut ByteReader<'_>) -> Result<Vec<u8>, DecodeError> {
        let stored = r.len_prefixed()?;
        let expected = if self.is_external() {
            None
        } else {
            let beams = self.beam_count().ok_or_else(|| {
                DecodeError::Malformed(format!(
                    "bearing bounds {}..{} are inverted",
                    self.start_bearing, self.end_bearing
                ))
            })?;
            match self.payload_len() {
                Some(len) if len <= compression::MAX_RAW_LEN => Some(len),
                _ => {
                    return Err(DecodeError::Malformed(format!(
                        "image of {beams} beams x {} lines exceeds {} bytes",
                        self.end_range,
                        compression::MAX_RAW_LEN
                    )))
                }
            }
        };
        Ok(compression::decompress(
            self.compression_type as u32,
            stored,
            expected,
        )?)
    }
}

/// Main ping image with beam geometry and ping metadata
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MainImage {
    pub geometry: ImageGeometry,
    /// Beam angles in radians, one per beam
    pub bearing_table: Vec<f64>,
    pub state_flags: u32,
    pub modulation_frequency: u32,
    pub beam_form_aperture: f32,
    pub tx_time: f64,
    pub ping_flags: u16,
    /// Speed of sound at the transducer, m/s
    pub sos_at_xd: f32,
    pub percent_gain: i16,
    pub chirp: bool,
    pub sonar_type: u8,
    pub platform: u8,
    /// Uncompressed intensities, beam-major per range line
    pub data: Vec<u8>,
}

impl MainImage {
    pub fn beam_count(&self) -> u32 {
        self.geometry.beam_count().unwrap_or(0)
    }

    pub fn is_high_frequency(&self) -> bool {
        self.ping_flags & PING_FLAG_HIGH_FREQUENCY != 0
    }

    /// Sound velocity was set by the operator rather than measured
    pub fn sos_user_selected(&self) -> bool {
        self.ping_flags & PING_FLAG_SOS_USER_SELECTED != 0
    }

    /// Head is mounted upside down
    pub fn is_inverted(&self) -> bool {
        self.state_flags & STATE_FLAG_INVERTED_MASK != 0
    }

    fn encode(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        let beams = self.geometry.beam_count().unwrap_or(0) as usize;
        if self.bearing_table.len() != beams {
            return Err(EncodeError::Inconsistent(format!(
                "bearing table has {} entries for {beams} beams",
                self.bearing_table.len()
            )));
        }

        self.geometry.encode(w);
        w.put_u32(crate::wire::checked_u32("bearing table", self.bearing_table.len())?);
        for bearing in &self.bearing_table {
            w.put_f64(*bearing);
        }
        w.put_u32(self.state_flags);
        w.put_u32(self.modulation_frequency);
        w.put_f32(self.beam_form_aperture);
        w.put_f64(self.tx_time);
        w.put_u16(self.ping_flags);
        w.put_f32(self.sos_at_xd);
        w.put_i16(self.percent_gain);
        w.put_bool(self.chirp);
        w.put_u8(self.sonar_type);
        w.put_u8(self.platform);
        self.geometry.encode_payload(w, &self.data)
    }

    fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let geometry = ImageGeometry::decode(r)?;
        let count = r.u32()?;
        if geometry.beam_count() != Some(count) {
            return Err(DecodeError::Malformed(format!(
                "bearing table has {count} entries for bearings {}..{}",
                geometry.start_bearing, geometry.end_bearing
            )));
        }
        let bearing_table = r.f64_array(count as usize)?;

        let state_flags = r.u32()?;
        let modulation_frequency = r.u32()?;
        let beam_form_aperture = r.f32()?;
        let tx_time = r.f64()?;
        let ping_flags = r.u16()?;
        let sos_at_xd = r.f32()?;
        let percent_gain = r.i16()?;
        let chirp = r.bool()?;
        let sonar_type = r.u8()?;
        let platform = r.u8()?;
        let data = geometry.decode_payload(r)?;

        Ok(Self {
            geometry,
            bearing_table,
            state_flags,
            modulation_frequency,
            beam_form_aperture,
            tx_time,
            ping_flags,
            sos_at_xd,
            percent_gain,
            chirp,
            sonar_type,
            platform,
            data,
        })
    }
}

/// Acoustic zoom image, sharing the main image's bearing table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoomImage {
    pub active: bool,
    pub id: u16,
    pub magnitude: f64,
    /// Only stored when `active`
    pub geometry: ImageGeometry,
    /// Only stored when `active`
    pub data: Vec<u8>,
}

impl ZoomImage {
    pub fn new(id: u16, magnitude: f64, geometry: ImageGeometry, data: Vec<u8>) -> Self {
        Self {
            active: true,
            id,
            magnitude,
            geometry,
            data,
        }
    }

    fn encode(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_bool(self.active);
        w.put_u16(self.id);
        w.put_f64(self.magnitude);
        if self.active {
            self.geometry.encode(w);
            self.geometry.encode_payload(w, &self.data)?;
        }
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let active = r.bool()?;
        let id = r.u16()?;
        let magnitude = r.f64()?;
        if !active {
            return Ok(Self {
                active,
                id,
                magnitude,
                ..Default::default()
            });
        }

        let geometry = ImageGeometry::decode(r)?;
        let data = geometry.decode_payload(r)?;
        Ok(Self {
            active,
            id,
            magnitude,
            geometry,
            data,
        })
    }
}

/// One sonar ping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageRecord {
    pub main: MainImage,
    pub zoom: ZoomImage,
}

impl ImageRecord {
    pub fn new(main: MainImage) -> Self {
        Self {
            main,
            zoom: ZoomImage::default(),
        }
    }

    pub fn with_zoom(mut self, zoom: ZoomImage) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn has_zoom(&self) -> bool {
        self.zoom.active
    }

    pub(crate) fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        self.main.encode(w)?;
        self.zoom.encode(w)
    }

    pub(crate) fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let main = MainImage::decode(r)?;
        let zoom = ZoomImage::decode(r)?;
        Ok(Self { main, zoom })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_main(beams: u32, ranges: u32, compression: CompressionType) -> MainImage {
        MainImage {
            geometry: ImageGeometry::new(beams, ranges, compression),
            bearing_table: (0..beams).map(|b| b as f64 * 0.01 - 0.5).collect(),
            state_flags: 0,
            modulation_frequency: 720_000,
            beam_form_aperture: 120.0,
            tx_time: 12.5,
            ping_flags: PING_FLAG_HIGH_FREQUENCY,
            sos_at_xd: 1500.0,
            percent_gain: 50,
            chirp: true,
            sonar_type: 2,
            platform: 4,
            data: (0..beams * ranges).map(|i| (i % 200) as u8).collect(),
        }
    }

    fn encode(rec: &ImageRecord) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(256);
        rec.encode_body(&mut w).unwrap();
        w.into_inner()
    }

    fn decode(bytes: &[u8]) -> Result<ImageRecord, DecodeError> {
        let mut r = ByteReader::new(bytes);
        let rec = ImageRecord::decode_body(&mut r)?;
        r.finish()?;
        Ok(rec)
    }

    #[test]
    fn test_roundtrip_without_zoom() {
        let rec = ImageRecord::new(test_main(16, 32, CompressionType::Zlib));
        let bytes = encode(&rec);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, rec);
        assert!(!decoded.has_zoom());
        assert_eq!(encode(&decoded), bytes);
        // Inactive zoom costs exactly its 11 byte preamble
        assert_eq!(&bytes[bytes.len() - 11..], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_roundtrip_with_zoom() {
        let zoom = ZoomImage::new(
            3,
            2.0,
            ImageGeometry::new(8, 10, CompressionType::None),
            vec![7; 80],
        );
        let rec = ImageRecord::new(test_main(4, 4, CompressionType::None)).with_zoom(zoom);
        let bytes = encode(&rec);
        let decoded = decode(&bytes).unwrap();
        assert!(decoded.has_zoom());
        assert_eq!(decoded.zoom.data.len(), 80);
        assert_eq!(decoded, rec);
    }

    #[test]
    fn test_empty_image() {
        let rec = ImageRecord::new(test_main(0, 0, CompressionType::None));
        assert_eq!(decode(&encode(&rec)).unwrap(), rec);
    }

    #[test]
    fn test_external_payload_is_opaque() {
        let mut main = test_main(4, 4, CompressionType::H264);
        main.data = vec![0, 0, 0, 1, 0x65];
        let rec = ImageRecord::new(main);
        assert_eq!(decode(&encode(&rec)).unwrap(), rec);
    }

    #[test]
    fn test_bearing_table_mismatch_rejected() {
        let mut main = test_main(4, 4, CompressionType::None);
        main.bearing_table.pop();
        let mut w = ByteWriter::with_capacity(64);
        assert!(matches!(
            ImageRecord::new(main).encode_body(&mut w),
            Err(EncodeError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_payload_size_mismatch_rejected() {
        let mut main = test_main(4, 4, CompressionType::None);
        main.data.push(0);
        let mut w = ByteWriter::with_capacity(64);
        assert!(matches!(
            ImageRecord::new(main).encode_body(&mut w),
            Err(EncodeError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_decode_rejects_inconsistent_count() {
        let mut bytes = encode(&ImageRecord::new(test_main(2, 2, CompressionType::None)));
        // bearing count follows the 22 bytes of geometry
        bytes[22] = 3;
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = encode(&ImageRecord::new(test_main(4, 4, CompressionType::Zlib)));
        assert!(matches!(
            decode(&bytes[..bytes.len() - 5]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unknown_compression_tag() {
        let mut main = test_main(2, 2, CompressionType::None);
        main.geometry.compression_type = 9;
        let mut w = ByteWriter::with_capacity(64);
        assert!(matches!(
            ImageRecord::new(main).encode_body(&mut w),
            Err(EncodeError::Compression(_))
        ));
    }

    #[test]
    fn test_flags() {
        let mut main = test_main(1, 1, CompressionType::None);
        assert!(main.is_high_frequency());
        assert!(!main.sos_user_selected());
        assert!(!main.is_inverted());
        main.ping_flags = PING_FLAG_SOS_USER_SELECTED;
        main.state_flags = 0x2000;
        assert!(!main.is_high_frequency());
        assert!(main.sos_user_selected());
        assert!(main.is_inverted());
        assert_eq!(main.beam_count(), 1);
    }
}

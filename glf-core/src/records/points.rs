//! 3D point-cloud ping records.
//!
//! Body: packed [`PointDataHeader`] followed by `(count u32, count * i16)`.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};
use crate::wire::{checked_u32, ByteReader, ByteWriter};

/// Packed size of [`PointDataHeader`]
pub const POINT_DATA_HEADER_SIZE: usize = 56;

/// Ping and attitude metadata for one point-cloud ping
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointDataHeader {
    /// UTC, microseconds
    pub timestamp: u64,
    pub flags: u32,
    pub ping_count: u32,
    /// 1-16, zero when not sub-pinging
    pub subping: u8,
    pub tx_beam: u8,
    /// Degrees * 100
    pub ahrs_roll: i16,
    pub ahrs_pitch: i16,
    pub ahrs_yaw: i16,
    /// mm/s
    pub sos: u32,
    /// mm
    pub start_range: u32,
    pub end_range: u32,
    pub tx_focus_range: u32,
    /// dB/km
    pub absorb_coe: u32,
    /// Cycles
    pub tx_length: u16,
    pub tx_start_chan: u16,
    pub tx_num_chans: u16,
    pub tx_attenuation: u8,
    pub tx_shading: u8,
    pub tx_beam_spacing: u8,
    pub rx_beam_spacing: u8,
    /// dB * 8
    pub rx_gain: u16,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloudRecord {
    pub header: PointDataHeader,
    pub points: Vec<i16>,
}

impl PointCloudRecord {
    pub(crate) fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_fixed(&self.header)?;
        w.put_u32(checked_u32("point data", self.points.len())?);
        for point in &self.points {
            w.put_i16(*point);
        }
        Ok(())
    }

    pub(crate) fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let header = r.fixed(POINT_DATA_HEADER_SIZE)?;
        let count = r.u32()? as usize;
        let points = r.i16_array(count)?;
        Ok(Self { header, points })
    }
}

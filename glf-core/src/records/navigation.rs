//! Fixed-layout navigation payloads carried inside generic records.
//!
//! Both structs are stored packed and little endian, reinterpreted in place
//! from the generic record payload.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Packed size of [`GpsFix`]
pub const GPS_FIX_SIZE: usize = 322;

/// Packed size of [`CompassFix`]
pub const COMPASS_FIX_SIZE: usize = 112;

pub const MAX_SATELLITES: usize = 12;

bitflags! {
    /// Which [`GpsFix`] fields hold valid data
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GpsValidity: u8 {
        const EASTING_NORTHING = 1 << 0;
        const LATITUDE = 1 << 1;
        const LONGITUDE = 1 << 2;
        const COURSE_OVER_GROUND = 1 << 3;
        const SPEED_OVER_GROUND = 1 << 4;
        const HEADING = 1 << 5;
        const TIME = 1 << 6;
    }
}

bitflags! {
    /// Compass/AHRS state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompassState: u32 {
        const HEADING_VALID = 1 << 0;
        const PITCH_VALID = 1 << 1;
        const ROLL_VALID = 1 << 2;
        const HEAVE_VALID = 1 << 3;
        const AHRS_CONFIG_ACK = 1 << 4;
        const AHRS_MEASUREMENT_ACK = 1 << 5;
        const AHRS_MFM_SUCCESS = 1 << 6;
        const AHRS_CALIBRATION_MODE = 1 << 7;
        const AHRS_CALIBRATION_RESULT_OK = 1 << 8;
        const AHRS_DEVICE_NOT_FOUND = 1 << 9;
        const AHRS_FAILED_TO_START_LOGGING = 1 << 10;
        const AHRS_FAILED_TO_PROCESS_DATA = 1 << 11;
        const AHRS_FAILED_TO_WRITE_RESULT = 1 << 12;
        const AHRS_CALIBRATION_STOPPED = 1 << 13;
        const AHRS_ACCEL_CLIPPED = 1 << 14;
        const AHRS_GYRO_CLIPPED = 1 << 15;
        const AHRS_MAG_CLIPPED = 1 << 16;
        const AHRS_FILTER_VALID = 1 << 17;
        const AHRS_HEADING_ZEROED = 1 << 18;
        const AHRS_INCLINATION_ZEROED = 1 << 19;
        const AHRS_RESTORE_FACTORY_ACK = 1 << 20;
        const AHRS_SET_MFM_RESULTS_ACK = 1 << 21;
        const VERTICAL_MOUNT_CW = 1 << 22;
        const AHRS_DATA = 1 << 23;
        const AHRS_MICRON_GEMINI = 1 << 24;
        const VERTICAL_MOUNT_CCW = 1 << 25;
        const AHRS_MICRO = 1 << 26;
        const AHRS_MICRO_MAG_OK = 1 << 27;
        const AHRS_MICRO_GYRO_OK = 1 << 28;
        const AHRS_MICRO_ACCEL_OK = 1 << 29;
        const AHRS_MICRO_CLOCK_MODE = 1 << 30;
        const AHRS_MICRO_WATCHDOG = 1 << 31;
    }
}

/// GPS fix as logged by the acquisition layer (322 bytes packed)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Metres
    pub altitude: f64,
    pub easting: f64,
    pub northing: f64,
    pub en_altitude: f64,
    /// Course over ground, degrees
    pub cog: f64,
    /// Speed over ground, knots
    pub sog: f64,
    /// Degrees
    pub heading: f64,
    pub sats_in_view: i32,
    pub sat_id: [i32; MAX_SATELLITES],
    pub sat_elevation: [i32; MAX_SATELLITES],
    pub sat_azimuth: [i32; MAX_SATELLITES],
    pub sat_snr: [i32; MAX_SATELLITES],
    pub pdop: f64,
    pub hdop: f64,
    pub vdop: f64,
    /// 1 = no fix, 2 = 2D, 3 = 3D
    pub fix_mode: i32,
    /// Seconds since the Unix epoch
    pub time: u64,
    /// Raw validity byte, see [`GpsFix::validity`]
    pub gps_valid: u8,
    /// NUL padded label
    pub source_name: [u8; 16],
    /// `H` relative heading up, `N` relative north up, `E` absolute UTM
    pub en_format: u8,
}

impl Default for GpsFix {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            easting: 0.0,
            northing: 0.0,
            en_altitude: 0.0,
            cog: 0.0,
            sog: 0.0,
            heading: 0.0,
            sats_in_view: 0,
            sat_id: [0; MAX_SATELLITES],
            sat_elevation: [0; MAX_SATELLITES],
            sat_azimuth: [0; MAX_SATELLITES],
            sat_snr: [0; MAX_SATELLITES],
            pdop: 0.0,
            hdop: 0.0,
            vdop: 0.0,
            fix_mode: 0,
            time: 0,
            gps_valid: 0,
            source_name: [0; 16],
            en_format: b'E',
        }
    }
}

impl GpsFix {
    pub fn validity(&self) -> GpsValidity {
        GpsValidity::from_bits_truncate(self.gps_valid)
    }

    pub fn source(&self) -> String {
        c_string(&self.source_name)
    }

    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        parse_exact(data, GPS_FIX_SIZE, "GPS fix")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Fixed-size plain data never fails to serialize
        bincode::serialize(self).unwrap_or_default()
    }
}

/// Compass/AHRS sample (112 bytes packed)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct CompassFix {
    pub heading: f64,
    pub roll: f64,
    pub pitch: f64,
    pub heave: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub temperature: f64,
    /// Magnetic variation, degrees
    pub variation: f64,
    /// Magnetic deviation, degrees
    pub deviation: f64,
    /// True north reference, else magnetic
    pub heading_is_true: bool,
    pub spare: [u8; 3],
    /// Raw state bits, see [`CompassFix::state`]
    pub cmp_valid: u32,
    pub source_name: [u8; 16],
    /// Milliseconds into the day
    pub time: u64,
}

impl CompassFix {
    pub fn state(&self) -> CompassState {
        CompassState::from_bits_retain(self.cmp_valid)
    }

    pub fn source(&self) -> String {
        c_string(&self.source_name)
    }

    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        parse_exact(data, COMPASS_FIX_SIZE, "compass fix")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }
}

/// Copy `name` into a NUL padded label, truncating to fit
pub fn source_label(name: &str) -> [u8; 16] {
    let mut label = [0u8; 16];
    let bytes = name.as_bytes();
    let n = bytes.len().min(label.len() - 1);
    label[..n].copy_from_slice(&bytes[..n]);
    label
}

fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn parse_exact<T: serde::de::DeserializeOwned>(
    data: &[u8],
    size: usize,
    what: &str,
) -> Result<T, DecodeError> {
    if data.len() != size {
        return Err(DecodeError::Malformed(format!(
            "{what} payload is {} bytes, expected {size}",
            data.len()
        )));
    }
    Ok(bincode::deserialize(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_sizes() {
        assert_eq!(GpsFix::default().to_bytes().len(), GPS_FIX_SIZE);
        assert_eq!(CompassFix::default().to_bytes().len(), COMPASS_FIX_SIZE);
    }

    #[test]
    fn test_gps_field_offsets() {
        let fix = GpsFix {
            latitude: 50.5,
            time: 1_700_000_000,
            gps_valid: 0x07,
            source_name: source_label("GPS1"),
            ..Default::default()
        };
        let bytes = fix.to_bytes();

        assert_eq!(f64::from_le_bytes(bytes[0..8].try_into().unwrap()), 50.5);
        // time follows the satellite block
        assert_eq!(
            u64::from_le_bytes(bytes[296..304].try_into().unwrap()),
            1_700_000_000
        );
        assert_eq!(bytes[304], 0x07);
        assert_eq!(&bytes[305..309], b"GPS1");
        assert_eq!(bytes[321], b'E');

        let parsed = GpsFix::parse(&bytes).unwrap();
        assert_eq!(parsed, fix);
        assert_eq!(parsed.source(), "GPS1");
        assert_eq!(
            parsed.validity(),
            GpsValidity::EASTING_NORTHING | GpsValidity::LATITUDE | GpsValidity::LONGITUDE
        );
    }

    #[test]
    fn test_compass_state() {
        let fix = CompassFix {
            heading: 271.25,
            heading_is_true: true,
            cmp_valid: (CompassState::HEADING_VALID | CompassState::AHRS_DATA).bits(),
            ..Default::default()
        };
        let bytes = fix.to_bytes();
        assert_eq!(bytes[80], 1);

        let parsed = CompassFix::parse(&bytes).unwrap();
        assert!(parsed.state().contains(CompassState::HEADING_VALID));
        assert!(!parsed.state().contains(CompassState::PITCH_VALID));
        assert_eq!(parsed.heading, 271.25);
    }

    #[test]
    fn test_wrong_size_is_malformed() {
        assert!(matches!(
            GpsFix::parse(&[0u8; 100]),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            CompassFix::parse(&[0u8; 113]),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_source_label_truncates() {
        let label = source_label("a-very-long-source-name");
        assert_eq!(label[15], 0);
        assert_eq!(c_string(&label), "a-very-long-sou");
    }
}

//! Sonar status telemetry record.
//!
//! Body is the status message version followed by a packed
//! [`GeminiStatus`] block; there are no variable-length parts.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};
use crate::wire::{ByteReader, ByteWriter};

/// Packed size of [`GeminiStatus`]
pub const GEMINI_STATUS_SIZE: usize = 232;

/// Status message version written by this crate
pub const STATUS_MSG_VERSION: u16 = 1;

const BOOT_STATUS_MASK: u32 = 0x1ff;
const SHUTDOWN_OVER_TEMPERATURE: u16 = 0x0001;
const SHUTDOWN_OUT_OF_WATER: u16 = 0x0006;

/// Telemetry reported by the sonar head
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeminiStatus {
    pub bf_version: i16,
    pub da_version: i16,
    pub flags: i16,
    pub device_id: i16,
    /// 0xFF none, 0 first transducer, 1 second
    pub xd_selected: u8,
    pub vga_t1: f64,
    pub vga_t2: f64,
    pub vga_t3: f64,
    pub vga_t4: f64,
    pub psu_t: f64,
    pub die_t: f64,
    pub tx_t: f64,
    pub afe0_top_temp: f64,
    pub afe0_bot_temp: f64,
    pub afe1_top_temp: f64,
    pub afe1_bot_temp: f64,
    pub afe2_top_temp: f64,
    pub afe2_bot_temp: f64,
    pub afe3_top_temp: f64,
    pub afe3_bot_temp: f64,
    pub link_type: u16,
    pub uplink_speed_mbps: f64,
    pub downlink_speed_mbps: f64,
    pub link_quality: u16,
    pub packet_count: u32,
    pub recv_error_count: u32,
    pub resent_packet_count: u32,
    pub dropped_packet_count: u32,
    pub unknown_packet_count: u32,
    pub lost_line_count: u32,
    pub general_count: u32,
    pub sonar_alt_ip: u32,
    pub surface_ip: u32,
    pub subnet_mask: u32,
    pub mac_address: [u16; 3],
    pub boot_sts_register: u32,
    pub boot_sts_register_da: u32,
    pub fpga_time: u64,
    pub dip_switch: u16,
    pub shutdown_status: u16,
    pub network_adaptor_found: bool,
    pub subsea_internal_temp: f64,
    pub subsea_cpu_temp: f64,
}

impl Default for GeminiStatus {
    fn default() -> Self {
        Self {
            bf_version: 0,
            da_version: 0,
            flags: 0,
            device_id: 0,
            xd_selected: 0xFF,
            vga_t1: 0.0,
            vga_t2: 0.0,
            vga_t3: 0.0,
            vga_t4: 0.0,
            psu_t: 0.0,
            die_t: 0.0,
            tx_t: 0.0,
            afe0_top_temp: 0.0,
            afe0_bot_temp: 0.0,
            afe1_top_temp: 0.0,
            afe1_bot_temp: 0.0,
            afe2_top_temp: 0.0,
            afe2_bot_temp: 0.0,
            afe3_top_temp: 0.0,
            afe3_bot_temp: 0.0,
            link_type: 0,
            uplink_speed_mbps: 0.0,
            downlink_speed_mbps: 0.0,
            link_quality: 0,
            packet_count: 0,
            recv_error_count: 0,
            resent_packet_count: 0,
            dropped_packet_count: 0,
            unknown_packet_count: 0,
            lost_line_count: 0,
            general_count: 0,
            sonar_alt_ip: 0,
            surface_ip: 0,
            subnet_mask: 0,
            mac_address: [0; 3],
            boot_sts_register: 0,
            boot_sts_register_da: 0,
            fpga_time: 0,
            dip_switch: 0,
            shutdown_status: 0,
            network_adaptor_found: false,
            subsea_internal_temp: 0.0,
            subsea_cpu_temp: 0.0,
        }
    }
}

impl GeminiStatus {
    /// Head is running its bootloader rather than the application
    pub fn bootloader_booted(&self) -> bool {
        self.boot_sts_register & BOOT_STATUS_MASK == 1
    }

    pub fn over_temperature(&self) -> bool {
        self.shutdown_status & SHUTDOWN_OVER_TEMPERATURE != 0
    }

    pub fn out_of_water(&self) -> bool {
        self.shutdown_status & SHUTDOWN_OUT_OF_WATER != 0
    }

    pub fn sonar_alt_ip(&self) -> std::net::Ipv4Addr {
        // Stored as the in-memory (network order) address word
        std::net::Ipv4Addr::from(self.sonar_alt_ip.to_le_bytes())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    pub version: u16,
    pub status: GeminiStatus,
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self {
            version: STATUS_MSG_VERSION,
            status: GeminiStatus::default(),
        }
    }
}

impl StatusRecord {
    pub fn new(status: GeminiStatus) -> Self {
        Self {
            version: STATUS_MSG_VERSION,
            status,
        }
    }

    pub(crate) fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u16(self.version);
        w.put_fixed(&self.status)
    }

    pub(crate) fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let version = r.u16()?;
        let status = r.fixed(GEMINI_STATUS_SIZE)?;
        Ok(Self { version, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_size() {
        let bytes = bincode::serialize(&GeminiStatus::default()).unwrap();
        assert_eq!(bytes.len(), GEMINI_STATUS_SIZE);
        // xd_selected sits right after the four i16 fields
        assert_eq!(bytes[8], 0xFF);
    }

    #[test]
    fn test_helpers() {
        let mut status = GeminiStatus {
            boot_sts_register: 0x0201,
            ..Default::default()
        };
        assert!(status.bootloader_booted());
        status.boot_sts_register = 0x0002;
        assert!(!status.bootloader_booted());

        status.shutdown_status = 0x0001;
        assert!(status.over_temperature());
        assert!(!status.out_of_water());
        status.shutdown_status = 0x0004;
        assert!(status.out_of_water());

        status.sonar_alt_ip = u32::from_le_bytes([192, 168, 2, 201]);
        assert_eq!(status.sonar_alt_ip().to_string(), "192.168.2.201");
    }

    #[test]
    fn test_body_roundtrip() {
        let rec = StatusRecord::new(GeminiStatus {
            psu_t: 41.5,
            link_quality: 97,
            network_adaptor_found: true,
            ..Default::default()
        });
        let mut w = ByteWriter::with_capacity(GEMINI_STATUS_SIZE + 2);
        rec.encode_body(&mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 2 + GEMINI_STATUS_SIZE);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(StatusRecord::decode_body(&mut r).unwrap(), rec);
        r.finish().unwrap();
    }

    #[test]
    fn test_short_body() {
        let mut r = ByteReader::new(&[1, 0, 0, 0]);
        assert!(matches!(
            StatusRecord::decode_body(&mut r),
            Err(DecodeError::Truncated { expected: 232, .. })
        ));
    }
}

//! Positional decoder for the GET_SYS_INFO telemetry block.
//!
//! The block has no tags or field lengths: every field sits at a fixed
//! little-endian offset. Two layouts exist:
//!
//! - **Legacy** (50 bytes): position, fix quality, UTC date/time, validity
//!   flags, battery voltage and GPS state.
//! - **Extended** (63 bytes): a version byte, the legacy block, then
//!   keep-alive, battery percentage, motion and environmental readings.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::SysInfoError;

/// Which GET_SYS_INFO layout the firmware sends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SysInfoLayout {
    /// 50-byte block without a version byte.
    #[default]
    Legacy,
    /// 63-byte block with a leading version byte.
    Extended,
}

impl SysInfoLayout {
    /// Exact payload length for this layout.
    pub fn payload_len(self) -> usize {
        match self {
            SysInfoLayout::Legacy => SYS_INFO_LEGACY_LEN,
            SysInfoLayout::Extended => SYS_INFO_EXTENDED_LEN,
        }
    }
}

/// GPS power/acquisition state reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpsState {
    /// Receiver is starting up.
    Initializing,
    /// Receiver is on and searching for a fix.
    Searching,
    /// Receiver is powered off to save battery.
    PoweredOff,
    /// Receiver has a fix and is tracking.
    FixAcquired,
    /// Tracker is deciding whether it is stationary.
    AnalyzingStationary,
    /// Receiver is ingesting AGNSS data.
    TransmittingAgnss,
    /// Code not known to this host.
    Unknown(u8),
}

impl From<u8> for GpsState {
    fn from(code: u8) -> Self {
        match code {
            0 => GpsState::Initializing,
            1 => GpsState::Searching,
            2 => GpsState::PoweredOff,
            3 => GpsState::FixAcquired,
            4 => GpsState::AnalyzingStationary,
            5 => GpsState::TransmittingAgnss,
            other => GpsState::Unknown(other),
        }
    }
}

impl From<GpsState> for u8 {
    fn from(state: GpsState) -> Self {
        match state {
            GpsState::Initializing => 0,
            GpsState::Searching => 1,
            GpsState::PoweredOff => 2,
            GpsState::FixAcquired => 3,
            GpsState::AnalyzingStationary => 4,
            GpsState::TransmittingAgnss => 5,
            GpsState::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for GpsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpsState::Initializing => write!(f, "initializing"),
            GpsState::Searching => write!(f, "searching"),
            GpsState::PoweredOff => write!(f, "powered off"),
            GpsState::FixAcquired => write!(f, "fix acquired"),
            GpsState::AnalyzingStationary => write!(f, "analyzing stationary"),
            GpsState::TransmittingAgnss => write!(f, "transmitting AGNSS"),
            GpsState::Unknown(code) => write!(f, "unknown ({})", code),
        }
    }
}

/// Fields only present in the extended layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtendedInfo {
    /// Seconds left on a GPS keep-alive; 0 when none is active.
    pub keep_alive_remaining_s: u16,
    /// Estimated battery charge.
    pub battery_percent: u8,
    /// Whether the motion detector considers the tracker at rest.
    pub is_stationary: bool,
    /// Temperature in °C, if the sensor is fitted.
    pub temperature_c: Option<f32>,
    /// Barometric pressure in Pa, if the sensor is fitted.
    pub pressure_pa: Option<f32>,
}

/// Decoded system telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SysInfo {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f32,
    /// Satellites used in the fix.
    pub satellites: u32,
    /// Horizontal dilution of precision.
    pub hdop: f32,
    /// Ground speed in km/h.
    pub speed: f32,
    /// Course over ground in degrees.
    pub course: f32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Position fields hold a real fix.
    pub location_valid: bool,
    /// Date/time fields come from the receiver.
    pub date_time_valid: bool,
    /// Battery voltage in volts.
    pub battery_voltage: f32,
    pub gps_state: GpsState,
    /// Present when the extended layout was decoded.
    pub extended: Option<ExtendedInfo>,
}

impl SysInfo {
    /// Decode a GET_SYS_INFO payload in the given layout.
    ///
    /// The payload must be exactly the layout's length.
    pub fn decode(payload: &[u8], layout: SysInfoLayout) -> Result<Self, SysInfoError> {
        let expected = layout.payload_len();
        if payload.len() != expected {
            return Err(SysInfoError::PayloadLengthMismatch {
                expected,
                actual: payload.len(),
            });
        }

        match layout {
            SysInfoLayout::Legacy => Ok(decode_legacy(payload)),
            SysInfoLayout::Extended => {
                if payload[0] != SYS_INFO_EXTENDED_VERSION {
                    return Err(SysInfoError::UnsupportedVersion(payload[0]));
                }
                let mut info = decode_legacy(&payload[1..1 + SYS_INFO_LEGACY_LEN]);
                info.extended = Some(decode_extension(&payload[1 + SYS_INFO_LEGACY_LEN..]));
                Ok(info)
            }
        }
    }

    /// Encode to the given layout, as the firmware would.
    ///
    /// Encoding the extended layout without extended fields writes zeros
    /// and NaN sensor readings.
    pub fn encode(&self, layout: SysInfoLayout) -> Vec<u8> {
        let mut out = Vec::with_capacity(layout.payload_len());
        if layout == SysInfoLayout::Extended {
            out.push(SYS_INFO_EXTENDED_VERSION);
        }

        out.extend_from_slice(&self.latitude.to_le_bytes());
        out.extend_from_slice(&self.longitude.to_le_bytes());
        out.extend_from_slice(&self.altitude.to_le_bytes());
        out.extend_from_slice(&self.satellites.to_le_bytes());
        out.extend_from_slice(&self.hdop.to_le_bytes());
        out.extend_from_slice(&self.speed.to_le_bytes());
        out.extend_from_slice(&self.course.to_le_bytes());
        out.extend_from_slice(&self.year.to_le_bytes());
        out.extend_from_slice(&[self.month, self.day, self.hour, self.minute, self.second]);
        out.push(u8::from(self.location_valid));
        out.push(u8::from(self.date_time_valid));
        out.extend_from_slice(&self.battery_voltage.to_le_bytes());
        out.push(self.gps_state.into());

        if layout == SysInfoLayout::Extended {
            let ext = self.extended.unwrap_or(ExtendedInfo {
                keep_alive_remaining_s: 0,
                battery_percent: 0,
                is_stationary: false,
                temperature_c: None,
                pressure_pa: None,
            });
            out.extend_from_slice(&ext.keep_alive_remaining_s.to_le_bytes());
            out.push(ext.battery_percent);
            out.push(u8::from(ext.is_stationary));
            out.extend_from_slice(&ext.temperature_c.unwrap_or(f32::NAN).to_le_bytes());
            out.extend_from_slice(&ext.pressure_pa.unwrap_or(f32::NAN).to_le_bytes());
        }

        out
    }

    /// UTC timestamp of the last fix, when the receiver supplied one.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        if !self.date_time_valid {
            return None;
        }
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }

    /// Position as `(latitude, longitude)`, when the fix is valid.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.location_valid.then_some((self.latitude, self.longitude))
    }
}

fn decode_legacy(b: &[u8]) -> SysInfo {
    SysInfo {
        latitude: read_f64(b, 0),
        longitude: read_f64(b, 8),
        altitude: read_f32(b, 16),
        satellites: u32::from_le_bytes([b[20], b[21], b[22], b[23]]),
        hdop: read_f32(b, 24),
        speed: read_f32(b, 28),
        course: read_f32(b, 32),
        year: u16::from_le_bytes([b[36], b[37]]),
        month: b[38],
        day: b[39],
        hour: b[40],
        minute: b[41],
        second: b[42],
        location_valid: b[43] != 0,
        date_time_valid: b[44] != 0,
        battery_voltage: read_f32(b, 45),
        gps_state: GpsState::from(b[49]),
        extended: None,
    }
}

fn decode_extension(b: &[u8]) -> ExtendedInfo {
    ExtendedInfo {
        keep_alive_remaining_s: u16::from_le_bytes([b[0], b[1]]),
        battery_percent: b[2],
        is_stationary: b[3] != 0,
        temperature_c: sensor_reading(read_f32(b, 4)),
        pressure_pa: sensor_reading(read_f32(b, 8)),
    }
}

fn sensor_reading(value: f32) -> Option<f32> {
    (!value.is_nan()).then_some(value)
}

fn read_f32(b: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn read_f64(b: &[u8], at: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[at..at + 8]);
    f64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SysInfo {
        SysInfo {
            latitude: 52.520008,
            longitude: 13.404954,
            altitude: 34.5,
            satellites: 9,
            hdop: 1.2,
            speed: 3.5,
            course: 270.0,
            year: 2024,
            month: 6,
            day: 15,
            hour: 12,
            minute: 30,
            second: 45,
            location_valid: true,
            date_time_valid: true,
            battery_voltage: 3.92,
            gps_state: GpsState::FixAcquired,
            extended: None,
        }
    }

    #[test]
    fn test_decode_legacy_offsets() {
        let mut payload = vec![0u8; SYS_INFO_LEGACY_LEN];
        payload[0..8].copy_from_slice(&45.5f64.to_le_bytes());
        payload[20..24].copy_from_slice(&7u32.to_le_bytes());
        payload[36..38].copy_from_slice(&2025u16.to_le_bytes());
        payload[38] = 3;
        payload[43] = 1;
        payload[45..49].copy_from_slice(&4.1f32.to_le_bytes());
        payload[49] = 3;

        let info = SysInfo::decode(&payload, SysInfoLayout::Legacy).unwrap();
        assert_eq!(info.latitude, 45.5);
        assert_eq!(info.satellites, 7);
        assert_eq!(info.year, 2025);
        assert_eq!(info.month, 3);
        assert!(info.location_valid);
        assert!(!info.date_time_valid);
        assert_eq!(info.battery_voltage, 4.1);
        assert_eq!(info.gps_state, GpsState::FixAcquired);
        assert!(info.extended.is_none());
    }

    #[test]
    fn test_decode_length_mismatch() {
        let err = SysInfo::decode(&[0u8; 49], SysInfoLayout::Legacy).unwrap_err();
        assert_eq!(
            err,
            SysInfoError::PayloadLengthMismatch {
                expected: 50,
                actual: 49
            }
        );

        // a legacy block is not an extended one
        let err = SysInfo::decode(&[0u8; 50], SysInfoLayout::Extended).unwrap_err();
        assert!(matches!(
            err,
            SysInfoError::PayloadLengthMismatch { expected: 63, .. }
        ));
    }

    #[test]
    fn test_decode_extended() {
        let mut info = sample();
        info.extended = Some(ExtendedInfo {
            keep_alive_remaining_s: 600,
            battery_percent: 80,
            is_stationary: true,
            temperature_c: Some(21.5),
            pressure_pa: None,
        });

        let payload = info.encode(SysInfoLayout::Extended);
        assert_eq!(payload.len(), SYS_INFO_EXTENDED_LEN);
        assert_eq!(payload[0], SYS_INFO_EXTENDED_VERSION);

        let decoded = SysInfo::decode(&payload, SysInfoLayout::Extended).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn test_decode_extended_bad_version() {
        let mut payload = sample().encode(SysInfoLayout::Extended);
        payload[0] = 1;
        assert_eq!(
            SysInfo::decode(&payload, SysInfoLayout::Extended),
            Err(SysInfoError::UnsupportedVersion(1))
        );
    }

    #[test]
    fn test_gps_state_codes() {
        assert_eq!(GpsState::from(0), GpsState::Initializing);
        assert_eq!(GpsState::from(2), GpsState::PoweredOff);
        assert_eq!(GpsState::from(3), GpsState::FixAcquired);
        assert_eq!(GpsState::from(5), GpsState::TransmittingAgnss);
        assert_eq!(GpsState::from(9), GpsState::Unknown(9));
        assert_eq!(u8::from(GpsState::AnalyzingStationary), 4);
    }

    #[test]
    fn test_timestamp() {
        let info = sample();
        let ts = info.timestamp().unwrap();
        assert_eq!(ts.to_string(), "2024-06-15 12:30:45");

        let mut stale = info;
        stale.date_time_valid = false;
        assert!(stale.timestamp().is_none());

        // receiver sends zeros before it has a date
        let mut zeroed = info;
        zeroed.month = 0;
        assert!(zeroed.timestamp().is_none());
    }

    #[test]
    fn test_position() {
        let mut info = sample();
        assert_eq!(info.position(), Some((52.520008, 13.404954)));
        info.location_valid = false;
        assert_eq!(info.position(), None);
    }

    #[test]
    fn test_serialize_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["gps_state"], "fix_acquired");
        assert_eq!(json["satellites"], 9);
    }
}

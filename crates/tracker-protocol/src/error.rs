//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding a command.
///
/// These indicate a caller bug (a chunk larger than the negotiated budget,
/// a path that cannot be length-prefixed), never a runtime condition of the
/// link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Chunk payload exceeds the negotiated chunk size.
    #[error("payload too large: maximum {max} bytes, got {len}")]
    PayloadTooLarge {
        /// Bytes supplied.
        len: usize,
        /// Current chunk budget.
        max: usize,
    },

    /// Path does not fit its one-byte length prefix.
    #[error("path too long: maximum {max} bytes, got {len}")]
    PathTooLong {
        /// Path length in bytes.
        len: usize,
        /// Maximum encodable length.
        max: usize,
    },
}

/// Errors raised while decoding a response frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is shorter than the opcode's fixed minimum.
    #[error("malformed 0x{opcode:02X} frame: expected at least {expected} bytes, got {actual}")]
    Malformed {
        /// Opcode of the offending frame.
        opcode: u8,
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Leading byte is not a known opcode.
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Frame has a valid length but inconsistent contents.
    #[error("invalid frame data: {0}")]
    InvalidData(String),
}

/// Errors raised by the positional system-info decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SysInfoError {
    /// Payload length does not match the expected layout.
    #[error("system info payload length mismatch: expected {expected} bytes, got {actual}")]
    PayloadLengthMismatch {
        /// Length required by the layout.
        expected: usize,
        /// Length received.
        actual: usize,
    },

    /// Extended payload carries an unsupported version byte.
    #[error("unsupported system info version: {0}")]
    UnsupportedVersion(u8),
}

/// Failure status reported by the firmware in a response frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Path or handle does not exist.
    #[error("not found")]
    NotFound,
    /// Device cannot serve the request right now.
    #[error("device busy")]
    DeviceBusy,
    /// AGNSS byte count did not match the declared length.
    #[error("length mismatch")]
    LengthMismatch,
    /// Unknown status code.
    #[error("unknown status (0x{0:02X})")]
    Unknown(u8),
}

impl From<u8> for DeviceStatus {
    fn from(code: u8) -> Self {
        use crate::constants::*;
        match code {
            STATUS_NOT_FOUND => DeviceStatus::NotFound,
            STATUS_DEVICE_BUSY => DeviceStatus::DeviceBusy,
            STATUS_LENGTH_MISMATCH => DeviceStatus::LengthMismatch,
            _ => DeviceStatus::Unknown(code),
        }
    }
}

impl From<DeviceStatus> for u8 {
    fn from(status: DeviceStatus) -> Self {
        use crate::constants::*;
        match status {
            DeviceStatus::NotFound => STATUS_NOT_FOUND,
            DeviceStatus::DeviceBusy => STATUS_DEVICE_BUSY,
            DeviceStatus::LengthMismatch => STATUS_LENGTH_MISMATCH,
            DeviceStatus::Unknown(code) => code,
        }
    }
}

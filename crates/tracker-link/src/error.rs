//! Error types for the link engine.

use std::time::Duration;

use thiserror::Error;
use tracker_protocol::{DecodeError, DeviceStatus, EncodeError, Opcode, SysInfoError};

/// Errors raised by a transport when writing a frame.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error on the underlying byte pipe.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The pipe has been closed.
    #[error("transport closed")]
    Closed,
}

/// A response that could not be matched to the pending request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Response echoes a different opcode than the request.
    #[error("response opcode mismatch: expected {expected}, got {actual}")]
    Mismatch {
        /// Opcode of the pending request.
        expected: Opcode,
        /// Opcode carried by the response.
        actual: Opcode,
    },

    /// Response frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Response decoded but its contents break the request's contract.
    #[error("unexpected {opcode} response: {detail}")]
    Unexpected {
        /// Opcode of the request.
        opcode: Opcode,
        /// What was wrong.
        detail: String,
    },
}

/// Errors returned by [`crate::Connection`] operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Another request is already awaiting its response.
    #[error("a request is already in flight")]
    Busy,

    /// No response arrived within the timeout.
    #[error("{opcode} timed out after {after:?}")]
    Timeout {
        /// Opcode of the abandoned request.
        opcode: Opcode,
        /// Timeout that elapsed.
        after: Duration,
    },

    /// The transport reported a disconnect.
    #[error("disconnected")]
    Disconnected,

    /// Response did not fit the request.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Device answered with a failure status.
    #[error("device error: {0}")]
    Device(#[from] DeviceStatus),

    /// A file or AGNSS session is already active.
    #[error("another transfer session is active")]
    SessionConflict,

    /// Writing the request failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Request could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// System info payload could not be decoded.
    #[error("system info error: {0}")]
    SysInfo(#[from] SysInfoError),

    /// File ended before its reported size.
    #[error("file truncated: expected {expected} bytes, received {received}")]
    Truncated {
        /// Size reported by OPEN_FILE.
        expected: u32,
        /// Bytes actually read.
        received: u32,
    },

    /// AGNSS upload of zero bytes.
    #[error("AGNSS payload is empty")]
    EmptyPayload,
}

impl From<DecodeError> for LinkError {
    fn from(e: DecodeError) -> Self {
        LinkError::Protocol(ProtocolError::Decode(e))
    }
}

impl LinkError {
    /// Whether the link is gone and nothing more can be sent.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, LinkError::Disconnected)
    }

    /// Device status carried by this error, if any.
    pub fn device_status(&self) -> Option<DeviceStatus> {
        match self {
            LinkError::Device(status) => Some(*status),
            _ => None,
        }
    }
}

/// Result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

//! Boundary to the byte pipe carrying the UART service.
//!
//! The engine never talks to a Bluetooth stack directly. A transport
//! writes request frames to the write characteristic and reports what
//! happens on the notify side as [`TransportEvent`]s on an mpsc channel.

use std::future::Future;

use bytes::Bytes;

use crate::error::TransportError;

/// Something reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Bytes from one notification. May hold part of a frame or several.
    Notification(Bytes),
    /// The negotiated ATT MTU changed.
    MtuChanged(usize),
    /// The link is gone.
    Disconnected,
}

/// Write side of the link.
///
/// Implementations split a frame across ATT writes as needed; the
/// firmware parses requests byte by byte.
pub trait Transport: Send + Sync + 'static {
    /// Write one complete request frame.
    fn write(&self, frame: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;
}

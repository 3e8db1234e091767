//! Response frame reassembly.
//!
//! The firmware splits each response across as many notifications as the
//! ATT MTU requires. Response frames carry their own payload length, so the
//! host can rebuild them without any extra delimiter.

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::*;
use crate::error::DecodeError;
use crate::responses::Response;
use crate::types::Opcode;

/// Rebuilds response frames from notification fragments.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    /// Buffer for accumulating notification bytes.
    buffer: BytesMut,
}

impl FrameAssembler {
    /// Create a new assembler.
    pub fn new() -> Self {
        FrameAssembler {
            buffer: BytesMut::with_capacity(RESPONSE_HEADER_SIZE + MAX_RESPONSE_PAYLOAD),
        }
    }

    /// Add notification bytes to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Take the next complete frame, header included.
    ///
    /// Returns `None` if more data is needed. A frame boundary holding an
    /// unknown opcode or an impossible length cannot be resynchronized, so
    /// the buffer is discarded and the error returned.
    pub fn next_frame(&mut self) -> Option<Result<Bytes, DecodeError>> {
        if self.buffer.is_empty() {
            return None;
        }

        if let Err(e) = Opcode::try_from(self.buffer[0]) {
            self.buffer.clear();
            return Some(Err(e));
        }

        if self.buffer.len() < RESPONSE_HEADER_SIZE {
            return None;
        }

        let len = u16::from_le_bytes([self.buffer[2], self.buffer[3]]) as usize;
        if len > MAX_RESPONSE_PAYLOAD {
            self.buffer.clear();
            return Some(Err(DecodeError::InvalidData(format!(
                "declared payload of {} bytes exceeds {}",
                len, MAX_RESPONSE_PAYLOAD
            ))));
        }

        if self.buffer.len() < RESPONSE_HEADER_SIZE + len {
            return None;
        }

        Some(Ok(self.buffer.split_to(RESPONSE_HEADER_SIZE + len).freeze()))
    }

    /// Take and decode the next complete response.
    pub fn next_response(&mut self) -> Option<Result<Response, DecodeError>> {
        self.next_frame()
            .map(|frame| frame.and_then(|f| Response::decode(&f)))
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Encode a response frame as the firmware would send it.
///
/// Used by device simulators and tests.
pub fn encode_response(opcode: u8, status: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
    buf.put_u8(opcode);
    buf.put_u8(status);
    buf.put_u16_le(payload.len() as u16);
    buf.extend_from_slice(payload);
    buf
}

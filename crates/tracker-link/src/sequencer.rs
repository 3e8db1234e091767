//! Single-slot request sequencer.
//!
//! The link carries no request identifiers, so a response can only be
//! matched to a request by allowing one request on the wire at a time.
//! The sequencer owns that one slot. Callers install a [`PendingRequest`]
//! before writing a frame; the router task completes it when a response
//! frame is decoded.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, histogram};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use tracker_protocol::{DecodeError, Opcode, Response};

use crate::error::{LinkError, ProtocolError};
use crate::metric_defs::*;

type Sink = oneshot::Sender<Result<Response, LinkError>>;

/// The one outstanding request.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    id: u64,
    opcode: Opcode,
    sent_at: Instant,
    sink: Sink,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<PendingRequest>,
    disconnected: bool,
    /// The last request ended without its response; part of it may
    /// still sit in the router's frame buffer.
    abandoned: bool,
    /// Set on install after an abandoned request; the router drops its
    /// buffered bytes before the next notification.
    discard_buffered: bool,
}

/// Tracks the in-flight request of one connection.
#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    slot: Mutex<Slot>,
    next_id: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `opcode`.
    ///
    /// Fails with `Disconnected` once the link is gone and with `Busy`
    /// while another request is pending. Nothing is queued.
    pub fn install(
        &self,
        opcode: Opcode,
    ) -> Result<(u64, oneshot::Receiver<Result<Response, LinkError>>), LinkError> {
        let mut slot = self.slot.lock();
        if slot.disconnected {
            return Err(LinkError::Disconnected);
        }
        if let Some(pending) = &slot.pending {
            debug!("{} rejected: {} still pending", opcode, pending.opcode);
            return Err(LinkError::Busy);
        }

        if slot.abandoned {
            slot.abandoned = false;
            slot.discard_buffered = true;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sink, receiver) = oneshot::channel();
        slot.pending = Some(PendingRequest {
            id,
            opcode,
            sent_at: Instant::now(),
            sink,
        });
        counter!(LINK_REQUESTS_SENT.name, "opcode" => opcode.to_string()).increment(1);
        Ok((id, receiver))
    }

    /// Clear the slot if it still holds request `id`.
    pub fn release(&self, id: u64) -> bool {
        let mut slot = self.slot.lock();
        match &slot.pending {
            Some(pending) if pending.id == id => {
                slot.pending = None;
                slot.abandoned = true;
                true
            }
            _ => false,
        }
    }

    /// Whether buffered bytes predate the current request and must go.
    pub fn take_discard_buffered(&self) -> bool {
        std::mem::take(&mut self.slot.lock().discard_buffered)
    }

    /// Whether a request is awaiting its response.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    /// Whether the link has been reported gone.
    pub fn is_disconnected(&self) -> bool {
        self.slot.lock().disconnected
    }

    /// Hand a decoded frame to the pending request.
    pub fn complete(&self, decoded: Result<Response, DecodeError>) {
        let pending = self.slot.lock().pending.take();

        let Some(pending) = pending else {
            match decoded {
                Ok(response) => {
                    debug!("dropping {} response with no request pending", response.opcode())
                }
                Err(e) => debug!("dropping undecodable frame with no request pending: {}", e),
            }
            counter!(LINK_UNSOLICITED_FRAMES.name).increment(1);
            return;
        };

        let result = match decoded {
            Ok(response) if response.opcode() == pending.opcode => {
                let elapsed = pending.sent_at.elapsed();
                trace!("{} answered after {:?}", pending.opcode, elapsed);
                histogram!(LINK_REQUEST_LATENCY.name, "opcode" => pending.opcode.to_string())
                    .record(elapsed.as_secs_f64());
                Ok(response)
            }
            Ok(response) => {
                warn!(
                    "expected {} response, got {}",
                    pending.opcode,
                    response.opcode()
                );
                Err(LinkError::Protocol(ProtocolError::Mismatch {
                    expected: pending.opcode,
                    actual: response.opcode(),
                }))
            }
            Err(e) => {
                warn!("failed to decode {} response: {}", pending.opcode, e);
                counter!(LINK_DECODE_ERRORS.name).increment(1);
                Err(e.into())
            }
        };

        // The caller may have given up already.
        let _ = pending.sink.send(result);
    }

    /// Fail the pending request and refuse all further ones.
    pub fn disconnect(&self) {
        let pending = {
            let mut slot = self.slot.lock();
            slot.disconnected = true;
            slot.pending.take()
        };
        if let Some(pending) = pending {
            debug!("failing pending {} on disconnect", pending.opcode);
            let _ = pending.sink.send(Err(LinkError::Disconnected));
        }
    }
}

/// Clears the slot when a caller stops waiting, whatever the reason.
pub(crate) struct PendingGuard<'a> {
    pub sequencer: &'a Sequencer,
    pub id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.sequencer.release(self.id) {
            trace!("released request {}", self.id);
        }
    }
}

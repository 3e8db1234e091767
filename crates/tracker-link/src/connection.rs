//! Connection handle and router task.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use tracker_protocol::{Command, FrameAssembler, Opcode, Response};

use crate::config::LinkConfig;
use crate::error::{LinkError, ProtocolError, Result};
use crate::metric_defs::*;
use crate::mtu::MtuState;
use crate::sequencer::{PendingGuard, Sequencer};
use crate::session::{AgnssUploadState, FileTransferState, Sessions};
use crate::transport::{Transport, TransportEvent};

/// State shared between a [`Connection`] and its router task.
#[derive(Debug)]
pub(crate) struct Shared {
    pub sequencer: Sequencer,
    pub mtu: MtuState,
    pub sessions: Mutex<Sessions>,
}

impl Shared {
    fn disconnect(&self) {
        // Sessions first, so a transfer woken by the failed request
        // already sees its invalidated state.
        self.sessions.lock().on_disconnect();
        self.sequencer.disconnect();
    }
}

/// One live link to a tracker.
///
/// Every operation is a sequence of single requests; only one request is
/// ever on the wire. A new connection starts with a fresh sequencer, MTU
/// state and session slots, and nothing outlives it.
pub struct Connection<T: Transport> {
    transport: T,
    shared: Arc<Shared>,
    config: LinkConfig,
    router: JoinHandle<()>,
}

impl<T: Transport> Connection<T> {
    /// Start a connection over `transport`.
    ///
    /// Spawns the router task consuming `events`, so this must be called
    /// from within a tokio runtime.
    pub fn open(transport: T, events: mpsc::Receiver<TransportEvent>, config: LinkConfig) -> Self {
        let shared = Arc::new(Shared {
            sequencer: Sequencer::new(),
            mtu: MtuState::new(config.default_chunk_size),
            sessions: Mutex::new(Sessions::default()),
        });
        let router = tokio::spawn(route_events(shared.clone(), events));
        debug!("connection opened, chunk size {}", shared.mtu.chunk_size());

        Connection {
            transport,
            shared,
            config,
            router,
        }
    }

    /// Settings this connection was opened with.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Whether the transport is still up.
    pub fn is_connected(&self) -> bool {
        !self.shared.sequencer.is_disconnected()
    }

    /// Whether a request is awaiting its response.
    pub fn is_busy(&self) -> bool {
        self.shared.sequencer.is_pending()
    }

    /// Current chunk size.
    pub fn chunk_size(&self) -> usize {
        self.shared.mtu.chunk_size()
    }

    /// Override the chunk size, as when the transport reports a
    /// negotiated payload size out of band.
    pub fn set_chunk_size(&self, size: usize) {
        self.shared.mtu.set_chunk_size(size);
    }

    /// State of the current or last file download.
    pub fn file_transfer_state(&self) -> FileTransferState {
        self.shared.sessions.lock().file()
    }

    /// State of the current or last AGNSS upload.
    pub fn agnss_upload_state(&self) -> AgnssUploadState {
        self.shared.sessions.lock().agnss()
    }

    /// Send one command and wait for its response, with the configured
    /// request timeout.
    ///
    /// Device failure statuses come back as [`Response::Failed`].
    pub async fn send(&self, command: Command) -> Result<Response> {
        self.send_with_timeout(command, self.config.request_timeout())
            .await
    }

    /// Send one command and wait up to `timeout` for its response.
    pub async fn send_with_timeout(&self, command: Command, timeout: Duration) -> Result<Response> {
        self.ensure_no_session()?;
        let budget = self.budget_for(command.opcode());
        self.request(command, budget, timeout).await
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    /// One-shot operations must not slip in between a session's chunks.
    pub(crate) fn ensure_no_session(&self) -> Result<()> {
        if self.shared.sessions.lock().any_active() {
            return Err(LinkError::SessionConflict);
        }
        Ok(())
    }

    fn budget_for(&self, opcode: Opcode) -> usize {
        match opcode {
            Opcode::ReadChunk => self.shared.mtu.read_budget(),
            _ => self.shared.mtu.write_budget(),
        }
    }

    /// Write `command` and wait for the matching response.
    ///
    /// `budget` is the chunk budget the caller sized the command with.
    pub(crate) async fn request(
        &self,
        command: Command,
        budget: usize,
        timeout: Duration,
    ) -> Result<Response> {
        let opcode = command.opcode();
        let frame = command.encode(budget)?;
        let (id, receiver) = self.shared.sequencer.install(opcode)?;
        let _guard = PendingGuard {
            sequencer: &self.shared.sequencer,
            id,
        };

        trace!("tx {} [{}]", opcode, hex::encode(&frame));
        let mut receiver = receiver;

        // One deadline covers the write and the wait. A stalled write still
        // sees a disconnect, which completes the receiver. A dropped sender
        // means the router is gone.
        let exchange = async {
            tokio::select! {
                written = self.transport.write(frame) => written?,
                completed = &mut receiver => {
                    return completed.unwrap_or(Err(LinkError::Disconnected));
                }
            }
            receiver.await.unwrap_or(Err(LinkError::Disconnected))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {:?}", opcode, timeout);
                counter!(LINK_REQUEST_TIMEOUTS.name, "opcode" => opcode.to_string()).increment(1);
                Err(LinkError::Timeout {
                    opcode,
                    after: timeout,
                })
            }
        }
    }

    /// Like [`Connection::request`], with device failures turned into
    /// [`LinkError::Device`].
    pub(crate) async fn request_ok(
        &self,
        command: Command,
        budget: usize,
        timeout: Duration,
    ) -> Result<Response> {
        Ok(self.request(command, budget, timeout).await?.into_result()?)
    }

    /// Request with the configured timeout and the current budget.
    pub(crate) async fn simple_request(&self, command: Command) -> Result<Response> {
        let budget = self.budget_for(command.opcode());
        self.request_ok(command, budget, self.config.request_timeout())
            .await
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.router.abort();
    }
}

/// Error for a response of the right opcode but the wrong shape.
pub(crate) fn unexpected(response: Response) -> LinkError {
    LinkError::Protocol(ProtocolError::Unexpected {
        opcode: response.opcode(),
        detail: format!("{:?}", response),
    })
}

/// Feed transport events into the sequencer until the link goes away.
async fn route_events(shared: Arc<Shared>, mut events: mpsc::Receiver<TransportEvent>) {
    let mut assembler = FrameAssembler::new();

    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Notification(data) => {
                trace!("rx [{}]", hex::encode(&data));
                if shared.sequencer.take_discard_buffered() && assembler.buffered_len() > 0 {
                    debug!(
                        "dropping {} buffered bytes left by an abandoned request",
                        assembler.buffered_len()
                    );
                    assembler.clear();
                }
                assembler.push(&data);
                while let Some(decoded) = assembler.next_response() {
                    shared.sequencer.complete(decoded);
                }
            }
            TransportEvent::MtuChanged(att_mtu) => {
                debug!("ATT MTU {}", att_mtu);
                shared.mtu.update_from_att_mtu(att_mtu);
            }
            TransportEvent::Disconnected => break,
        }
    }

    info!("link disconnected");
    shared.disconnect();
}

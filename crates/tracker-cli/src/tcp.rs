//! TCP byte bridge to the tracker's UART service.
//!
//! The bridge forwards the raw byte stream in both directions, so each
//! socket read becomes one notification. A bridge has no ATT MTU of its
//! own; the chunk budget comes from the link configuration.

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use tracker_link::{Transport, TransportError, TransportEvent};

const READ_BUFFER_SIZE: usize = 1024;
const EVENT_QUEUE_DEPTH: usize = 64;

/// Write half of a bridged connection.
pub struct TcpTransport {
    writer: Mutex<OwnedWriteHalf>,
    reader: JoinHandle<()>,
}

impl TcpTransport {
    /// Dial `address` and start forwarding received bytes as events.
    pub async fn connect(
        address: &str,
    ) -> std::io::Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        debug!(%address, "bridge connected");

        let (read_half, write_half) = stream.into_split();
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let reader = tokio::spawn(forward_reads(read_half, events_tx));

        Ok((
            TcpTransport {
                writer: Mutex::new(write_half),
                reader,
            },
            events_rx,
        ))
    }
}

impl Transport for TcpTransport {
    async fn write(&self, frame: Bytes) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn forward_reads(mut reader: OwnedReadHalf, events: mpsc::Sender<TransportEvent>) {
    let mut read_buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut read_buf).await {
            Ok(0) => {
                debug!("bridge closed the connection");
                break;
            }
            Ok(n) => {
                let event = TransportEvent::Notification(Bytes::copy_from_slice(&read_buf[..n]));
                if events.send(event).await.is_err() {
                    // Connection dropped
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "bridge read failed");
                break;
            }
        }
    }
    let _ = events.send(TransportEvent::Disconnected).await;
}

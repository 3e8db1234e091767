//! Scripted in-memory tracker for integration tests.
//!
//! The fake device parses request frames exactly as the firmware does,
//! keeps a tiny filesystem and AGNSS buffer, and answers through the
//! transport event channel. Faults can be attached to the n-th request of
//! a given opcode.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracker_link::protocol::*;
use tracker_link::{Connection, LinkConfig, Transport, TransportError, TransportEvent};

// ============================================================================
// Transport
// ============================================================================

/// Transport that hands frames to the fake device task.
pub struct MockTransport {
    writes: mpsc::UnboundedSender<Bytes>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MockTransport {
    /// Transport feeding `writes`, with writes enabled.
    pub fn new(writes: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            writes,
            fail_writes: Arc::new(Mutex::new(false)),
        }
    }
}

impl Transport for MockTransport {
    async fn write(&self, frame: Bytes) -> Result<(), TransportError> {
        if *self.fail_writes.lock() {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write characteristic unavailable",
            )));
        }
        self.writes.send(frame).map_err(|_| TransportError::Closed)
    }
}

// ============================================================================
// Fake device
// ============================================================================

/// What the device does instead of its normal answer.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Never answer.
    Silence,
    /// Report a disconnect instead of answering.
    Disconnect,
    /// Answer with this status and no payload.
    Status(u8),
    /// Send these bytes verbatim.
    Raw(Vec<u8>),
    /// Report a new ATT MTU, then answer normally.
    MtuThenAnswer(usize),
    /// Send only the first n bytes of the normal answer.
    Partial(usize),
}

/// A request as the device parsed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub opcode: u8,
    pub payload: Vec<u8>,
}

impl Request {
    /// READ_CHUNK `(offset, max_len)`.
    pub fn read_args(&self) -> (u32, u16) {
        let p = &self.payload;
        (
            u32::from_le_bytes([p[1], p[2], p[3], p[4]]),
            u16::from_le_bytes([p[5], p[6]]),
        )
    }

    /// WRITE_AGNSS_CHUNK `(offset, data)`.
    pub fn agnss_chunk(&self) -> (u32, Vec<u8>) {
        let p = &self.payload;
        let len = u16::from_le_bytes([p[4], p[5]]) as usize;
        (
            u32::from_le_bytes([p[0], p[1], p[2], p[3]]),
            p[6..6 + len].to_vec(),
        )
    }
}

#[derive(Debug)]
enum Action {
    Send(Vec<u8>),
    Silence,
    Disconnect,
    Mtu(usize, Vec<u8>),
}

/// Device state and scripted behavior.
#[derive(Debug, Default)]
pub struct FakeTracker {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeMap<String, Vec<DirectoryEntry>>,
    /// Size OPEN_FILE reports instead of the real one.
    pub reported_sizes: HashMap<String, u32>,
    pub sysinfo: Vec<u8>,
    pub agnss_buffer: Option<(u32, Vec<u8>)>,
    pub agnss_committed: Option<Vec<u8>>,
    pub agnss_aborts: usize,
    pub wakeups: usize,
    pub keep_alive_minutes: Option<u16>,
    pub findmy_keys: Option<Vec<u8>>,
    pub findmy_enabled: bool,
    pub requests: Vec<Request>,
    faults: HashMap<(u8, usize), Fault>,
    counts: HashMap<u8, usize>,
    handles: HashMap<u8, String>,
    next_handle: u8,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), data);
        self
    }

    pub fn with_dir(mut self, path: &str, entries: Vec<DirectoryEntry>) -> Self {
        self.dirs.insert(path.to_string(), entries);
        self
    }

    pub fn with_sysinfo(mut self, payload: Vec<u8>) -> Self {
        self.sysinfo = payload;
        self
    }

    /// Apply `fault` to the `nth` (1-based) request with `opcode`.
    pub fn fault(mut self, opcode: u8, nth: usize, fault: Fault) -> Self {
        self.faults.insert((opcode, nth), fault);
        self
    }

    /// Opcodes of all requests seen, in order.
    pub fn opcodes(&self) -> Vec<u8> {
        self.requests.iter().map(|r| r.opcode).collect()
    }

    pub fn requests_with(&self, opcode: u8) -> Vec<Request> {
        self.requests
            .iter()
            .filter(|r| r.opcode == opcode)
            .cloned()
            .collect()
    }

    fn handle(&mut self, frame: &[u8]) -> Action {
        assert!(frame.len() >= REQUEST_HEADER_SIZE, "short request frame");
        let opcode = frame[0];
        let len = u16::from_le_bytes([frame[1], frame[2]]) as usize;
        assert_eq!(frame.len(), REQUEST_HEADER_SIZE + len, "request length header");
        let payload = frame[REQUEST_HEADER_SIZE..].to_vec();

        self.requests.push(Request {
            opcode,
            payload: payload.clone(),
        });
        let count = self.counts.entry(opcode).or_insert(0);
        *count += 1;

        match self.faults.remove(&(opcode, *count)) {
            Some(Fault::Silence) => Action::Silence,
            Some(Fault::Disconnect) => Action::Disconnect,
            Some(Fault::Status(status)) => Action::Send(encode_response(opcode, status, &[])),
            Some(Fault::Raw(bytes)) => Action::Send(bytes),
            Some(Fault::MtuThenAnswer(att_mtu)) => Action::Mtu(att_mtu, self.answer(opcode, &payload)),
            Some(Fault::Partial(n)) => {
                let mut bytes = self.answer(opcode, &payload);
                bytes.truncate(n);
                Action::Send(bytes)
            }
            None => Action::Send(self.answer(opcode, &payload)),
        }
    }

    fn answer(&mut self, opcode: u8, p: &[u8]) -> Vec<u8> {
        let (status, body) = match opcode {
            CMD_LIST_DIR => match self.dirs.get(&path(p)) {
                Some(entries) => (STATUS_OK, encode_listing(entries)),
                None => (STATUS_NOT_FOUND, Vec::new()),
            },

            CMD_OPEN_FILE => {
                let path = path(p);
                match self.files.get(&path) {
                    Some(data) => {
                        let size = self
                            .reported_sizes
                            .get(&path)
                            .copied()
                            .unwrap_or(data.len() as u32);
                        let handle = self.next_handle;
                        self.next_handle = self.next_handle.wrapping_add(1);
                        self.handles.insert(handle, path);
                        let mut body = vec![handle];
                        body.extend_from_slice(&size.to_le_bytes());
                        (STATUS_OK, body)
                    }
                    None => (STATUS_NOT_FOUND, Vec::new()),
                }
            }

            CMD_READ_CHUNK => {
                let offset = u32::from_le_bytes([p[1], p[2], p[3], p[4]]) as usize;
                let max_len = u16::from_le_bytes([p[5], p[6]]) as usize;
                match self.handles.get(&p[0]).and_then(|path| self.files.get(path)) {
                    Some(data) if offset >= data.len() => (STATUS_END_OF_FILE, Vec::new()),
                    Some(data) => {
                        let end = (offset + max_len).min(data.len());
                        (STATUS_OK, encode_chunk(&data[offset..end]))
                    }
                    None => (STATUS_NOT_FOUND, Vec::new()),
                }
            }

            CMD_CLOSE_FILE => match self.handles.remove(&p[0]) {
                Some(_) => (STATUS_OK, Vec::new()),
                None => (STATUS_NOT_FOUND, Vec::new()),
            },

            CMD_DELETE_FILE => match self.files.remove(&path(p)) {
                Some(_) => (STATUS_OK, Vec::new()),
                None => (STATUS_NOT_FOUND, Vec::new()),
            },

            CMD_GET_SYS_INFO => (STATUS_OK, self.sysinfo.clone()),

            CMD_START_AGNSS_WRITE => {
                let total = u32::from_le_bytes([p[0], p[1], p[2], p[3]]);
                self.agnss_buffer = Some((total, Vec::new()));
                (STATUS_OK, Vec::new())
            }

            CMD_WRITE_AGNSS_CHUNK => {
                let offset = u32::from_le_bytes([p[0], p[1], p[2], p[3]]) as usize;
                let len = u16::from_le_bytes([p[4], p[5]]) as usize;
                match &mut self.agnss_buffer {
                    Some((_, buf)) if offset <= buf.len() => {
                        buf.truncate(offset);
                        buf.extend_from_slice(&p[6..6 + len]);
                        (STATUS_OK, Vec::new())
                    }
                    _ => (STATUS_LENGTH_MISMATCH, Vec::new()),
                }
            }

            CMD_END_AGNSS_WRITE => match (p[0], self.agnss_buffer.take()) {
                (AGNSS_END_ABORT, _) => {
                    self.agnss_aborts += 1;
                    (STATUS_OK, Vec::new())
                }
                (_, Some((total, buf))) if buf.len() == total as usize => {
                    self.agnss_committed = Some(buf);
                    (STATUS_OK, Vec::new())
                }
                _ => (STATUS_LENGTH_MISMATCH, Vec::new()),
            },

            CMD_GPS_WAKEUP => {
                self.wakeups += 1;
                (STATUS_OK, Vec::new())
            }

            CMD_GPS_KEEP_ALIVE => {
                self.keep_alive_minutes = Some(u16::from_le_bytes([p[0], p[1]]));
                (STATUS_OK, Vec::new())
            }

            CMD_WRITE_FINDMY_KEYS if p.len() == FINDMY_KEY_SIZE => {
                self.findmy_keys = Some(p.to_vec());
                self.findmy_enabled = true;
                (STATUS_OK, Vec::new())
            }
            CMD_WRITE_FINDMY_KEYS => (STATUS_LENGTH_MISMATCH, Vec::new()),

            CMD_READ_FINDMY_KEYS => match &self.findmy_keys {
                Some(keys) => (STATUS_OK, keys.clone()),
                None => (STATUS_NOT_FOUND, Vec::new()),
            },

            CMD_GET_FINDMY_STATUS => (STATUS_OK, vec![self.findmy_enabled as u8]),

            other => panic!("unexpected opcode 0x{:02X}", other),
        };
        encode_response(opcode, status, &body)
    }
}

fn path(payload: &[u8]) -> String {
    let len = payload[0] as usize;
    String::from_utf8(payload[1..1 + len].to_vec()).expect("utf-8 path")
}

// ============================================================================
// Harness
// ============================================================================

/// A connection wired to a running fake device.
pub struct Harness {
    pub conn: Connection<MockTransport>,
    pub device: Arc<Mutex<FakeTracker>>,
    pub events: mpsc::Sender<TransportEvent>,
    pub fail_writes: Arc<Mutex<bool>>,
}

/// Start `device` with the default notification size (20 bytes).
pub fn start(device: FakeTracker, config: LinkConfig) -> Harness {
    start_with_notify_size(device, config, 20)
}

/// Start `device`, splitting every response into `notify_size` pieces.
pub fn start_with_notify_size(
    device: FakeTracker,
    config: LinkConfig,
    notify_size: usize,
) -> Harness {
    let (writes_tx, mut writes_rx) = mpsc::unbounded_channel::<Bytes>();
    let (events_tx, events_rx) = mpsc::channel(64);
    let device = Arc::new(Mutex::new(device));
    let fail_writes = Arc::new(Mutex::new(false));

    let transport = MockTransport {
        writes: writes_tx,
        fail_writes: fail_writes.clone(),
    };
    let conn = Connection::open(transport, events_rx, config);

    let task_device = device.clone();
    let task_events = events_tx.clone();
    tokio::spawn(async move {
        while let Some(frame) = writes_rx.recv().await {
            let action = task_device.lock().handle(&frame);
            let bytes = match action {
                Action::Send(bytes) => bytes,
                Action::Silence => continue,
                Action::Disconnect => {
                    let _ = task_events.send(TransportEvent::Disconnected).await;
                    continue;
                }
                Action::Mtu(att_mtu, bytes) => {
                    let _ = task_events.send(TransportEvent::MtuChanged(att_mtu)).await;
                    bytes
                }
            };
            for piece in bytes.chunks(notify_size) {
                let _ = task_events
                    .send(TransportEvent::Notification(Bytes::copy_from_slice(piece)))
                    .await;
            }
        }
    });

    Harness {
        conn,
        device,
        events: events_tx,
        fail_writes,
    }
}

/// Config with a 20-byte chunk budget.
pub fn config_with_chunk(size: usize) -> LinkConfig {
    LinkConfig {
        default_chunk_size: size,
        ..LinkConfig::default()
    }
}

/// `len` bytes of a recognizable pattern.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

//! Usable payload size per chunk.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;
use tracker_protocol::{ATT_HEADER_SIZE, MAX_AGNSS_CHUNK, MAX_READ_CHUNK};

/// Current chunk budget of one connection.
///
/// Shared between the router task (which applies MTU changes) and the
/// transfer loops (which read it at the start of every chunk).
#[derive(Debug)]
pub struct MtuState {
    chunk_size: AtomicUsize,
}

impl MtuState {
    /// Start at `default_size`.
    pub fn new(default_size: usize) -> Self {
        MtuState {
            chunk_size: AtomicUsize::new(default_size.max(1)),
        }
    }

    /// Current chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.load(Ordering::Acquire)
    }

    /// Record the chunk size reported by the transport. Zero is ignored.
    pub fn set_chunk_size(&self, size: usize) {
        if size == 0 {
            return;
        }
        let previous = self.chunk_size.swap(size, Ordering::AcqRel);
        if previous != size {
            debug!("chunk size {} -> {}", previous, size);
        }
    }

    /// Apply a negotiated ATT MTU.
    pub fn update_from_att_mtu(&self, att_mtu: usize) {
        self.set_chunk_size(att_mtu.saturating_sub(ATT_HEADER_SIZE));
    }

    /// Largest READ_CHUNK length to request right now.
    pub fn read_budget(&self) -> usize {
        self.chunk_size().min(MAX_READ_CHUNK)
    }

    /// Largest AGNSS chunk to send right now.
    pub fn write_budget(&self) -> usize {
        self.chunk_size().min(MAX_AGNSS_CHUNK)
    }
}

//! Per-connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracker_protocol::{SysInfoLayout, DEFAULT_CHUNK_SIZE};

/// Settings for one [`crate::Connection`].
///
/// Every field has a default, so an empty YAML/JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Timeout for a single request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Timeout for GET_SYS_INFO, in milliseconds.
    pub sysinfo_timeout_ms: u64,
    /// Chunk budget before the transport reports a negotiated MTU.
    pub default_chunk_size: usize,
    /// How many times a failed AGNSS chunk is re-sent.
    pub chunk_retries: u32,
    /// Which GET_SYS_INFO layout the firmware sends.
    pub sysinfo_layout: SysInfoLayout,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            request_timeout_ms: 5000,
            sysinfo_timeout_ms: 5000,
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_retries: 1,
            sysinfo_layout: SysInfoLayout::Legacy,
        }
    }
}

impl LinkConfig {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// GET_SYS_INFO timeout as a [`Duration`].
    pub fn sysinfo_timeout(&self) -> Duration {
        Duration::from_millis(self.sysinfo_timeout_ms)
    }
}

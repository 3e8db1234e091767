//! Metrics emitted by the link engine.
//!
//! Each metric is declared once as a [`Metric`] so names cannot drift
//! between the call sites and [`describe_metrics`]. Nothing is recorded
//! unless the application installs a `metrics` recorder.

use metrics::{describe_counter, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "tracker.link.requests_sent").
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Unit,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn counter(name: &'static str, description: &'static str, unit: Unit) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description,
            unit,
            labels: &[],
        }
    }

    const fn histogram(name: &'static str, description: &'static str, unit: Unit) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description,
            unit,
            labels: &[],
        }
    }

    const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

// ============================================================================
// Request sequencer
// ============================================================================

/// Requests written to the transport.
///
/// Labels: opcode
pub const LINK_REQUESTS_SENT: Metric = Metric::counter(
    "tracker.link.requests_sent",
    "Requests written to the transport",
    Unit::Count,
)
.with_labels(&["opcode"]);

/// Requests abandoned because no response arrived in time.
///
/// Labels: opcode
pub const LINK_REQUEST_TIMEOUTS: Metric = Metric::counter(
    "tracker.link.request_timeouts",
    "Requests that timed out",
    Unit::Count,
)
.with_labels(&["opcode"]);

/// Time from request install to matching response.
///
/// Labels: opcode
pub const LINK_REQUEST_LATENCY: Metric = Metric::histogram(
    "tracker.link.request_latency_seconds",
    "Request round-trip latency",
    Unit::Seconds,
)
.with_labels(&["opcode"]);

/// Response frames received with no request pending.
pub const LINK_UNSOLICITED_FRAMES: Metric = Metric::counter(
    "tracker.link.unsolicited_frames",
    "Response frames dropped because no request was pending",
    Unit::Count,
);

/// Response frames that failed to decode.
pub const LINK_DECODE_ERRORS: Metric = Metric::counter(
    "tracker.link.decode_errors",
    "Response frames that could not be decoded",
    Unit::Count,
);

// ============================================================================
// Transfers
// ============================================================================

/// File bytes received through READ_CHUNK.
pub const FILE_BYTES_DOWNLOADED: Metric = Metric::counter(
    "tracker.file.bytes_downloaded",
    "File bytes received",
    Unit::Bytes,
);

/// AGNSS bytes acknowledged by the device.
pub const AGNSS_BYTES_UPLOADED: Metric = Metric::counter(
    "tracker.agnss.bytes_uploaded",
    "AGNSS bytes acknowledged by the device",
    Unit::Bytes,
);

/// AGNSS chunks sent a second time after a failure.
pub const AGNSS_CHUNK_RETRIES: Metric = Metric::counter(
    "tracker.agnss.chunk_retries",
    "AGNSS chunk writes retried",
    Unit::Count,
);

/// All metrics declared by this crate.
pub const ALL: &[Metric] = &[
    LINK_REQUESTS_SENT,
    LINK_REQUEST_TIMEOUTS,
    LINK_REQUEST_LATENCY,
    LINK_UNSOLICITED_FRAMES,
    LINK_DECODE_ERRORS,
    FILE_BYTES_DOWNLOADED,
    AGNSS_BYTES_UPLOADED,
    AGNSS_CHUNK_RETRIES,
];

/// Describes all link metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in ALL {
        metric.describe();
    }
}

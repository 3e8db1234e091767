//! Tracker Link
//!
//! Async command/response engine for the GPS tracker's BLE UART service.
//!
//! A [`Connection`] wraps one live link. It writes request frames through
//! a [`Transport`] and receives notifications, MTU changes and disconnects
//! as [`TransportEvent`]s. Only one request is ever on the wire; chunked
//! transfers are ordered sequences of single requests, sized by the
//! chunk budget current at the start of each chunk.
//!
//! # Example
//!
//! ```rust,ignore
//! use tracker_link::{Connection, LinkConfig};
//!
//! let (events_tx, events_rx) = tokio::sync::mpsc::channel(64);
//! let conn = Connection::open(my_transport, events_rx, LinkConfig::default());
//!
//! for entry in conn.list_directory("/").await? {
//!     println!("{}", entry.name);
//! }
//! let log = conn.download_file("/log.bin").await?;
//! ```

mod agnss;
mod config;
mod connection;
mod device;
mod error;
mod files;
pub mod metric_defs;
mod mtu;
mod sequencer;
mod session;
mod transport;

pub use config::LinkConfig;
pub use connection::Connection;
pub use error::{LinkError, ProtocolError, Result, TransportError};
pub use metric_defs::describe_metrics;
pub use mtu::MtuState;
pub use session::{AgnssUploadState, FileTransferState};
pub use transport::{Transport, TransportEvent};

pub use tracker_protocol as protocol;

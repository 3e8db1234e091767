//! Tracker UART Protocol
//!
//! This crate provides types and utilities for talking to the GPS tracker
//! firmware over its BLE UART service. The link is a single write
//! characteristic paired with a single notify characteristic, and every
//! exchange is one request frame followed by one response frame.
//!
//! # Protocol Overview
//!
//! - **Requests** (host → firmware): `opcode, len u16 LE, payload`
//! - **Responses** (firmware → host): `opcode, status, len u16 LE, payload`
//!
//! A response echoes the opcode it answers. The firmware splits responses
//! across notifications to fit the ATT MTU; [`FrameAssembler`] rebuilds them.
//!
//! # Example
//!
//! ```rust,ignore
//! use tracker_protocol::{Command, FrameAssembler, DEFAULT_CHUNK_SIZE};
//!
//! // Build a request
//! let frame = Command::ListDir { path: "/".into() }.encode(DEFAULT_CHUNK_SIZE)?;
//!
//! // Rebuild a response from notifications
//! let mut assembler = FrameAssembler::new();
//! assembler.push(&notification);
//! if let Some(response) = assembler.next_response() {
//!     println!("{:?}", response?);
//! }
//! ```

mod commands;
mod constants;
mod error;
mod findmy;
mod frame;
mod responses;
mod sysinfo;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use findmy::*;
pub use frame::*;
pub use responses::*;
pub use sysinfo::*;
pub use types::*;

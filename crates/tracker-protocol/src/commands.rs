//! Commands that can be sent to the tracker firmware.

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::*;
use crate::error::EncodeError;
use crate::findmy::FindMyKeys;
use crate::types::*;

/// Commands that can be sent to the tracker firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the entries of a directory.
    ListDir {
        /// Directory path.
        path: String,
    },

    /// Open a file for reading.
    OpenFile {
        /// File path.
        path: String,
    },

    /// Read a chunk of an open file.
    ReadChunk {
        /// Handle returned by OPEN_FILE.
        handle: FileHandle,
        /// Byte offset to read from.
        offset: u32,
        /// Maximum number of bytes to return.
        max_len: u16,
    },

    /// Release an open file handle.
    CloseFile {
        /// Handle returned by OPEN_FILE.
        handle: FileHandle,
    },

    /// Delete a file.
    DeleteFile {
        /// File path.
        path: String,
    },

    /// Read the system telemetry block.
    GetSysInfo,

    /// Begin an AGNSS upload.
    StartAgnssWrite {
        /// Total number of bytes that will follow.
        total_len: u32,
    },

    /// Write one AGNSS chunk.
    WriteAgnssChunk {
        /// Offset of this chunk within the upload.
        offset: u32,
        /// Chunk bytes.
        data: Bytes,
    },

    /// Finish an AGNSS upload.
    EndAgnssWrite {
        /// Commit or abort.
        outcome: AgnssOutcome,
    },

    /// Wake the GPS receiver.
    GpsWakeup,

    /// Keep the GPS receiver powered.
    GpsKeepAlive {
        /// Duration in minutes; 0 cancels.
        minutes: u16,
    },

    /// Store Find My keys and start advertising with them.
    WriteFindMyKeys {
        /// Key material.
        keys: FindMyKeys,
    },

    /// Read back the stored Find My keys.
    ReadFindMyKeys,

    /// Ask whether Find My advertising is enabled.
    GetFindMyStatus,
}

impl Command {
    /// Get the opcode for this command.
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::ListDir { .. } => Opcode::ListDir,
            Command::OpenFile { .. } => Opcode::OpenFile,
            Command::ReadChunk { .. } => Opcode::ReadChunk,
            Command::CloseFile { .. } => Opcode::CloseFile,
            Command::DeleteFile { .. } => Opcode::DeleteFile,
            Command::GetSysInfo => Opcode::GetSysInfo,
            Command::StartAgnssWrite { .. } => Opcode::StartAgnssWrite,
            Command::WriteAgnssChunk { .. } => Opcode::WriteAgnssChunk,
            Command::EndAgnssWrite { .. } => Opcode::EndAgnssWrite,
            Command::GpsWakeup => Opcode::GpsWakeup,
            Command::GpsKeepAlive { .. } => Opcode::GpsKeepAlive,
            Command::WriteFindMyKeys { .. } => Opcode::WriteFindMyKeys,
            Command::ReadFindMyKeys => Opcode::ReadFindMyKeys,
            Command::GetFindMyStatus => Opcode::GetFindMyStatus,
        }
    }

    /// Get the wire code for this command.
    pub fn code(&self) -> u8 {
        self.opcode().code()
    }

    /// Encode the command payload (without the frame header).
    ///
    /// `max_chunk` is the current chunk budget; chunk-carrying commands
    /// larger than it are rejected.
    pub fn encode_payload(&self, max_chunk: usize) -> Result<BytesMut, EncodeError> {
        let mut buf = BytesMut::new();

        match self {
            Command::ListDir { path }
            | Command::OpenFile { path }
            | Command::DeleteFile { path } => {
                put_path(&mut buf, path)?;
            }

            Command::ReadChunk {
                handle,
                offset,
                max_len,
            } => {
                if *max_len as usize > max_chunk {
                    return Err(EncodeError::PayloadTooLarge {
                        len: *max_len as usize,
                        max: max_chunk,
                    });
                }
                buf.put_u8(handle.0);
                buf.put_u32_le(*offset);
                buf.put_u16_le(*max_len);
            }

            Command::CloseFile { handle } => {
                buf.put_u8(handle.0);
            }

            Command::GetSysInfo
            | Command::GpsWakeup
            | Command::ReadFindMyKeys
            | Command::GetFindMyStatus => {}

            Command::StartAgnssWrite { total_len } => {
                buf.put_u32_le(*total_len);
            }

            Command::WriteAgnssChunk { offset, data } => {
                if data.len() > max_chunk {
                    return Err(EncodeError::PayloadTooLarge {
                        len: data.len(),
                        max: max_chunk,
                    });
                }
                buf.put_u32_le(*offset);
                buf.put_u16_le(data.len() as u16);
                buf.extend_from_slice(data);
            }

            Command::EndAgnssWrite { outcome } => {
                buf.put_u8((*outcome).into());
            }

            Command::GpsKeepAlive { minutes } => {
                buf.put_u16_le(*minutes);
            }

            Command::WriteFindMyKeys { keys } => {
                buf.extend_from_slice(&keys.to_bytes());
            }
        }

        if buf.len() > MAX_REQUEST_PAYLOAD {
            return Err(EncodeError::PayloadTooLarge {
                len: buf.len(),
                max: MAX_REQUEST_PAYLOAD,
            });
        }

        Ok(buf)
    }

    /// Encode the command to a complete request frame.
    ///
    /// Layout: opcode, payload length (u16 LE), payload.
    pub fn encode(&self, max_chunk: usize) -> Result<Bytes, EncodeError> {
        let payload = self.encode_payload(max_chunk)?;
        let mut frame = BytesMut::with_capacity(REQUEST_HEADER_SIZE + payload.len());
        frame.put_u8(self.code());
        frame.put_u16_le(payload.len() as u16);
        frame.extend_from_slice(&payload);
        Ok(frame.freeze())
    }
}

fn put_path(buf: &mut BytesMut, path: &str) -> Result<(), EncodeError> {
    let bytes = path.as_bytes();
    if bytes.len() > MAX_PATH_LEN {
        return Err(EncodeError::PathTooLong {
            len: bytes.len(),
            max: MAX_PATH_LEN,
        });
    }
    buf.put_u8(bytes.len() as u8);
    buf.extend_from_slice(bytes);
    Ok(())
}

//! Responses from the tracker firmware.

use bytes::{BufMut, Bytes};

use crate::constants::*;
use crate::error::*;
use crate::findmy::FindMyKeys;
use crate::types::*;

/// Responses received from the tracker firmware.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Directory listing, in device order.
    Listing(Vec<DirectoryEntry>),

    /// File opened.
    FileOpened {
        /// Handle for subsequent reads.
        handle: FileHandle,
        /// Total file size in bytes.
        size: u32,
    },

    /// File data.
    Chunk {
        /// Bytes read (may be shorter than requested).
        data: Bytes,
        /// Device flagged the end of the file.
        end_of_file: bool,
    },

    /// File handle released.
    FileClosed,

    /// File deleted.
    FileDeleted,

    /// Raw system info block; decode with [`crate::SysInfo::decode`].
    SysInfo(Bytes),

    /// AGNSS receive buffer allocated.
    AgnssStarted,

    /// AGNSS chunk stored.
    AgnssChunkWritten,

    /// AGNSS upload finished.
    AgnssEnded,

    /// GPS wake-up accepted.
    GpsWokeUp,

    /// GPS keep-alive accepted.
    KeepAliveSet,

    /// Find My keys stored and advertising started.
    FindMyKeysWritten,

    /// Stored Find My keys; `None` when the device holds none.
    FindMyKeys(Option<FindMyKeys>),

    /// Find My advertising state.
    FindMyStatus {
        /// Whether the tracker is advertising.
        enabled: bool,
    },

    /// Device reported a failure status.
    Failed {
        /// Opcode of the failed request.
        opcode: Opcode,
        /// Failure status.
        status: DeviceStatus,
    },
}

impl Response {
    /// Opcode this response answers.
    pub fn opcode(&self) -> Opcode {
        match self {
            Response::Listing(_) => Opcode::ListDir,
            Response::FileOpened { .. } => Opcode::OpenFile,
            Response::Chunk { .. } => Opcode::ReadChunk,
            Response::FileClosed => Opcode::CloseFile,
            Response::FileDeleted => Opcode::DeleteFile,
            Response::SysInfo(_) => Opcode::GetSysInfo,
            Response::AgnssStarted => Opcode::StartAgnssWrite,
            Response::AgnssChunkWritten => Opcode::WriteAgnssChunk,
            Response::AgnssEnded => Opcode::EndAgnssWrite,
            Response::GpsWokeUp => Opcode::GpsWakeup,
            Response::KeepAliveSet => Opcode::GpsKeepAlive,
            Response::FindMyKeysWritten => Opcode::WriteFindMyKeys,
            Response::FindMyKeys(_) => Opcode::ReadFindMyKeys,
            Response::FindMyStatus { .. } => Opcode::GetFindMyStatus,
            Response::Failed { opcode, .. } => *opcode,
        }
    }

    /// Turn a device failure into an error, passing successes through.
    pub fn into_result(self) -> Result<Self, DeviceStatus> {
        match self {
            Response::Failed { status, .. } => Err(status),
            other => Ok(other),
        }
    }

    /// Decode a response from a complete frame.
    ///
    /// Layout: opcode, status, payload length (u16 LE), payload.
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        if frame.is_empty() {
            return Err(DecodeError::Malformed {
                opcode: 0,
                expected: RESPONSE_HEADER_SIZE,
                actual: 0,
            });
        }

        let code = frame[0];
        let opcode = Opcode::try_from(code)?;

        if frame.len() < RESPONSE_HEADER_SIZE {
            return Err(DecodeError::Malformed {
                opcode: code,
                expected: RESPONSE_HEADER_SIZE,
                actual: frame.len(),
            });
        }

        let status = frame[1];
        let declared = u16::from_le_bytes([frame[2], frame[3]]) as usize;
        let expected = RESPONSE_HEADER_SIZE + declared;
        if frame.len() < expected {
            return Err(DecodeError::Malformed {
                opcode: code,
                expected,
                actual: frame.len(),
            });
        }
        if frame.len() > expected {
            return Err(DecodeError::InvalidData(format!(
                "{} trailing bytes after 0x{:02X} frame",
                frame.len() - expected,
                code
            )));
        }

        let payload = &frame[RESPONSE_HEADER_SIZE..];

        match status {
            STATUS_OK => decode_success(opcode, payload),

            STATUS_END_OF_FILE if opcode == Opcode::ReadChunk => {
                let data = if payload.is_empty() {
                    Bytes::new()
                } else {
                    decode_chunk_data(payload)?
                };
                Ok(Response::Chunk {
                    data,
                    end_of_file: true,
                })
            }

            _ => Ok(Response::Failed {
                opcode,
                status: DeviceStatus::from(status),
            }),
        }
    }
}

fn decode_success(opcode: Opcode, payload: &[u8]) -> Result<Response, DecodeError> {
    let min = opcode.min_response_payload();
    if payload.len() < min {
        return Err(DecodeError::Malformed {
            opcode: opcode.code(),
            expected: RESPONSE_HEADER_SIZE + min,
            actual: RESPONSE_HEADER_SIZE + payload.len(),
        });
    }

    match opcode {
        Opcode::ListDir => Ok(Response::Listing(decode_listing(payload)?)),

        Opcode::OpenFile => {
            let handle = FileHandle(payload[0]);
            let size = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
            Ok(Response::FileOpened { handle, size })
        }

        Opcode::ReadChunk => Ok(Response::Chunk {
            data: decode_chunk_data(payload)?,
            end_of_file: false,
        }),

        Opcode::CloseFile => Ok(Response::FileClosed),
        Opcode::DeleteFile => Ok(Response::FileDeleted),
        Opcode::GetSysInfo => Ok(Response::SysInfo(Bytes::copy_from_slice(payload))),
        Opcode::StartAgnssWrite => Ok(Response::AgnssStarted),
        Opcode::WriteAgnssChunk => Ok(Response::AgnssChunkWritten),
        Opcode::EndAgnssWrite => Ok(Response::AgnssEnded),
        Opcode::GpsWakeup => Ok(Response::GpsWokeUp),
        Opcode::GpsKeepAlive => Ok(Response::KeepAliveSet),
        Opcode::WriteFindMyKeys => Ok(Response::FindMyKeysWritten),
        Opcode::ReadFindMyKeys if payload.is_empty() => Ok(Response::FindMyKeys(None)),
        Opcode::ReadFindMyKeys => Ok(Response::FindMyKeys(Some(FindMyKeys::from_bytes(
            payload,
        )?))),
        Opcode::GetFindMyStatus => Ok(Response::FindMyStatus {
            enabled: payload[0] != 0,
        }),
    }
}

fn decode_chunk_data(payload: &[u8]) -> Result<Bytes, DecodeError> {
    if payload.len() < 2 {
        return Err(DecodeError::Malformed {
            opcode: CMD_READ_CHUNK,
            expected: RESPONSE_HEADER_SIZE + 2,
            actual: RESPONSE_HEADER_SIZE + payload.len(),
        });
    }
    let data_len = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    let data = &payload[2..];
    if data.len() != data_len {
        return Err(DecodeError::InvalidData(format!(
            "chunk declares {} bytes but carries {}",
            data_len,
            data.len()
        )));
    }
    Ok(Bytes::copy_from_slice(data))
}

fn decode_listing(payload: &[u8]) -> Result<Vec<DirectoryEntry>, DecodeError> {
    let mut entries = Vec::new();
    let mut i = 0;

    while i < payload.len() {
        // kind + name_len
        if payload.len() < i + 2 {
            return Err(listing_too_short(i + 2, payload.len()));
        }
        let kind = EntryKind::try_from(payload[i])?;
        let name_len = payload[i + 1] as usize;
        i += 2;

        if payload.len() < i + name_len {
            return Err(listing_too_short(i + name_len, payload.len()));
        }
        let name = std::str::from_utf8(&payload[i..i + name_len])
            .map_err(|_| DecodeError::InvalidData("invalid UTF-8 in entry name".to_string()))?
            .to_string();
        i += name_len;

        let size = match kind {
            EntryKind::File => {
                if payload.len() < i + 4 {
                    return Err(listing_too_short(i + 4, payload.len()));
                }
                let size = u32::from_le_bytes([
                    payload[i],
                    payload[i + 1],
                    payload[i + 2],
                    payload[i + 3],
                ]);
                i += 4;
                Some(size)
            }
            EntryKind::Directory => None,
        };

        entries.push(DirectoryEntry { name, kind, size });
    }

    Ok(entries)
}

fn listing_too_short(expected: usize, actual: usize) -> DecodeError {
    DecodeError::Malformed {
        opcode: CMD_LIST_DIR,
        expected: RESPONSE_HEADER_SIZE + expected,
        actual: RESPONSE_HEADER_SIZE + actual,
    }
}

/// Encode a LIST_DIR success payload, as the firmware would.
///
/// Names longer than 255 bytes are truncated.
pub fn encode_listing(entries: &[DirectoryEntry]) -> Vec<u8> {
    let mut buf = Vec::new();
    for entry in entries {
        let name = entry.name.as_bytes();
        let name_len = name.len().min(u8::MAX as usize);
        buf.put_u8(entry.kind.into());
        buf.put_u8(name_len as u8);
        buf.extend_from_slice(&name[..name_len]);
        if entry.kind == EntryKind::File {
            buf.put_u32_le(entry.size.unwrap_or(0));
        }
    }
    buf
}

/// Encode a READ_CHUNK success payload, as the firmware would.
pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + data.len());
    buf.put_u16_le(data.len() as u16);
    buf.extend_from_slice(data);
    buf
}

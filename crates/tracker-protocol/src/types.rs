//! Common types used in the protocol.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::DecodeError;

/// Command opcode. Every request starts with one and every response echoes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// List a directory.
    ListDir,
    /// Open a file for reading.
    OpenFile,
    /// Read a chunk of an open file.
    ReadChunk,
    /// Close an open file.
    CloseFile,
    /// Delete a file.
    DeleteFile,
    /// Read system telemetry.
    GetSysInfo,
    /// Start an AGNSS upload.
    StartAgnssWrite,
    /// Write an AGNSS chunk.
    WriteAgnssChunk,
    /// End an AGNSS upload.
    EndAgnssWrite,
    /// Wake the GPS.
    GpsWakeup,
    /// Keep the GPS powered.
    GpsKeepAlive,
    /// Store Find My keys.
    WriteFindMyKeys,
    /// Read Find My keys.
    ReadFindMyKeys,
    /// Read Find My advertising state.
    GetFindMyStatus,
}

impl Opcode {
    /// Wire value of this opcode.
    pub fn code(self) -> u8 {
        match self {
            Opcode::ListDir => CMD_LIST_DIR,
            Opcode::OpenFile => CMD_OPEN_FILE,
            Opcode::ReadChunk => CMD_READ_CHUNK,
            Opcode::CloseFile => CMD_CLOSE_FILE,
            Opcode::DeleteFile => CMD_DELETE_FILE,
            Opcode::GetSysInfo => CMD_GET_SYS_INFO,
            Opcode::StartAgnssWrite => CMD_START_AGNSS_WRITE,
            Opcode::WriteAgnssChunk => CMD_WRITE_AGNSS_CHUNK,
            Opcode::EndAgnssWrite => CMD_END_AGNSS_WRITE,
            Opcode::GpsWakeup => CMD_GPS_WAKEUP,
            Opcode::GpsKeepAlive => CMD_GPS_KEEP_ALIVE,
            Opcode::WriteFindMyKeys => CMD_WRITE_FINDMY_KEYS,
            Opcode::ReadFindMyKeys => CMD_READ_FINDMY_KEYS,
            Opcode::GetFindMyStatus => CMD_GET_FINDMY_STATUS,
        }
    }

    /// Minimum success payload length for a response to this opcode.
    pub(crate) fn min_response_payload(self) -> usize {
        match self {
            Opcode::OpenFile => 5,
            Opcode::ReadChunk => 2,
            Opcode::GetFindMyStatus => 1,
            _ => 0,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            CMD_LIST_DIR => Ok(Opcode::ListDir),
            CMD_OPEN_FILE => Ok(Opcode::OpenFile),
            CMD_READ_CHUNK => Ok(Opcode::ReadChunk),
            CMD_CLOSE_FILE => Ok(Opcode::CloseFile),
            CMD_DELETE_FILE => Ok(Opcode::DeleteFile),
            CMD_GET_SYS_INFO => Ok(Opcode::GetSysInfo),
            CMD_START_AGNSS_WRITE => Ok(Opcode::StartAgnssWrite),
            CMD_WRITE_AGNSS_CHUNK => Ok(Opcode::WriteAgnssChunk),
            CMD_END_AGNSS_WRITE => Ok(Opcode::EndAgnssWrite),
            CMD_GPS_WAKEUP => Ok(Opcode::GpsWakeup),
            CMD_GPS_KEEP_ALIVE => Ok(Opcode::GpsKeepAlive),
            CMD_WRITE_FINDMY_KEYS => Ok(Opcode::WriteFindMyKeys),
            CMD_READ_FINDMY_KEYS => Ok(Opcode::ReadFindMyKeys),
            CMD_GET_FINDMY_STATUS => Ok(Opcode::GetFindMyStatus),
            _ => Err(DecodeError::UnknownOpcode(code)),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Opcode::ListDir => "LIST_DIR",
            Opcode::OpenFile => "OPEN_FILE",
            Opcode::ReadChunk => "READ_CHUNK",
            Opcode::CloseFile => "CLOSE_FILE",
            Opcode::DeleteFile => "DELETE_FILE",
            Opcode::GetSysInfo => "GET_SYS_INFO",
            Opcode::StartAgnssWrite => "START_AGNSS_WRITE",
            Opcode::WriteAgnssChunk => "WRITE_AGNSS_CHUNK",
            Opcode::EndAgnssWrite => "END_AGNSS_WRITE",
            Opcode::GpsWakeup => "GPS_WAKEUP",
            Opcode::GpsKeepAlive => "GPS_KEEP_ALIVE",
            Opcode::WriteFindMyKeys => "WRITE_FINDMY_KEYS",
            Opcode::ReadFindMyKeys => "READ_FINDMY_KEYS",
            Opcode::GetFindMyStatus => "GET_FINDMY_STATUS",
        };
        f.write_str(name)
    }
}

/// Server-assigned token for an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub u8);

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl TryFrom<u8> for EntryKind {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            ENTRY_KIND_FILE => Ok(EntryKind::File),
            ENTRY_KIND_DIRECTORY => Ok(EntryKind::Directory),
            _ => Err(DecodeError::InvalidData(format!(
                "unknown directory entry kind: 0x{:02X}",
                tag
            ))),
        }
    }
}

impl From<EntryKind> for u8 {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => ENTRY_KIND_FILE,
            EntryKind::Directory => ENTRY_KIND_DIRECTORY,
        }
    }
}

/// One entry of a LIST_DIR response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entry name (not a full path).
    pub name: String,
    /// File or directory.
    pub kind: EntryKind,
    /// Size in bytes; `None` for directories.
    pub size: Option<u32>,
}

impl DirectoryEntry {
    /// A file entry.
    pub fn file(name: impl Into<String>, size: u32) -> Self {
        DirectoryEntry {
            name: name.into(),
            kind: EntryKind::File,
            size: Some(size),
        }
    }

    /// A directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        DirectoryEntry {
            name: name.into(),
            kind: EntryKind::Directory,
            size: None,
        }
    }

    /// Whether this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// How an AGNSS upload is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgnssOutcome {
    /// All bytes were sent; ask the device to validate and apply them.
    Commit,
    /// The upload failed; ask the device to drop its buffer.
    Abort,
}

impl From<AgnssOutcome> for u8 {
    fn from(outcome: AgnssOutcome) -> Self {
        match outcome {
            AgnssOutcome::Commit => AGNSS_END_COMMIT,
            AgnssOutcome::Abort => AGNSS_END_ABORT,
        }
    }
}

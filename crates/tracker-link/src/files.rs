//! Directory listing, deletion and chunked file download.

use metrics::counter;
use tracing::{debug, info, warn};
use tracker_protocol::{Command, DirectoryEntry, FileHandle, Opcode, Response};

use crate::connection::{unexpected, Connection};
use crate::error::{LinkError, ProtocolError, Result};
use crate::metric_defs::*;
use crate::session::{FileSession, FileTransferState};
use crate::transport::Transport;

impl<T: Transport> Connection<T> {
    /// List a remote directory. Entries come back in device order.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        self.ensure_no_session()?;
        match self
            .simple_request(Command::ListDir {
                path: path.to_string(),
            })
            .await?
        {
            Response::Listing(entries) => {
                debug!("{}: {} entries", path, entries.len());
                Ok(entries)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Delete a remote file.
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        self.ensure_no_session()?;
        match self
            .simple_request(Command::DeleteFile {
                path: path.to_string(),
            })
            .await?
        {
            Response::FileDeleted => {
                info!("deleted {}", path);
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    /// Download a whole file.
    pub async fn download_file(&self, path: &str) -> Result<Vec<u8>> {
        self.download_file_with_progress(path, 0, |_, _| {}).await
    }

    /// Download a file starting at `offset`, e.g. to resume a transfer
    /// that failed part way.
    pub async fn download_file_from(&self, path: &str, offset: u32) -> Result<Vec<u8>> {
        self.download_file_with_progress(path, offset, |_, _| {})
            .await
    }

    /// Download a file starting at `offset`, calling `progress` with
    /// `(bytes_through, file_size)` after every chunk.
    ///
    /// The result holds exactly `file_size - offset` bytes; a file that
    /// ends early fails with [`LinkError::Truncated`]. The handle is
    /// closed on every path while the link is up.
    pub async fn download_file_with_progress<F>(
        &self,
        path: &str,
        offset: u32,
        mut progress: F,
    ) -> Result<Vec<u8>>
    where
        F: FnMut(u32, u32) + Send,
    {
        let session = FileSession::begin(&self.shared().sessions)?;

        let (handle, size) = match self
            .simple_request(Command::OpenFile {
                path: path.to_string(),
            })
            .await
        {
            Ok(Response::FileOpened { handle, size }) => (handle, size),
            Ok(other) => {
                session.finish(FileTransferState::Errored);
                return Err(unexpected(other));
            }
            Err(e) => {
                debug!("open {} failed: {}", path, e);
                session.finish(FileTransferState::Errored);
                return Err(e);
            }
        };
        session.advance(FileTransferState::Open);
        debug!("opened {} as handle {}, {} bytes", path, handle.0, size);

        session.advance(FileTransferState::Reading);
        let read = self
            .read_chunks(handle, offset, size, &mut progress)
            .await
            .and_then(|data| {
                let received = offset.saturating_add(data.len() as u32);
                if received < size {
                    Err(LinkError::Truncated {
                        expected: size,
                        received,
                    })
                } else {
                    Ok(data)
                }
            });

        session.advance(FileTransferState::Closing);
        let closed = self.close_file(handle).await;

        match read {
            Ok(data) => {
                if let Err(e) = closed {
                    warn!("closing {} failed after a complete read: {}", path, e);
                }
                let state = if self.is_connected() {
                    FileTransferState::Closed
                } else {
                    FileTransferState::Errored
                };
                session.finish(state);
                info!("downloaded {} ({} bytes)", path, data.len());
                Ok(data)
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    debug!("closing {} after failure: {}", path, close_err);
                }
                session.finish(FileTransferState::Errored);
                Err(e)
            }
        }
    }

    async fn read_chunks<F>(
        &self,
        handle: FileHandle,
        start: u32,
        size: u32,
        progress: &mut F,
    ) -> Result<Vec<u8>>
    where
        F: FnMut(u32, u32) + Send,
    {
        let mut data = Vec::with_capacity(size.saturating_sub(start) as usize);
        let mut offset = start;

        while offset < size {
            let budget = self.shared().mtu.read_budget();
            let want = budget.min((size - offset) as usize) as u16;

            let response = self
                .request_ok(
                    Command::ReadChunk {
                        handle,
                        offset,
                        max_len: want,
                    },
                    budget,
                    self.config().request_timeout(),
                )
                .await?;

            let (chunk, end_of_file) = match response {
                Response::Chunk { data, end_of_file } => (data, end_of_file),
                other => return Err(unexpected(other)),
            };
            if chunk.len() > want as usize {
                return Err(LinkError::Protocol(ProtocolError::Unexpected {
                    opcode: Opcode::ReadChunk,
                    detail: format!("{} bytes returned for a {} byte read", chunk.len(), want),
                }));
            }

            data.extend_from_slice(&chunk);
            offset += chunk.len() as u32;
            counter!(FILE_BYTES_DOWNLOADED.name).increment(chunk.len() as u64);
            progress(offset, size);

            if end_of_file || chunk.len() < want as usize {
                debug!("read ended at offset {} of {}", offset, size);
                break;
            }
        }

        Ok(data)
    }

    async fn close_file(&self, handle: FileHandle) -> Result<()> {
        if !self.is_connected() {
            return Err(LinkError::Disconnected);
        }
        match self.simple_request(Command::CloseFile { handle }).await? {
            Response::FileClosed => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

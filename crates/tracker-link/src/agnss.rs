//! Chunked AGNSS upload.
//!
//! START_AGNSS_WRITE declares the total length, WRITE_AGNSS_CHUNK carries
//! the blob in order, END_AGNSS_WRITE commits it. The blob is opaque here.

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, warn};
use tracker_protocol::{AgnssOutcome, Command, EncodeError, Response};

use crate::connection::{unexpected, Connection};
use crate::error::{LinkError, Result};
use crate::metric_defs::*;
use crate::session::{AgnssSession, AgnssUploadState};
use crate::transport::Transport;

impl<T: Transport> Connection<T> {
    /// Upload an AGNSS blob.
    pub async fn upload_agnss(&self, data: &[u8]) -> Result<()> {
        self.upload_agnss_with_progress(data, |_, _| {}).await
    }

    /// Upload an AGNSS blob, calling `progress` with `(bytes_acked, total)`
    /// after every chunk.
    ///
    /// A failed upload is aborted on the device (best effort) and the
    /// error that caused it is returned.
    pub async fn upload_agnss_with_progress<F>(&self, data: &[u8], mut progress: F) -> Result<()>
    where
        F: FnMut(usize, usize) + Send,
    {
        if data.is_empty() {
            return Err(LinkError::EmptyPayload);
        }
        let total_len = u32::try_from(data.len()).map_err(|_| EncodeError::PayloadTooLarge {
            len: data.len(),
            max: u32::MAX as usize,
        })?;

        let session = AgnssSession::begin(&self.shared().sessions)?;

        match self.simple_request(Command::StartAgnssWrite { total_len }).await {
            Ok(Response::AgnssStarted) => {}
            Ok(other) => {
                session.finish(AgnssUploadState::Aborted);
                return Err(unexpected(other));
            }
            Err(e) => {
                debug!("START_AGNSS_WRITE failed: {}", e);
                session.finish(AgnssUploadState::Aborted);
                return Err(e);
            }
        }
        debug!("AGNSS upload of {} bytes started", total_len);

        session.advance(AgnssUploadState::Writing);
        match self.write_and_commit(data, &mut progress).await {
            Ok(()) => {
                session.finish(AgnssUploadState::Ended);
                info!("AGNSS upload of {} bytes committed", total_len);
                Ok(())
            }
            Err(e) => {
                session.advance(AgnssUploadState::Aborting);
                if self.is_connected() {
                    if let Err(abort_err) = self
                        .simple_request(Command::EndAgnssWrite {
                            outcome: AgnssOutcome::Abort,
                        })
                        .await
                    {
                        debug!("AGNSS abort failed: {}", abort_err);
                    }
                }
                session.finish(AgnssUploadState::Aborted);
                warn!("AGNSS upload aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn write_and_commit<F>(&self, data: &[u8], progress: &mut F) -> Result<()>
    where
        F: FnMut(usize, usize) + Send,
    {
        let mut offset = 0;
        while offset < data.len() {
            let budget = self.shared().mtu.write_budget();
            let end = (offset + budget).min(data.len());
            let chunk = Bytes::copy_from_slice(&data[offset..end]);

            self.write_chunk(offset as u32, chunk, budget).await?;

            counter!(AGNSS_BYTES_UPLOADED.name).increment((end - offset) as u64);
            offset = end;
            progress(offset, data.len());
        }

        match self
            .simple_request(Command::EndAgnssWrite {
                outcome: AgnssOutcome::Commit,
            })
            .await?
        {
            Response::AgnssEnded => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Write one chunk, re-sending the same bytes on failure up to the
    /// configured retry count.
    async fn write_chunk(&self, offset: u32, chunk: Bytes, budget: usize) -> Result<()> {
        let mut attempt = 0;
        loop {
            let result = self
                .request_ok(
                    Command::WriteAgnssChunk {
                        offset,
                        data: chunk.clone(),
                    },
                    budget,
                    self.config().request_timeout(),
                )
                .await;

            match result {
                Ok(Response::AgnssChunkWritten) => return Ok(()),
                Ok(other) => return Err(unexpected(other)),
                Err(LinkError::Disconnected) => return Err(LinkError::Disconnected),
                Err(e) if attempt < self.config().chunk_retries => {
                    attempt += 1;
                    warn!("AGNSS chunk at {} failed ({}), retry {}", offset, e, attempt);
                    counter!(AGNSS_CHUNK_RETRIES.name).increment(1);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

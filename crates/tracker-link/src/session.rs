//! Transfer session states.
//!
//! A connection runs at most one chunked transfer at a time: either a
//! file download or an AGNSS upload. The state of the last session stays
//! readable after it ends, so a caller can tell `Errored` from `Closed`.

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::error::LinkError;

/// State of the file download session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTransferState {
    /// No download running.
    Closed,
    /// OPEN_FILE sent.
    Opening,
    /// Handle and size received.
    Open,
    /// READ_CHUNK loop running.
    Reading,
    /// CLOSE_FILE sent.
    Closing,
    /// Download failed. Stays until the next download begins.
    Errored,
}

impl FileTransferState {
    fn is_active(self) -> bool {
        matches!(
            self,
            FileTransferState::Opening
                | FileTransferState::Open
                | FileTransferState::Reading
                | FileTransferState::Closing
        )
    }
}

/// State of the AGNSS upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgnssUploadState {
    /// No upload running.
    Idle,
    /// START_AGNSS_WRITE accepted.
    Started,
    /// Chunks being written.
    Writing,
    /// END_AGNSS_WRITE(commit) accepted.
    Ended,
    /// Upload failed; abort in progress.
    Aborting,
    /// Upload failed and was abandoned.
    Aborted,
}

impl AgnssUploadState {
    fn is_active(self) -> bool {
        matches!(
            self,
            AgnssUploadState::Started | AgnssUploadState::Writing | AgnssUploadState::Aborting
        )
    }
}

/// Session slots of one connection.
#[derive(Debug)]
pub(crate) struct Sessions {
    file: FileTransferState,
    agnss: AgnssUploadState,
}

impl Default for Sessions {
    fn default() -> Self {
        Sessions {
            file: FileTransferState::Closed,
            agnss: AgnssUploadState::Idle,
        }
    }
}

impl Sessions {
    pub fn file(&self) -> FileTransferState {
        self.file
    }

    pub fn agnss(&self) -> AgnssUploadState {
        self.agnss
    }

    pub fn any_active(&self) -> bool {
        self.file.is_active() || self.agnss.is_active()
    }

    /// `Errored` only yields to a new session.
    fn set_file(&mut self, state: FileTransferState) {
        if self.file == FileTransferState::Errored {
            return;
        }
        trace!("file session {:?} -> {:?}", self.file, state);
        self.file = state;
    }

    /// `Aborting` only yields to `Aborted`.
    fn set_agnss(&mut self, state: AgnssUploadState) {
        if self.agnss == AgnssUploadState::Aborting && state != AgnssUploadState::Aborted {
            return;
        }
        trace!("AGNSS session {:?} -> {:?}", self.agnss, state);
        self.agnss = state;
    }

    /// Invalidate whatever is running.
    pub fn on_disconnect(&mut self) {
        if self.file.is_active() {
            self.set_file(FileTransferState::Errored);
        }
        if matches!(
            self.agnss,
            AgnssUploadState::Started | AgnssUploadState::Writing
        ) {
            self.set_agnss(AgnssUploadState::Aborting);
        }
    }
}

/// Exclusive claim on the file session.
///
/// Dropping it without [`FileSession::finish`] (the caller abandoned the
/// download) leaves the session `Errored`.
pub(crate) struct FileSession<'a> {
    sessions: &'a Mutex<Sessions>,
    finished: bool,
}

impl<'a> FileSession<'a> {
    pub fn begin(sessions: &'a Mutex<Sessions>) -> Result<Self, LinkError> {
        let mut guard = sessions.lock();
        if guard.any_active() {
            return Err(LinkError::SessionConflict);
        }
        guard.file = FileTransferState::Opening;
        Ok(FileSession {
            sessions,
            finished: false,
        })
    }

    pub fn advance(&self, state: FileTransferState) {
        self.sessions.lock().set_file(state);
    }

    #[cfg(test)]
    pub fn state(&self) -> FileTransferState {
        self.sessions.lock().file
    }

    pub fn finish(mut self, state: FileTransferState) {
        self.finished = true;
        self.sessions.lock().set_file(state);
    }
}

impl Drop for FileSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("file download abandoned; the device may still hold the handle");
            self.sessions.lock().set_file(FileTransferState::Errored);
        }
    }
}

/// Exclusive claim on the AGNSS session.
///
/// Dropping it without [`AgnssSession::finish`] leaves the session
/// `Aborted`.
pub(crate) struct AgnssSession<'a> {
    sessions: &'a Mutex<Sessions>,
    finished: bool,
}

impl<'a> AgnssSession<'a> {
    pub fn begin(sessions: &'a Mutex<Sessions>) -> Result<Self, LinkError> {
        let mut guard = sessions.lock();
        if guard.any_active() {
            return Err(LinkError::SessionConflict);
        }
        // Claimed from the moment START_AGNSS_WRITE is sent.
        guard.agnss = AgnssUploadState::Started;
        Ok(AgnssSession {
            sessions,
            finished: false,
        })
    }

    pub fn advance(&self, state: AgnssUploadState) {
        self.sessions.lock().set_agnss(state);
    }

    pub fn finish(mut self, state: AgnssUploadState) {
        self.finished = true;
        self.sessions.lock().set_agnss(state);
    }
}

impl Drop for AgnssSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("AGNSS upload abandoned");
            let mut sessions = self.sessions.lock();
            sessions.set_agnss(AgnssUploadState::Aborting);
            sessions.set_agnss(AgnssUploadState::Aborted);
        }
    }
}

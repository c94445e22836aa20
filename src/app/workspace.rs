//! Shared mutable state of the shell app.
//!
//! Everything the render/input side, the reconcile thread and the drain
//! tasks touch lives in one [`WorkspaceState`] behind one mutex. Critical
//! sections are short and never contain blocking I/O.

use crate::model::buffer::Buffer;
use crate::model::listing::DirectoryListing;
use crate::services::file_sync::FileBinding;
use crate::services::terminal::TranscriptSink;
use crate::view::WorkspaceView;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct WorkspaceState {
    /// Current navigation directory; also the shell's working directory
    pub dir: PathBuf,
    pub listing: DirectoryListing,
    /// Content of the open file
    pub editor: Buffer,
    pub binding: Option<FileBinding>,
    pub transcript: Buffer,
}

impl WorkspaceState {
    /// Copy out what a render surface needs.
    pub fn view(&self) -> WorkspaceView {
        WorkspaceView {
            dir: self.dir.clone(),
            listing: self.listing.clone(),
            file: self.binding.as_ref().map(|b| b.path.clone()),
            editor: self.editor.clone(),
            transcript: self.transcript.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Workspace {
    state: Mutex<WorkspaceState>,
}

impl Workspace {
    pub fn new(state: WorkspaceState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Every critical section leaves the state consistent, so a poisoned
    /// lock is still safe to use.
    pub fn lock(&self) -> MutexGuard<'_, WorkspaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TranscriptSink for Workspace {
    fn with_transcript(&self, f: &mut dyn FnMut(&mut Buffer)) {
        f(&mut self.lock().transcript);
    }
}

//! Embedded shell terminal.
//!
//! The transcript buffer is both the terminal's output and its input field.
//! [`TerminalController`] spots a submitted `$ command` line, the
//! [`SessionManager`] runs it in a fresh login shell and two drain tasks feed
//! the filtered output back into the same transcript.

pub mod controller;
pub mod launcher;
pub mod session;

pub use controller::TerminalController;
pub use launcher::{LaunchRequest, LaunchedProcess, ProcessHandle, ProcessLauncher, ShellLauncher};
pub use session::{SessionManager, SessionSettings, SessionStatus};

use crate::model::buffer::Buffer;
use std::sync::{Mutex, PoisonError};

/// Serialized access to the transcript buffer.
///
/// Implementations run `f` inside the same critical section that guards every
/// other buffer mutation, so output appends never interleave with user edits
/// or with a session switch.
pub trait TranscriptSink: Send + Sync {
    fn with_transcript(&self, f: &mut dyn FnMut(&mut Buffer));
}

impl TranscriptSink for Mutex<Buffer> {
    fn with_transcript(&self, f: &mut dyn FnMut(&mut Buffer)) {
        let mut buffer = self.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut buffer);
    }
}

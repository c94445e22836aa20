//! Command detection in the transcript.
//!
//! A command is submitted by typing a newline at the end of a line that
//! starts with the prompt marker. The controller only looks at the
//! transcript after user input; appends made by the drain tasks are never
//! passed through it.

use crate::model::buffer::Buffer;

#[derive(Debug, Clone)]
pub struct TerminalController {
    prompt_marker: String,
    /// Caret offset at which the last command was dispatched
    dispatched_offset: Option<usize>,
}

impl TerminalController {
    pub fn new(prompt_marker: impl Into<String>) -> Self {
        Self {
            prompt_marker: prompt_marker.into(),
            dispatched_offset: None,
        }
    }

    pub fn dispatched_offset(&self) -> Option<usize> {
        self.dispatched_offset
    }

    /// Inspect the transcript after a user edit and return the command to
    /// run, if one was just submitted.
    ///
    /// The same caret position never dispatches twice, so re-observing an
    /// unchanged transcript is harmless.
    pub fn observe(&mut self, transcript: &Buffer) -> Option<String> {
        let caret = transcript.caret();
        if self.dispatched_offset == Some(caret) {
            return None;
        }

        let line = transcript.line_before_caret()?;
        let command = line.strip_prefix(self.prompt_marker.as_str())?;

        self.dispatched_offset = Some(caret);
        let command = command.trim_start().trim_end_matches('\r');
        tracing::debug!("Dispatching {:?} at offset {}", command, caret);
        Some(command.to_string())
    }
}

//! Render surface seam and the stdio front end.
//!
//! Layout, fonts and themes are not part of the core. A surface receives an
//! owned [`WorkspaceView`] copied out of the workspace, so slow output never
//! holds up the drain tasks or the reconcile thread.

use crate::model::buffer::Buffer;
use crate::model::listing::DirectoryListing;
use std::io::{self, Write};
use std::ops::Range;
use std::path::PathBuf;

/// Snapshot of everything a surface may display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceView {
    pub dir: PathBuf,
    pub listing: DirectoryListing,
    /// Path of the open file, if any
    pub file: Option<PathBuf>,
    pub editor: Buffer,
    pub transcript: Buffer,
}

pub trait RenderSurface {
    fn present(&mut self, view: &WorkspaceView);
}

/// One line of stdin, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Typed into the transcript, newline included
    Keys(String),
    ShowListing,
    Activate(usize),
    ShowEditor,
    ReplaceEditor(String),
    Quit,
}

/// Lines starting with `:` are front-end commands; everything else is
/// typed into the transcript. Write `::` to type a literal leading colon.
pub fn parse_input(line: &str) -> InputEvent {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let Some(command) = line.strip_prefix(':') else {
        return InputEvent::Keys(format!("{}\n", line));
    };
    if command.starts_with(':') {
        return InputEvent::Keys(format!("{}\n", command));
    }

    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    match name {
        "ls" => InputEvent::ShowListing,
        "cat" => InputEvent::ShowEditor,
        "quit" | "q" => InputEvent::Quit,
        "write" => InputEvent::ReplaceEditor(rest.replace("\\n", "\n")),
        "go" => match rest.trim().parse() {
            Ok(index) => InputEvent::Activate(index),
            Err(_) => InputEvent::Keys(format!("{}\n", line)),
        },
        _ => InputEvent::Keys(format!("{}\n", line)),
    }
}

/// Streams the transcript to a writer as it grows.
///
/// Text the user typed is already on their screen, so ranges reported
/// through [`input_echoed`](Self::input_echoed) are skipped.
pub struct StdioSurface<W: Write> {
    out: W,
    printed: usize,
    echoed: Vec<Range<usize>>,
}

impl<W: Write> StdioSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            echoed: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn input_echoed(&mut self, range: Range<usize>) {
        if !range.is_empty() {
            self.echoed.push(range);
        }
    }

    pub fn write_listing(&mut self, view: &WorkspaceView) -> io::Result<()> {
        writeln!(self.out, "{}", view.dir.display())?;
        for (index, name) in view.listing.names().enumerate() {
            writeln!(self.out, "{:>4}  {}", index, name)?;
        }
        self.out.flush()
    }

    pub fn write_editor(&mut self, view: &WorkspaceView) -> io::Result<()> {
        match &view.file {
            Some(path) => writeln!(self.out, "--- {}", path.display())?,
            None => writeln!(self.out, "--- (no file open)")?,
        }
        self.out.write_all(view.editor.text().as_bytes())?;
        if !view.editor.text().ends_with('\n') {
            writeln!(self.out)?;
        }
        writeln!(self.out, "---")?;
        self.out.flush()
    }

    fn write_transcript(&mut self, transcript: &str) -> io::Result<()> {
        if self.printed >= transcript.len() {
            return Ok(());
        }

        let mut cursor = self.printed;
        self.echoed.sort_by_key(|r| r.start);
        for range in self.echoed.drain(..) {
            let start = range.start.clamp(cursor, transcript.len());
            let end = range.end.min(transcript.len());
            if start > cursor {
                self.out.write_all(transcript[cursor..start].as_bytes())?;
            }
            cursor = cursor.max(end);
        }
        if cursor < transcript.len() {
            self.out.write_all(transcript[cursor..].as_bytes())?;
        }
        self.printed = transcript.len();
        self.out.flush()
    }
}

impl<W: Write> RenderSurface for StdioSurface<W> {
    fn present(&mut self, view: &WorkspaceView) {
        if let Err(e) = self.write_transcript(view.transcript.text()) {
            tracing::warn!("Failed to write transcript: {}", e);
        }
    }
}

//! Two-way synchronization between the editor buffer and the file on disk.
//!
//! There is no save action. On every tick the orchestrator hands the engine a
//! snapshot of the buffer and the current [`FileBinding`]:
//!
//! - If the buffer's fingerprint differs from the binding, the buffer changed
//!   locally and is written to disk.
//! - Otherwise the file is read back; if its fingerprint differs, the file
//!   changed externally and its content replaces the buffer.
//!
//! Local edits are checked first, so when both sides changed within one tick
//! the buffer wins. That is last-writer-wins by polling order, not a merge.
//!
//! Fingerprints are always taken over *normalized* text (tabs expanded), the
//! same form the buffer holds. A file containing tabs therefore does not look
//! externally modified just because the buffer shows spaces.

use crate::error::{Result, ShellError};
use crate::model::filesystem::FileSystem;
use crate::primitives::fingerprint::{fingerprint, Fingerprint};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The file currently open in the editor buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBinding {
    pub path: PathBuf,
    /// Last fingerprint read from or written to disk
    pub fingerprint: Fingerprint,
}

impl FileBinding {
    pub fn new(path: PathBuf, fingerprint: Fingerprint) -> Self {
        Self { path, fingerprint }
    }
}

/// Outcome of one reconcile pass.
#[derive(Debug)]
pub enum SyncAction {
    /// Buffer and disk both match the binding
    Unchanged,
    /// The buffer was written to disk and the binding updated
    Wrote,
    /// Writing failed; the binding was left alone so the next tick retries
    WriteFailed(ShellError),
    /// The file changed on disk; the buffer must be replaced with `content`
    Reload { content: String },
    /// The file could not be read this tick
    ReadSkipped,
}

pub struct FileSync {
    fs: Arc<dyn FileSystem>,
    tab_width: usize,
}

impl FileSync {
    pub fn new(fs: Arc<dyn FileSystem>, tab_width: usize) -> Self {
        Self { fs, tab_width }
    }

    /// Expand every tab into `tab_width` spaces.
    pub fn normalize(&self, text: &str) -> String {
        if !text.contains('\t') {
            return text.to_string();
        }
        text.replace('\t', &" ".repeat(self.tab_width))
    }

    fn read_normalized(&self, path: &Path) -> std::io::Result<String> {
        let bytes = self.fs.read_file(path)?;
        Ok(self.normalize(&String::from_utf8_lossy(&bytes)))
    }

    /// Read `path` for editing. Returns the normalized content and its fingerprint.
    pub fn open(&self, path: &Path) -> Result<(String, Fingerprint)> {
        let content = self
            .read_normalized(path)
            .map_err(|e| ShellError::io(path, e))?;
        let fp = fingerprint(&content);
        tracing::debug!("Opened {:?} ({} bytes, {})", path, content.len(), fp.short());
        Ok((content, fp))
    }

    /// Run one reconcile pass for `binding` against the buffer snapshot.
    ///
    /// Updates `binding.fingerprint` on a successful write or on a detected
    /// external change. Never touches the buffer itself; a [`SyncAction::Reload`]
    /// tells the caller what to put there.
    pub fn reconcile(&self, binding: &mut FileBinding, buffer: &str) -> SyncAction {
        let buffer_fp = fingerprint(buffer);

        if buffer_fp != binding.fingerprint {
            return match self.fs.write_file(&binding.path, buffer.as_bytes()) {
                Ok(()) => {
                    tracing::debug!(
                        "Wrote {:?}: {} -> {}",
                        binding.path,
                        binding.fingerprint.short(),
                        buffer_fp.short()
                    );
                    binding.fingerprint = buffer_fp;
                    SyncAction::Wrote
                }
                Err(e) => {
                    tracing::warn!("Failed to write {:?}: {}", binding.path, e);
                    SyncAction::WriteFailed(ShellError::io(&binding.path, e))
                }
            };
        }

        let content = match self.read_normalized(&binding.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Skipping read of {:?}: {}", binding.path, e);
                return SyncAction::ReadSkipped;
            }
        };

        let disk_fp = fingerprint(&content);
        if disk_fp == binding.fingerprint {
            return SyncAction::Unchanged;
        }

        tracing::debug!(
            "External change in {:?}: {} -> {}",
            binding.path,
            binding.fingerprint.short(),
            disk_fp.short()
        );
        binding.fingerprint = disk_fp;
        SyncAction::Reload { content }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::filesystem::{DirEntry, StdFileSystem};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts writes and can be told to fail them.
    #[derive(Default)]
    struct CountingFs {
        writes: AtomicUsize,
        fail_writes: bool,
    }

    impl FileSystem for CountingFs {
        fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
            StdFileSystem.read_file(path)
        }

        fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            StdFileSystem.write_file(path, data)
        }

        fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
            StdFileSystem.read_dir(path)
        }
    }

    fn setup(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_open_expands_tabs() {
        let (_dir, path) = setup("fn main() {\n\tlet x = 1;\n\t\tx\n}");
        let sync = FileSync::new(Arc::new(StdFileSystem), 2);

        let (content, fp) = sync.open(&path).unwrap();
        assert_eq!(content, "fn main() {\n  let x = 1;\n    x\n}");
        assert_eq!(fp, fingerprint(&content));
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let sync = FileSync::new(Arc::new(StdFileSystem), 2);
        let err = sync.open(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ShellError::Io { .. }));
    }

    #[test]
    fn test_reconcile_idle_is_noop() {
        let (_dir, path) = setup("stable");
        let fs = Arc::new(CountingFs::default());
        let sync = FileSync::new(fs.clone(), 2);
        let (content, fp) = sync.open(&path).unwrap();
        let mut binding = FileBinding::new(path.clone(), fp);

        for _ in 0..3 {
            assert!(matches!(sync.reconcile(&mut binding, &content), SyncAction::Unchanged));
        }
        assert_eq!(fs.writes.load(Ordering::SeqCst), 0);
        assert_eq!(binding.fingerprint, fp);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "stable");
    }

    #[test]
    fn test_reconcile_writes_local_edit() {
        let (_dir, path) = setup("before");
        let sync = FileSync::new(Arc::new(StdFileSystem), 2);
        let (_, fp) = sync.open(&path).unwrap();
        let mut binding = FileBinding::new(path.clone(), fp);

        let action = sync.reconcile(&mut binding, "after");
        assert!(matches!(action, SyncAction::Wrote));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "after");
        assert_eq!(binding.fingerprint, fingerprint("after"));

        // Next tick sees everything in agreement.
        assert!(matches!(sync.reconcile(&mut binding, "after"), SyncAction::Unchanged));
    }

    #[test]
    fn test_reconcile_reloads_external_edit() {
        let (_dir, path) = setup("v1");
        let sync = FileSync::new(Arc::new(StdFileSystem), 2);
        let (content, fp) = sync.open(&path).unwrap();
        let mut binding = FileBinding::new(path.clone(), fp);

        std::fs::write(&path, "v2\twith tab").unwrap();

        match sync.reconcile(&mut binding, &content) {
            SyncAction::Reload { content } => assert_eq!(content, "v2  with tab"),
            other => panic!("expected reload, got {:?}", other),
        }
        assert_eq!(binding.fingerprint, fingerprint("v2  with tab"));
    }

    #[test]
    fn test_tabbed_file_is_not_seen_as_external_change() {
        let (_dir, path) = setup("\tindented");
        let sync = FileSync::new(Arc::new(StdFileSystem), 2);
        let (content, fp) = sync.open(&path).unwrap();
        let mut binding = FileBinding::new(path.clone(), fp);

        assert!(matches!(sync.reconcile(&mut binding, &content), SyncAction::Unchanged));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\tindented");
    }

    #[test]
    fn test_whitespace_only_tab_swap_normalizes_away() {
        let (_dir, path) = setup("  indented");
        let sync = FileSync::new(Arc::new(StdFileSystem), 2);
        let (content, fp) = sync.open(&path).unwrap();
        let mut binding = FileBinding::new(path.clone(), fp);

        // Two spaces and a tab normalize to the same text.
        std::fs::write(&path, "\tindented").unwrap();

        assert!(matches!(sync.reconcile(&mut binding, &content), SyncAction::Unchanged));
        assert_eq!(binding.fingerprint, fp);
    }

    #[test]
    fn test_local_edit_wins_over_external_edit() {
        let (_dir, path) = setup("original");
        let sync = FileSync::new(Arc::new(StdFileSystem), 2);
        let (_, fp) = sync.open(&path).unwrap();
        let mut binding = FileBinding::new(path.clone(), fp);

        // Both sides change within the same tick window.
        std::fs::write(&path, "external").unwrap();
        let action = sync.reconcile(&mut binding, "local");

        assert!(matches!(action, SyncAction::Wrote));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "local");
    }

    #[test]
    fn test_write_failure_retries_next_tick() {
        let (_dir, path) = setup("before");
        let fs = Arc::new(CountingFs {
            fail_writes: true,
            ..Default::default()
        });
        let sync = FileSync::new(fs.clone(), 2);
        let (_, fp) = sync.open(&path).unwrap();
        let mut binding = FileBinding::new(path.clone(), fp);

        let first = sync.reconcile(&mut binding, "edited");
        assert!(matches!(first, SyncAction::WriteFailed(ShellError::Io { .. })));
        assert_eq!(binding.fingerprint, fp);

        let second = sync.reconcile(&mut binding, "edited");
        assert!(matches!(second, SyncAction::WriteFailed(_)));
        assert_eq!(fs.writes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let (_dir, path) = setup("here");
        let sync = FileSync::new(Arc::new(StdFileSystem), 2);
        let (content, fp) = sync.open(&path).unwrap();
        let mut binding = FileBinding::new(path.clone(), fp);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(sync.reconcile(&mut binding, &content), SyncAction::ReadSkipped));
        assert_eq!(binding.fingerprint, fp);
    }
}

//! Filesystem abstraction for the sync engine and the directory browser
//!
//! The core never touches `std::fs` directly. It goes through the
//! [`FileSystem`] trait so tests can substitute failing or in-memory
//! backends:
//! - `StdFileSystem`: native filesystem using `std::fs`
//! - `NoopFileSystem`: every operation fails (placeholder / error-path tests)
//!
//! The trait is synchronous. Callers run it outside of any lock that other
//! activities contend on.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

// ============================================================================
// Directory Entry Types
// ============================================================================

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
}

/// A directory entry returned by `read_dir`
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// File/directory name
    pub name: String,
    /// Type of entry
    pub entry_type: EntryType,
    /// For symlinks, whether the target is a directory
    pub symlink_target_is_dir: bool,
}

impl DirEntry {
    pub fn new(name: String, entry_type: EntryType) -> Self {
        Self {
            name,
            entry_type,
            symlink_target_is_dir: false,
        }
    }

    pub fn new_symlink(name: String, target_is_dir: bool) -> Self {
        Self {
            name,
            entry_type: EntryType::Symlink,
            symlink_target_is_dir: target_is_dir,
        }
    }

    /// Returns true if this entry is a directory OR a symlink pointing to a directory
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
            || (self.entry_type == EntryType::Symlink && self.symlink_target_is_dir)
    }

    pub fn is_symlink(&self) -> bool {
        self.entry_type == EntryType::Symlink
    }
}

// ============================================================================
// FileSystem Trait
// ============================================================================

/// Filesystem operations the core depends on.
pub trait FileSystem: Send + Sync {
    /// Read entire file into memory
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace the file's content
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// List entries in a directory (non-recursive, unsorted)
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Resolve `rel` against `base` into a clean absolute path.
    ///
    /// Purely lexical: `..` pops the previous component and never climbs
    /// above the root, `.` is dropped. An absolute `rel` replaces `base`.
    fn resolve_abs(&self, base: &Path, rel: &Path) -> PathBuf {
        let joined = base.join(rel);
        let mut out = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::Prefix(p) => out.push(p.as_os_str()),
                Component::RootDir => out.push(Component::RootDir.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                Component::Normal(name) => out.push(name),
            }
        }
        if out.as_os_str().is_empty() {
            out.push(Component::RootDir.as_os_str());
        }
        out
    }
}

// ============================================================================
// StdFileSystem Implementation
// ============================================================================

/// Standard filesystem implementation using `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Sibling temp file so the final rename never crosses filesystems
    fn temp_path_for(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "nerved-save".to_string());
        path.with_file_name(format!(".{}.{}.nerved-tmp", name, std::process::id()))
    }
}

impl FileSystem for StdFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    /// Atomic write: temp file + fsync + rename, keeping the original permissions.
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let original_permissions = std::fs::metadata(path).ok().map(|meta| meta.permissions());
        let temp_path = Self::temp_path_for(path);
        {
            let mut file = File::create(&temp_path)?;
            if let Err(e) = file.write_all(data).and_then(|_| file.sync_all()) {
                let _ = std::fs::remove_file(&temp_path);
                return Err(e);
            }
        }
        if let Some(perms) = original_permissions {
            let _ = std::fs::set_permissions(&temp_path, perms);
        }
        if let Err(e) = std::fs::rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type()?;

            let dir_entry = if file_type.is_symlink() {
                let target_is_dir = std::fs::metadata(&path)
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                DirEntry::new_symlink(name, target_is_dir)
            } else if file_type.is_dir() {
                DirEntry::new(name, EntryType::Directory)
            } else {
                DirEntry::new(name, EntryType::File)
            };

            entries.push(dir_entry);
        }
        Ok(entries)
    }
}

// ============================================================================
// NoopFileSystem Implementation
// ============================================================================

/// No-op filesystem that returns errors for all operations
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFileSystem;

impl NoopFileSystem {
    fn unsupported<T>() -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Filesystem not available",
        ))
    }
}

impl FileSystem for NoopFileSystem {
    fn read_file(&self, _path: &Path) -> io::Result<Vec<u8>> {
        Self::unsupported()
    }

    fn write_file(&self, _path: &Path, _data: &[u8]) -> io::Result<()> {
        Self::unsupported()
    }

    fn read_dir(&self, _path: &Path) -> io::Result<Vec<DirEntry>> {
        Self::unsupported()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Directory listings shown by the file browser.
//!
//! A listing is rebuilt wholesale on every navigation or refresh. Its first
//! entry is always the synthetic parent directory `../`; after it come all
//! directories, then all files, each group sorted lexicographically.
//! Directory names carry a trailing separator.

use super::filesystem::FileSystem;
use crate::error::{Result, ShellError};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// What activating an entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Display name; directories end with the path separator
    pub name: String,
    pub kind: EntryKind,
}

impl ListingEntry {
    pub fn directory(name: &str) -> Self {
        Self {
            name: format!("{}{}", name, MAIN_SEPARATOR),
            kind: EntryKind::Directory,
        }
    }

    pub fn file(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EntryKind::File,
        }
    }

    pub fn parent() -> Self {
        Self::directory("..")
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Name relative to the listed directory, without the trailing separator.
    pub fn relative_path(&self) -> &Path {
        Path::new(self.name.trim_end_matches(MAIN_SEPARATOR))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    pub dir: PathBuf,
    pub entries: Vec<ListingEntry>,
}

impl DirectoryListing {
    /// Build a listing from raw entries, applying the sort order.
    pub fn from_entries(dir: PathBuf, entries: impl IntoIterator<Item = ListingEntry>) -> Self {
        let mut entries: Vec<ListingEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.name.cmp(&b.name))
        });
        entries.insert(0, ListingEntry::parent());
        Self { dir, entries }
    }

    /// List `dir` through `fs`.
    pub fn read(fs: &dyn FileSystem, dir: &Path) -> Result<Self> {
        let raw = fs
            .read_dir(dir)
            .map_err(|e| ShellError::io(dir, e))?;
        let entries = raw.iter().map(|entry| {
            if entry.is_dir() {
                ListingEntry::directory(&entry.name)
            } else {
                ListingEntry::file(&entry.name)
            }
        });
        Ok(Self::from_entries(dir.to_path_buf(), entries))
    }

    pub fn get(&self, index: usize) -> Option<&ListingEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

/// Resolve `relative_target` against `current_dir` and list the result.
///
/// On failure nothing is returned, so the caller keeps its previous listing.
pub fn navigate(
    fs: &dyn FileSystem,
    current_dir: &Path,
    relative_target: &Path,
) -> Result<DirectoryListing> {
    let target = fs.resolve_abs(current_dir, relative_target);
    DirectoryListing::read(fs, &target)
}

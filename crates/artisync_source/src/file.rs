//! File-system content source rooted at a registry directory.

use crate::error::{SourceError, SourceResult};
use crate::source::{normalize_location, ContentSource, SourceEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// A content source backed by a directory tree.
///
/// Every regular file below the root is a candidate; its location is the
/// path relative to the root with `/` separators and a leading `/`.
/// Hidden entries (names starting with `.`, e.g. `.git`) are skipped.
///
/// # Example
///
/// ```no_run
/// use artisync_source::{ContentSource, FileSystemSource};
/// use std::path::Path;
///
/// let source = FileSystemSource::open(Path::new("/var/lib/registry/public")).unwrap();
/// let roles = source.list_candidates(&|loc: &str| loc.ends_with(".roles")).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    /// Opens a source rooted at an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a directory.
    pub fn open(root: &Path) -> SourceResult<Self> {
        let metadata = fs::metadata(root)?;
        if !metadata.is_dir() {
            return Err(SourceError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Opens a source, creating the root directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open_with_create_dirs(root: &Path) -> SourceResult<Self> {
        fs::create_dir_all(root)?;
        Self::open(root)
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a location to its path below the root.
    fn path_of(&self, location: &str) -> SourceResult<PathBuf> {
        let normalized = normalize_location(location)?;
        let mut path = self.root.clone();
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        Ok(path)
    }

    fn walk(
        &self,
        dir: &Path,
        prefix: &str,
        filter: &dyn Fn(&str) -> bool,
        out: &mut Vec<SourceEntry>,
    ) -> SourceResult<()> {
        let mut children = fs::read_dir(dir)?.collect::<Result<Vec<_>, io::Error>>()?;
        children.sort_by_key(|entry| entry.file_name());

        for child in children {
            let name = child.file_name();
            let Some(name) = name.to_str() else {
                trace!(path = %child.path().display(), "skipping non UTF-8 path");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let location = format!("{prefix}/{name}");
            let file_type = child.file_type()?;
            if file_type.is_dir() {
                self.walk(&child.path(), &location, filter, out)?;
            } else if file_type.is_file() && filter(&location) {
                let content = fs::read(child.path())?;
                out.push(SourceEntry::new(location, content));
            }
        }
        Ok(())
    }
}

impl ContentSource for FileSystemSource {
    fn list_candidates(&self, filter: &dyn Fn(&str) -> bool) -> SourceResult<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        self.walk(&self.root, "", filter, &mut entries)?;
        entries.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(entries)
    }

    fn exists(&self, location: &str) -> SourceResult<bool> {
        let path = self.path_of(location)?;
        Ok(path.is_file())
    }

    fn read(&self, location: &str) -> SourceResult<Vec<u8>> {
        let path = self.path_of(location)?;
        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(normalize_location(location)?))
            }
            Err(e) => Err(e.into()),
        }
    }
}

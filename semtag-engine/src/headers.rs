//! File header witness
//!
//! Reads and writes the `semtag:` comment line inside component files.

use semtag_core::{
    find_header, is_commentless, stamp_header, CommentStyle, ComponentType, FileHeader,
    ReconcileError, SemtagResult, Stamp, ValidationError,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options for [`HeaderStore::write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Overwrite an existing header line.
    pub replace: bool,
    /// Picks the comment syntax when the extension is unknown.
    pub type_hint: Option<ComponentType>,
}

/// Second witness of a component's version, stored in the file itself.
pub trait HeaderStore {
    /// Header of the file at repo-relative `path`, if any.
    fn read(&self, path: &str) -> Option<FileHeader>;

    /// True if a header can be written to `path`.
    fn supports(&self, path: &str, type_hint: Option<ComponentType>) -> bool;

    /// Write `header`. Returns whether the file changed.
    fn write(&self, path: &str, header: &FileHeader, options: WriteOptions) -> SemtagResult<bool>;
}

/// Header store over files below a repository root.
#[derive(Debug, Clone)]
pub struct CommentHeaderStore {
    root: PathBuf,
    scan_lines: usize,
}

impl CommentHeaderStore {
    pub fn new(root: impl Into<PathBuf>, scan_lines: usize) -> Self {
        Self {
            root: root.into(),
            scan_lines,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl HeaderStore for CommentHeaderStore {
    fn read(&self, path: &str) -> Option<FileHeader> {
        if is_commentless(path) {
            return None;
        }
        let content = std::fs::read_to_string(self.root.join(path)).ok()?;
        find_header(&content, self.scan_lines).map(|(_, header)| header)
    }

    fn supports(&self, path: &str, type_hint: Option<ComponentType>) -> bool {
        CommentStyle::for_path_or_type(path, type_hint).is_some()
    }

    fn write(&self, path: &str, header: &FileHeader, options: WriteOptions) -> SemtagResult<bool> {
        let style = CommentStyle::for_path_or_type(path, options.type_hint).ok_or_else(|| {
            ValidationError::UnsupportedHeaderFormat {
                path: path.to_string(),
            }
        })?;
        let full = self.root.join(path);
        let io_error = |e: std::io::Error| ReconcileError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        };
        let content = std::fs::read_to_string(&full).map_err(io_error)?;
        match stamp_header(&content, style, header, options.replace, self.scan_lines) {
            Stamp::Unchanged => {
                debug!(path, "header unchanged");
                Ok(false)
            }
            Stamp::Updated(updated) => {
                std::fs::write(&full, updated).map_err(io_error)?;
                info!(path, version = %header.version, "header written");
                Ok(true)
            }
        }
    }
}

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One visited directory: its path plus the immediate children, split into
/// subdirectories and regular files.
///
/// Sibling order follows host directory-enumeration order; no sorting is
/// applied. Symlinks, sockets, and device nodes are skipped entirely, and
/// symlinked directories are never followed.
#[derive(Debug)]
pub struct WalkEntry {
    pub dir: PathBuf,
    pub subdirs: Vec<OsString>,
    pub files: Vec<OsString>,
}

/// Lazy depth-first directory traversal.
///
/// Yields one [`WalkEntry`] per directory, parent before children. The
/// traversal is finite and consumed once; between steps it holds no open
/// handles beyond the pending-directory queue.
#[derive(Debug)]
pub struct DirWalk {
    pending: VecDeque<PathBuf>,
}

impl DirWalk {
    pub(crate) fn new(root: &Path) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(root.to_path_buf());
        Self { pending }
    }

    fn visit(&mut self, dir: PathBuf) -> Result<WalkEntry> {
        let walk_err = |path: &Path, source| Error::Walk {
            path: path.to_path_buf(),
            source,
        };

        let mut subdirs = Vec::new();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| walk_err(&dir, e))? {
            let entry = entry.map_err(|e| walk_err(&dir, e))?;
            // DirEntry::file_type does not follow symlinks, so a symlinked
            // directory lands in neither bucket and is never descended into.
            let file_type = entry.file_type().map_err(|e| walk_err(&dir, e))?;
            if file_type.is_dir() {
                subdirs.push(entry.file_name());
            } else if file_type.is_file() {
                files.push(entry.file_name());
            }
        }

        // Children go to the front of the queue so they are visited before
        // any sibling of `dir`.
        for name in subdirs.iter().rev() {
            self.pending.push_front(dir.join(name));
        }

        Ok(WalkEntry { dir, subdirs, files })
    }
}

impl Iterator for DirWalk {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let dir = self.pending.pop_front()?;
        Some(self.visit(dir))
    }
}

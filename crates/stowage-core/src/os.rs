use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path};
use std::process::{Child, Command, Stdio};
use std::time::SystemTime;

use flate2::read::GzDecoder;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::walk::DirWalk;

/// File metadata needed for packaging: the host permission word, size in
/// bytes, and modification time.
///
/// The modification time is reported for callers that want staleness
/// checks; the packager deliberately ignores it.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub mode: u32,
    pub size: u64,
    pub modified: SystemTime,
}

/// Abstraction over the host filesystem and process spawning.
///
/// Production code uses [`RealOs`]; tests substitute their own double.
/// Every component that touches the host takes `&dyn OsUtils` as an
/// explicit argument — there is no process-wide default instance.
///
/// All operations are deterministic given identical filesystem state.
/// Only [`remove_file`](OsUtils::remove_file) and temp-dir cleanup swallow
/// "already absent" conditions; every other failure propagates.
pub trait OsUtils: Send + Sync {
    /// Permission bits, size, and mtime for `path`.
    /// Errors if `path` does not exist.
    fn stat(&self, path: &Path) -> Result<FileStat>;

    /// Whole-file binary read.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Whole-file text read.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Whole-file write, creating or truncating `path`.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Remove a file. Succeeds silently if `path` does not exist.
    fn remove_file(&self, path: &Path) -> Result<()>;

    fn file_exists(&self, path: &Path) -> bool;

    fn directory_exists(&self, path: &Path) -> bool;

    /// Immediate children of `path`, in host enumeration order.
    fn list_directory(&self, path: &Path) -> Result<Vec<OsString>>;

    /// Lazy depth-first traversal rooted at `root`. See [`DirWalk`].
    fn walk(&self, root: &Path) -> DirWalk;

    /// Recursive directory creation, like `mkdir -p`.
    fn make_dirs(&self, path: &Path) -> Result<()>;

    fn copy(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Move `src` to `dst`, copying when the rename crosses filesystems.
    /// Any other rename failure propagates with its original cause.
    fn rename(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Recursively copy the tree rooted at `src` into `dst`, creating the
    /// destination root if absent.
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Remove a directory and everything under it.
    fn remove_tree(&self, path: &Path) -> Result<()>;

    /// Unpack a zip archive into `dest`. Errors on a corrupt or
    /// unreadable archive.
    fn extract_zip(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// Unpack a tar archive into `dest`, transparently handling gzip
    /// compression.
    fn extract_tar(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// Freshly created temporary directory. The directory and all its
    /// contents are deleted when the returned guard drops, on every exit
    /// path including panics and early `?` returns.
    fn temp_dir(&self) -> Result<TempDir>;

    /// Spawn a subprocess without waiting for it. The caller owns the
    /// returned handle and decides when to wait, kill, or stream.
    ///
    /// When `env` is given it replaces the inherited environment entirely.
    fn spawn(
        &self,
        command: &[String],
        stdout: Stdio,
        stderr: Stdio,
        env: Option<&HashMap<String, String>>,
    ) -> Result<Child>;
}

/// Host-backed [`OsUtils`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealOs;

impl OsUtils for RealOs {
    fn stat(&self, path: &Path) -> Result<FileStat> {
        let stat_err = |source| Error::Stat {
            path: path.to_path_buf(),
            source,
        };
        let meta = std::fs::metadata(path).map_err(stat_err)?;
        let modified = meta.modified().map_err(stat_err)?;
        Ok(FileStat {
            mode: mode_bits(&meta),
            size: meta.len(),
            modified,
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        std::fs::write(path, contents).map_err(|e| Error::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Remove {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<OsString>> {
        let list_err = |source| Error::ListDir {
            path: path.to_path_buf(),
            source,
        };
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path).map_err(list_err)? {
            names.push(entry.map_err(list_err)?.file_name());
        }
        Ok(names)
    }

    fn walk(&self, root: &Path) -> DirWalk {
        DirWalk::new(root)
    }

    fn make_dirs(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| Error::CreateDir {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        std::fs::copy(src, dst).map(drop).map_err(|e| Error::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source: e,
        })
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        let move_err = |source| Error::Move {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source,
        };
        match std::fs::rename(src, dst) {
            Ok(()) => Ok(()),
            // rename cannot cross filesystems; fall back to copy + remove.
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                self.copy(src, dst)?;
                std::fs::remove_file(src).map_err(move_err)
            }
            Err(e) => Err(move_err(e)),
        }
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        tracing::debug!(src = %src.display(), dst = %dst.display(), "copying tree");
        for entry in WalkDir::new(src) {
            let entry = entry.map_err(|e| Error::Walk {
                path: src.to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();
            let relative = path.strip_prefix(src).unwrap_or(path);
            let dest = dst.join(relative);
            if entry.file_type().is_dir() {
                self.make_dirs(&dest)?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = dest.parent() {
                    self.make_dirs(parent)?;
                }
                self.copy(path, &dest)?;
            }
        }
        Ok(())
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir_all(path).map_err(|e| Error::RemoveTree {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn extract_zip(&self, archive: &Path, dest: &Path) -> Result<()> {
        let zip_err = |source| Error::ExtractZip {
            path: archive.to_path_buf(),
            source,
        };
        let file = std::fs::File::open(archive).map_err(|e| zip_err(e.into()))?;
        let mut zip = zip::ZipArchive::new(file).map_err(zip_err)?;
        zip.extract(dest).map_err(zip_err)
    }

    fn extract_tar(&self, archive: &Path, dest: &Path) -> Result<()> {
        let tar_err = |source| Error::ExtractTar {
            path: archive.to_path_buf(),
            source,
        };
        let mut file = std::fs::File::open(archive).map_err(tar_err)?;
        let mut magic = [0u8; 2];
        let n = file.read(&mut magic).map_err(tar_err)?;
        file.seek(SeekFrom::Start(0)).map_err(tar_err)?;
        if n == 2 && magic == [0x1f, 0x8b] {
            tar::Archive::new(GzDecoder::new(file))
                .unpack(dest)
                .map_err(tar_err)
        } else {
            tar::Archive::new(file).unpack(dest).map_err(tar_err)
        }
    }

    fn temp_dir(&self) -> Result<TempDir> {
        TempDir::new().map_err(|e| Error::TempDir { source: e })
    }

    fn spawn(
        &self,
        command: &[String],
        stdout: Stdio,
        stderr: Stdio,
        env: Option<&HashMap<String, String>>,
    ) -> Result<Child> {
        let Some((program, args)) = command.split_first() else {
            return Err(Error::Spawn {
                command: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        };
        let mut cmd = Command::new(program);
        cmd.args(args).stdout(stdout).stderr(stderr);
        if let Some(env) = env {
            cmd.env_clear().envs(env);
        }
        cmd.spawn().map_err(|e| Error::Spawn {
            command: command.join(" "),
            source: e,
        })
    }
}

/// Normalize a path into an archive-safe name: drive prefix and root are
/// stripped, `.` and resolvable `..` segments are collapsed, and the
/// remaining components are joined with `/` regardless of host OS.
pub fn normalize_to_relative_slash_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_owned());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}

#[cfg(unix)]
fn mode_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0xFFFF
}

#[cfg(not(unix))]
fn mode_bits(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

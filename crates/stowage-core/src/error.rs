use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Host filesystem ──
    #[error("failed to stat {path}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to list directory {path}")]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to copy {src} to {dst}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {src} to {dst}")]
    Move {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove directory tree {path}")]
    RemoveTree {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error while walking {path}")]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Archive extraction ──
    #[error("failed to extract zip archive {path}")]
    ExtractZip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("failed to extract tar archive {path}")]
    ExtractTar {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Temp dirs and processes ──
    #[error("failed to create temporary directory")]
    TempDir { source: std::io::Error },

    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// Voluntary cancellation, distinct from hard failures so callers can
    /// exit quietly instead of reporting an error.
    #[error("operation aborted by user")]
    Aborted,
}

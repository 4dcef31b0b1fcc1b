//! Core types for stowage.
//!
//! This crate defines the host abstraction the rest of the tool is built
//! on ([`OsUtils`] and its production implementation [`RealOs`]), the
//! `stowage.toml` schema ([`StowageConfig`]), and shared error types.
//!
//! Nothing above this crate touches `std::fs` or `std::process` directly:
//! components take `&dyn OsUtils` as an explicit argument, which keeps the
//! host environment substitutable in tests and bans ambient global state.

pub mod config;
pub mod error;
pub mod os;
pub mod walk;

pub use config::{Compression, PackConfig, StowageConfig};
pub use error::{Error, Result};
pub use os::{FileStat, OsUtils, RealOs, normalize_to_relative_slash_path};
pub use walk::{DirWalk, WalkEntry};

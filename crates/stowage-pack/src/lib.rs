//! Byte-reproducible zip packaging for stowage.
//!
//! # Packaging pipeline
//!
//! ```text
//! stowage pack
//!   1. Walk       ── OsUtils::walk(source_dir), host enumeration order
//!   2. Normalize  ── relative forward-slash arcname, fixed 1980 timestamp
//!   3. Write      ── PackWriter::add_file → zip stream
//!   4. Finalize   ── central directory flushed by finish()
//! ```
//!
//! # Reproducibility
//!
//! Entry bytes depend only on file content, permission bits, arcname, and
//! compression method. Source mtimes, absolute paths, and the host path
//! separator never reach the archive, so unchanged sources produce
//! bit-identical archives across machines and builds. A failed run leaves
//! the output valid-but-incomplete; callers must discard it.

pub mod package;
pub mod writer;

pub use package::create_zip_file;
pub use writer::{PackError, PackWriter};

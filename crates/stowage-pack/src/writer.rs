use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use stowage_core::{Compression, OsUtils, normalize_to_relative_slash_path};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Entry timestamp written for every archive member: 1980-01-01T00:00:00,
/// the minimum date the zip format can represent. Using a constant instead
/// of the source mtime is what makes archive bytes reproducible.
fn fixed_entry_time() -> zip::DateTime {
    zip::DateTime::default()
}

/// Append-only writer producing normalized zip entries.
///
/// Composes a generic [`ZipWriter`] with a metadata-normalization step
/// applied uniformly to every entry. One instance owns exactly one output
/// stream; entries cannot be rewritten once written, and concurrent use
/// from multiple threads is unsupported.
pub struct PackWriter<'a> {
    zip: ZipWriter<File>,
    os: &'a dyn OsUtils,
    compression: Compression,
    // Full mode word per entry, in write order. `ZipWriter` masks
    // permissions to 0o777; the real words are restored in `finish`.
    entry_modes: Vec<u32>,
}

impl<'a> PackWriter<'a> {
    /// Open a fresh archive at `path`, overwriting any existing file.
    pub fn create(
        path: &Path,
        os: &'a dyn OsUtils,
        compression: Compression,
    ) -> Result<Self, PackError> {
        // Opened read+write: `finish` seeks back through the stream to
        // restore full entry modes in the central directory.
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| PackError::Create {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            zip: ZipWriter::new(file),
            os,
            compression,
            entry_modes: Vec::new(),
        })
    }

    /// Append one entry for the regular file at `source`.
    ///
    /// When `arcname` is omitted it is derived from `source`; either way
    /// the name is normalized to a relative forward-slash path with any
    /// leading separator stripped. The full mode word from `stat`,
    /// setuid/setgid/sticky bits included, lands in the upper 16 bits
    /// of the entry's external attributes; the timestamp is always the
    /// fixed 1980 constant.
    ///
    /// `source` must name a regular file — callers check via the
    /// abstraction layer before calling.
    pub fn add_file(
        &mut self,
        source: &Path,
        arcname: Option<&str>,
        compression: Option<Compression>,
    ) -> Result<(), PackError> {
        let stat = self.os.stat(source)?;
        let name = match arcname {
            Some(name) => normalize_arcname(Path::new(name)),
            None => normalize_arcname(source),
        };
        let method = match compression.unwrap_or(self.compression) {
            Compression::Deflate => CompressionMethod::Deflated,
            Compression::Store => CompressionMethod::Stored,
        };
        let options = FileOptions::default()
            .compression_method(method)
            .last_modified_time(fixed_entry_time())
            .unix_permissions(stat.mode);

        // Read before starting the entry so a missing or unreadable source
        // leaves the archive without a dangling header.
        let contents = self.os.read(source)?;
        tracing::debug!(
            arcname = %name,
            size = stat.size,
            mode = %format_args!("{:o}", stat.mode),
            "adding archive entry"
        );
        self.zip
            .start_file(name.as_str(), options)
            .map_err(|e| PackError::Entry {
                arcname: name.clone(),
                source: e,
            })?;
        self.zip.write_all(&contents).map_err(|e| PackError::Entry {
            arcname: name,
            source: zip::result::ZipError::Io(e),
        })?;
        self.entry_modes.push(stat.mode);
        Ok(())
    }

    /// Flush the central directory and close the stream.
    pub fn finish(mut self) -> Result<(), PackError> {
        let mut file = self
            .zip
            .finish()
            .map_err(|e| PackError::Finish { source: e })?;
        restore_entry_modes(&mut file, &self.entry_modes).map_err(|e| PackError::Finish {
            source: zip::result::ZipError::Io(e),
        })
    }
}

const CENTRAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const END_OF_CENTRAL_DIR_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

/// Rewrite each central-directory entry's external attributes with the
/// entry's full mode word. `ZipWriter` only records the 0o777 permission
/// bits there, which loses setuid, setgid, and the sticky bit.
///
/// This writer never emits an archive comment, so the end-of-central-
/// directory record is the trailing 22 bytes of the stream.
fn restore_entry_modes(file: &mut File, modes: &[u32]) -> std::io::Result<()> {
    let corrupt = || std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed archive");

    let len = file.seek(SeekFrom::End(0))?;
    let mut eocd = [0u8; 22];
    file.seek(SeekFrom::Start(len.checked_sub(22).ok_or_else(corrupt)?))?;
    file.read_exact(&mut eocd)?;
    if eocd[0..4] != END_OF_CENTRAL_DIR_SIGNATURE {
        return Err(corrupt());
    }

    let mut offset = u64::from(u32::from_le_bytes([eocd[16], eocd[17], eocd[18], eocd[19]]));
    for mode in modes {
        file.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; 46];
        file.read_exact(&mut header)?;
        if header[0..4] != CENTRAL_HEADER_SIGNATURE {
            return Err(corrupt());
        }
        let name_len = u64::from(u16::from_le_bytes([header[28], header[29]]));
        let extra_len = u64::from(u16::from_le_bytes([header[30], header[31]]));
        let comment_len = u64::from(u16::from_le_bytes([header[32], header[33]]));

        // External attributes sit at byte 38 of the fixed header.
        file.seek(SeekFrom::Start(offset + 38))?;
        file.write_all(&(mode << 16).to_le_bytes())?;
        offset += 46 + name_len + extra_len + comment_len;
    }
    Ok(())
}

/// Relative forward-slash arcname for an archive entry.
fn normalize_arcname(path: &Path) -> String {
    normalize_to_relative_slash_path(path)
        .trim_start_matches('/')
        .to_owned()
}

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("failed to create archive at {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write archive entry {arcname}")]
    Entry {
        arcname: String,
        source: zip::result::ZipError,
    },

    #[error("failed to finalize archive")]
    Finish { source: zip::result::ZipError },

    #[error(transparent)]
    Os(#[from] stowage_core::Error),
}

use std::path::Path;

use stowage_core::{Compression, OsUtils, normalize_to_relative_slash_path};

use crate::writer::{PackError, PackWriter};

/// Mirror `source_dir` into a finished archive at `outfile`.
///
/// Equivalent to `zip -r`: every regular file under `source_dir` appears
/// exactly once, named by its path relative to `source_dir` in
/// forward-slash form. Walk order follows host directory enumeration and
/// entries are not sorted; symlinks and other non-regular files are
/// skipped. `source_dir` itself is never modified.
///
/// `outfile` is created fresh (or overwritten) and finalized on
/// completion. On error the archive is left incomplete and must be
/// discarded by the caller.
pub fn create_zip_file(
    source_dir: &Path,
    outfile: &Path,
    os: &dyn OsUtils,
    compression: Compression,
) -> Result<(), PackError> {
    let mut writer = PackWriter::create(outfile, os, compression)?;
    let mut count = 0usize;
    for entry in os.walk(source_dir) {
        let entry = entry?;
        for name in &entry.files {
            let full = entry.dir.join(name);
            let relative = full.strip_prefix(source_dir).unwrap_or(&full);
            let arcname = normalize_to_relative_slash_path(relative);
            writer.add_file(&full, Some(&arcname), None)?;
            count += 1;
        }
    }
    writer.finish()?;
    tracing::debug!(files = count, archive = %outfile.display(), "packaged directory");
    Ok(())
}

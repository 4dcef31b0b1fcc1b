use std::path::Path;

use anyhow::Context;
use stowage_core::{OsUtils, RealOs};

pub fn unpack(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    let os = RealOs;
    os.make_dirs(dest)?;

    tracing::debug!("extracting {} into {}", archive.display(), dest.display());
    let is_zip = archive
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    let result = if is_zip {
        os.extract_zip(archive, dest)
    } else {
        os.extract_tar(archive, dest)
    };
    result.with_context(|| format!("extracting {}", archive.display()))?;

    println!("Extracted {} into {}", archive.display(), dest.display());
    Ok(())
}

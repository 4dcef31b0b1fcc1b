use std::path::{Path, PathBuf};

use anyhow::Context;
use stowage_core::{Compression, OsUtils, RealOs, StowageConfig};

pub fn pack(source: &Path, output: Option<&Path>, store: bool) -> anyhow::Result<()> {
    let os = RealOs;
    if !os.directory_exists(source) {
        anyhow::bail!("source {} is not a directory", source.display());
    }

    let config = StowageConfig::load(Path::new("."))?;
    let outfile = resolve_output(source, output, &config);
    let compression = if store {
        Compression::Store
    } else {
        config.pack.compression
    };

    if let Some(parent) = outfile.parent() {
        if !parent.as_os_str().is_empty() {
            os.make_dirs(parent)?;
        }
    }

    tracing::debug!("packaging {} into {}", source.display(), outfile.display());
    stowage_pack::create_zip_file(source, &outfile, &os, compression)
        .with_context(|| format!("packaging {}", source.display()))?;

    println!("Packaged {} into {}", source.display(), outfile.display());
    Ok(())
}

/// Output path precedence: `-o` flag, then `[pack].output` from
/// stowage.toml, then `<source dir name>.zip` in the working directory.
fn resolve_output(source: &Path, output: Option<&Path>, config: &StowageConfig) -> PathBuf {
    if let Some(path) = output {
        return path.to_path_buf();
    }
    if let Some(configured) = &config.pack.output {
        return PathBuf::from(configured);
    }
    let stem = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_owned());
    PathBuf::from(format!("{stem}.zip"))
}

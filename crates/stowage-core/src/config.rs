use serde::{Deserialize, Serialize};

/// stowage.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StowageConfig {
    #[serde(default)]
    pub pack: PackConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackConfig {
    /// Compression method applied to archive entries.
    #[serde(default)]
    pub compression: Compression,
    /// Default archive output path, relative to the project directory.
    /// The CLI `-o` flag overrides this.
    pub output: Option<String>,
}

/// Per-entry compression method for packaged archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Deflate,
    Store,
}

impl StowageConfig {
    /// Load from stowage.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join("stowage.toml");
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }
}

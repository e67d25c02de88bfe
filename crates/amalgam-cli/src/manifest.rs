//! Manifest-based configuration for amalgamation runs

use amalgam_core::AmalgamConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Manifest file looked up in the working directory when none is given
pub const DEFAULT_MANIFEST: &str = "amalgam.toml";

/// Main manifest configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct Manifest {
    /// Amalgamation settings
    pub config: AmalgamConfig,
}

impl Manifest {
    /// Load manifest from file
    ///
    /// Relative `source-dir` and `output-dir` entries are taken relative to the
    /// directory holding the manifest.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;

        let mut manifest: Manifest = toml::from_str(&content)
            .with_context(|| format!("Failed to parse manifest file: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        manifest.config.source_dir = anchor(base, &manifest.config.source_dir);
        manifest.config.output_dir = anchor(base, &manifest.config.output_dir);
        debug!("Loaded manifest {}: {:?}", path.display(), manifest.config);
        Ok(manifest)
    }

    /// Load `path` if given, otherwise `amalgam.toml` in `dir` when present
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Option<Self>> {
        match path {
            Some(path) => Self::from_file(path).map(Some),
            None => {
                let default = dir.join(DEFAULT_MANIFEST);
                if default.is_file() {
                    Self::from_file(&default).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

fn anchor(base: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}

/// Command-line values that take precedence over the manifest
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub root: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub implementation_extension: Option<String>,
    pub exclude: Vec<String>,
}

impl ConfigOverrides {
    /// Merge the overrides onto the manifest configuration, if any
    pub fn apply(self, manifest: Option<Manifest>) -> Result<AmalgamConfig> {
        let mut config = match (manifest, self.root) {
            (Some(manifest), root) => {
                let mut config = manifest.config;
                if let Some(root) = root {
                    config.root = root;
                }
                config
            }
            (None, Some(root)) => AmalgamConfig::new(root),
            (None, None) => {
                bail!("No root file given: pass --root or provide {}", DEFAULT_MANIFEST)
            }
        };

        if let Some(dir) = self.source_dir {
            config.source_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(ext) = self.implementation_extension {
            config.implementation_extension = ext;
        }
        config.exclude.extend(self.exclude);

        config.validate()?;
        Ok(config)
    }
}

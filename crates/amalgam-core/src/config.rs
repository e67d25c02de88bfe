//! Configuration for a single amalgamation run

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AmalgamError, Result};

pub const DEFAULT_IMPLEMENTATION_EXTENSION: &str = "cpp";
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AmalgamConfig {
    /// Root interface file, relative to `source_dir`
    pub root: String,

    /// Directory every quoted reference is resolved against
    #[serde(default = "default_dir")]
    pub source_dir: PathBuf,

    /// Directory the two merged artifacts are written to
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,

    /// Extension of implementation files, without the leading dot
    #[serde(default = "default_implementation_extension")]
    pub implementation_extension: String,

    /// File names never inlined into the implementation artifact
    #[serde(default)]
    pub exclude: BTreeSet<String>,

    /// Deepest reference chain followed before giving up
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_implementation_extension() -> String {
    DEFAULT_IMPLEMENTATION_EXTENSION.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl AmalgamConfig {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            source_dir: default_dir(),
            output_dir: default_dir(),
            implementation_extension: default_implementation_extension(),
            exclude: BTreeSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_implementation_extension(mut self, ext: impl Into<String>) -> Self {
        self.implementation_extension = ext.into();
        self
    }

    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.insert(name.into());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.root.trim().is_empty() {
            return Err(AmalgamError::InvalidConfig(
                "root file name is empty".to_string(),
            ));
        }
        if self.implementation_extension.is_empty() {
            return Err(AmalgamError::InvalidConfig(
                "implementation extension is empty".to_string(),
            ));
        }
        if self.implementation_extension.starts_with('.') {
            return Err(AmalgamError::InvalidConfig(format!(
                "implementation extension '{}' must not start with a dot",
                self.implementation_extension
            )));
        }
        if self.max_depth == 0 {
            return Err(AmalgamError::InvalidConfig(
                "max-depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Two-pass amalgamation of an interface/implementation file tree
//!
//! The interface pass inlines everything reachable from the root file. The
//! implementation pass then walks the discovered interface files in order,
//! merging each one's implementation file. Both passes share one visited
//! registry, so an implementation file's references to local interface files
//! resolve as already inlined and are replaced by a single reference to the
//! merged interface artifact.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::AmalgamConfig;
use crate::error::{AmalgamError, Result};
use crate::resolver::{PassOutput, Resolver, VisitedRegistry};

/// Name of the implementation file paired with `interface`
///
/// The extension of the last path component is replaced, or appended when
/// there is none.
pub fn implementation_name(interface: &str, extension: &str) -> String {
    let component_start = interface
        .rfind(|c: char| c == '/' || c == '\\')
        .map_or(0, |i| i + 1);
    let component = &interface[component_start..];
    let stem_len = match component.rfind('.') {
        // A leading dot marks a hidden file, not an extension
        Some(dot) if component[..dot].trim_start_matches('.').is_empty() => component.len(),
        Some(dot) => dot,
        None => component.len(),
    };
    format!("{}.{}", &interface[..component_start + stem_len], extension)
}

/// Both merged artifacts, held in memory until written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Amalgamation {
    /// File name of the merged interface artifact
    pub interface_name: String,
    /// File name of the merged implementation artifact
    pub implementation_name: String,
    #[serde(skip)]
    pub interface: String,
    #[serde(skip)]
    pub implementation: String,
    /// Interface files in discovery order, root first
    pub interface_files: Vec<String>,
    /// Implementation files in the order they were merged
    pub implementation_files: Vec<String>,
    /// Reference lines left in the interface artifact
    pub forwarded_interface: Vec<String>,
    /// Reference lines left in the implementation artifact, not counting the
    /// reference to the interface artifact
    pub forwarded_implementation: Vec<String>,
}

/// What a completed run wrote to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmalgamReport {
    pub interface_path: PathBuf,
    pub implementation_path: PathBuf,
    pub interface_files: Vec<String>,
    pub implementation_files: Vec<String>,
}

impl Amalgamation {
    /// Write both artifacts into `dir`, creating it if needed
    ///
    /// Both artifacts are staged in temporary files in `dir` before either is
    /// renamed into place. If the second rename fails, the interface artifact
    /// is rolled back, so a failed write leaves neither new artifact behind.
    pub fn write_to(&self, dir: &Path) -> Result<AmalgamReport> {
        fs::create_dir_all(dir).map_err(|source| AmalgamError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let interface_path = dir.join(&self.interface_name);
        let implementation_path = dir.join(&self.implementation_name);
        for path in [&interface_path, &implementation_path] {
            if path.is_dir() {
                return Err(AmalgamError::Write {
                    path: path.clone(),
                    source: io::Error::other("destination is a directory"),
                });
            }
        }

        let interface_file = stage(&interface_path, self.interface.as_bytes())?;
        let implementation_file = stage(&implementation_path, self.implementation.as_bytes())?;
        let previous_interface = read_existing(&interface_path)?;

        persist(interface_file, &interface_path)?;
        if let Err(err) = persist(implementation_file, &implementation_path) {
            restore(&interface_path, previous_interface.as_deref());
            return Err(err);
        }

        info!("Wrote {}", interface_path.display());
        info!("Wrote {}", implementation_path.display());

        Ok(AmalgamReport {
            interface_path,
            implementation_path,
            interface_files: self.interface_files.clone(),
            implementation_files: self.implementation_files.clone(),
        })
    }
}

fn write_error(path: &Path) -> impl Fn(io::Error) -> AmalgamError + '_ {
    move |source| AmalgamError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `contents` to a synced temporary file next to `path`
fn stage(path: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(write_error(path))?;
    file.write_all(contents).map_err(write_error(path))?;
    file.as_file().sync_all().map_err(write_error(path))?;
    Ok(file)
}

fn persist(file: NamedTempFile, path: &Path) -> Result<()> {
    file.persist(path)
        .map(drop)
        .map_err(|e| write_error(path)(e.error))
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(write_error(path)(e)),
    }
}

/// Put back what was at `path` before this run, or remove it if nothing was
fn restore(path: &Path, previous: Option<&[u8]>) {
    let restored = match previous {
        Some(bytes) => stage(path, bytes).and_then(|file| persist(file, path)),
        None => fs::remove_file(path).map_err(write_error(path)),
    };
    if let Err(e) = restored {
        warn!("Could not roll back {}: {}", path.display(), e);
    }
}

pub struct Amalgamator {
    config: AmalgamConfig,
}

impl Amalgamator {
    pub fn new(config: AmalgamConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AmalgamConfig {
        &self.config
    }

    /// Run both passes without touching the output directory
    pub fn plan(&self) -> Result<Amalgamation> {
        self.config.validate()?;
        let config = &self.config;

        let root_path = config.source_dir.join(&config.root);
        if !root_path.is_file() {
            return Err(AmalgamError::RootNotFound(root_path));
        }

        let interface_name = Path::new(&config.root)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AmalgamError::InvalidConfig(format!(
                    "root '{}' does not name a file",
                    config.root
                ))
            })?;
        let implementation_artifact =
            implementation_name(&interface_name, &config.implementation_extension);

        info!("Merging interface files from {}", config.root);
        let mut visited = VisitedRegistry::new();
        let no_exclusions = BTreeSet::new();
        let interface_resolver = Resolver::new(&config.source_dir, &no_exclusions)
            .with_max_depth(config.max_depth);
        let mut interface_output = PassOutput::new();
        interface_resolver.resolve(&config.root, &mut visited, &mut interface_output, true)?;
        let interface_files: Vec<String> = visited.iter().map(str::to_string).collect();
        debug!("Discovery order: {:?}", interface_files);

        info!(
            "Merging implementation files for {} interface files",
            interface_files.len()
        );
        let implementation_resolver = Resolver::new(&config.source_dir, &config.exclude)
            .with_max_depth(config.max_depth);
        let mut implementation_output = PassOutput::new();
        let mut implementation_files = Vec::new();
        let mut first = true;

        // The registry keeps growing while implementation files pull in
        // interface files the first pass never reached; those get paired too.
        let mut index = 0;
        while let Some(name) = visited.get(index) {
            index += 1;
            let candidate = implementation_name(name, &config.implementation_extension);
            if visited.contains(&candidate) {
                continue;
            }
            let resolution = implementation_resolver.resolve(
                &candidate,
                &mut visited,
                &mut implementation_output,
                first,
            )?;
            if resolution.is_resolved() {
                implementation_files.push(candidate);
                first = false;
            }
        }

        let synthetic = format!("#include \"{}\"\n", interface_name);
        let amalgamation = Amalgamation {
            interface: interface_output.assemble(),
            implementation: implementation_output.assemble_with(&synthetic),
            interface_name,
            implementation_name: implementation_artifact,
            interface_files,
            implementation_files,
            forwarded_interface: interface_output.forwarded().to_vec(),
            forwarded_implementation: implementation_output.forwarded().to_vec(),
        };
        info!(
            "Merged {} interface and {} implementation files",
            amalgamation.interface_files.len(),
            amalgamation.implementation_files.len()
        );
        Ok(amalgamation)
    }

    /// Merge the tree and write both artifacts to the configured output directory
    pub fn run(&self) -> Result<AmalgamReport> {
        let amalgamation = self.plan()?;
        let report = amalgamation.write_to(&self.config.output_dir)?;
        info!("Done");
        Ok(report)
    }
}

//! Recursive reference resolution
//!
//! The resolver walks quoted `#include` references depth-first starting at a
//! single file, inlining every local file it can find and forwarding the rest.
//! A file is marked visited *before* its own references are followed, so a
//! reference cycle terminates: the back-reference sees the file as already
//! inlined and is dropped.
//!
//! Output for one pass is split into two streams:
//! - references: forwarded reference lines, plus the first file's leading
//!   notice and include guard
//! - body: everything else, in traversal order

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{AmalgamError, Result};
use crate::line::{
    classify, dedup_key, is_blank, lines_inclusive, split_after_close, LineKind,
};

/// Files already opened during a run, in the order they were first visited
#[derive(Debug, Clone, Default)]
pub struct VisitedRegistry {
    files: IndexSet<String>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    /// Record a file as visited. Returns false if it already was.
    pub fn mark(&mut self, name: &str) -> bool {
        self.files.insert(name.to_string())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.files.get_index(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.files.into_iter().collect()
    }
}

/// The two accumulators of a single pass
#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    references: String,
    body: String,
    /// Trimmed text of every reference line forwarded so far
    included: HashSet<String>,
    forwarded: Vec<String>,
}

impl PassOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn references(&self) -> &str {
        &self.references
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Forwarded reference lines (trimmed) in the order they were emitted
    pub fn forwarded(&self) -> &[String] {
        &self.forwarded
    }

    fn push_reference(&mut self, text: &str) {
        self.references.push_str(text);
    }

    fn push_body(&mut self, text: &str) {
        self.body.push_str(text);
    }

    /// Forward an unresolved reference line unless an identical one already was
    fn forward(&mut self, line: &str) -> bool {
        let key = dedup_key(line);
        if self.included.contains(key) {
            return false;
        }
        self.included.insert(key.to_string());
        self.forwarded.push(key.to_string());
        self.references.push_str(line);
        true
    }

    pub fn assemble(&self) -> String {
        let mut merged = String::with_capacity(self.references.len() + self.body.len());
        merged.push_str(&self.references);
        merged.push_str(&self.body);
        merged
    }

    /// Like [`assemble`](Self::assemble) with one extra line between the streams
    pub fn assemble_with(&self, line: &str) -> String {
        let line = terminated(line);
        let mut merged =
            String::with_capacity(self.references.len() + line.len() + self.body.len());
        merged.push_str(&self.references);
        merged.push_str(&line);
        merged.push_str(&self.body);
        merged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Angle-bracket or otherwise unquoted reference
    NotLocal,
    /// No regular file with that name under the source directory
    Missing,
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The file was opened and its content appended
    Inlined,
    /// The file had been visited earlier in this run
    AlreadyVisited,
    /// The reference must stay in the output as-is
    Unresolved(UnresolvedReason),
}

impl Resolution {
    /// Whether the file's content is (or already was) part of the output
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Inlined | Resolution::AlreadyVisited)
    }
}

/// Where the resolver is within a file's leading notice block
enum Leading {
    Pending,
    InComment(String),
    Done,
}

pub struct Resolver<'a> {
    source_dir: &'a Path,
    excluded: &'a BTreeSet<String>,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(source_dir: &'a Path, excluded: &'a BTreeSet<String>) -> Self {
        Self {
            source_dir,
            excluded,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn source_path(&self, name: &str) -> PathBuf {
        self.source_dir.join(name)
    }

    /// Resolve `name` and everything it references into `output`
    ///
    /// Only the file resolved with `first` set contributes its leading notice
    /// and include guard; every file reached from it is processed as non-first.
    pub fn resolve(
        &self,
        name: &str,
        visited: &mut VisitedRegistry,
        output: &mut PassOutput,
        first: bool,
    ) -> Result<Resolution> {
        self.resolve_at(name, visited, output, first, 1)
    }

    fn resolve_at(
        &self,
        name: &str,
        visited: &mut VisitedRegistry,
        output: &mut PassOutput,
        first: bool,
        depth: usize,
    ) -> Result<Resolution> {
        if self.excluded.contains(name) {
            return Ok(Resolution::Unresolved(UnresolvedReason::Excluded));
        }
        let path = self.source_path(name);
        if !path.is_file() {
            return Ok(Resolution::Unresolved(UnresolvedReason::Missing));
        }
        if visited.contains(name) {
            return Ok(Resolution::AlreadyVisited);
        }
        if depth > self.max_depth {
            return Err(AmalgamError::DepthExceeded {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        debug!("Parsing {}", name);
        visited.mark(name);
        let text = read_source(&path)?;
        self.process(&text, visited, output, first, depth)?;
        Ok(Resolution::Inlined)
    }

    fn process(
        &self,
        text: &str,
        visited: &mut VisitedRegistry,
        output: &mut PassOutput,
        first: bool,
        depth: usize,
    ) -> Result<()> {
        let mut leading = Leading::Pending;

        for raw in lines_inclusive(text) {
            let line = terminated(raw);

            if let Leading::InComment(block) = &mut leading {
                match split_notice(&line, 0) {
                    Some((notice, code)) => {
                        block.push_str(&notice);
                        if first {
                            output.push_reference(block);
                        }
                        if let Some(code) = code {
                            output.push_body(code);
                        }
                        leading = Leading::Done;
                    }
                    None => block.push_str(&line),
                }
                continue;
            }

            if matches!(leading, Leading::Pending) {
                match classify(&line) {
                    LineKind::CommentOpen { closed: true } => {
                        if let Some((notice, code)) = split_notice(&line, 2) {
                            if first {
                                output.push_reference(&notice);
                            }
                            if let Some(code) = code {
                                output.push_body(code);
                            }
                        }
                        leading = Leading::Done;
                        continue;
                    }
                    LineKind::CommentOpen { closed: false } => {
                        leading = Leading::InComment(line.into_owned());
                        continue;
                    }
                    _ if is_blank(&line) => {
                        output.push_body(&line);
                        continue;
                    }
                    _ => leading = Leading::Done,
                }
            }

            match classify(&line) {
                LineKind::IncludeOnce => {
                    if first {
                        output.push_reference(&line);
                    }
                }
                LineKind::Include { target } => {
                    let resolution = match target {
                        Some(target) => {
                            self.resolve_at(target, visited, output, false, depth + 1)?
                        }
                        None => Resolution::Unresolved(UnresolvedReason::NotLocal),
                    };
                    if let Resolution::Unresolved(reason) = resolution {
                        if output.forward(&line) {
                            trace!("Forwarding {} ({:?})", dedup_key(&line), reason);
                        }
                    }
                }
                _ => output.push_body(&line),
            }
        }

        // A file that is nothing but an unterminated notice still counts as its notice
        if let Leading::InComment(block) = leading {
            if first {
                output.push_reference(&block);
            }
        }

        Ok(())
    }
}

fn read_source(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| AmalgamError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|source| AmalgamError::Encoding {
        path: path.to_path_buf(),
        source,
    })
}

/// Split the line closing a leading notice into the notice itself and any
/// code following the `*/`, which belongs to the body
fn split_notice(line: &str, from: usize) -> Option<(Cow<'_, str>, Option<&str>)> {
    let (notice, rest) = split_after_close(line, from)?;
    if is_blank(rest) {
        Some((Cow::Borrowed(line), None))
    } else {
        Some((Cow::Owned(format!("{}\n", notice)), Some(rest)))
    }
}

fn terminated(line: &str) -> Cow<'_, str> {
    if line.ends_with('\n') {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(format!("{}\n", line))
    }
}

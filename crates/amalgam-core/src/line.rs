//! Prefix-based classification of source lines
//!
//! Only the few directives that matter for merging are recognised. Everything
//! else is opaque text that gets copied through untouched.

use std::sync::OnceLock;

use regex::Regex;

/// What a single line means to the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `#pragma once`
    IncludeOnce,
    /// `#include ...`; `target` is the quoted name, `None` for `<...>` includes
    Include { target: Option<&'a str> },
    /// A line opening a block comment; `closed` when `*/` follows on the same line
    CommentOpen { closed: bool },
    Other,
}

fn quoted_target() -> &'static Regex {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    QUOTED.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("quoted include pattern is valid"))
}

pub fn classify(line: &str) -> LineKind<'_> {
    if line.starts_with("#pragma") && line.contains("once") {
        LineKind::IncludeOnce
    } else if line.starts_with("#include") {
        let target = quoted_target()
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());
        LineKind::Include { target }
    } else if line.starts_with("/*") {
        LineKind::CommentOpen {
            closed: split_after_close(line, 2).is_some(),
        }
    } else {
        LineKind::Other
    }
}

/// Split `line` just after the first `*/` found at or past byte `from`
pub fn split_after_close(line: &str, from: usize) -> Option<(&str, &str)> {
    line.get(from..)?
        .find("*/")
        .map(|i| line.split_at(from + i + 2))
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Identity used when deduplicating forwarded reference lines
pub fn dedup_key(line: &str) -> &str {
    line.trim()
}

/// Split text into lines, keeping each line's terminator
pub fn lines_inclusive(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n')
}

//! Library interface for amalgam CLI components

pub mod manifest;

use amalgam_core::Amalgamation;
use anyhow::Result;
use std::fmt::Write;

/// Render the outcome of a dry run, either as text or as JSON
pub fn render_plan(amalgamation: &Amalgamation, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(amalgamation)?);
    }

    let mut out = String::new();
    writeln!(
        out,
        "{} + {}",
        amalgamation.interface_name, amalgamation.implementation_name
    )?;
    list(&mut out, "Interface files", &amalgamation.interface_files)?;
    list(
        &mut out,
        "Implementation files",
        &amalgamation.implementation_files,
    )?;
    list(
        &mut out,
        "Forwarded references (interface)",
        &amalgamation.forwarded_interface,
    )?;
    list(
        &mut out,
        "Forwarded references (implementation)",
        &amalgamation.forwarded_implementation,
    )?;
    Ok(out)
}

fn list(out: &mut String, title: &str, items: &[String]) -> std::fmt::Result {
    writeln!(out, "{} ({}):", title, items.len())?;
    for item in items {
        writeln!(out, "  {}", item)?;
    }
    Ok(())
}

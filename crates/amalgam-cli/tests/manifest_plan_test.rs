//! Manifest-driven runs through the CLI library

use amalgam::manifest::{ConfigOverrides, Manifest};
use amalgam::render_plan;
use amalgam_core::Amalgamator;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn project() -> Result<TempDir, Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let src = dir.path().join("Test");
    fs::create_dir_all(&src)?;
    fs::write(
        src.join("Lib.h"),
        "/* notice */\n#pragma once\n#include <QString>\n#include \"util.h\"\nclass Lib;\n",
    )?;
    fs::write(src.join("util.h"), "/* notice */\n#pragma once\nclass Util;\n")?;
    fs::write(
        src.join("util.cpp"),
        "/* notice */\n#include \"util.h\"\n#include \"sqlite3.h\"\nUtil::Util() {}\n",
    )?;
    fs::write(src.join("sqlite3.h"), "struct sqlite3;\n")?;
    fs::write(
        dir.path().join("amalgam.toml"),
        "[config]\nroot = \"Lib.h\"\nsource-dir = \"Test\"\noutput-dir = \"Lib\"\nexclude = [\"sqlite3.h\"]\n",
    )?;
    Ok(dir)
}

#[test]
fn test_manifest_run_writes_into_manifest_relative_output() -> Result<(), Box<dyn std::error::Error>>
{
    let dir = project()?;
    let manifest = Manifest::discover(None, dir.path())?;
    let config = ConfigOverrides::default().apply(manifest)?;
    let report = Amalgamator::new(config).run()?;

    assert_eq!(report.interface_path, dir.path().join("Lib").join("Lib.h"));
    assert_eq!(
        fs::read_to_string(dir.path().join("Lib").join("Lib.h"))?,
        "/* notice */\n#pragma once\n#include <QString>\nclass Util;\nclass Lib;\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("Lib").join("Lib.cpp"))?,
        "/* notice */\n#include \"sqlite3.h\"\n#include \"Lib.h\"\nUtil::Util() {}\n"
    );
    Ok(())
}

#[test]
fn test_render_plan_text() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    let manifest_path = dir.path().join("amalgam.toml");
    let manifest = Manifest::discover(Some(manifest_path.as_path()), dir.path())?;
    let amalgamation = Amalgamator::new(ConfigOverrides::default().apply(manifest)?).plan()?;

    let expected = "\
Lib.h + Lib.cpp
Interface files (2):
  Lib.h
  util.h
Implementation files (1):
  util.cpp
Forwarded references (interface) (1):
  #include <QString>
Forwarded references (implementation) (1):
  #include \"sqlite3.h\"
";
    assert_eq!(render_plan(&amalgamation, false)?, expected);
    assert!(!dir.path().join("Lib").exists());
    Ok(())
}

#[test]
fn test_render_plan_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    let manifest = Manifest::discover(None, dir.path())?;
    let amalgamation = Amalgamator::new(ConfigOverrides::default().apply(manifest)?).plan()?;

    let json: serde_json::Value = serde_json::from_str(&render_plan(&amalgamation, true)?)?;
    assert_eq!(json["interface_files"], serde_json::json!(["Lib.h", "util.h"]));
    assert_eq!(json["implementation_name"], "Lib.cpp");
    assert!(json.get("interface").is_none());
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use amalgam::manifest::{ConfigOverrides, Manifest};
use amalgam::render_plan;
use amalgam_core::{AmalgamConfig, Amalgamator};

#[derive(Parser)]
#[command(name = "amalgam")]
#[command(about = "Merge a tree of headers and sources into one header and one source file", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the tree and write both artifacts
    Merge {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Resolve the tree without writing anything
    Plan {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Manifest file (defaults to ./amalgam.toml when present)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Root header, relative to the source directory
    #[arg(short, long)]
    root: Option<String>,

    /// Directory references are resolved against
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Directory the merged files are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Extension of implementation files
    #[arg(long = "ext")]
    implementation_extension: Option<String>,

    /// File never merged into the implementation output (repeatable)
    #[arg(short, long)]
    exclude: Vec<String>,
}

impl SourceArgs {
    fn into_config(self) -> Result<AmalgamConfig> {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        let manifest = Manifest::discover(self.manifest.as_deref(), &cwd)?;
        ConfigOverrides {
            root: self.root,
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            implementation_extension: self.implementation_extension,
            exclude: self.exclude,
        }
        .apply(manifest)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.debug {
        tracing::Level::TRACE
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(cli.debug) // Show target module in debug mode
        .init();

    match cli.command {
        Commands::Merge { source } => handle_merge(source),
        Commands::Plan { source, json } => handle_plan(source, json),
    }
}

fn handle_merge(source: SourceArgs) -> Result<()> {
    let config = source.into_config()?;
    info!(
        "Amalgamating {} from {:?} into {:?}",
        config.root, config.source_dir, config.output_dir
    );

    let report = Amalgamator::new(config)
        .run()
        .context("Amalgamation failed")?;

    info!(
        "Merged {} headers and {} sources",
        report.interface_files.len(),
        report.implementation_files.len()
    );
    Ok(())
}

fn handle_plan(source: SourceArgs, json: bool) -> Result<()> {
    let config = source.into_config()?;
    let amalgamation = Amalgamator::new(config)
        .plan()
        .context("Amalgamation failed")?;
    print!("{}", render_plan(&amalgamation, json)?);
    Ok(())
}

//! Command-line interface for chaptercast.
//!
//! Provides commands for assembling a podcast from a segment manifest,
//! previewing its chapter layout, checking the external encoder, and
//! showing the resolved configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{load_config, Config};
use crate::core::{default_output_base_name, Assembler, AssemblyRequest, SilencePolicy};
use crate::domain::{chapter_listing, format_timestamp, SegmentManifest};

/// chaptercast - Chaptered podcast assembly engine
#[derive(Parser, Debug)]
#[command(name = "chaptercast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .chaptercast/config.yaml discovery)
    #[arg(long, global = true, env = "CHAPTERCAST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge segments, write chapters, and encode the final podcast
    Assemble {
        /// Segment manifest (JSON, or YAML by extension)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Directory for the final file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output file name without extension (default: daily_digest_<date>)
        #[arg(short, long)]
        name: Option<String>,

        /// Podcast title (overrides manifest and config)
        #[arg(long)]
        title: Option<String>,

        /// Silence between segments in milliseconds
        #[arg(long)]
        silence_ms: Option<u64>,

        /// Remove the gap before a segment that fails to load
        #[arg(long)]
        rollback_silence: bool,

        /// Scratch directory for intermediate files (private temp dir if omitted)
        #[arg(long)]
        scratch_dir: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the chapter layout without encoding
    Chapters {
        /// Segment manifest (JSON, or YAML by extension)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Silence between segments in milliseconds
        #[arg(long)]
        silence_ms: Option<u64>,

        /// Remove the gap before a segment that fails to load
        #[arg(long)]
        rollback_silence: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the external encoder is available
    Check,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut config = load_config(self.config.as_deref())?;

        match self.command {
            Commands::Assemble {
                manifest,
                output_dir,
                name,
                title,
                silence_ms,
                rollback_silence,
                scratch_dir,
                json,
            } => {
                apply_merge_flags(&mut config, silence_ms, rollback_silence)?;
                if let Some(dir) = output_dir {
                    config.output_dir = dir;
                }
                assemble(&config, &manifest, name, title, scratch_dir, json).await
            }
            Commands::Chapters {
                manifest,
                silence_ms,
                rollback_silence,
                json,
            } => {
                apply_merge_flags(&mut config, silence_ms, rollback_silence)?;
                show_chapters(&config, &manifest, json).await
            }
            Commands::Check => check(&config).await,
            Commands::Config => show_config(&config),
        }
    }
}

/// Overlay merge flags; the result is validated like any other source
fn apply_merge_flags(
    config: &mut Config,
    silence_ms: Option<u64>,
    rollback_silence: bool,
) -> Result<()> {
    if let Some(ms) = silence_ms {
        config.silence_ms = ms;
    }
    if rollback_silence {
        config.silence_policy = SilencePolicy::Rollback;
    }
    config.validate().context("Invalid command-line options")
}

/// Assemble a podcast from a manifest
async fn assemble(
    config: &Config,
    manifest_path: &Path,
    name: Option<String>,
    title: Option<String>,
    scratch_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let manifest = SegmentManifest::from_file(manifest_path)?;
    if manifest.segments.is_empty() {
        anyhow::bail!("Manifest contains no segments: {}", manifest_path.display());
    }

    let base_name =
        name.unwrap_or_else(|| default_output_base_name(chrono::Local::now().date_naive()));

    let mut request = AssemblyRequest::new(manifest.segments, &config.output_dir, base_name);
    request.title = title.or(manifest.title);
    request.scratch_dir = scratch_dir;

    let assembler = Assembler::new(config);
    let result = assembler
        .assemble(&request)
        .await
        .context("Podcast assembly failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.output_path.display());
        println!(
            "\nDuration: {}  Chapters: {}\n",
            format_timestamp(result.total_duration_ms),
            result.chapters.len()
        );
        print!("{}", chapter_listing(&result.chapters));
    }

    Ok(())
}

/// Print the chapter layout for a manifest
async fn show_chapters(config: &Config, manifest_path: &Path, json: bool) -> Result<()> {
    let manifest = SegmentManifest::from_file(manifest_path)?;

    let assembler = Assembler::new(config);
    let plan = assembler
        .plan(&manifest.segments)
        .await
        .context("Failed to compute chapter layout")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{:<10} {:<10} {:<40}", "START", "END", "TITLE");
    println!("{}", "-".repeat(60));
    for chapter in &plan.chapters {
        println!(
            "{:<10} {:<10} {:<40}",
            format_timestamp(chapter.start_ms),
            format_timestamp(chapter.end_ms),
            chapter.title
        );
    }
    println!(
        "\nTotal: {} ({} ms), {} skipped",
        format_timestamp(plan.total_duration_ms),
        plan.total_duration_ms,
        plan.skipped
    );

    Ok(())
}

/// Check encoder availability
async fn check(config: &Config) -> Result<()> {
    let assembler = Assembler::new(config);
    let transcoder = assembler.transcoder();

    match transcoder.health_check().await {
        Ok(version) => {
            println!("✓ {}: {}", transcoder.binary_path(), version);
            Ok(())
        }
        Err(e) => {
            println!("✗ {}: {}", transcoder.binary_path(), e);
            std::process::exit(1);
        }
    }
}

/// Show resolved configuration
fn show_config(config: &Config) -> Result<()> {
    match config.config_file {
        Some(ref path) => println!("# Config file: {}", path.display()),
        None => println!("# Config file: (none, using defaults)"),
    }
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

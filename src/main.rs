mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use organizer_core::config::MetadataBackend;
use organizer_core::{FileConfig, OrganizeOptions, TransferMode};
use tracing::{error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Copy,
    Move,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Metadata {
    /// Run exiftool for every file
    Exiftool,
    /// Built-in EXIF reader, images only
    Exif,
    /// Modification time only
    None,
}

#[derive(Parser, Debug)]
#[command(name = "asset-organizer", version, about = "Sort video, image and audio files into YYYY/MM/DD folders by capture date")]
struct Cli {
    /// Folder to scan (recursively)
    #[arg(long)]
    source: PathBuf,

    /// Root of the YYYY/MM/DD output tree
    #[arg(long)]
    output: PathBuf,

    /// Really copy/move files. Without this flag nothing is changed on disk
    #[arg(long)]
    execute: bool,

    /// What to do with each file when --execute is given
    #[arg(long, value_enum, default_value_t = Mode::Copy)]
    mode: Mode,

    /// Copy originals here before moving them (--mode move only)
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Log file, appended to on every run
    #[arg(long, default_value = "logs/organizer.log")]
    log_file: PathBuf,

    /// TOML file overriding extension lists and metadata settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where capture dates come from (default: exiftool, or the config file)
    #[arg(long, value_enum)]
    metadata: Option<Metadata>,
}

fn build_options(cli: &Cli) -> anyhow::Result<OrganizeOptions> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let mut options = OrganizeOptions::new(&cli.source, &cli.output);
    options.dry_run = !cli.execute;
    options.mode = match cli.mode {
        Mode::Copy => TransferMode::Copy,
        Mode::Move => TransferMode::Move,
    };
    options.backup_dir = cli.backup_dir.clone();
    options.filter = file_config.filter;
    options.metadata = file_config.metadata;
    if let Some(m) = cli.metadata {
        options.metadata.backend = match m {
            Metadata::Exiftool => MetadataBackend::ExifTool,
            Metadata::Exif => MetadataBackend::Exif,
            Metadata::None => MetadataBackend::None,
        };
    }
    Ok(options)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init_logger(&cli.log_file)?;
    let t_total = std::time::Instant::now();

    let options = build_options(&cli).inspect_err(|e| error!("{:#}", e))?;

    let summary = organize_core(&options).inspect_err(|e| error!("{:#}", e))?;

    if summary.dry_run {
        info!("dry run: nothing was copied or moved; pass --execute to apply the plan");
    }
    eprintln!(
        "Done! {} scanned, {} skipped, {} planned, {} succeeded, {} failed ({:.2}s)",
        summary.scanned,
        summary.skipped,
        summary.planned,
        summary.succeeded,
        summary.failed,
        t_total.elapsed().as_secs_f64()
    );
    for failure in &summary.failures {
        eprintln!("  failed: {}: {}", failure.path.display(), failure.reason);
    }
    eprintln!("Log: {}", cli.log_file.display());

    Ok(())
}

fn organize_core(options: &OrganizeOptions) -> anyhow::Result<organizer_core::RunSummary> {
    organizer_core::organize(options).with_context(|| {
        format!(
            "cannot organize {} into {}",
            options.source.display(),
            options.output.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_dry_run_copy() {
        let cli = Cli::try_parse_from(["asset-organizer", "--source", "in", "--output", "out"]).unwrap();
        assert!(!cli.execute);
        assert_eq!(cli.mode, Mode::Copy);
        assert_eq!(cli.log_file, PathBuf::from("logs/organizer.log"));

        let options = build_options(&cli).unwrap();
        assert!(options.dry_run);
        assert_eq!(options.mode, TransferMode::Copy);
        assert_eq!(options.metadata.backend, MetadataBackend::ExifTool);
    }

    #[test]
    fn test_required_args() {
        assert!(Cli::try_parse_from(["asset-organizer", "--source", "in"]).is_err());
        assert!(Cli::try_parse_from(["asset-organizer", "--output", "out"]).is_err());
        assert!(Cli::try_parse_from([
            "asset-organizer", "--source", "in", "--output", "out", "--mode", "rename"
        ])
        .is_err());
    }

    #[test]
    fn test_move_with_backup_and_metadata_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("organizer.toml");
        std::fs::write(&config, "[metadata]\nbackend = \"exif\"\ncommand = \"/opt/exiftool\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "asset-organizer",
            "--source", "in",
            "--output", "out",
            "--execute",
            "--mode", "move",
            "--backup-dir", "bak",
            "--metadata", "none",
            "--config", config.to_str().unwrap(),
        ])
        .unwrap();
        let options = build_options(&cli).unwrap();
        assert!(!options.dry_run);
        assert_eq!(options.mode, TransferMode::Move);
        assert_eq!(options.backup_dir, Some(PathBuf::from("bak")));
        // flag wins over the file, other file settings survive
        assert_eq!(options.metadata.backend, MetadataBackend::None);
        assert_eq!(options.metadata.command, "/opt/exiftool");
    }

    #[test]
    fn test_unreadable_config_is_an_error() {
        let cli = Cli::try_parse_from([
            "asset-organizer", "--source", "in", "--output", "out", "--config", "/nonexistent/organizer.toml",
        ])
        .unwrap();
        assert!(build_options(&cli).is_err());
    }
}

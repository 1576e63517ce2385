pub mod config;
pub mod date;
pub mod error;
pub mod executor;
pub mod filter;
pub mod media;
pub mod planner;
pub mod scan;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{FilterConfig, MetadataBackend, MetadataConfig};
use crate::date::exif::ExifReader;
use crate::date::exiftool::ExifTool;
use crate::date::{DateResolver, MetadataSource, NoMetadata, Provenance};
use crate::error::{FileError, OrganizeError};
use crate::executor::{ActionExecutor, ActionKind, FileOutcome, PlannedAction};
use crate::filter::ExtensionFilter;
use crate::media::MediaFile;
use crate::planner::DestinationPlanner;

pub use config::FileConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Plan and log only. This is the default; real transfers must be asked for.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    #[serde(default)]
    pub mode: TransferMode,
    /// Copy originals here before moving them (move mode only)
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

fn default_dry_run() -> bool {
    true
}

impl OrganizeOptions {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            dry_run: true,
            mode: TransferMode::Copy,
            backup_dir: None,
            filter: FilterConfig::default(),
            metadata: MetadataConfig::default(),
        }
    }

    fn action_kind(&self) -> ActionKind {
        match (self.dry_run, self.mode) {
            (true, _) => ActionKind::DryRun,
            (false, TransferMode::Copy) => ActionKind::Copy,
            (false, TransferMode::Move) => ActionKind::Move,
        }
    }

    /// Backups only make sense when originals leave the source tree.
    fn effective_backup_dir(&self) -> Option<&Path> {
        match self.mode {
            TransferMode::Move => self.backup_dir.as_deref(),
            TransferMode::Copy => None,
        }
    }
}

/// A file that could not be organized, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// What happened to one eligible file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub backup: Option<PathBuf>,
    pub date: NaiveDate,
    pub provenance: Provenance,
    pub action: ActionKind,
    /// `None` when the action failed; the reason is in [`RunSummary::failures`]
    pub outcome: Option<FileOutcome>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub dry_run: bool,
    /// Regular files found under the source
    pub scanned: u64,
    /// Files rejected by the extension filter
    pub skipped: u64,
    /// Eligible files that got a destination
    pub planned: u64,
    /// Files actually copied or moved (always 0 for dry runs)
    pub succeeded: u64,
    pub failed: u64,
    pub failures: Vec<FileFailure>,
    pub actions: Vec<ActionRecord>,
}

impl RunSummary {
    fn record_failure(&mut self, path: &Path, reason: impl ToString) {
        self.failed += 1;
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }
}

/// Check options and resolve the source to an absolute path. Nothing is
/// created or modified here.
fn validate(options: &OrganizeOptions) -> Result<PathBuf, OrganizeError> {
    if options.output.as_os_str().is_empty() {
        return Err(OrganizeError::Config("output directory must not be empty".into()));
    }
    if !options.source.exists() {
        return Err(OrganizeError::SourceMissing(options.source.clone()));
    }
    if !options.source.is_dir() {
        return Err(OrganizeError::SourceNotDir(options.source.clone()));
    }
    if options.output.exists() && !options.output.is_dir() {
        return Err(OrganizeError::Config(format!(
            "output is not a directory: {}",
            options.output.display()
        )));
    }

    if let Some(backup) = &options.backup_dir {
        if options.mode == TransferMode::Copy {
            warn!(backup = %backup.display(), "--backup-dir only applies to move mode; ignored");
        } else if absolutize(backup)? == absolutize(&options.output)? {
            return Err(OrganizeError::Config(
                "backup directory must differ from the output directory".into(),
            ));
        }
    }

    Ok(fs::canonicalize(&options.source)?)
}

fn absolutize(path: &Path) -> Result<PathBuf, OrganizeError> {
    if let Ok(p) = fs::canonicalize(path) {
        return Ok(p);
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Build the metadata collaborator selected in `config`.
pub fn metadata_source(config: &MetadataConfig) -> Box<dyn MetadataSource> {
    match config.backend {
        MetadataBackend::ExifTool => {
            let tool = ExifTool::new(config);
            if tool.is_available() {
                Box::new(tool)
            } else {
                warn!(command = %config.command, "metadata tool not available; dates will come from modification times");
                Box::new(NoMetadata)
            }
        }
        MetadataBackend::Exif => Box::new(ExifReader),
        MetadataBackend::None => Box::new(NoMetadata),
    }
}

/// Run the full pipeline with the metadata source named in the options.
pub fn organize(options: &OrganizeOptions) -> Result<RunSummary, OrganizeError> {
    let source_root = validate(options)?;
    let source = metadata_source(&options.metadata);
    run(options, source_root, source.as_ref())
}

/// Run the full pipeline: walk, filter, resolve dates, plan, execute.
///
/// Only configuration problems return `Err`; per-file problems end up in
/// [`RunSummary::failures`].
pub fn organize_with_source(
    options: &OrganizeOptions,
    metadata: &dyn MetadataSource,
) -> Result<RunSummary, OrganizeError> {
    let source_root = validate(options)?;
    run(options, source_root, metadata)
}

fn run(
    options: &OrganizeOptions,
    source_root: PathBuf,
    metadata: &dyn MetadataSource,
) -> Result<RunSummary, OrganizeError> {
    let backup_dir = options.effective_backup_dir();

    // Keep the output and backup trees out of the scan when they live inside
    // the source.
    let mut excluded = vec![absolutize(&options.output)?];
    if let Some(b) = backup_dir {
        excluded.push(absolutize(b)?);
    }

    let filter = ExtensionFilter::new(&options.filter);
    let resolver = DateResolver::new(metadata);
    let executor = ActionExecutor::new();
    let mut planner = DestinationPlanner::new(&options.output);
    let mut backup_planner = backup_dir.map(|b| DestinationPlanner::new(b));
    let kind = options.action_kind();

    let scan = scan::collect_files(&source_root, &excluded);
    let mut summary = RunSummary {
        dry_run: options.dry_run,
        scanned: scan.files.len() as u64,
        ..RunSummary::default()
    };
    for (path, reason) in &scan.errors {
        summary.record_failure(path, reason);
    }

    info!(
        source = %source_root.display(),
        output = %options.output.display(),
        files = summary.scanned,
        dry_run = options.dry_run,
        mode = ?options.mode,
        "scan started"
    );

    for path in &scan.files {
        if let Err(reason) = filter.check(path) {
            debug!(path = %path.display(), %reason, "skipped");
            summary.skipped += 1;
            continue;
        }

        let media = match MediaFile::discover(path) {
            Ok(m) => m,
            Err(e) => {
                error!(source = %path.display(), error = %e, "file failed");
                summary.record_failure(path, e);
                continue;
            }
        };

        let resolved = resolver.resolve(&media);
        let action = PlannedAction {
            source: media.path.clone(),
            destination: planner.plan(resolved.date, &media.filename),
            kind,
            backup: backup_planner
                .as_mut()
                .map(|p| p.plan(resolved.date, &media.filename)),
        };
        summary.planned += 1;

        let result = executor.execute(&action);
        log_action(&action, resolved.date, resolved.provenance, &result);

        let outcome = match result {
            Ok(outcome) => {
                if outcome == FileOutcome::Succeeded {
                    summary.succeeded += 1;
                }
                Some(outcome)
            }
            Err(e) => {
                summary.record_failure(&media.path, e);
                None
            }
        };

        summary.actions.push(ActionRecord {
            source: action.source,
            destination: action.destination,
            backup: action.backup,
            date: resolved.date,
            provenance: resolved.provenance,
            action: kind,
            outcome,
        });
    }

    info!(
        scanned = summary.scanned,
        skipped = summary.skipped,
        planned = summary.planned,
        succeeded = summary.succeeded,
        failed = summary.failed,
        dry_run = summary.dry_run,
        "scan finished"
    );

    Ok(summary)
}

/// The per-file audit line.
fn log_action(
    action: &PlannedAction,
    date: NaiveDate,
    provenance: Provenance,
    result: &Result<FileOutcome, FileError>,
) {
    let backup = action
        .backup
        .as_ref()
        .map(|b| b.display().to_string())
        .unwrap_or_default();
    match result {
        Ok(outcome) => info!(
            source = %action.source.display(),
            date = %date,
            provenance = %provenance,
            action = %action.kind,
            destination = %action.destination.display(),
            backup = %backup,
            outcome = %outcome,
            "file processed"
        ),
        Err(e) => error!(
            source = %action.source.display(),
            date = %date,
            provenance = %provenance,
            action = %action.kind,
            destination = %action.destination.display(),
            backup = %backup,
            outcome = "failed",
            error = %e,
            "file failed"
        ),
    }
}

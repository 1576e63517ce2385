use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::FileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    DryRun,
    Copy,
    Move,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::DryRun => f.write_str("dry-run"),
            ActionKind::Copy => f.write_str("copy"),
            ActionKind::Move => f.write_str("move"),
        }
    }
}

/// One file's planned transfer. Produced by the orchestrator from the
/// planner's output and consumed right away by [`ActionExecutor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: ActionKind,
    /// Only set for moves with a backup root
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileOutcome {
    /// Dry run: planned and logged, nothing touched
    LoggedOnly,
    Succeeded,
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::LoggedOnly => f.write_str("logged-only"),
            FileOutcome::Succeeded => f.write_str("succeeded"),
        }
    }
}

/// Carries out planned actions. Never overwrites an existing file.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor;

impl ActionExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, action: &PlannedAction) -> Result<FileOutcome, FileError> {
        match action.kind {
            ActionKind::DryRun => Ok(FileOutcome::LoggedOnly),
            ActionKind::Copy => {
                copy_preserving(&action.source, &action.destination)?;
                Ok(FileOutcome::Succeeded)
            }
            ActionKind::Move => {
                if let Some(backup) = &action.backup {
                    self.backup(&action.source, backup)?;
                }
                move_file(&action.source, &action.destination)?;
                Ok(FileOutcome::Succeeded)
            }
        }
    }

    fn backup(&self, source: &Path, backup: &Path) -> Result<(), FileError> {
        let fail = |reason: String| FileError::Backup {
            path: backup.to_path_buf(),
            reason,
        };

        copy_preserving(source, backup).map_err(|e| fail(e.to_string()))?;

        // never move away the only copy unless the backup matches it
        let src_hash = sha256_file(source).map_err(|e| fail(format!("hash source: {}", e)))?;
        let bak_hash = sha256_file(backup).map_err(|e| fail(format!("hash backup: {}", e)))?;
        if src_hash != bak_hash {
            return Err(fail(format!(
                "checksum mismatch (source {}, backup {})",
                src_hash, bak_hash
            )));
        }

        debug!(source = %source.display(), backup = %backup.display(), "backup written");
        Ok(())
    }
}

fn create_parent(path: &Path) -> Result<(), FileError> {
    match path.parent() {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| FileError::io("create directory", parent, e))
        }
        None => Ok(()),
    }
}

/// Copy content into a new file at `dst`, then carry over permissions and
/// modification time. A partial `dst` is removed on failure.
pub fn copy_preserving(src: &Path, dst: &Path) -> Result<u64, FileError> {
    create_parent(dst)?;

    let mut reader = File::open(src).map_err(|e| FileError::io("open", src, e))?;
    let meta = reader
        .metadata()
        .map_err(|e| FileError::io("stat", src, e))?;

    let out = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                FileError::DestinationExists(dst.to_path_buf())
            } else {
                FileError::io("create", dst, e)
            }
        })?;

    let mut writer = BufWriter::new(out);
    let copied = io::copy(&mut reader, &mut writer)
        .and_then(|n| {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            Ok(n)
        });
    let bytes = match copied {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(dst);
            return Err(FileError::io("copy", dst, e));
        }
    };

    if let Err(e) = fs::set_permissions(dst, meta.permissions()) {
        warn!(path = %dst.display(), error = %e, "could not copy permissions");
    }
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    if let Err(e) = filetime::set_file_mtime(dst, mtime) {
        warn!(path = %dst.display(), error = %e, "could not preserve modification time");
    }

    Ok(bytes)
}

/// Rename when possible. Only a cross-filesystem rename falls back to copy
/// and delete; every other rename error is returned as is.
pub fn move_file(src: &Path, dst: &Path) -> Result<(), FileError> {
    create_parent(dst)?;
    // rename() silently replaces on unix
    if fs::symlink_metadata(dst).is_ok() {
        return Err(FileError::DestinationExists(dst.to_path_buf()));
    }

    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(source = %src.display(), error = %e, "rename crosses filesystems, copying instead");
            copy_then_remove(src, dst, |p| fs::remove_file(p))
        }
        Err(e) => Err(FileError::io("rename", src, e)),
    }
}

/// The copy is undone when the source cannot be removed, so a failed move
/// never leaves a second copy in the output tree.
fn copy_then_remove<F>(src: &Path, dst: &Path, remove_source: F) -> Result<(), FileError>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    copy_preserving(src, dst)?;
    if let Err(e) = remove_source(src) {
        if let Err(cleanup) = fs::remove_file(dst) {
            warn!(path = %dst.display(), error = %cleanup, "could not remove copy after failed move");
        }
        return Err(FileError::io("remove source", src, e));
    }
    Ok(())
}

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a run before any file is touched.
#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("source directory does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("source is not a directory: {}", .0.display())]
    SourceNotDir(PathBuf),

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: ConfigFileError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error(transparent)]
    Read(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

/// Errors scoped to a single file. They are recorded in the run summary and
/// never abort the run.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup to {} failed: {reason}", .path.display())]
    Backup { path: PathBuf, reason: String },

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
}

impl FileError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        FileError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

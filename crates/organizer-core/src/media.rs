use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::FileError;

#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Absolute path of the file in the source tree
    pub path: PathBuf,
    /// Just the filename
    pub filename: String,
    /// Lower-case extension without the dot (empty if none)
    pub extension: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time, captured at discovery
    pub modified: SystemTime,
}

impl MediaFile {
    /// Stat `path` and capture what the rest of the pipeline needs.
    pub fn discover(path: &Path) -> Result<Self, FileError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| FileError::io("resolve", path, e))?
                .join(path)
        };

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FileError::NoFileName(path.clone()))?
            .to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let meta = fs::metadata(&path).map_err(|e| FileError::io("stat", &path, e))?;
        let modified = meta
            .modified()
            .map_err(|e| FileError::io("read mtime", &path, e))?;

        Ok(Self {
            path,
            filename,
            extension,
            size: meta.len(),
            modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_reads_size_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Clip.MP4");
        fs::write(&path, b"12345").unwrap();

        let media = MediaFile::discover(&path).unwrap();
        assert_eq!(media.filename, "Clip.MP4");
        assert_eq!(media.extension, "mp4");
        assert_eq!(media.size, 5);
        assert!(media.path.is_absolute());
    }

    #[test]
    fn test_discover_missing_file_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MediaFile::discover(&dir.path().join("gone.jpg")).unwrap_err();
        assert!(matches!(err, FileError::Io { op: "stat", .. }));
    }
}

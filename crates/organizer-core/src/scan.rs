use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Result of walking the source tree
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Regular files, in sorted walk order
    pub files: Vec<PathBuf>,
    /// Entries that could not be read: (path if known, reason)
    pub errors: Vec<(PathBuf, String)>,
}

/// Collect every regular file under `root`.
///
/// Symlinks are neither followed nor returned. Directories listed in
/// `excluded` (the output or backup tree when nested inside the source) are
/// pruned; the root itself is never pruned.
pub fn collect_files(root: &Path, excluded: &[PathBuf]) -> ScanResult {
    let mut result = ScanResult::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() > 0
                && e.file_type().is_dir()
                && excluded.iter().any(|x| e.path() == x.as_path()))
        });

    for entry in walker {
        match entry {
            Ok(e) if e.file_type().is_file() => result.files.push(e.into_path()),
            Ok(_) => {}
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                warn!(path = %path.display(), error = %err, "cannot read entry");
                result.errors.push((path, err.to_string()));
            }
        }
    }

    result
}

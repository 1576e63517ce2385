use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

/// Assigns `root/YYYY/MM/DD/<name>` destinations and keeps them unique for
/// the lifetime of one run.
///
/// A name counts as taken if something exists on disk at that path or if an
/// earlier call already handed it out. The second part matters for dry runs
/// and for batches where earlier transfers have not happened yet.
#[derive(Debug)]
pub struct DestinationPlanner {
    root: PathBuf,
    claimed: HashSet<PathBuf>,
    /// Last suffix tried per base path, so repeated names don't rescan from _001
    counters: HashMap<PathBuf, u32>,
}

impl DestinationPlanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            claimed: HashSet::new(),
            counters: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of destinations handed out so far.
    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }

    pub fn directory_for(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()))
    }

    /// Claim a destination for `filename` on `date`, checking the real
    /// filesystem for existing entries.
    pub fn plan(&mut self, date: NaiveDate, filename: &str) -> PathBuf {
        self.plan_with(date, filename, |p| fs::symlink_metadata(p).is_ok())
    }

    /// Like [`plan`](Self::plan) with a caller-supplied existence check.
    pub fn plan_with<F>(&mut self, date: NaiveDate, filename: &str, exists: F) -> PathBuf
    where
        F: Fn(&Path) -> bool,
    {
        let dir = self.directory_for(date);
        let base = dir.join(filename);
        let counter = self.counters.entry(base.clone()).or_insert(0);

        let dest = if *counter == 0 && !self.claimed.contains(&base) && !exists(&base) {
            base
        } else {
            loop {
                *counter += 1;
                let candidate = dir.join(sequenced_name(filename, *counter));
                if !self.claimed.contains(&candidate) && !exists(&candidate) {
                    break candidate;
                }
            }
        };

        self.claimed.insert(dest.clone());
        dest
    }
}

/// `clip.mp4` + 1 -> `clip_001.mp4`; names without an extension get the
/// suffix at the end.
pub fn sequenced_name(filename: &str, seq: u32) -> String {
    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{}_{:03}.{}", stem, seq, ext),
        None => format!("{}_{:03}", stem, seq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_directory_layout_is_zero_padded() {
        let planner = DestinationPlanner::new("/out");
        assert_eq!(
            planner.directory_for(day(2026, 1, 3)),
            PathBuf::from("/out/2026/01/03")
        );
        assert_eq!(
            planner.directory_for(day(987, 12, 31)),
            PathBuf::from("/out/0987/12/31")
        );
    }

    #[test]
    fn test_sequenced_name() {
        assert_eq!(sequenced_name("clip.mp4", 1), "clip_001.mp4");
        assert_eq!(sequenced_name("clip.mp4", 42), "clip_042.mp4");
        assert_eq!(sequenced_name("clip.mp4", 1234), "clip_1234.mp4");
        assert_eq!(sequenced_name("archive.tar.gz", 2), "archive.tar_002.gz");
        assert_eq!(sequenced_name("README", 3), "README_003");
    }

    #[test]
    fn test_same_name_same_day_in_first_seen_order() {
        let mut planner = DestinationPlanner::new("/out");
        let date = day(2026, 1, 30);
        let paths: Vec<PathBuf> = (0..3)
            .map(|_| planner.plan_with(date, "clip.mp4", |_| false))
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/out/2026/01/30/clip.mp4"),
                PathBuf::from("/out/2026/01/30/clip_001.mp4"),
                PathBuf::from("/out/2026/01/30/clip_002.mp4"),
            ]
        );
        assert_eq!(planner.claimed_count(), 3);
    }

    #[test]
    fn test_sequences_are_scoped_per_directory_and_name() {
        let mut planner = DestinationPlanner::new("/out");
        let a = planner.plan_with(day(2026, 1, 30), "clip.mp4", |_| false);
        let b = planner.plan_with(day(2026, 1, 31), "clip.mp4", |_| false);
        let c = planner.plan_with(day(2026, 1, 30), "other.mp4", |_| false);
        let d = planner.plan_with(day(2026, 1, 30), "clip.mp4", |_| false);
        assert_eq!(a, PathBuf::from("/out/2026/01/30/clip.mp4"));
        assert_eq!(b, PathBuf::from("/out/2026/01/31/clip.mp4"));
        assert_eq!(c, PathBuf::from("/out/2026/01/30/other.mp4"));
        assert_eq!(d, PathBuf::from("/out/2026/01/30/clip_001.mp4"));
    }

    #[test]
    fn test_existing_entries_are_skipped() {
        let taken: HashSet<PathBuf> = [
            PathBuf::from("/out/2026/01/30/clip.mp4"),
            PathBuf::from("/out/2026/01/30/clip_001.mp4"),
            PathBuf::from("/out/2026/01/30/clip_003.mp4"),
        ]
        .into_iter()
        .collect();
        let exists = |p: &Path| taken.contains(p);

        let mut planner = DestinationPlanner::new("/out");
        let date = day(2026, 1, 30);
        assert_eq!(
            planner.plan_with(date, "clip.mp4", exists),
            PathBuf::from("/out/2026/01/30/clip_002.mp4")
        );
        assert_eq!(
            planner.plan_with(date, "clip.mp4", exists),
            PathBuf::from("/out/2026/01/30/clip_004.mp4")
        );
    }

    #[test]
    fn test_plan_checks_real_filesystem_without_creating_anything() {
        let dir = tempfile::tempdir().unwrap();
        let day_dir = dir.path().join("2026").join("01").join("30");
        fs::create_dir_all(&day_dir).unwrap();
        fs::write(day_dir.join("clip.mp4"), b"old").unwrap();

        let mut planner = DestinationPlanner::new(dir.path());
        let dest = planner.plan(day(2026, 1, 30), "clip.mp4");
        assert_eq!(dest, day_dir.join("clip_001.mp4"));
        assert!(!dest.exists());

        let other_day = planner.plan(day(2026, 2, 1), "clip.mp4");
        assert!(!other_day.parent().unwrap().exists());
    }
}

pub mod exif;
pub mod exiftool;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::media::MediaFile;

/// Original capture time
pub const FIELD_DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";
/// File/container creation date
pub const FIELD_CREATE_DATE: &str = "CreateDate";
/// Media track creation date (QuickTime/MP4)
pub const FIELD_MEDIA_CREATE_DATE: &str = "MediaCreateDate";

/// Candidate fields in priority order.
pub const DATE_FIELDS: [&str; 3] = [
    FIELD_DATE_TIME_ORIGINAL,
    FIELD_CREATE_DATE,
    FIELD_MEDIA_CREATE_DATE,
];

/// Raw field values reported by a metadata source, keyed by field name.
pub type MetadataFields = HashMap<String, String>;

/// Something that can report raw metadata fields for a file.
///
/// `None` means the source could not be consulted at all (tool missing,
/// crashed, timed out, garbage output). Implementations must not panic.
pub trait MetadataSource {
    fn fetch_fields(&self, path: &Path, fields: &[&str]) -> Option<MetadataFields>;
}

/// Source that never knows anything; every date comes from mtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataSource for NoMetadata {
    fn fetch_fields(&self, _path: &Path, _fields: &[&str]) -> Option<MetadataFields> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Metadata,
    Mtime,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Metadata => f.write_str("metadata"),
            Provenance::Mtime => f.write_str("mtime"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub provenance: Provenance,
}

/// Resolves the effective date of a media file.
pub struct DateResolver<'a> {
    source: &'a dyn MetadataSource,
}

impl<'a> DateResolver<'a> {
    pub fn new(source: &'a dyn MetadataSource) -> Self {
        Self { source }
    }

    /// Metadata date if any candidate field parses, otherwise the mtime
    /// captured when the file was discovered. Never fails.
    pub fn resolve(&self, media: &MediaFile) -> ResolvedDate {
        if let Some(fields) = self.source.fetch_fields(&media.path, &DATE_FIELDS) {
            for key in DATE_FIELDS {
                if let Some(dt) = fields.get(key).and_then(|v| parse_metadata_datetime(v)) {
                    debug!(path = %media.path.display(), field = key, "date from metadata");
                    return ResolvedDate {
                        date: dt.date(),
                        provenance: Provenance::Metadata,
                    };
                }
            }
        }

        let local: DateTime<Local> = media.modified.into();
        ResolvedDate {
            date: local.date_naive(),
            provenance: Provenance::Mtime,
        }
    }
}

const NAIVE_FORMATS: &[&str] = &["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const ZONED_FORMATS: &[&str] = &["%Y:%m:%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Parse the datetime spellings metadata tools emit. Zoned values keep their
/// wall-clock time in their own offset. Placeholder values such as
/// `0000:00:00 00:00:00` do not parse.
pub fn parse_metadata_datetime(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = raw.trim().replace('Z', "+0000");

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt);
        }
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt.naive_local());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    struct StubSource(Option<MetadataFields>);

    impl MetadataSource for StubSource {
        fn fetch_fields(&self, _path: &Path, _fields: &[&str]) -> Option<MetadataFields> {
            self.0.clone()
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> Option<MetadataFields> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn media_with_mtime(mtime: SystemTime) -> MediaFile {
        MediaFile {
            path: PathBuf::from("/in/clip.mp4"),
            filename: "clip.mp4".into(),
            extension: "mp4".into(),
            size: 1,
            modified: mtime,
        }
    }

    fn local_noon(y: i32, m: u32, d: u32) -> SystemTime {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let local = naive.and_local_timezone(Local).single().unwrap();
        SystemTime::UNIX_EPOCH + Duration::from_secs(local.timestamp() as u64)
    }

    #[test]
    fn test_parse_formats() {
        let expect = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        assert_eq!(parse_metadata_datetime("2024:03:09 08:15:00"), Some(expect));
        assert_eq!(parse_metadata_datetime("2024-03-09 08:15:00"), Some(expect));
        assert_eq!(parse_metadata_datetime("2024-03-09T08:15:00"), Some(expect));
        assert_eq!(parse_metadata_datetime("2024:03:09 08:15:00+09:00"), Some(expect));
        assert_eq!(parse_metadata_datetime("2024-03-09T08:15:00Z"), Some(expect));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_metadata_datetime("0000:00:00 00:00:00"), None);
        assert_eq!(parse_metadata_datetime(""), None);
        assert_eq!(parse_metadata_datetime("yesterday"), None);
        assert_eq!(parse_metadata_datetime("2024:13:01 00:00:00"), None);
    }

    #[test]
    fn test_metadata_wins_over_mtime() {
        let source = StubSource(fields(&[(FIELD_DATE_TIME_ORIGINAL, "2019:07:04 10:00:00")]));
        let resolved = DateResolver::new(&source).resolve(&media_with_mtime(local_noon(2026, 1, 30)));
        assert_eq!(resolved.provenance, Provenance::Metadata);
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2019, 7, 4).unwrap());
    }

    #[test]
    fn test_field_priority_and_unparseable_skip() {
        let source = StubSource(fields(&[
            (FIELD_DATE_TIME_ORIGINAL, "0000:00:00 00:00:00"),
            (FIELD_CREATE_DATE, "2021:05:06 07:08:09"),
            (FIELD_MEDIA_CREATE_DATE, "2020:01:01 00:00:00"),
        ]));
        let resolved = DateResolver::new(&source).resolve(&media_with_mtime(local_noon(2026, 1, 30)));
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2021, 5, 6).unwrap());

        let source = StubSource(fields(&[(FIELD_MEDIA_CREATE_DATE, "2020:01:01 00:00:00")]));
        let resolved = DateResolver::new(&source).resolve(&media_with_mtime(local_noon(2026, 1, 30)));
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn test_falls_back_to_mtime() {
        let media = media_with_mtime(local_noon(2026, 1, 30));
        let expected = NaiveDate::from_ymd_opt(2026, 1, 30).unwrap();

        for source in [
            StubSource(None),
            StubSource(fields(&[])),
            StubSource(fields(&[(FIELD_CREATE_DATE, "not a date")])),
        ] {
            let resolved = DateResolver::new(&source).resolve(&media);
            assert_eq!(resolved.provenance, Provenance::Mtime);
            assert_eq!(resolved.date, expected);
        }

        let resolved = DateResolver::new(&NoMetadata).resolve(&media);
        assert_eq!(resolved.provenance, Provenance::Mtime);
    }
}

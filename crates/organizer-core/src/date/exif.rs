use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{In, Reader, Tag, Value};

use super::{MetadataFields, MetadataSource, FIELD_CREATE_DATE, FIELD_DATE_TIME_ORIGINAL};

/// Reads EXIF straight out of image containers (JPEG, PNG, HEIF, TIFF)
/// without an external tool. Videos and audio yield `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifReader;

/// EXIF tag that backs each field name. EXIF has no media-track date.
const TAG_FIELDS: &[(&str, Tag)] = &[
    (FIELD_DATE_TIME_ORIGINAL, Tag::DateTimeOriginal),
    (FIELD_CREATE_DATE, Tag::DateTimeDigitized),
];

impl MetadataSource for ExifReader {
    fn fetch_fields(&self, path: &Path, fields: &[&str]) -> Option<MetadataFields> {
        let file = File::open(path).ok()?;
        let exif = Reader::new()
            .read_from_container(&mut BufReader::new(file))
            .ok()?;

        let mut out = MetadataFields::new();
        for (name, tag) in TAG_FIELDS {
            if !fields.contains(name) {
                continue;
            }
            let Some(field) = exif.get_field(*tag, In::PRIMARY) else {
                continue;
            };
            // EXIF datetimes are "YYYY:MM:DD HH:MM:SS" with no timezone
            if let Value::Ascii(ref parts) = field.value {
                if let Some(s) = parts.first().and_then(|b| std::str::from_utf8(b).ok()) {
                    out.insert(name.to_string(), s.trim_end_matches('\0').to_string());
                }
            }
        }
        Some(out)
    }
}

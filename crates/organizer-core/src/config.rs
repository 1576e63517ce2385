use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigFileError, OrganizeError};

const DEFAULT_ALLOWED: &[&str] = &["mp4", "mov", "png", "jpg", "wav"];
const DEFAULT_DENIED: &[&str] = &["tmp", "part", "crdownload"];
const DEFAULT_PREFIXES: &[&str] = &["thumb", "thumbnail", "~$", "."];

fn default_command() -> String {
    "exiftool".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Which files are eligible for organizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Extensions to accept, without the leading dot
    pub allowed_extensions: Vec<String>,
    /// Temporary / partial-download extensions, always rejected
    pub denied_extensions: Vec<String>,
    /// Filename prefixes that are always rejected
    pub excluded_prefixes: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED.iter().map(|s| s.to_string()).collect(),
            denied_extensions: DEFAULT_DENIED.iter().map(|s| s.to_string()).collect(),
            excluded_prefixes: DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FilterConfig {
    /// Lower-case everything and strip leading dots from extensions so that
    /// `.MP4` in a config file means the same as `mp4`.
    pub fn normalized(mut self) -> Self {
        let norm_ext = |v: &mut Vec<String>| {
            for e in v.iter_mut() {
                *e = e.trim_start_matches('.').to_lowercase();
            }
            v.retain(|e| !e.is_empty());
        };
        norm_ext(&mut self.allowed_extensions);
        norm_ext(&mut self.denied_extensions);
        for p in self.excluded_prefixes.iter_mut() {
            *p = p.to_lowercase();
        }
        self.excluded_prefixes.retain(|p| !p.is_empty());
        self
    }
}

/// Where capture dates are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    /// External `exiftool` process per file
    #[default]
    ExifTool,
    /// Built-in EXIF reader (images only)
    Exif,
    /// Always use the modification time
    None,
}

/// Settings for the metadata collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    /// Program to run for [`MetadataBackend::ExifTool`]
    pub command: String,
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::default(),
            command: default_command(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Contents of an optional `--config` TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub filter: FilterConfig,
    pub metadata: MetadataConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, OrganizeError> {
        let wrap = |source: ConfigFileError| OrganizeError::ConfigFile {
            path: path.to_path_buf(),
            source,
        };
        let text = fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
        Self::parse(&text).map_err(|e| wrap(e.into()))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: FileConfig = toml::from_str(text)?;
        config.filter = config.filter.normalized();
        Ok(config)
    }
}

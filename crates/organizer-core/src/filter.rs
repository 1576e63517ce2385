use std::collections::HashSet;
use std::path::Path;

use crate::config::FilterConfig;

/// Why a file was left out of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ExcludedExtension,
    UnsupportedExtension,
    ExcludedPrefix,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::ExcludedExtension => "excluded extension",
            SkipReason::UnsupportedExtension => "unsupported extension",
            SkipReason::ExcludedPrefix => "excluded prefix",
        };
        f.write_str(s)
    }
}

/// Decides which paths are media files worth organizing.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    allowed: HashSet<String>,
    denied: HashSet<String>,
    prefixes: Vec<String>,
}

impl ExtensionFilter {
    pub fn new(config: &FilterConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            allowed: config.allowed_extensions.into_iter().collect(),
            denied: config.denied_extensions.into_iter().collect(),
            prefixes: config.excluded_prefixes,
        }
    }

    pub fn is_eligible(&self, path: &Path) -> bool {
        self.check(path).is_ok()
    }

    /// Same decision as [`is_eligible`](Self::is_eligible), with the reason
    /// for rejection. Denied extensions win over allowed ones.
    pub fn check(&self, path: &Path) -> Result<(), SkipReason> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        if let Some(ext) = &ext {
            if self.denied.contains(ext) {
                return Err(SkipReason::ExcludedExtension);
            }
        }

        match &ext {
            Some(ext) if self.allowed.contains(ext) => {}
            _ => return Err(SkipReason::UnsupportedExtension),
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase())
            .unwrap_or_default();
        if self.prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            return Err(SkipReason::ExcludedPrefix);
        }

        Ok(())
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use super::{MetadataFields, MetadataSource};
use crate::config::MetadataConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `exiftool -j -n -<Field>... <file>` once per file and reads the JSON
/// it prints.
#[derive(Debug, Clone)]
pub struct ExifTool {
    command: PathBuf,
    timeout: Duration,
}

impl ExifTool {
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            command: PathBuf::from(&config.command),
            timeout: config.timeout(),
        }
    }

    /// Whether the tool can be started at all, bounded by the same timeout
    /// as per-file calls. Used only to warn once up front; per-file calls
    /// degrade on their own.
    pub fn is_available(&self) -> bool {
        let child = Command::new(&self.command)
            .arg("-ver")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match child {
            Ok(mut child) => self
                .wait_with_deadline(&mut child, &self.command)
                .is_some_and(|s| s.success()),
            Err(_) => false,
        }
    }

    fn run(&self, path: &Path, fields: &[&str]) -> Option<Vec<u8>> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-j").arg("-n");
        for f in fields {
            cmd.arg(format!("-{}", f));
        }
        cmd.arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                debug!(command = %self.command.display(), error = %e, "metadata tool not started");
                return None;
            }
        };

        // Output for three fields is tiny, so it fits in the pipe buffer
        // while we wait for exit.
        let status = self.wait_with_deadline(&mut child, path)?;

        if !status.success() {
            debug!(path = %path.display(), ?status, "metadata tool exited with failure");
            return None;
        }

        let mut out = Vec::new();
        child.stdout.take()?.read_to_end(&mut out).ok()?;
        Some(out)
    }

    /// Poll until the child exits. On timeout or a wait error the child is
    /// killed and reaped.
    fn wait_with_deadline(&self, child: &mut Child, path: &Path) -> Option<ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!(path = %path.display(), timeout = ?self.timeout, "metadata tool timed out");
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "waiting for metadata tool failed");
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
            }
        }
    }
}

impl MetadataSource for ExifTool {
    fn fetch_fields(&self, path: &Path, fields: &[&str]) -> Option<MetadataFields> {
        let stdout = self.run(path, fields)?;
        parse_exiftool_json(&stdout, fields)
    }
}

/// exiftool `-j` prints an array with one object per input file. Only string
/// values are kept; `-n` leaves dates as strings.
pub fn parse_exiftool_json(bytes: &[u8], fields: &[&str]) -> Option<MetadataFields> {
    let payload: Value = serde_json::from_slice(bytes).ok()?;
    let item = payload.as_array()?.first()?.as_object()?;

    Some(
        fields
            .iter()
            .filter_map(|key| {
                let value = item.get(*key)?.as_str()?;
                Some((key.to_string(), value.to_string()))
            })
            .collect(),
    )
}

//! Writer configuration

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{GlfError, Result};

/// Default size limit per output file
pub const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;

pub const DEFAULT_FILE_PREFIX: &str = "log";

pub const DEFAULT_STATS_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriterConfig {
    /// Directory receiving the log files, created if missing
    pub directory: PathBuf,
    /// Rotate before a file would grow past this many bytes
    pub max_file_size_bytes: u64,
    /// File names are `<prefix>_<YYYYmmdd_HHMMSS>.glf`
    pub file_prefix: String,
    /// Minimum time between statistics notifications, 0 for every append
    pub stats_interval_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            stats_interval_ms: DEFAULT_STATS_INTERVAL_MS,
        }
    }
}

impl WriterConfig {
    pub fn new(directory: impl Into<PathBuf>, max_file_size_bytes: u64) -> Self {
        Self {
            directory: directory.into(),
            max_file_size_bytes,
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config: WriterConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| GlfError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded writer config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_file_size_bytes == 0 {
            return Err(GlfError::InvalidParam(
                "maximum file size must be greater than zero".to_string(),
            ));
        }
        if self.directory.as_os_str().is_empty() {
            return Err(GlfError::InvalidParam("directory is empty".to_string()));
        }
        if self.file_prefix.is_empty() || self.file_prefix.contains(|c: char| c == '/' || c == '\\') {
            return Err(GlfError::InvalidParam(format!(
                "invalid file prefix '{}'",
                self.file_prefix
            )));
        }
        Ok(())
    }
}

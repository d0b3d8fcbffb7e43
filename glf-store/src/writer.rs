//! Rotating log writer.
//!
//! Records are appended synchronously on the caller's thread. Before a
//! record would push the current file past the configured size, the file is
//! closed and a new uniquely named one is started, so a record is never
//! split across files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam::channel::Receiver;
use glf_core::Record;
use log::{debug, error, info};

use crate::config::WriterConfig;
use crate::disk;
use crate::error::{GlfError, Result};
use crate::notify::{Notification, Notifier, OutputFileInfo, DEFAULT_TIME_LEFT_SECS};

pub const FILE_EXTENSION: &str = "glf";

/// Elapsed time needed before a write rate is trusted
const MIN_RATE_WINDOW: Duration = Duration::from_millis(500);

struct OutputFile {
    path: PathBuf,
    name: String,
    file: File,
    size: u64,
    records: u32,
}

pub struct LogWriter {
    config: WriterConfig,
    notifier: Notifier,
    current: Option<OutputFile>,
    written: Vec<PathBuf>,
    session_start: Instant,
    session_bytes: u64,
    last_published: Option<Instant>,
}

impl LogWriter {
    /// Open a writer with default settings
    pub fn open(directory: impl Into<PathBuf>, max_file_size_bytes: u64) -> Result<Self> {
        Self::with_config(WriterConfig::new(directory, max_file_size_bytes))
    }

    pub fn with_config(config: WriterConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.directory).map_err(GlfError::FailedToWrite)?;

        let mut writer = Self {
            config,
            notifier: Notifier::new(),
            current: None,
            written: Vec::new(),
            session_start: Instant::now(),
            session_bytes: 0,
            last_published: None,
        };
        writer.start_file()?;
        Ok(writer)
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Name of the file currently being written
    pub fn file_name(&self) -> Option<&str> {
        self.current.as_ref().map(|f| f.name.as_str())
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// Every file this writer has created, in order
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Encode and append one record, rotating first if it would not fit
    pub fn append(&mut self, record: &Record) -> Result<()> {
        if self.current.is_none() {
            return Err(GlfError::InvalidHandle);
        }
        let bytes = record.encode()?;

        let needs_rotation = self.current.as_ref().is_some_and(|f| {
            f.size > 0 && f.size + bytes.len() as u64 > self.config.max_file_size_bytes
        });
        if needs_rotation {
            self.rotate()?;
        }

        let result = match self.current.as_mut() {
            Some(output) => output.file.write_all(&bytes),
            None => return Err(GlfError::InvalidHandle),
        };
        if let Err(e) = result {
            self.fail(&e);
            return Err(GlfError::FailedToWrite(e));
        }

        if let Some(output) = self.current.as_mut() {
            output.size += bytes.len() as u64;
            output.records += 1;
        }
        self.session_bytes += bytes.len() as u64;

        if self.stats_due() {
            self.publish_stats();
        }
        Ok(())
    }

    /// Close the current file and start a fresh one
    pub fn restart(&mut self) -> Result<()> {
        self.finish_file()?;
        self.start_file()
    }

    /// Flush and close the current file; later appends fail with `InvalidHandle`
    pub fn close(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Err(GlfError::InvalidHandle);
        }
        self.finish_file()
    }

    /// Statistics for the current file
    pub fn stats(&self) -> OutputFileInfo {
        let mut info = OutputFileInfo::default();
        if let Some(output) = &self.current {
            info.file_name = output.name.clone();
            info.record_count = output.records;
            info.file_size_bytes = output.size;
        }

        if let Some(space) = disk::disk_space(&self.config.directory) {
            info.disk_space_free_bytes = space.free_bytes;
            info.percent_disk_space_free = space.percent_free();
            info.recording_time_left_secs = self.time_left(space.free_bytes);
        }
        info
    }

    fn time_left(&self, free_bytes: u64) -> u64 {
        let elapsed = self.session_start.elapsed();
        if elapsed < MIN_RATE_WINDOW || self.session_bytes == 0 {
            return DEFAULT_TIME_LEFT_SECS;
        }
        let bytes_per_sec = self.session_bytes as f64 / elapsed.as_secs_f64();
        (free_bytes as f64 / bytes_per_sec) as u64
    }

    fn stats_due(&self) -> bool {
        match (self.config.stats_interval_ms, self.last_published) {
            (0, _) | (_, None) => true,
            (interval, Some(at)) => at.elapsed() >= Duration::from_millis(interval),
        }
    }

    fn publish_stats(&mut self) {
        self.last_published = Some(Instant::now());
        self.notifier.emit(Notification::OutputFile(self.stats()));
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(output) = &self.current {
            debug!(
                "Rotating {} at {} bytes ({} records)",
                output.name, output.size, output.records
            );
        }
        self.finish_file()?;
        self.start_file()
    }

    fn start_file(&mut self) -> Result<()> {
        let (path, file) = match create_unique(&self.config.directory, &self.config.file_prefix) {
            Ok(created) => created,
            Err(e) => {
                self.notifier.error(format!(
                    "Failed to create log file in {}: {}",
                    self.config.directory.display(),
                    e
                ));
                return Err(GlfError::FailedToWrite(e));
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Opened log file {}", path.display());

        self.written.push(path.clone());
        self.current = Some(OutputFile {
            path,
            name,
            file,
            size: 0,
            records: 0,
        });
        self.publish_stats();
        Ok(())
    }

    fn finish_file(&mut self) -> Result<()> {
        let Some(output) = self.current.as_ref() else {
            return Ok(());
        };
        let flushed = output.file.sync_all();
        self.publish_stats();

        if let Some(output) = self.current.take() {
            info!(
                "Closed log file {} ({} records, {} bytes)",
                output.path.display(),
                output.records,
                output.size
            );
        }
        flushed.map_err(GlfError::FailedToWrite)
    }

    /// A write failed: give up on the current file
    fn fail(&mut self, e: &io::Error) {
        if let Some(output) = self.current.take() {
            error!("Write to {} failed: {}", output.path.display(), e);
            self.notifier.error(format!(
                "Failed to write {}, file closed: {}",
                output.name, e
            ));
        }
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finish_file() {
            error!("Failed to close log file: {}", e);
        }
    }
}

/// Create `<prefix>_<YYYYmmdd_HHMMSS>.glf` in `dir`, adding `_n` until the
/// name is unused
fn create_unique(dir: &Path, prefix: &str) -> io::Result<(PathBuf, File)> {
    let base_name = format!("{}_{}", prefix, chrono::Utc::now().format("%Y%m%d_%H%M%S"));

    let mut counter = 0;
    loop {
        let name = if counter == 0 {
            format!("{}.{}", base_name, FILE_EXTENSION)
        } else {
            format!("{}_{}.{}", base_name, counter, FILE_EXTENSION)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e),
        }
    }
}

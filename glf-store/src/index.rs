//! Position index over an ordered list of log files.
//!
//! The builder reads only record headers, using each `length` field to skip
//! the body, and appends one [`IndexEntry`] per record. The table is
//! append-only; a separate atomic length publishes entries to readers only
//! after they are fully written, so queries can run while an asynchronous
//! build is still scanning.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::Receiver;
use glf_core::{DataType, RecordHeader, HEADER_SIZE, START_MARKER};
use log::{debug, info};
use serde::Serialize;

use crate::error::{GlfError, Result};
use crate::notify::{InputFileListInfo, Notification, Notifier};

/// Entries published per batch while scanning
const PUBLISH_BATCH: usize = 256;

/// Location and playback timing of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Position in the ordered file list
    pub file_index: u32,
    /// Byte offset of the record header within its file
    pub offset: u64,
    /// Frame number (see [`FrameClock`])
    pub frame: u32,
    /// Milliseconds since the previous frame (see [`FrameClock`])
    pub interval_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Block until every file is scanned
    #[default]
    Synchronous,
    /// Scan on a background thread; queries past the scanned prefix
    /// return `StillBuildingIndex`
    Asynchronous,
}

/// Frame numbering and inter-frame timing.
///
/// Every sonar image starts a new frame, numbered from 1; other records carry
/// the frame of the latest image, 0 before the first. An image's interval is
/// the non-negative time since the previous image in milliseconds, 0 for the
/// first one. Other records play within the current frame and carry 0.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    frame: u32,
    last_frame_timestamp: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance past `header`, returning `(frame, interval_ms)`
    pub fn advance(&mut self, header: &RecordHeader) -> (u32, u32) {
        if header.kind() != Some(DataType::SonarImage) {
            return (self.frame, 0);
        }
        self.frame = self.frame.saturating_add(1);
        let interval = match self.last_frame_timestamp {
            Some(last) => {
                let ms = (header.timestamp - last) * 1000.0;
                if ms.is_finite() && ms > 0.0 {
                    ms.round().min(u32::MAX as f64) as u32
                } else {
                    0
                }
            }
            None => 0,
        };
        self.last_frame_timestamp = Some(header.timestamp);
        (self.frame, interval)
    }
}

/// Result of trying to read one header at a record boundary
pub(crate) enum HeaderRead {
    /// Clean end of file
    Eof,
    /// File ends inside a header
    Partial { len: usize, first: u8 },
    Complete([u8; HEADER_SIZE]),
}

pub(crate) fn read_header_bytes<R: Read>(reader: &mut R) -> io::Result<HeaderRead> {
    let mut buf = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(match filled {
        0 => HeaderRead::Eof,
        HEADER_SIZE => HeaderRead::Complete(buf),
        len => HeaderRead::Partial {
            len,
            first: buf[0],
        },
    })
}

struct IndexShared {
    files: Vec<PathBuf>,
    entries: RwLock<Vec<IndexEntry>>,
    /// Number of entries safe to read
    published: AtomicUsize,
    /// Global index of the first record of each file, once reached
    file_starts: RwLock<Vec<Option<usize>>>,
    progress: Mutex<InputFileListInfo>,
    complete: AtomicBool,
    stop: AtomicBool,
    wake_lock: Mutex<()>,
    wake: Condvar,
    notifier: Notifier,
}

impl IndexShared {
    fn publish(&self, batch: &mut Vec<IndexEntry>) {
        if batch.is_empty() {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.append(batch);
        self.published.store(entries.len(), Ordering::Release);
        drop(entries);
        self.wake_all();
    }

    fn wake_all(&self) {
        let _guard = self.wake_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.wake.notify_all();
    }

    fn set_file_start(&self, file_index: usize, start: usize) {
        let mut starts = self
            .file_starts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        starts[file_index] = Some(start);
    }

    fn entry(&self, index: usize) -> Result<IndexEntry> {
        if index < self.published.load(Ordering::Acquire) {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            return Ok(entries[index]);
        }
        if self.complete.load(Ordering::Acquire) {
            // Entries may have been published between the two loads
            if index < self.published.load(Ordering::Acquire) {
                return self.entry(index);
            }
            return Err(GlfError::DataNotAvailable);
        }
        Err(GlfError::StillBuildingIndex)
    }

    fn report_progress(&self, scanned_bytes: u64, total_bytes: u64, path: &Path) {
        let percent = if total_bytes == 0 {
            100
        } else {
            (scanned_bytes.saturating_mul(100) / total_bytes).min(100) as u32
        };
        let info = {
            let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
            progress.record_count = self.published.load(Ordering::Acquire) as u64;
            progress.percent_processed = percent;
            progress.file_count += 1;
            progress.file_names.push(path.display().to_string());
            progress.clone()
        };
        self.notifier.emit(Notification::InputFileList(info));
    }

    fn run(&self) {
        let started = Instant::now();
        let total_bytes: u64 = self
            .files
            .iter()
            .map(|p| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0))
            .sum();
        let mut scanned_bytes = 0u64;
        let mut clock = FrameClock::new();

        for (file_index, path) in self.files.iter().enumerate() {
            if self.stop.load(Ordering::Acquire) {
                debug!("Index build stopped before {}", path.display());
                self.wake_all();
                return;
            }
            self.set_file_start(file_index, self.published.load(Ordering::Acquire));
            scanned_bytes += self.scan_file(file_index, path, &mut clock);
            self.report_progress(scanned_bytes, total_bytes, path);
        }

        self.complete.store(true, Ordering::Release);
        self.wake_all();
        info!(
            "Indexed {} records in {} files in {:?}",
            self.published.load(Ordering::Acquire),
            self.files.len(),
            started.elapsed()
        );
    }

    /// Index one file; returns its size for progress reporting
    fn scan_file(&self, file_index: usize, path: &Path, clock: &mut FrameClock) -> u64 {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                self.notifier
                    .error(format!("Cannot open {}, skipped: {}", path.display(), e));
                return 0;
            }
        };
        let file_len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let mut reader = BufReader::new(file);
        let mut batch = Vec::with_capacity(PUBLISH_BATCH);
        let mut offset = 0u64;
        let mut records = 0usize;

        loop {
            if batch.len() >= PUBLISH_BATCH {
                self.publish(&mut batch);
                if self.stop.load(Ordering::Acquire) {
                    return file_len;
                }
            }

            let bytes = match read_header_bytes(&mut reader) {
                Ok(HeaderRead::Complete(bytes)) => bytes,
                Ok(HeaderRead::Eof) => break,
                Ok(HeaderRead::Partial { first, .. }) if offset == 0 && first != START_MARKER => {
                    self.notifier.error(format!(
                        "{} is not a GLF log (bad start marker), skipped",
                        path.display()
                    ));
                    break;
                }
                Ok(HeaderRead::Partial { len, .. }) => {
                    self.notifier.warning(format!(
                        "{}: truncated header ({} bytes) at offset {}, ignored",
                        path.display(),
                        len,
                        offset
                    ));
                    break;
                }
                Err(e) => {
                    self.notifier.error(format!(
                        "{}: read failed at offset {}: {}",
                        path.display(),
                        offset,
                        e
                    ));
                    break;
                }
            };

            if offset == 0 && bytes[0] != START_MARKER {
                self.notifier.error(format!(
                    "{} is not a GLF log (bad start marker), skipped",
                    path.display()
                ));
                break;
            }
            let header = match RecordHeader::parse(&bytes) {
                Ok(header) => header,
                Err(e) => {
                    self.notifier.warning(format!(
                        "{}: corrupt record at offset {} ({}), rest of file ignored",
                        path.display(),
                        offset,
                        e
                    ));
                    break;
                }
            };

            let length = header.length as u64;
            if offset + length > file_len {
                self.notifier.warning(format!(
                    "{}: record at offset {} runs past end of file, ignored",
                    path.display(),
                    offset
                ));
                break;
            }

            let (frame, interval_ms) = clock.advance(&header);
            batch.push(IndexEntry {
                file_index: file_index as u32,
                offset,
                frame,
                interval_ms,
            });
            records += 1;

            let body = header.body_len() as i64;
            if let Err(e) = reader.seek_relative(body) {
                self.notifier.error(format!(
                    "{}: seek failed at offset {}: {}",
                    path.display(),
                    offset,
                    e
                ));
                break;
            }
            offset += length;
        }

        self.publish(&mut batch);
        debug!("{}: {} records", path.display(), records);
        file_len
    }
}

/// Handle to an index that may still be building
pub struct IndexHandle {
    shared: Arc<IndexShared>,
    worker: Option<JoinHandle<()>>,
    started: bool,
}

impl IndexHandle {
    /// Create an unstarted index over `files`, in session order
    pub fn new(files: Vec<PathBuf>) -> Self {
        let file_count = files.len();
        Self {
            shared: Arc::new(IndexShared {
                files,
                entries: RwLock::new(Vec::new()),
                published: AtomicUsize::new(0),
                file_starts: RwLock::new(vec![None; file_count]),
                progress: Mutex::new(InputFileListInfo::default()),
                complete: AtomicBool::new(false),
                stop: AtomicBool::new(false),
                wake_lock: Mutex::new(()),
                wake: Condvar::new(),
                notifier: Notifier::new(),
            }),
            worker: None,
            started: false,
        }
    }

    /// Create and start an index in one step
    pub fn build(files: Vec<PathBuf>, mode: BuildMode) -> Result<Self> {
        let mut handle = Self::new(files);
        handle.start(mode)?;
        Ok(handle)
    }

    /// Start scanning; only one build may ever run per handle
    pub fn start(&mut self, mode: BuildMode) -> Result<()> {
        if self.started {
            return Err(GlfError::IndexAlreadyStarted);
        }
        if self.shared.files.is_empty() {
            return Err(GlfError::InvalidParam("file list is empty".to_string()));
        }
        self.started = true;

        match mode {
            BuildMode::Synchronous => self.shared.run(),
            BuildMode::Asynchronous => {
                let shared = self.shared.clone();
                let worker = std::thread::Builder::new()
                    .name("glf-index".to_string())
                    .spawn(move || shared.run())?;
                self.worker = Some(worker);
            }
        }
        Ok(())
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.shared.notifier.subscribe()
    }

    pub(crate) fn notifier(&self) -> &Notifier {
        &self.shared.notifier
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.shared.files
    }

    /// Look up a record position.
    ///
    /// `StillBuildingIndex` while the scan has not reached `index`,
    /// `DataNotAvailable` once the scan is complete and `index` is past the end.
    pub fn entry(&self, index: usize) -> Result<IndexEntry> {
        self.shared.entry(index)
    }

    /// Records indexed so far
    pub fn record_count(&self) -> usize {
        self.shared.published.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.shared.complete.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> InputFileListInfo {
        self.shared
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Global index of the first record in file `file_index`.
    ///
    /// A file that contributed no records reports the index the next record
    /// would have had.
    pub fn file_start_position(&self, file_index: usize) -> Result<usize> {
        if file_index >= self.shared.files.len() {
            return Err(GlfError::InvalidParam(format!(
                "file index {} out of range ({} files)",
                file_index,
                self.shared.files.len()
            )));
        }
        let starts = self
            .shared
            .file_starts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        starts[file_index].ok_or(GlfError::StillBuildingIndex)
    }

    /// Block until `index` is available, the build completes, or `timeout` expires
    pub fn wait_for(&self, index: usize, timeout: Duration) -> Result<IndexEntry> {
        let deadline = Instant::now() + timeout;
        let mut guard = self
            .shared
            .wake_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            match self.shared.entry(index) {
                Err(GlfError::StillBuildingIndex) if self.worker.is_some() => {}
                other => return other,
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(GlfError::StillBuildingIndex);
            }
            guard = self
                .shared
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Block until the build completes; false if `timeout` expired first
    pub fn wait_until_complete(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self
            .shared
            .wake_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_complete() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline || self.worker.is_none() {
                return false;
            }
            guard = self
                .shared
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Stop a running build and wait for the worker to exit
    pub fn close(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                self.shared.notifier.error("Index worker panicked");
            }
        }
    }
}

impl Drop for IndexHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::writer::LogWriter;
    use glf_core::records::{GenericRecord, ImageGeometry, ImageRecord, MainImage, StatusRecord};
    use glf_core::{CompressionType, Record};
    use tempfile::TempDir;

    pub(crate) fn image_record(ts: f64) -> Record {
        let main = MainImage {
            geometry: ImageGeometry::new(4, 8, CompressionType::Zlib),
            bearing_table: vec![-0.2, -0.1, 0.1, 0.2],
            data: vec![17; 32],
            ..Default::default()
        };
        Record::image(ts, 1, ImageRecord::new(main))
    }

    pub(crate) fn status_record(ts: f64) -> Record {
        Record::status(ts, 1, StatusRecord::default())
    }

    /// Write `records` into a single fresh file and return its path
    pub(crate) fn write_file(dir: &Path, name: &str, records: &[Record]) -> PathBuf {
        let mut writer = LogWriter::open(dir.join(name), u64::MAX).unwrap();
        for record in records {
            writer.append(record).unwrap();
        }
        writer.close().unwrap();
        writer.written_files()[0].clone()
    }

    fn session(dir: &Path) -> Vec<PathBuf> {
        vec![
            write_file(dir, "a", &[status_record(10.0), image_record(10.1), status_record(10.25)]),
            write_file(dir, "b", &[image_record(10.5), image_record(11.0)]),
        ]
    }

    #[test]
    fn test_frame_clock() {
        let mut clock = FrameClock::new();
        let status = RecordHeader::new(DataType::GeminiStatus, 100.0);
        let first = RecordHeader::new(DataType::SonarImage, 100.25);
        let late_status = RecordHeader::new(DataType::GeminiStatus, 100.4);
        let second = RecordHeader::new(DataType::SonarImage, 100.5);
        let earlier = RecordHeader::new(DataType::SonarImage, 99.0);

        assert_eq!(clock.advance(&status), (0, 0));
        assert_eq!(clock.advance(&first), (1, 0));
        assert_eq!(clock.advance(&late_status), (1, 0));
        // Measured from the previous image, not the status in between
        assert_eq!(clock.advance(&second), (2, 250));
        // Clock going backwards never produces a negative interval
        assert_eq!(clock.advance(&earlier), (3, 0));
    }

    #[test]
    fn test_sync_index_completeness() {
        let temp = TempDir::new().unwrap();
        let files = session(temp.path());
        let index = IndexHandle::build(files, BuildMode::Synchronous).unwrap();

        assert!(index.is_complete());
        assert_eq!(index.record_count(), 5);
        for i in 0..5 {
            assert!(index.entry(i).is_ok());
        }
        assert!(matches!(index.entry(5), Err(GlfError::DataNotAvailable)));

        let entries: Vec<IndexEntry> = (0..5).map(|i| index.entry(i).unwrap()).collect();
        assert_eq!(
            entries.iter().map(|e| e.file_index).collect::<Vec<_>>(),
            vec![0, 0, 0, 1, 1]
        );
        assert_eq!(
            entries.iter().map(|e| e.frame).collect::<Vec<_>>(),
            vec![0, 1, 1, 2, 3]
        );
        assert_eq!(
            entries.iter().map(|e| e.interval_ms).collect::<Vec<_>>(),
            vec![0, 0, 0, 400, 500]
        );
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[3].offset, 0);
        assert!(entries[1].offset > 0);
    }

    #[test]
    fn test_file_start_positions() {
        let temp = TempDir::new().unwrap();
        let index = IndexHandle::build(session(temp.path()), BuildMode::Synchronous).unwrap();
        assert_eq!(index.file_start_position(0).unwrap(), 0);
        assert_eq!(index.file_start_position(1).unwrap(), 3);
        assert!(matches!(
            index.file_start_position(2),
            Err(GlfError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_unstarted_handle_is_still_building() {
        let temp = TempDir::new().unwrap();
        let index = IndexHandle::new(session(temp.path()));
        assert!(matches!(index.entry(0), Err(GlfError::StillBuildingIndex)));
        assert!(matches!(
            index.file_start_position(0),
            Err(GlfError::StillBuildingIndex)
        ));
        assert!(!index.wait_until_complete(Duration::from_millis(10)));
    }

    #[test]
    fn test_async_build() {
        let temp = TempDir::new().unwrap();
        let mut index = IndexHandle::new(session(temp.path()));
        let rx = index.subscribe();
        index.start(BuildMode::Asynchronous).unwrap();

        assert!(index.wait_until_complete(Duration::from_secs(10)));
        assert_eq!(index.record_count(), 5);
        assert_eq!(index.wait_for(4, Duration::from_secs(1)).unwrap().frame, 3);
        assert!(matches!(
            index.wait_for(5, Duration::from_secs(1)),
            Err(GlfError::DataNotAvailable)
        ));

        let progress: Vec<InputFileListInfo> = rx
            .try_iter()
            .filter_map(|n| match n {
                Notification::InputFileList(info) => Some(info),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[1].file_count, 2);
        assert_eq!(progress[1].record_count, 5);
        assert_eq!(progress[1].percent_processed, 100);
    }

    /// The worker blocks opening a named pipe until the test opens its write
    /// end, so queries are made while the build is known to be in flight
    #[cfg(unix)]
    #[test]
    fn test_queries_during_async_build() {
        use nix::sys::stat::Mode;

        let temp = TempDir::new().unwrap();
        let good = write_file(temp.path(), "good", &[status_record(1.0), image_record(1.5)]);
        let pipe = temp.path().join("live.glf");
        nix::unistd::mkfifo(&pipe, Mode::S_IRUSR | Mode::S_IWUSR).unwrap();

        let index = IndexHandle::build(vec![good, pipe.clone()], BuildMode::Asynchronous).unwrap();
        assert_eq!(index.wait_for(1, Duration::from_secs(10)).unwrap().frame, 1);

        assert!(!index.is_complete());
        assert!(matches!(index.entry(2), Err(GlfError::StillBuildingIndex)));
        assert!(matches!(index.entry(1_000), Err(GlfError::StillBuildingIndex)));
        assert!(matches!(
            index.file_start_position(1),
            Ok(2) | Err(GlfError::StillBuildingIndex)
        ));
        assert!(matches!(
            index.wait_for(2, Duration::from_millis(50)),
            Err(GlfError::StillBuildingIndex)
        ));
        assert!(!index.wait_until_complete(Duration::from_millis(50)));

        // An empty pipe reads as an empty file
        drop(std::fs::OpenOptions::new().write(true).open(&pipe).unwrap());

        assert!(index.wait_until_complete(Duration::from_secs(10)));
        assert_eq!(index.record_count(), 2);
        assert!(matches!(index.entry(2), Err(GlfError::DataNotAvailable)));
        assert!(matches!(index.entry(1_000), Err(GlfError::DataNotAvailable)));
        assert_eq!(index.file_start_position(1).unwrap(), 2);
    }

    #[test]
    fn test_second_start_rejected() {
        let temp = TempDir::new().unwrap();
        let mut index = IndexHandle::build(session(temp.path()), BuildMode::Synchronous).unwrap();
        assert!(matches!(
            index.start(BuildMode::Asynchronous),
            Err(GlfError::IndexAlreadyStarted)
        ));
    }

    #[test]
    fn test_empty_file_list() {
        assert!(matches!(
            IndexHandle::build(Vec::new(), BuildMode::Synchronous),
            Err(GlfError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_corrupt_file_skipped() {
        let temp = TempDir::new().unwrap();
        let good = write_file(temp.path(), "good", &[status_record(1.0), image_record(2.0)]);
        let corrupt = temp.path().join("corrupt.glf");
        std::fs::write(&corrupt, b"this is not a log file at all").unwrap();
        let good2 = write_file(temp.path(), "good2", &[image_record(3.0)]);

        let mut index = IndexHandle::new(vec![good, corrupt, good2]);
        let rx = index.subscribe();
        index.start(BuildMode::Synchronous).unwrap();

        assert_eq!(index.record_count(), 3);
        let files: Vec<u32> = (0..3).map(|i| index.entry(i).unwrap().file_index).collect();
        assert_eq!(files, vec![0, 0, 2]);
        assert_eq!(index.file_start_position(1).unwrap(), 2);
        assert_eq!(index.file_start_position(2).unwrap(), 2);

        let errors: Vec<String> = rx
            .try_iter()
            .filter_map(|n| match n {
                Notification::Message {
                    severity: crate::notify::Severity::Error,
                    text,
                } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("corrupt.glf"));
    }

    #[test]
    fn test_missing_file_skipped() {
        let temp = TempDir::new().unwrap();
        let good = write_file(temp.path(), "good", &[status_record(1.0)]);
        let index = IndexHandle::build(
            vec![temp.path().join("missing.glf"), good],
            BuildMode::Synchronous,
        )
        .unwrap();
        assert_eq!(index.record_count(), 1);
        assert_eq!(index.entry(0).unwrap().file_index, 1);
    }

    #[test]
    fn test_truncated_tail_not_indexed() {
        let temp = TempDir::new().unwrap();
        let path = write_file(temp.path(), "t", &[status_record(1.0), status_record(2.0)]);
        let len = std::fs::metadata(&path).unwrap().len();
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 10).unwrap();

        let mut index = IndexHandle::new(vec![path]);
        let rx = index.subscribe();
        index.start(BuildMode::Synchronous).unwrap();
        assert_eq!(index.record_count(), 1);
        assert!(rx.try_iter().any(|n| matches!(
            n,
            Notification::Message {
                severity: crate::notify::Severity::Warning,
                ..
            }
        )));
    }

    #[test]
    fn test_corruption_mid_file_keeps_prefix() {
        let temp = TempDir::new().unwrap();
        let path = write_file(
            temp.path(),
            "m",
            &[status_record(1.0), status_record(2.0), status_record(3.0)],
        );
        let record_len = status_record(0.0).encode().unwrap().len();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[record_len] = b'#';
        std::fs::write(&path, bytes).unwrap();

        let index = IndexHandle::build(vec![path], BuildMode::Synchronous).unwrap();
        assert_eq!(index.record_count(), 1);
    }

    #[test]
    fn test_empty_log_file() {
        let temp = TempDir::new().unwrap();
        let empty = write_file(temp.path(), "e", &[]);
        let good = write_file(temp.path(), "g", &[Record::generic(
            DataType::Generic,
            1.0,
            GenericRecord::ascii("hello"),
        )]);
        let index = IndexHandle::build(vec![empty, good], BuildMode::Synchronous).unwrap();
        assert_eq!(index.record_count(), 1);
        assert_eq!(index.file_start_position(0).unwrap(), 0);
        assert_eq!(index.file_start_position(1).unwrap(), 0);
    }

    #[test]
    fn test_close_stops_worker() {
        let temp = TempDir::new().unwrap();
        let files: Vec<PathBuf> = (0..20)
            .map(|i| {
                let records: Vec<Record> = (0..50).map(|j| status_record((i * 50 + j) as f64)).collect();
                write_file(temp.path(), &format!("f{i}"), &records)
            })
            .collect();

        let mut index = IndexHandle::build(files, BuildMode::Asynchronous).unwrap();
        index.close();
        // Worker has been joined; nothing runs behind our back any more
        assert!(index.worker.is_none());
        let count = index.record_count();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(index.record_count(), count);
    }
}

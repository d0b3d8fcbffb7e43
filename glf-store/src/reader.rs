//! Random-access reader over an indexed session

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use crossbeam::channel::Receiver;
use glf_core::{Record, RecordHeader, HEADER_SIZE};
use log::debug;

use crate::error::{GlfError, Result};
use crate::index::{BuildMode, IndexEntry, IndexHandle};
use crate::notify::Notification;

/// A decoded record with its playback timing
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRecord {
    pub record: Record,
    /// Frame number, see [`crate::index::FrameClock`]
    pub frame: u32,
    /// Milliseconds since the previous frame of the session
    pub interval_ms: u32,
}

pub struct LogReader {
    index: IndexHandle,
    /// Opened lazily, one handle per file in the list
    files: Vec<Option<File>>,
    active_file: Option<u32>,
    closed: bool,
}

impl LogReader {
    /// Index `files` (in session order) and open a reader over them
    pub fn open(files: Vec<PathBuf>, mode: BuildMode) -> Result<Self> {
        Ok(Self::from_index(IndexHandle::build(files, mode)?))
    }

    /// Read through an existing index handle, started or not
    pub fn from_index(index: IndexHandle) -> Self {
        let file_count = index.files().len();
        Self {
            index,
            files: (0..file_count).map(|_| None).collect(),
            active_file: None,
            closed: false,
        }
    }

    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut IndexHandle {
        &mut self.index
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.index.subscribe()
    }

    pub fn record_count(&self) -> usize {
        self.index.record_count()
    }

    pub fn is_complete(&self) -> bool {
        self.index.is_complete()
    }

    pub fn file_start_position(&self, file_index: usize) -> Result<usize> {
        if self.closed {
            return Err(GlfError::InvalidHandle);
        }
        self.index.file_start_position(file_index)
    }

    /// Fetch and decode the record at global position `index`
    pub fn get_record(&mut self, index: usize) -> Result<PlaybackRecord> {
        if self.closed {
            return Err(GlfError::InvalidHandle);
        }
        let entry = self.index.entry(index)?;
        self.read_entry(index, entry)
    }

    /// Like [`LogReader::get_record`], waiting up to `timeout` for the index
    pub fn wait_record(&mut self, index: usize, timeout: Duration) -> Result<PlaybackRecord> {
        if self.closed {
            return Err(GlfError::InvalidHandle);
        }
        let entry = self.index.wait_for(index, timeout)?;
        self.read_entry(index, entry)
    }

    /// Stop any index build and release file handles
    pub fn close(&mut self) {
        self.index.close();
        self.files.iter_mut().for_each(|f| *f = None);
        self.closed = true;
    }

    fn read_entry(&mut self, index: usize, entry: IndexEntry) -> Result<PlaybackRecord> {
        let record = match self.read_at(&entry) {
            Ok(record) => record,
            Err(e) => {
                let path = self.index.files()[entry.file_index as usize].display().to_string();
                self.index.notifier().error(format!(
                    "Cannot read record {} ({} @ {}): {}",
                    index, path, entry.offset, e
                ));
                return Err(e);
            }
        };

        if self.active_file != Some(entry.file_index) {
            debug!("Active file is now #{}", entry.file_index);
            self.active_file = Some(entry.file_index);
            self.index.notifier().emit(Notification::ActiveFile {
                index: entry.file_index,
            });
        }

        Ok(PlaybackRecord {
            record,
            frame: entry.frame,
            interval_ms: entry.interval_ms,
        })
    }

    fn read_at(&mut self, entry: &IndexEntry) -> Result<Record> {
        let file_index = entry.file_index as usize;
        if self.files[file_index].is_none() {
            self.files[file_index] = Some(File::open(&self.index.files()[file_index])?);
        }
        let file = self.files[file_index]
            .as_mut()
            .ok_or(GlfError::InvalidHandle)?;

        file.seek(SeekFrom::Start(entry.offset))?;
        let mut bytes = vec![0u8; HEADER_SIZE];
        file.read_exact(&mut bytes)?;
        let header = RecordHeader::parse(&bytes)?;
        bytes.resize(header.length as usize, 0);
        file.read_exact(&mut bytes[HEADER_SIZE..])?;

        Ok(Record::decode(&bytes)?)
    }
}

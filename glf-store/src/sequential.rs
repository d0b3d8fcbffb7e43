//! Forward-only reader over a single file.
//!
//! No index is built, so the first record is available immediately. After
//! any decode or I/O error the reader is poisoned: alignment with the record
//! stream can't be trusted any more and every later call fails with
//! `InvalidHandle`.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use crossbeam::channel::Receiver;
use glf_core::{DecodeError, Record, RecordHeader, HEADER_SIZE, START_MARKER};
use log::info;

use crate::error::{GlfError, Result};
use crate::index::{read_header_bytes, FrameClock, HeaderRead};
use crate::notify::{Notification, Notifier};
use crate::reader::PlaybackRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Failed,
    Closed,
}

pub struct SequentialReader {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    clock: FrameClock,
    state: State,
    notifier: Notifier,
}

impl SequentialReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);

        if let Some(&byte) = reader.fill_buf()?.first() {
            if byte != START_MARKER {
                return Err(DecodeError::InvalidStartMarker(byte).into());
            }
        }
        info!("Reading {} sequentially", path.display());

        Ok(Self {
            path,
            reader,
            offset: 0,
            clock: FrameClock::new(),
            state: State::Open,
            notifier: Notifier::new(),
        })
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next record
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Decode the next record; `DataNotAvailable` at end of file
    pub fn next_record(&mut self) -> Result<PlaybackRecord> {
        if self.state != State::Open {
            return Err(GlfError::InvalidHandle);
        }
        match self.read_next() {
            Ok(record) => Ok(record),
            Err(GlfError::DataNotAvailable) => Err(GlfError::DataNotAvailable),
            Err(e) => {
                self.state = State::Failed;
                self.notifier.error(format!(
                    "{}: cannot read record at offset {}: {}",
                    self.path.display(),
                    self.offset,
                    e
                ));
                Err(e)
            }
        }
    }

    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    fn read_next(&mut self) -> Result<PlaybackRecord> {
        let header_bytes = match read_header_bytes(&mut self.reader)? {
            HeaderRead::Eof => return Err(GlfError::DataNotAvailable),
            HeaderRead::Partial { len, .. } => {
                return Err(DecodeError::Truncated {
                    expected: HEADER_SIZE,
                    actual: len,
                }
                .into())
            }
            HeaderRead::Complete(bytes) => bytes,
        };
        let header = RecordHeader::parse(&header_bytes)?;

        let mut bytes = vec![0u8; header.length as usize];
        bytes[..HEADER_SIZE].copy_from_slice(&header_bytes);
        if let Err(e) = self.reader.read_exact(&mut bytes[HEADER_SIZE..]) {
            return Err(match e.kind() {
                ErrorKind::UnexpectedEof => DecodeError::Truncated {
                    expected: header.length as usize,
                    actual: HEADER_SIZE,
                }
                .into(),
                _ => e.into(),
            });
        }

        let record = Record::decode(&bytes)?;
        let (frame, interval_ms) = self.clock.advance(&header);
        self.offset += header.length as u64;

        Ok(PlaybackRecord {
            record,
            frame,
            interval_ms,
        })
    }
}

/// Yields records until end of file; a failure is yielded once, then iteration stops
impl Iterator for SequentialReader {
    type Item = Result<PlaybackRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(record) => Some(Ok(record)),
            Err(GlfError::DataNotAvailable) | Err(GlfError::InvalidHandle) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

//! Out-of-band status notifications.
//!
//! Every writer, index and reader owns its own [`Notifier`]; there is no
//! process-wide callback slot. Subscribers get a crossbeam receiver and see
//! every notification emitted after they subscribed.

use std::sync::{Arc, Mutex, PoisonError};

use crossbeam::channel::{self, Receiver, Sender};
use log::{error, info, warn};
use serde::Serialize;

/// Recording time reported before a write rate is known
pub const DEFAULT_TIME_LEFT_SECS: u64 = 26 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Statistics for the file being recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFileInfo {
    pub file_name: String,
    pub record_count: u32,
    pub file_size_bytes: u64,
    pub disk_space_free_bytes: u64,
    pub percent_disk_space_free: f64,
    pub recording_time_left_secs: u64,
}

impl Default for OutputFileInfo {
    fn default() -> Self {
        Self {
            file_name: String::new(),
            record_count: 0,
            file_size_bytes: 0,
            disk_space_free_bytes: 0,
            percent_disk_space_free: 0.0,
            recording_time_left_secs: DEFAULT_TIME_LEFT_SECS,
        }
    }
}

/// Progress of an index build over an ordered file list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFileListInfo {
    /// Records indexed so far
    pub record_count: u64,
    /// Percent of total bytes scanned
    pub percent_processed: u32,
    /// Files processed or being processed
    pub file_count: u32,
    pub file_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    OutputFile(OutputFileInfo),
    InputFileList(InputFileListInfo),
    /// The file serving random-access reads changed
    ActiveFile { index: u32 },
    Message { severity: Severity, text: String },
}

/// Fan-out of notifications to any number of subscribers
#[derive(Clone, Default)]
pub struct Notifier {
    subscribers: Arc<Mutex<Vec<Sender<Notification>>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn emit(&self, notification: Notification) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Drop subscribers whose receiver is gone
        subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
    }

    /// Log `text` and publish it as a message notification
    pub fn message(&self, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        match severity {
            Severity::Info => info!("{}", text),
            Severity::Warning => warn!("{}", text),
            Severity::Error => error!("{}", text),
        }
        self.emit(Notification::Message { severity, text });
    }

    pub fn info(&self, text: impl Into<String>) {
        self.message(Severity::Info, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.message(Severity::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.message(Severity::Error, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out() {
        let notifier = Notifier::new();
        let a = notifier.subscribe();
        let b = notifier.subscribe();

        notifier.emit(Notification::ActiveFile { index: 2 });

        assert_eq!(a.try_recv().unwrap(), Notification::ActiveFile { index: 2 });
        assert_eq!(b.try_recv().unwrap(), Notification::ActiveFile { index: 2 });
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let notifier = Notifier::new();
        let keep = notifier.subscribe();
        drop(notifier.subscribe());

        notifier.warning("disk nearly full");
        assert_eq!(
            keep.try_recv().unwrap(),
            Notification::Message {
                severity: Severity::Warning,
                text: "disk nearly full".to_string()
            }
        );
        assert_eq!(notifier.subscribers.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_instances_do_not_cross_talk() {
        let first = Notifier::new();
        let second = Notifier::new();
        let rx = first.subscribe();

        second.error("not for you");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Notification::OutputFile(OutputFileInfo {
            file_name: "log_20240101_000000.glf".to_string(),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(json["type"], "outputFile");
        assert_eq!(json["fileName"], "log_20240101_000000.glf");
        assert_eq!(json["recordingTimeLeftSecs"], DEFAULT_TIME_LEFT_SECS);
    }
}

//! Status codes returned by the store

use glf_core::{DecodeError, EncodeError};
use thiserror::Error;

/// Base of the numeric status codes
pub const GLF_ERROR_CODE: u32 = 0x0100_0000;

/// Numeric code for success
pub const GLF_OK: u32 = 0;

#[derive(Error, Debug)]
pub enum GlfError {
    /// Handle was closed, or a previous failure invalidated it
    #[error("Invalid handle")]
    InvalidHandle,

    /// No record at this position, and none will appear
    #[error("Data not available")]
    DataNotAvailable,

    /// I/O failure while writing; the output file has been closed
    #[error("Failed to write log file: {0}")]
    FailedToWrite(#[source] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// The index has not reached this position yet; ask again later
    #[error("Still building index")]
    StillBuildingIndex,

    /// A build is already running (or done) on this index handle
    #[error("Index build already started")]
    IndexAlreadyStarted,

    #[error("Record rejected: {0}")]
    Encode(#[from] EncodeError),

    #[error("Corrupt record: {0}")]
    Decode(#[from] DecodeError),

    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot load config '{0}'")]
    Config(String),
}

impl GlfError {
    /// Numeric status code, `GLF_ERROR_CODE | n`
    pub fn code(&self) -> u32 {
        let n = match self {
            GlfError::InvalidHandle => 2,
            GlfError::DataNotAvailable | GlfError::Decode(_) | GlfError::Io(_) => 3,
            GlfError::FailedToWrite(_) => 4,
            GlfError::InvalidParam(_) | GlfError::Encode(_) | GlfError::Config(_) => 5,
            GlfError::StillBuildingIndex | GlfError::IndexAlreadyStarted => 6,
        };
        GLF_ERROR_CODE | n
    }

    /// Not an error in the exceptional sense: retry or stop iterating
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            GlfError::StillBuildingIndex | GlfError::DataNotAvailable
        )
    }
}

pub type Result<T> = std::result::Result<T, GlfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GlfError::InvalidHandle.code(), 0x0100_0002);
        assert_eq!(GlfError::DataNotAvailable.code(), 0x0100_0003);
        assert_eq!(
            GlfError::FailedToWrite(std::io::Error::other("disk full")).code(),
            0x0100_0004
        );
        assert_eq!(GlfError::InvalidParam("max".into()).code(), 0x0100_0005);
        assert_eq!(GlfError::StillBuildingIndex.code(), 0x0100_0006);
    }

    #[test]
    fn test_not_ready() {
        assert!(GlfError::StillBuildingIndex.is_not_ready());
        assert!(GlfError::DataNotAvailable.is_not_ready());
        assert!(!GlfError::InvalidHandle.is_not_ready());
    }
}

//! Error types for PeerLink.
//!
//! This module provides a unified error type for all PeerLink operations,
//! with specific error variants for the different failure modes of the
//! upload, share and download paths.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::code::ShareCode;

/// A specialized `Result` type for PeerLink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for PeerLink.
#[derive(Error, Debug)]
pub enum Error {
    /// Share code could not be parsed (P001)
    #[error("invalid share code: {0}")]
    InvalidCodeFormat(String),

    /// No file is registered under the code (P002)
    #[error("no file is associated with share code {0}")]
    CodeNotFound(ShareCode),

    /// Every code in the configured range is already taken (P003)
    #[error("no free share code left in range {start}-{end}")]
    CodeSpaceExhausted {
        /// First code of the range
        start: u16,
        /// Last code of the range
        end: u16,
    },

    /// The code's file server was already started once
    #[error("share {0} has already been served or is being served")]
    ShareAlreadyStarted(ShareCode),

    /// Request rejected before the body was looked at (P004)
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Multipart body could not be parsed (P005)
    #[error("could not parse multipart body: {0}")]
    MalformedMultipart(&'static str),

    /// File name cannot be carried in a transfer header
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),

    /// Could not reach the file server for a code (P006)
    #[error("could not connect to share {code}: {source}")]
    ConnectionFailed {
        /// Code that was dialled
        code: ShareCode,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// Transfer broke off part way (P007)
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Operation timeout
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern PXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidCodeFormat(_) => Some("P001"),
            Self::CodeNotFound(_) => Some("P002"),
            Self::CodeSpaceExhausted { .. } => Some("P003"),
            Self::MalformedRequest(_) => Some("P004"),
            Self::MalformedMultipart(_) => Some("P005"),
            Self::ConnectionFailed { .. } => Some("P006"),
            Self::TransferFailed(_) => Some("P007"),
            _ => None,
        }
    }

    /// Returns whether this error was caused by the client rather than the
    /// server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCodeFormat(_)
                | Self::CodeNotFound(_)
                | Self::MalformedRequest(_)
                | Self::MalformedMultipart(_)
                | Self::ConnectionFailed { .. }
                | Self::TransferFailed(_)
                | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::InvalidCodeFormat("x".into()).code(), Some("P001"));
        assert_eq!(
            Error::MalformedMultipart("missing filename").code(),
            Some("P005")
        );
        assert_eq!(Error::ConfigError("bad".into()).code(), None);
    }

    #[test]
    fn test_client_errors() {
        assert!(Error::MalformedMultipart("x").is_client_error());
        assert!(Error::Timeout(Duration::from_secs(1)).is_client_error());
        assert!(Error::CodeNotFound(ShareCode::new(50_000).unwrap()).is_client_error());
        assert!(!Error::Io(io::Error::other("disk full")).is_client_error());
        assert!(!Error::CodeSpaceExhausted {
            start: 1,
            end: 2
        }
        .is_client_error());
    }

    #[test]
    fn test_display_includes_code() {
        let err = Error::CodeNotFound(ShareCode::new(50_000).unwrap());
        assert!(err.to_string().contains("50000"));
    }
}

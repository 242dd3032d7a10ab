//! # PeerLink Core Library
//!
//! `peerlink-core` implements a small peer-to-peer file sharing gateway.
//! A file uploaded over HTTP is stored, given a numeric share code that is
//! also a TCP port, and offered on a one-shot listener on that port to
//! exactly one peer.
//!
//! ## Modules
//!
//! - [`code`] - Share code parsing and allocation ranges
//! - [`config`] - Configuration management
//! - [`file`] - Scratch storage for uploads
//! - [`multipart`] - Single-file `multipart/form-data` extraction
//! - [`registry`] - Process-wide code to file mapping
//! - [`transfer`] - One-shot file servers and the relay client
//! - [`web`] - HTTP upload and download gateway
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use peerlink_core::registry::ShareRegistry;
//! use peerlink_core::transfer::SessionManager;
//!
//! let registry = Arc::new(ShareRegistry::default());
//! let sessions = SessionManager::new(registry, Default::default());
//! let code = sessions.share("/tmp/report.pdf", "report.pdf").await?;
//! println!("Share code: {}", code);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]

pub mod code;
pub mod config;
pub mod error;
pub mod file;
pub mod multipart;
pub mod registry;
pub mod transfer;

#[cfg(feature = "web")]
pub mod web;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP gateway port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default first share code (start of the IANA dynamic port range)
pub const DEFAULT_CODE_RANGE_START: u16 = 49152;

/// Default last share code
pub const DEFAULT_CODE_RANGE_END: u16 = 65535;

/// Default chunk size for streaming a shared file (64 KB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default upload body limit (1 GB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Default timeout for the relay connecting to a share, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default timeout between reads while relaying, in seconds
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Name of the scratch directory under the system temp dir
pub const SCRATCH_DIR_NAME: &str = "peerlink-uploads";

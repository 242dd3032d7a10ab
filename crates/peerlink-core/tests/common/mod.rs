//! Common test utilities for `PeerLink` integration tests.
//!
//! This module provides shared functionality for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use peerlink_core::config::Config;

/// Width of the share code range handed to each test.
const CODE_RANGE_WIDTH: u16 = 40;

/// Base port for tests, advanced for each test to avoid conflicts.
static TEST_PORT_COUNTER: AtomicU16 = AtomicU16::new(52600);

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "----PeerLinkTestBoundary7MA4YWxkTrZu0gW";

/// Create a temporary directory for test files.
///
/// The directory will be automatically cleaned up when the returned
/// `TempDir` is dropped.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Generate random bytes for testing.
pub fn random_bytes(size: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Get a share code range no other test in this binary uses.
pub fn get_test_code_range() -> (u16, u16) {
    let start = TEST_PORT_COUNTER.fetch_add(CODE_RANGE_WIDTH, Ordering::SeqCst);
    (start, start + CODE_RANGE_WIDTH - 1)
}

/// A configuration confined to localhost, a private code range and the
/// given scratch directory.
pub fn test_config(scratch_dir: &Path) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.max_upload_bytes = 16 * 1024 * 1024;
    config.share.code_range = get_test_code_range();
    config.share.bind_address = "127.0.0.1".to_string();
    config.download.connect_host = "127.0.0.1".to_string();
    config.download.connect_timeout = Duration::from_secs(2);
    config.download.idle_timeout = Duration::from_secs(5);
    config.storage.scratch_dir = Some(scratch_dir.to_path_buf());
    config
}

/// Build a single-file `multipart/form-data` body delimited by [`BOUNDARY`].
pub fn multipart_body(file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\
         \r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// `Content-Type` header value matching [`multipart_body`].
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// A port in the test range that is not listening.
pub fn closed_port() -> u16 {
    let (start, _) = get_test_code_range();
    start
}

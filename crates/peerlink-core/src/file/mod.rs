//! Scratch storage for uploaded files.
//!
//! Uploads are written once into the scratch directory under a name that
//! cannot collide with any other upload of the same process:
//!
//! ```text
//! <unix millis>-<sequence>-<sanitized file name>
//! ```
//!
//! The name the client sent is only ever used as the last component of that
//! name, after [`sanitize_file_name`] has stripped any directory parts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::multipart::DEFAULT_FILE_NAME;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Reduce a client supplied file name to a single safe path component.
///
/// Everything up to the last `/` or `\` is dropped. Control characters and
/// double quotes become `_` so the name can sit inside a transfer header and
/// a `Content-Disposition` value. Names that end up empty, `.` or `..` are
/// replaced by [`DEFAULT_FILE_NAME`].
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_control() || c == '"' { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Build the on-disk name for an upload.
///
/// `file_name` must already be sanitized.
#[must_use]
pub fn unique_name(file_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}-{file_name}")
}

/// Write an upload into `scratch_dir` and return where it landed.
///
/// The directory is created if missing. A partially written file is removed
/// before the error is returned.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be
/// written.
pub async fn store(scratch_dir: &Path, file_name: &str, content: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(scratch_dir).await?;

    let path = scratch_dir.join(unique_name(&sanitize_file_name(file_name)));
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;

    let written = async {
        file.write_all(content).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = tokio::fs::remove_file(&path).await;
        return Err(e.into());
    }

    tracing::debug!(
        path = %path.display(),
        "stored upload ({})",
        format_size(content.len() as u64)
    );
    Ok(path)
}

/// Format a file size for display.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

//! Receiving side of the one-shot transfer, used by the download relay.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{configure_tcp_keepalive, protocol};
use crate::code::ShareCode;
use crate::config::DownloadConfig;
use crate::error::{Error, Result};

/// Name reported when the sender's header carries none.
pub const FALLBACK_FILE_NAME: &str = "downloaded-file";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// A file pulled from a share into scratch storage.
///
/// The backing file has no directory entry; the operating system reclaims it
/// as soon as `file` is dropped, whether or not the bytes were relayed.
#[derive(Debug)]
pub struct FetchedFile {
    /// Name announced by the sender
    pub file_name: String,
    /// Number of body bytes received
    pub len: u64,
    /// Anonymous scratch file positioned at its start
    pub file: File,
}

/// Connect to the file server for `code`, read its header and copy the
/// payload into an anonymous file under `scratch_dir`.
///
/// # Errors
///
/// Returns [`Error::ConnectionFailed`] if the server cannot be reached (an
/// unknown or already served code), [`Error::Timeout`] if connecting or any
/// single read stalls past the configured limits, and
/// [`Error::TransferFailed`] if the stream breaks off.
pub async fn fetch(
    code: ShareCode,
    config: &DownloadConfig,
    scratch_dir: &Path,
) -> Result<FetchedFile> {
    let addr = (config.connect_host.as_str(), code.port());
    let mut stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))?
        .map_err(|source| Error::ConnectionFailed { code, source })?;

    if let Err(e) = configure_tcp_keepalive(&stream) {
        tracing::debug!("Could not enable keep-alive: {}", e);
    }
    tracing::debug!(%code, "connected to share");

    let file_name = protocol::read_header(&mut stream, config.idle_timeout)
        .await?
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

    let scratch = tempfile::tempfile_in(scratch_dir)?;
    let mut file = File::from_std(scratch);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut len = 0u64;
    loop {
        let n = tokio::time::timeout(config.idle_timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| Error::Timeout(config.idle_timeout))?
            .map_err(|e| Error::TransferFailed(format!("connection to share {code} broke: {e}")))?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n]).await?;
        len += n as u64;
    }

    file.flush().await?;
    file.rewind().await?;

    tracing::info!(%code, "Received {} ({} bytes)", file_name, len);
    Ok(FetchedFile {
        file_name,
        len,
        file,
    })
}

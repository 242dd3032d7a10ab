//! Framing for the raw one-shot transfer stream.
//!
//! After accepting its single client the sender writes one ASCII header line
//! followed by the file bytes, then closes the connection:
//!
//! ```text
//! Filename:<name>\n
//! <raw bytes until end of stream>
//! ```
//!
//! There is no length prefix and no checksum. End of stream marks end of
//! file.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Prefix of the header line.
pub const HEADER_PREFIX: &str = "Filename:";

/// Longest header line a receiver accepts, including the newline.
pub const MAX_HEADER_LEN: usize = 4096;

/// Encode the header line for a file name.
///
/// # Errors
///
/// Returns [`Error::InvalidFileName`] if the name contains a line break,
/// which would corrupt the framing.
pub fn encode_header(file_name: &str) -> Result<Vec<u8>> {
    if file_name.contains(['\n', '\r']) {
        return Err(Error::InvalidFileName(file_name.to_string()));
    }
    Ok(format!("{HEADER_PREFIX}{file_name}\n").into_bytes())
}

/// Write the header line to a stream.
pub async fn write_header<W>(writer: &mut W, file_name: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let header = encode_header(file_name)?;
    writer.write_all(&header).await?;
    Ok(())
}

/// Read the header line one byte at a time and return the announced file
/// name.
///
/// Returns `Ok(None)` when a line was read but does not start with
/// [`HEADER_PREFIX`]. Each byte read is bounded by `idle_timeout`.
///
/// # Errors
///
/// Fails if the stream ends before a newline, the line exceeds
/// [`MAX_HEADER_LEN`], or the sender stalls.
pub async fn read_header<R>(reader: &mut R, idle_timeout: Duration) -> Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        let n = tokio::time::timeout(idle_timeout, reader.read(&mut byte))
            .await
            .map_err(|_| Error::Timeout(idle_timeout))?
            .map_err(|e| Error::TransferFailed(format!("reading file header failed: {e}")))?;

        if n == 0 {
            return Err(Error::TransferFailed(
                "connection closed before the file header".to_string(),
            ));
        }
        if byte[0] == b'\n' {
            break;
        }
        if line.len() + 1 >= MAX_HEADER_LEN {
            return Err(Error::TransferFailed(format!(
                "file header longer than {MAX_HEADER_LEN} bytes"
            )));
        }
        line.push(byte[0]);
    }

    Ok(decode_header(&line))
}

/// Extract the file name from a header line without its newline.
#[must_use]
pub fn decode_header(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    line.trim()
        .strip_prefix(HEADER_PREFIX)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(5);

    #[test]
    fn test_encode_header() {
        assert_eq!(encode_header("a.txt").unwrap(), b"Filename:a.txt\n");
        assert!(matches!(
            encode_header("evil\nname"),
            Err(Error::InvalidFileName(_))
        ));
        assert!(encode_header("evil\rname").is_err());
    }

    #[test]
    fn test_decode_header() {
        assert_eq!(decode_header(b"Filename:a.txt").as_deref(), Some("a.txt"));
        assert_eq!(
            decode_header(b"Filename:report 2024.pdf\r").as_deref(),
            Some("report 2024.pdf")
        );
        assert_eq!(decode_header(b"FileName:a.txt"), None);
        assert_eq!(decode_header(b"Filename:"), None);
        assert_eq!(decode_header(b""), None);
    }

    #[tokio::test]
    async fn test_read_header_leaves_body_in_stream() {
        let mut stream: &[u8] = b"Filename:a.txt\nhello\nworld";
        let name = read_header(&mut stream, IDLE).await.unwrap();

        assert_eq!(name.as_deref(), Some("a.txt"));
        assert_eq!(stream, b"hello\nworld");
    }

    #[tokio::test]
    async fn test_read_header_unknown_prefix() {
        let mut stream: &[u8] = b"Something:else\nbody";
        assert_eq!(read_header(&mut stream, IDLE).await.unwrap(), None);
        assert_eq!(stream, b"body");
    }

    #[tokio::test]
    async fn test_read_header_eof() {
        let mut stream: &[u8] = b"Filename:a.txt";
        assert!(matches!(
            read_header(&mut stream, IDLE).await,
            Err(Error::TransferFailed(_))
        ));

        let mut empty: &[u8] = b"";
        assert!(read_header(&mut empty, IDLE).await.is_err());
    }

    #[tokio::test]
    async fn test_read_header_too_long() {
        let long = vec![b'a'; MAX_HEADER_LEN * 2];
        let mut stream: &[u8] = &long;
        assert!(matches!(
            read_header(&mut stream, IDLE).await,
            Err(Error::TransferFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let mut buf = Vec::new();
        write_header(&mut buf, "notes.md").await.unwrap();
        buf.extend_from_slice(b"# notes");

        let mut stream: &[u8] = &buf;
        let name = read_header(&mut stream, IDLE).await.unwrap();
        assert_eq!(name.as_deref(), Some("notes.md"));
        assert_eq!(stream, b"# notes");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_header_times_out() {
        let (_writer, mut reader) = tokio::io::duplex(64);
        let result = read_header(&mut reader, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}

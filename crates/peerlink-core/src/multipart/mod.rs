//! Minimal `multipart/form-data` extraction.
//!
//! Upload bodies carry exactly one file field. Rather than walking the full
//! multipart grammar, [`parse`] locates the markers it needs directly in the
//! raw bytes:
//!
//! 1. `filename="` and the closing quote give the file name.
//! 2. An optional `Content-Type: ` line in the part headers gives the type.
//! 3. The first `\r\n\r\n` after the file name starts the body.
//! 4. The body ends at the closing delimiter `\r\n--<boundary>--` or, when
//!    that is absent, at the next interior delimiter `\r\n--<boundary>`.
//!
//! The closing delimiter is always searched for first. A body that contains
//! an interior delimiter followed later by the closing one therefore runs up
//! to the closing delimiter.

use crate::error::{Error, Result};

/// Name used when the upload carries an empty file name.
pub const DEFAULT_FILE_NAME: &str = "unnamed-file";

const FILENAME_MARKER: &[u8] = b"filename=\"";
const CONTENT_TYPE_MARKER: &[u8] = b"Content-Type: ";
const HEADER_END: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";

/// The file field extracted from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPart<'a> {
    /// File name as sent by the client, or [`DEFAULT_FILE_NAME`]
    pub file_name: String,
    /// Declared content type of the part, if any
    pub content_type: Option<String>,
    /// Raw file bytes
    pub content: &'a [u8],
}

/// Extract the single file field from a raw multipart body.
///
/// # Errors
///
/// Returns [`Error::MalformedMultipart`] if any required marker is missing or
/// the body would be empty.
pub fn parse<'a>(data: &'a [u8], boundary: &str) -> Result<ParsedPart<'a>> {
    let name_start = find(data, FILENAME_MARKER, 0)
        .ok_or(Error::MalformedMultipart("missing filename marker"))?
        + FILENAME_MARKER.len();
    let name_end = find(data, b"\"", name_start)
        .ok_or(Error::MalformedMultipart("unterminated filename"))?;
    let raw_name = String::from_utf8_lossy(&data[name_start..name_end]);

    let header_end = find(data, HEADER_END, name_end)
        .ok_or(Error::MalformedMultipart("missing header terminator"))?;
    let content_type = find_content_type(&data[name_end..header_end + CRLF.len()]);

    let start = header_end + HEADER_END.len();
    let closing = format!("\r\n--{boundary}--");
    let interior = format!("\r\n--{boundary}");
    let end = find(data, closing.as_bytes(), start)
        .or_else(|| find(data, interior.as_bytes(), start))
        .ok_or(Error::MalformedMultipart("missing closing boundary"))?;

    if end <= start {
        return Err(Error::MalformedMultipart("empty file content"));
    }

    let file_name = if raw_name.trim().is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        raw_name.into_owned()
    };

    tracing::debug!(
        file_name = %file_name,
        content_type = content_type.as_deref().unwrap_or("-"),
        bytes = end - start,
        "parsed multipart upload"
    );

    Ok(ParsedPart {
        file_name,
        content_type,
        content: &data[start..end],
    })
}

/// Extract the `boundary` parameter from a `Content-Type` header value.
///
/// Surrounding quotes are stripped and the value stops at the next `;`.
/// Returns `None` when the parameter is absent or empty.
pub fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    let (_, rest) = content_type.split_once("boundary=")?;
    let value = rest.split(';').next().unwrap_or_default().trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn find_content_type(headers: &[u8]) -> Option<String> {
    let start = find(headers, CONTENT_TYPE_MARKER, 0)? + CONTENT_TYPE_MARKER.len();
    let end = find(headers, CRLF, start)?;
    Some(String::from_utf8_lossy(&headers[start..end]).trim().to_string())
}

/// Position of the first occurrence of `needle` in `haystack` at or after
/// `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

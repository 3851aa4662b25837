//! Raw request bytes and the structured view derived from them.
//!
//! # Responsibilities
//! - Hold the exact bytes that will be forwarded (`RawMessage`)
//! - Derive method, target, version, headers and body length from those bytes
//! - Share the request-line and body-length rules with the streaming reader
//!
//! # Design Decisions
//! - `RawMessage` is the source of truth; `ParsedRequest` is a projection
//!   that is recomputed after anything touches the bytes
//! - Re-derivation applies the exact tokenizer rules of the streaming reader

use std::fmt;
use std::ops::Deref;

use super::headers::{tokenize_header_line, HeaderMap};
use super::method::{Method, Version};
use super::ParseError;

/// Exact wire bytes of one request: request line, headers, blank line, body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    bytes: Vec<u8>,
}

impl RawMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes as read from the wire.
    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access for interceptors.
    pub fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for RawMessage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for RawMessage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for RawMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for RawMessage {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

/// Structured view of a [`RawMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    method: Method,
    target: String,
    version: Version,
    headers: HeaderMap,
    body_length: usize,
}

impl ParsedRequest {
    /// Derive the structured request from complete raw bytes.
    ///
    /// End of input before the blank line is accepted as the end of the
    /// header section. The declared body length must match the bytes that
    /// follow the header section.
    pub fn from_raw(raw: &[u8]) -> Result<Self, ParseError> {
        let mut lines = raw.split_inclusive(|&b| b == b'\n');

        let request_line = lines.next().ok_or(ParseError::EmptyRequest)?;
        let (method, target, version) = parse_request_line(request_line)?;
        let mut offset = request_line.len();

        let mut headers = HeaderMap::new();
        for line in lines {
            offset += line.len();
            if is_blank_line(line) {
                break;
            }
            if let Some(field) = tokenize_header_line(line)?.field {
                headers.append(field.name, field.value);
            }
        }

        let declared = declared_body_length(method, &headers)?;
        let actual = raw.len() - offset;
        if declared != actual {
            return Err(ParseError::BodyLengthMismatch { declared, actual });
        }

        Ok(Self {
            method,
            target,
            version,
            headers,
            body_length: declared,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Request-target exactly as it appeared on the request line.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_length(&self) -> usize {
        self.body_length
    }

    pub fn host(&self) -> Option<&str> {
        self.headers.get("Host")
    }

    /// Body slice of the raw message this request was derived from.
    pub fn body<'a>(&self, raw: &'a RawMessage) -> &'a [u8] {
        let start = raw.len().saturating_sub(self.body_length);
        &raw[start..]
    }
}

/// Whether `line` is the blank line terminating the header section.
pub(crate) fn is_blank_line(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Split a request line into method, request-target and version.
///
/// The line is split on single spaces and must yield exactly three tokens.
/// The method is checked before the version.
pub fn parse_request_line(line: &[u8]) -> Result<(Method, String, Version), ParseError> {
    let trimmed = line
        .strip_suffix(b"\n")
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .unwrap_or(line);
    let text = std::str::from_utf8(trimmed)
        .map_err(|_| ParseError::InvalidRequestLine(String::from_utf8_lossy(trimmed).into_owned()))?;

    let parts: Vec<&str> = text.split(' ').collect();
    if parts.len() != 3 {
        return Err(ParseError::InvalidRequestLine(text.to_string()));
    }

    let method = Method::parse(parts[0])?;
    let version = Version::parse(parts[2])?;
    Ok((method, parts[1].to_string(), version))
}

/// Body length declared by the headers of a request with `method`.
///
/// Bodiless methods always yield 0. Conflicting `Content-Length` values are
/// rejected (RFC 7230 §3.3.2).
pub fn declared_body_length(method: Method, headers: &HeaderMap) -> Result<usize, ParseError> {
    if !method.has_body() {
        return Ok(0);
    }
    if let Some(encoding) = headers.get("Transfer-Encoding") {
        return Err(ParseError::UnsupportedTransferEncoding(encoding.to_string()));
    }

    let values = headers.get_all("Content-Length");
    let Some(first) = values.first() else {
        return Ok(0);
    };
    if values.iter().any(|v| v != first) {
        return Err(ParseError::InvalidContentLength(values.join(", ")));
    }
    if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength(first.to_string()));
    }
    first
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidContentLength(first.to_string()))
}

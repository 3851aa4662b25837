//! Raw-preserving request reader.
//!
//! # Responsibilities
//! - Read request line, header section and `Content-Length` body from a
//!   buffered stream
//! - Accumulate the bytes into a `RawMessage` as they are read
//! - Enforce line, header-count and body-size limits before buffering
//!
//! # Design Decisions
//! - The method gate runs before any header is read
//! - End of stream inside the header section ends the headers unless
//!   strict termination is configured
//! - The returned `ParsedRequest` is re-derived from the final raw bytes

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::headers::{tokenize_header_line, HeaderMap};
use super::request::{declared_body_length, is_blank_line, parse_request_line, ParsedRequest, RawMessage};
use super::ParseError;
use crate::config::{LimitsConfig, ParserConfig};

/// Limits and leniency switches applied while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub max_line_bytes: usize,
    pub max_headers: usize,
    pub max_body_bytes: usize,
    pub strict_header_termination: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::from_config(&LimitsConfig::default(), &ParserConfig::default())
    }
}

impl ReaderOptions {
    pub fn from_config(limits: &LimitsConfig, parser: &ParserConfig) -> Self {
        Self {
            max_line_bytes: limits.max_line_bytes,
            max_headers: limits.max_headers,
            max_body_bytes: limits.max_body_bytes,
            strict_header_termination: parser.strict_header_termination,
        }
    }
}

/// Reads one request from a buffered byte stream.
#[derive(Debug, Clone, Default)]
pub struct RequestReader {
    options: ReaderOptions,
}

impl RequestReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    /// Read a single request.
    ///
    /// On error nothing read so far is returned; the caller closes the
    /// connection.
    pub async fn read_request<R>(&self, reader: &mut R) -> Result<(RawMessage, ParsedRequest), ParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut raw = RawMessage::new();
        let mut line = Vec::new();

        // Request line and method gate.
        if self.read_line(reader, &mut line).await? == 0 {
            return Err(ParseError::EmptyRequest);
        }
        let (method, _, _) = parse_request_line(&line)?;
        raw.append(&line);

        // Header section.
        let mut headers = HeaderMap::new();
        let mut header_lines = 0usize;
        let mut terminated = false;
        loop {
            line.clear();
            if self.read_line(reader, &mut line).await? == 0 {
                break;
            }
            if is_blank_line(&line) {
                raw.append(&line);
                terminated = true;
                break;
            }

            // Skipped empty-name lines are still buffered, so they count too.
            header_lines += 1;
            if header_lines > self.options.max_headers {
                return Err(ParseError::TooManyHeaders(self.options.max_headers));
            }
            let tokenized = tokenize_header_line(&line)?;
            if let Some(field) = tokenized.field {
                headers.append(field.name, field.value);
            }
            raw.append(&tokenized.raw);

            if !line.ends_with(b"\n") {
                // Stream ended mid-line.
                break;
            }
        }
        if !terminated {
            if self.options.strict_header_termination {
                return Err(ParseError::TruncatedHeaders);
            }
            tracing::debug!("End of stream before blank line, treating headers as complete");
        }

        // Body.
        let length = declared_body_length(method, &headers)?;
        if length > self.options.max_body_bytes {
            return Err(ParseError::BodyTooLarge {
                declared: length,
                limit: self.options.max_body_bytes,
            });
        }
        if length > 0 {
            let mut body = Vec::with_capacity(length);
            let received = (&mut *reader).take(length as u64).read_to_end(&mut body).await?;
            if received < length {
                return Err(ParseError::TruncatedBody {
                    expected: length,
                    received,
                });
            }
            raw.append(&body);
        }

        let request = ParsedRequest::from_raw(&raw)?;
        Ok((raw, request))
    }

    /// Read through the next `\n`, bounded by `max_line_bytes`.
    async fn read_line<R>(&self, reader: &mut R, line: &mut Vec<u8>) -> Result<usize, ParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let limit = self.options.max_line_bytes;
        let n = (&mut *reader).take(limit as u64).read_until(b'\n', line).await?;
        if n >= limit && !line.ends_with(b"\n") {
            return Err(ParseError::LineTooLong(limit));
        }
        Ok(n)
    }
}

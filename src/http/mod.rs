//! HTTP/1.1 request parsing subsystem.
//!
//! # Data Flow
//! ```text
//! buffered client stream
//!     → reader.rs (request line, method gate, header section, body)
//!     → headers.rs (per-line tokenization, multimap)
//!     → request.rs (RawMessage + ParsedRequest re-derived from raw bytes)
//!     → handed to the interceptor, then to the forwarder
//! ```
//!
//! # Design Decisions
//! - Raw bytes are kept as read; only pre-colon whitespace is dropped
//! - Only bodiless and `Content-Length` bodies; chunked is rejected
//! - One request per connection

pub mod headers;
pub mod method;
pub mod reader;
pub mod request;

pub use headers::{tokenize_header_line, HeaderField, HeaderMap, TokenizedLine};
pub use method::{Method, Version};
pub use reader::{ReaderOptions, RequestReader};
pub use request::{ParsedRequest, RawMessage};

/// Errors raised while reading or re-deriving a request.
///
/// All of them are fatal to the connection only.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("connection closed before a request line was received")]
    EmptyRequest,

    #[error("invalid request line: {0:?}")]
    InvalidRequestLine(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed header line: {0:?}")]
    MalformedHeaderLine(String),

    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("unsupported Transfer-Encoding: {0}")]
    UnsupportedTransferEncoding(String),

    #[error("stream ended before the end of the header section")]
    TruncatedHeaders,

    #[error("body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: usize, received: usize },

    #[error("declared body length {declared} does not match {actual} bytes present")]
    BodyLengthMismatch { declared: usize, actual: usize },

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("more than {0} header fields")]
    TooManyHeaders(usize),

    #[error("body of {declared} bytes exceeds limit of {limit}")]
    BodyTooLarge { declared: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Short static label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::EmptyRequest => "empty_request",
            ParseError::InvalidRequestLine(_) => "invalid_request_line",
            ParseError::UnsupportedMethod(_) => "unsupported_method",
            ParseError::UnsupportedVersion(_) => "unsupported_version",
            ParseError::MalformedHeaderLine(_) => "malformed_header_line",
            ParseError::InvalidContentLength(_) => "invalid_content_length",
            ParseError::UnsupportedTransferEncoding(_) => "unsupported_transfer_encoding",
            ParseError::TruncatedHeaders => "truncated_headers",
            ParseError::TruncatedBody { .. } => "truncated_body",
            ParseError::BodyLengthMismatch { .. } => "body_length_mismatch",
            ParseError::LineTooLong(_) => "line_too_long",
            ParseError::TooManyHeaders(_) => "too_many_headers",
            ParseError::BodyTooLarge { .. } => "body_too_large",
            ParseError::Io(_) => "io",
        }
    }
}

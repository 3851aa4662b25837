//! Header tokenization and the header multimap.
//!
//! # Responsibilities
//! - Turn one raw header line into a normalized `(name, value)` pair
//! - Produce the normalized raw bytes that are stored for forwarding
//! - Keep headers in arrival order with duplicates preserved
//!
//! # Design Decisions
//! - Whitespace between field-name and colon is removed from the stored bytes
//!   (RFC 7230 §3.2.4); everything after the colon is kept as received
//! - An empty field-name is skipped, a missing colon is an error
//! - Lookups are case-insensitive, stored names keep their received case

use super::ParseError;

/// A single header field, already stripped of OWS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

/// Outcome of tokenizing one header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedLine {
    /// Line bytes with pre-colon spaces removed; this is what gets stored.
    pub raw: Vec<u8>,
    /// `None` when the field-name is empty and the line is skipped.
    pub field: Option<HeaderField>,
}

fn is_ows(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Tokenize one header line, including its line terminator.
///
/// The blank line ending the header section must not be passed here.
pub fn tokenize_header_line(line: &[u8]) -> Result<TokenizedLine, ParseError> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| ParseError::MalformedHeaderLine(lossy_line(line)))?;

    let mut raw = Vec::with_capacity(line.len());
    raw.extend(line[..colon].iter().copied().filter(|&b| b != b' '));
    let name_len = raw.len();
    raw.extend_from_slice(&line[colon..]);

    if name_len == 0 {
        return Ok(TokenizedLine { raw, field: None });
    }

    let name = String::from_utf8_lossy(&raw[..name_len]).into_owned();

    let rest = &line[colon + 1..];
    let start = rest.iter().position(|&b| !is_ows(b)).unwrap_or(rest.len());
    let end = rest
        .iter()
        .rposition(|&b| !(is_ows(b) || b == b'\r' || b == b'\n'))
        .map_or(start, |i| i + 1)
        .max(start);
    let value = String::from_utf8_lossy(&rest[start..end]).into_owned();

    Ok(TokenizedLine {
        raw,
        field: Some(HeaderField { name, value }),
    })
}

fn lossy_line(line: &[u8]) -> String {
    String::from_utf8_lossy(line)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Insertion-ordered header multimap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: Vec<HeaderField>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Existing values for the same name are kept.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(HeaderField {
            name: name.into(),
            value: value.into(),
        });
    }

    /// First value for `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    /// All values for `name` in arrival order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
    }
}

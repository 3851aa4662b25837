//! Automated header rewriting on the raw request bytes.
//!
//! Lines that are not touched keep their exact bytes; the request line and
//! the body are copied through unchanged.

use async_trait::async_trait;

use super::Interceptor;
use crate::config::InterceptionConfig;
use crate::http::headers::tokenize_header_line;
use crate::http::request::is_blank_line;
use crate::http::{ParseError, ParsedRequest, RawMessage};

/// Sets and removes header fields in the raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRewriter {
    set: Vec<(String, String)>,
    remove: Vec<String>,
}

impl HeaderRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &InterceptionConfig) -> Self {
        let mut rewriter = Self::new();
        for rule in &config.set_headers {
            rewriter = rewriter.set(rule.name.clone(), rule.value.clone());
        }
        for name in &config.remove_headers {
            rewriter = rewriter.remove(name.clone());
        }
        rewriter
    }

    /// Replace every occurrence of `name` with a single `name: value` line,
    /// appended at the end of the header section.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.push((name.into(), value.into()));
        self
    }

    /// Drop every occurrence of `name`.
    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.remove.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    fn drops(&self, name: &str) -> bool {
        self.remove.iter().any(|n| n.eq_ignore_ascii_case(name))
            || self.set.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Rewrite the header section of `raw` in place.
    pub fn apply(&self, raw: &mut RawMessage) -> Result<(), ParseError> {
        let bytes = raw.as_bytes();
        let mut lines = bytes.split_inclusive(|&b| b == b'\n');
        let Some(request_line) = lines.next() else {
            return Ok(());
        };
        let eol: &[u8] = if request_line.ends_with(b"\r\n") { b"\r\n" } else { b"\n" };

        let mut out = Vec::with_capacity(bytes.len());
        out.extend_from_slice(request_line);
        let mut offset = request_line.len();
        let mut blank = None;

        for line in lines {
            offset += line.len();
            if is_blank_line(line) {
                blank = Some(line);
                break;
            }
            let tokenized = tokenize_header_line(line)?;
            let dropped = tokenized.field.as_ref().is_some_and(|f| self.drops(&f.name));
            if !dropped {
                out.extend_from_slice(line);
            }
        }

        if !self.set.is_empty() && !out.ends_with(b"\n") {
            out.extend_from_slice(eol);
        }
        for (name, value) in &self.set {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(eol);
        }
        if let Some(blank) = blank {
            out.extend_from_slice(blank);
        }
        out.extend_from_slice(&bytes[offset..]);

        *raw.bytes_mut() = out;
        Ok(())
    }
}

#[async_trait]
impl Interceptor for HeaderRewriter {
    async fn intercept(&self, _request: &ParsedRequest, raw: &mut RawMessage) {
        if let Err(e) = self.apply(raw) {
            tracing::warn!(error = %e, "Header rewrite skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderRule;

    fn rewrite(rewriter: &HeaderRewriter, input: &[u8]) -> Vec<u8> {
        let mut raw = RawMessage::from(input);
        rewriter.apply(&mut raw).unwrap();
        raw.into_bytes()
    }

    #[test]
    fn sets_and_removes_headers() {
        let rewriter = HeaderRewriter::new()
            .set("User-Agent", "interceptor")
            .remove("proxy-connection");
        let out = rewrite(
            &rewriter,
            b"GET / HTTP/1.1\r\nHost: a\r\nUser-Agent: curl\r\nProxy-Connection: keep-alive\r\nAccept:  */*\r\n\r\n",
        );
        assert_eq!(
            out,
            b"GET / HTTP/1.1\r\nHost: a\r\nAccept:  */*\r\nUser-Agent: interceptor\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn body_untouched() {
        let rewriter = HeaderRewriter::new().set("X-Tag", "1");
        let out = rewrite(&rewriter, b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\na\r\nb");
        assert_eq!(out, b"POST / HTTP/1.1\r\nContent-Length: 4\r\nX-Tag: 1\r\n\r\na\r\nb".to_vec());
        let req = ParsedRequest::from_raw(&out).unwrap();
        assert_eq!(req.headers().get("x-tag"), Some("1"));
        assert_eq!(req.body_length(), 4);
    }

    #[test]
    fn appends_after_unterminated_header_section() {
        let rewriter = HeaderRewriter::new().set("X-Tag", "1");
        let out = rewrite(&rewriter, b"GET / HTTP/1.1\r\nHost: a");
        assert_eq!(out, b"GET / HTTP/1.1\r\nHost: a\r\nX-Tag: 1\r\n".to_vec());
    }

    #[test]
    fn empty_rewriter_is_identity() {
        let input = b"GET / HTTP/1.1\r\n: skipped\r\nHost: a\r\n\r\n";
        assert_eq!(rewrite(&HeaderRewriter::new(), input), input.to_vec());
    }

    #[test]
    fn from_config() {
        let config = InterceptionConfig {
            log_requests: false,
            set_headers: vec![HeaderRule {
                name: "Via".into(),
                value: "interceptor-proxy".into(),
            }],
            remove_headers: vec!["Cookie".into()],
        };
        let rewriter = HeaderRewriter::from_config(&config);
        assert!(!rewriter.is_empty());
        let out = rewrite(&rewriter, b"GET / HTTP/1.0\nCookie: a=1\n\n");
        assert_eq!(out, b"GET / HTTP/1.0\nVia: interceptor-proxy\n\n".to_vec());
    }

    #[tokio::test]
    async fn interceptor_ignores_malformed_input() {
        let mut raw = RawMessage::from(&b"GET / HTTP/1.1\r\nbroken\r\n\r\n"[..]);
        let before = raw.clone();
        let req = ParsedRequest::from_raw(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        HeaderRewriter::new().remove("X").intercept(&req, &mut raw).await;
        assert_eq!(raw, before);
    }
}

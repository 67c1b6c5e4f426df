//! Log sanitization utilities for patient-identifying text.
//!
//! This module provides string-based sanitization helpers applied to log
//! output (or any other untrusted text), covering:
//! - National identity numbers
//! - Phone numbers
//! - Email addresses
//! - Credentials that leak into formatted strings
//!
//! # Important: prefer logging identifiers, not identities
//!
//! Sanitizing strings is a fallback. The primary protection is that service
//! log lines carry roster ids, never names, addresses or contact details,
//! so patient identity does not reach the logging layer at all.
//!
//! # Performance
//!
//! Even with linear-time regex engines, scanning and allocating on large
//! inputs can be expensive. `sanitize()` enforces a maximum input size (see
//! `IRISDESK_SANITIZE_MAX_BYTES`).

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

/// Compiled patterns for PII detection and sanitization.
static PII_PATTERNS: OnceLock<PiiPatterns> = OnceLock::new();

/// Maximum number of bytes to sanitize per call.
///
/// Defaults to 16 KiB; can be overridden via `IRISDESK_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// A compiled PII pattern with its replacement text.
struct PiiPattern {
    regex: Regex,
    replacement: &'static str,
}

struct PiiPatterns {
    set: RegexSet,
    patterns: Vec<PiiPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    // Ensure we don't panic on UTF-8 boundaries.
    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("IRISDESK_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Initialize PII patterns (called once at startup).
fn get_patterns() -> &'static PiiPatterns {
    PII_PATTERNS.get_or_init(|| {
        // NOTE: Rust's `regex` crate is linear-time (no catastrophic
        // backtracking), but sanitizing large strings is still CPU-expensive.
        // Patterns stay simple and input size is capped (see
        // `max_sanitize_bytes`). False positives on look-alike digit runs
        // are accepted.
        let rules: Vec<(&'static str, &'static str)> = vec![
            // National identity documents (8 digits plus check letter)
            (r"\b\d{8}[A-Za-z]\b", "[REDACTED-ID]"),
            // Phone numbers, with or without a country prefix
            (
                r"\b(?:\+?34[-.\s]?)?[6789]\d{2}[-.\s]?\d{3}[-.\s]?\d{3}\b",
                "[REDACTED-PHONE]",
            ),
            // Email patterns (bounded labels; case-insensitive)
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            // Credentials pasted into log text
            (
                r"(?i)\b(?:password|passwd|pwd|contra|secret|token)\b\s*[:=]\s*[A-Za-z0-9._+/-]{4,}={0,2}\b",
                "[REDACTED-SECRET]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| PiiPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        PiiPatterns { set, patterns }
    })
}

/// Sanitize a string by replacing PII patterns.
///
/// This function applies all registered PII patterns to the input string
/// and returns a sanitized version.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();

    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    // Fast path: single scan for "any match".
    if !patterns.set.is_match(prefix) {
        let mut out = prefix.to_string();
        if truncated {
            out.push_str(" [TRUNCATED]");
        }
        return out;
    }

    // Only apply patterns that matched the original prefix.
    let matched: Vec<usize> = patterns.set.matches(prefix).into_iter().collect();
    let mut result = prefix.to_string();
    for idx in matched {
        let pattern = &patterns.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains potential PII.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let patterns = get_patterns();
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    patterns.set.is_match(prefix)
}

/// A `tracing_subscriber` writer wrapper that sanitizes formatted log output
/// before it is written to the underlying sink.
///
/// This keeps sanitization centralized (no need to call `sanitize()` at every
/// callsite). Log lines should still carry roster ids rather than identities;
/// the wrapper catches what slips through formatted strings.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M> Clone for SanitizingMakeWriter<M>
where
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let line_str = String::from_utf8_lossy(&line);
            let sanitized = sanitize(&line_str);
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // Prevent unbounded buffering if the formatter writes a huge line
        // with no newlines. We fall back to lossy UTF-8 conversion;
        // `sanitize()` will also cap the output.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if hard_cap > 0 && self.buffer.len() > hard_cap {
            let s = String::from_utf8_lossy(&self.buffer).to_string();
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let s = String::from_utf8_lossy(&self.buffer);
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_national_id() {
        let input = "Registered patient with document 12345678Z today";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-ID]"));
        assert!(!sanitized.contains("12345678Z"));
    }

    #[test]
    fn test_sanitize_phone() {
        let input = "Callback number 600 111 222 noted";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-PHONE]"));
        assert!(!sanitized.contains("600 111 222"));
    }

    #[test]
    fn test_sanitize_phone_with_prefix() {
        let input = "Contact +34 612345678";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-PHONE]"));
    }

    #[test]
    fn test_sanitize_email() {
        let input = "Contact: patient@clinic.example.com";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-EMAIL]"));
    }

    #[test]
    fn test_sanitize_credential() {
        let input = "password=personalcontra rejected";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-SECRET]"));
        assert!(!sanitized.contains("personalcontra"));
    }

    #[test]
    fn test_plain_ids_pass_through() {
        let input = "Exported report for patient 3 (52140 bytes)";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_contains_pii() {
        assert!(contains_pii("document 12345678Z"));
        assert!(contains_pii("mail patient@clinic.example.com"));
        assert!(!contains_pii("Just normal log text"));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let input = "prefix 12345678Z and a long tail of text after the cap";
        let sanitized = sanitize_with_limit(input, 20);
        assert!(sanitized.contains("[TRUNCATED]"));
        assert!(!sanitized.contains("12345678Z"));
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        use std::io::Write;

        let mut writer = SanitizingWriter::new(Vec::new());
        writer
            .write_all(b"first line with 12345678Z\nsecond line clean\n")
            .expect("Should write");
        writer.flush().expect("Should flush");

        let written = String::from_utf8(writer.inner).expect("Should be UTF-8");
        assert!(written.contains("[REDACTED-ID]"));
        assert!(written.contains("second line clean"));
        assert!(!written.contains("12345678Z"));
    }
}

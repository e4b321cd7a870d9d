//! Scrubbing of PII and secret-like substrings from failure messages.
//!
//! Every error message written to an execution record or to the event log
//! passes through [`sanitize_error_message`] first. The replacements run in a
//! fixed order: emails, then IPv4 addresses, then long alphanumeric runs
//! (API keys, bearer tokens), and finally the result is truncated.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length, in characters, of a sanitized message.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

const TRUNCATION_MARKER: &str = "...";

pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";
pub const IP_PLACEHOLDER: &str = "[IP]";
pub const TOKEN_PLACEHOLDER: &str = "[TOKEN]";

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("Invalid email regex")
});

static IPV4_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("Invalid IPv4 regex")
});

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9]{20,}\b").expect("Invalid token regex"));

/// Sanitize an error message for persistence.
///
/// The output never contains a raw email address, IPv4 address, or
/// alphanumeric run of 20+ characters, and is at most
/// [`MAX_ERROR_MESSAGE_CHARS`] characters long.
pub fn sanitize_error_message(message: &str) -> String {
    truncate_chars(&redact(message), MAX_ERROR_MESSAGE_CHARS)
}

/// Apply the email, IPv4 and token replacements without truncating.
///
/// Used for captured process output that is kept on disk in full.
pub fn redact(text: &str) -> String {
    let scrubbed = EMAIL_REGEX.replace_all(text, EMAIL_PLACEHOLDER);
    let scrubbed = IPV4_REGEX.replace_all(&scrubbed, IP_PLACEHOLDER);
    TOKEN_REGEX
        .replace_all(&scrubbed, TOKEN_PLACEHOLDER)
        .into_owned()
}

/// Truncate to `limit` characters, ending with `...` when anything was cut.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let keep = limit.saturating_sub(TRUNCATION_MARKER.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

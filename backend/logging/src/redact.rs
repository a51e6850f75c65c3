//! Log Redaction Layer
//!
//! Scrubs bearer tokens, API keys and credential-looking key/value pairs from
//! strings before they reach a log sink.

use once_cell::sync::Lazy;
use regex::Regex;

static BEARER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Bearer\s+[A-Za-z0-9\-._~+/]+=*").expect("static regex"));
static API_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:sk|pk|bd)-[A-Za-z0-9]{16,}\b").expect("static regex"));
// `"token": "abc"`, `password=abc`, `apiKey: abc`
static CREDENTIAL_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)("?(?:password|passwd|secret|token|api[_-]?key|access[_-]?token|authorization)"?\s*[:=]\s*"?)([^"\s,}&]+)"#,
    )
    .expect("static regex")
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BEARER_RE.replace_all(input, "Bearer [REDACTED_TOKEN]");
    let redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_KEY]");
    CREDENTIAL_PAIR_RE.replace_all(&redacted, "${1}[REDACTED]").into_owned()
}

/// Redacts every string inside a JSON value, in place.
pub fn redact_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => *s = redact_sensitive_data(s),
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_json),
        serde_json::Value::Object(map) => map.values_mut().for_each(redact_json),
        _ => {}
    }
}

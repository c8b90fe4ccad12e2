//! Sanitization gate for untrusted content entering shared board state.
//!
//! Every function here is pure and returns a safe default on violation
//! instead of erroring: a malicious payload degrades to an empty string or
//! an escaped one, never a crash in the caller. Any participant in a session
//! can paste arbitrary text and URLs, so image sources are additionally
//! screened against loopback/private hosts (SSRF via a live `<img>` fetch).

#[cfg(test)]
#[path = "sanitize_test.rs"]
mod sanitize_test;

use serde_json::Value;

use crate::doc::AssetKind;

/// HTML-entity-escape user text before it is stored as stroke text or note
/// content.
#[must_use]
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse [`sanitize_text`] for display in plain-text contexts.
#[must_use]
pub fn unescape_text(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Data URIs accepted as inline images.
const ALLOWED_DATA_PREFIXES: [&str; 4] = [
    "data:image/png",
    "data:image/jpeg",
    "data:image/gif",
    "data:image/webp",
];

/// Validate an image URL. Returns the URL unchanged when it is `https://` to
/// a public host, a root-relative internal path, or an allow-listed
/// `data:image/...` URI; returns `""` for everything else (`http://`,
/// loopback and private-range hosts, unknown schemes).
#[must_use]
pub fn validate_image_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    // Root-relative internal paths (but not protocol-relative `//host`).
    if url.starts_with('/') && !url.starts_with("//") {
        return url.to_string();
    }

    if url.starts_with("data:") {
        if ALLOWED_DATA_PREFIXES.iter().any(|prefix| url.starts_with(prefix)) {
            return url.to_string();
        }
        return String::new();
    }

    let Some(rest) = url.strip_prefix("https://") else {
        tracing::warn!(url, "non-https image url rejected");
        return String::new();
    };

    let host_end = rest
        .find(|c| c == '/' || c == ':' || c == '?' || c == '#')
        .unwrap_or(rest.len());
    let host = rest[..host_end].to_ascii_lowercase();

    if host.is_empty() || is_internal_host(&host) {
        tracing::warn!(url, "internal image url rejected");
        return String::new();
    }

    url.to_string()
}

/// Loopback and private-range hosts a pasted image URL must never reach.
fn is_internal_host(host: &str) -> bool {
    if host == "localhost" || host == "127.0.0.1" || host == "0.0.0.0" {
        return true;
    }
    if host.starts_with("10.") || host.starts_with("192.168.") {
        return true;
    }
    // 172.16.0.0/12
    if let Some(rest) = host.strip_prefix("172.") {
        let octet = rest.split('.').next().unwrap_or("");
        if let Ok(n) = octet.parse::<u8>() {
            if (16..=31).contains(&n) {
                return true;
            }
        }
    }
    host.ends_with(".local") || host.ends_with(".internal")
}

/// Sanitize the mutable fields of an asset payload in place, dispatching by
/// the declared kind: text content is entity-escaped, image sources pass
/// [`validate_image_url`].
pub fn sanitize_component_data(kind: AssetKind, data: &mut Value) {
    let Some(fields) = data.as_object_mut() else {
        return;
    };

    let text_keys: &[&str] = match kind {
        AssetKind::Sticky => &["text", "content"],
        AssetKind::Image => &[],
    };
    for key in text_keys {
        if let Some(text) = fields.get(*key).and_then(Value::as_str) {
            let clean = sanitize_text(text);
            fields.insert((*key).to_string(), Value::String(clean));
        }
    }

    if kind == AssetKind::Image {
        for key in ["src", "url"] {
            if let Some(url) = fields.get(key).and_then(Value::as_str) {
                let clean = validate_image_url(url);
                fields.insert(key.to_string(), Value::String(clean));
            }
        }
    }
}

/// Allow-list check for an upload's MIME type.
#[must_use]
pub fn validate_file_type(mime: &str, allowed: &[&str]) -> bool {
    allowed.contains(&mime)
}

/// Byte-size ceiling check for an upload.
#[must_use]
pub fn validate_file_size(size_bytes: u64, max_bytes: u64) -> bool {
    size_bytes <= max_bytes
}

/// Reduce a filename to a safe character set, collapsing runs of
/// replacements and capping the length.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len().min(255));
    let mut last_was_underscore = false;
    for ch in filename.chars() {
        if out.len() >= 255 {
            break;
        }
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' {
            out.push(ch);
            last_was_underscore = false;
        } else if !last_was_underscore {
            out.push('_');
            last_was_underscore = true;
        }
    }
    out
}

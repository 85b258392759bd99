//! Same-document JSON pointers in `$ref` fragments.

use serde_json::Value;

use crate::error::ResolveError;

/// Location of the document root.
pub const ROOT: &str = "#";

/// Validate a `$ref` string and return its canonical location (`#/a/b`).
///
/// Only fragment references into the current document are accepted. Percent
/// escapes are decoded; `~0`/`~1` escapes are kept, since locations stay in
/// pointer syntax.
pub fn parse_reference(reference: &str) -> Result<String, ResolveError> {
    let malformed = || ResolveError::MalformedReference(reference.to_string());

    let fragment = reference.strip_prefix('#').ok_or_else(malformed)?;
    if !fragment.is_empty() && !fragment.starts_with('/') {
        return Err(malformed());
    }

    let decoded = percent_decode(fragment).ok_or_else(malformed)?;

    let mut chars = decoded.chars();
    while let Some(ch) = chars.next() {
        if ch == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return Err(malformed());
        }
    }

    Ok(format!("#{decoded}"))
}

/// Look up a canonical location in the document.
pub fn lookup<'a>(document: &'a Value, location: &str) -> Option<&'a Value> {
    let pointer = location.strip_prefix('#')?;
    document.pointer(pointer)
}

/// Append one segment to a location, escaping it.
pub fn child(location: &str, segment: &str) -> String {
    format!("{location}/{}", escape(segment))
}

/// Escape a single pointer segment.
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape`] for a single segment.
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Location of a named component in one of the `components` sections.
pub fn component(section: &str, name: &str) -> String {
    child(&format!("#/components/{section}"), name)
}

/// The component name when `location` is exactly `#/components/<section>/<name>`.
pub fn component_name(location: &str, section: &str) -> Option<String> {
    let prefix = format!("#/components/{section}/");
    let rest = location.strip_prefix(&prefix)?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(unescape(rest))
}

fn percent_decode(input: &str) -> Option<String> {
    if !input.contains('%') {
        return Some(input.to_string());
    }
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

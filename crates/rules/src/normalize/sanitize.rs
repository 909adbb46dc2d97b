//! String sanitizers applied to configuration input before it becomes a rule.
//!
//! ASCII-oriented: characters outside the allowed sets are dropped, never
//! transliterated.

use serde_yaml::Value;

/// Remove `<...>` markup. An unterminated tag drops the rest of the input.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Remove percent-encoded octets such as `%20`.
fn strip_octets(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            i += 3;
            continue;
        }
        // `i` stays on a char boundary: skipped octets are ASCII.
        let ch = input[i..].chars().next().unwrap_or_default();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Plain text field: markup, octets and control characters removed,
/// whitespace runs collapsed to one space, ends trimmed.
pub fn sanitize_text(input: &str) -> String {
    let cleaned: String = strip_octets(&strip_tags(input))
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// HTML class token: only `A-Z a-z 0-9 _ -` survive.
pub fn sanitize_html_class(input: &str) -> String {
    strip_octets(input)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Lowercase dash-separated slug: whitespace and dots become `-`, other
/// punctuation is removed, dash runs collapse, edge dashes are trimmed.
pub fn sanitize_title(input: &str) -> String {
    let text = strip_octets(&strip_tags(input)).to_ascii_lowercase();
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' | '_' => Some(ch),
            '-' | '.' => Some('-'),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        };
        if let Some(c) = mapped {
            if c == '-' && slug.ends_with('-') {
                continue;
            }
            slug.push(c);
        }
    }
    slug.trim_matches('-').to_string()
}

/// Attribute key: `A-Z a-z 0-9 _ -`, case preserved.
pub fn sanitize_attribute_key(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Loose truthiness of a configuration value: null, `false`, `0`, `""`,
/// `"0"` and empty collections are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => truthy(&tagged.value),
    }
}

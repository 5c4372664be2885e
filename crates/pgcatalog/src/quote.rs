//! SQL quoting
//!
//! Identifiers (database, role and tablespace names) and literals (encoding
//! and locale names) follow different escaping rules. Keep them apart: a
//! quoted identifier in a literal position, or the reverse, is either a
//! syntax error or an injection.

/// Quote an identifier: wrap in double quotes, doubling embedded ones
///
/// Anything from the first NUL byte on is dropped, as the server would.
pub fn quote_identifier(name: &str) -> String {
    let name = truncate_at_nul(name);
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal: wrap in single quotes, doubling embedded ones
///
/// Values containing backslashes use the `E'...'` form with backslashes
/// doubled, so the result is the same whatever
/// `standard_conforming_strings` is set to.
pub fn quote_literal(value: &str) -> String {
    let value = truncate_at_nul(value);
    let escaped = value.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{escaped}'")
    }
}

fn truncate_at_nul(s: &str) -> &str {
    match s.find('\0') {
        Some(i) => &s[..i],
        None => s,
    }
}

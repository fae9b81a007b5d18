// SPDX-License-Identifier: Apache-2.0

//! Literal interpolation of PostgreSQL `$n` placeholders
//!
//! Produces the human-readable statement stored in the audit trail. The
//! output is never executed.

use once_cell::sync::Lazy;
use regex::Regex;

use sqlaudit_core::Value;

/// Marker left in place of a placeholder with no bound argument
pub const MISSING_ARGUMENT: &str = "?";

static DOLLAR_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$([A-Za-z_][A-Za-z0-9_]*)?\$").unwrap());

/// Replaces every `$n` placeholder with the literal of argument `n`.
///
/// Placeholders are visited in order of occurrence. Quoted literals,
/// quoted identifiers, dollar-quoted bodies and comments are copied
/// untouched.
pub fn interpolate(sql: &str, args: &[Value]) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + args.len() * 8);
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => i = skip_quoted(bytes, i + 1, quote),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |idx| i + idx + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = sql[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |idx| i + 2 + idx + 2);
            }
            b'$' if !follows_identifier(bytes, i) => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if digits > 0 {
                    let end = i + 1 + digits;
                    out.push_str(&sql[last..i]);
                    match argument(&sql[i + 1..end], args) {
                        Some(value) => out.push_str(&format_value(value)),
                        None => out.push_str(MISSING_ARGUMENT),
                    }
                    last = end;
                    i = end;
                } else {
                    i = skip_dollar_quoted(sql, i);
                }
            }
            _ => i += 1,
        }
    }

    out.push_str(&sql[last..]);
    out
}

/// Renders a value as a SQL literal
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Text(s) => quote(s),
        // hex digits and timestamps never contain quotes
        Value::Bytes(_) | Value::Timestamp(_) => format!("'{value}'"),
        other => quote(&other.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `$n` is 1-based; `$0` and out-of-range positions have no argument.
fn argument<'a>(digits: &str, args: &'a [Value]) -> Option<&'a Value> {
    let position: usize = digits.parse().ok()?;
    args.get(position.checked_sub(1)?)
}

fn follows_identifier(bytes: &[u8], i: usize) -> bool {
    i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_')
}

/// Index just past the closing quote; a doubled quote re-enters the scan
/// as a new quoted run, which yields the same boundaries.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    bytes[start..]
        .iter()
        .position(|b| *b == quote)
        .map_or(bytes.len(), |idx| start + idx + 1)
}

fn skip_dollar_quoted(sql: &str, i: usize) -> usize {
    let Some(tag) = DOLLAR_TAG.find(&sql[i..]) else {
        return i + 1;
    };
    let body = i + tag.end();
    sql[body..]
        .find(tag.as_str())
        .map_or(sql.len(), |idx| body + idx + tag.as_str().len())
}

// SPDX-License-Identifier: Apache-2.0

//! Target table and action of a data-modifying statement

use once_cell::sync::Lazy;
use regex::Regex;

use sqlaudit_core::{BuildError, ModificationAction};

use crate::classifier::strip_leading;

/// One identifier part: `"quoted"`, `` `quoted` ``, `[quoted]` or bare
const IDENT: &str = r#"(?:"(?:[^"]|"")+"|`[^`]+`|\[[^\]]+\]|[^\s"`\[\]().,;]+)"#;

static INSERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^INSERT\s+INTO\s+({IDENT}(?:\s*\.\s*{IDENT})*)")).unwrap()
});
static UPDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^UPDATE\s+(?:ONLY\s+)?({IDENT}(?:\s*\.\s*{IDENT})*)"
    ))
    .unwrap()
});
static DELETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^DELETE\s+FROM\s+(?:ONLY\s+)?({IDENT}(?:\s*\.\s*{IDENT})*)"
    ))
    .unwrap()
});
static IDENT_PART: Lazy<Regex> = Lazy::new(|| Regex::new(IDENT).unwrap());

/// The table a statement modifies and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAction {
    pub table: String,
    pub action: ModificationAction,
}

/// Locates the table and action of a statement already classified as DML
pub trait TableActionExtractor: Send + Sync {
    fn extract(&self, sql: &str) -> Result<TableAction, BuildError>;
}

/// Pattern-based extractor
///
/// Only the table following `INSERT INTO`, `UPDATE` or `DELETE FROM` is
/// reported; tables reached through joins or `USING` are not.
/// Names are kept as written: quotes are removed, case is preserved and a
/// schema qualifier stays part of the name (`"Sales"."Orders"` becomes
/// `Sales.Orders`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexExtractor;

impl TableActionExtractor for RegexExtractor {
    fn extract(&self, sql: &str) -> Result<TableAction, BuildError> {
        let head = strip_leading(sql);

        let patterns: [(&Lazy<Regex>, ModificationAction); 3] = [
            (&INSERT_RE, ModificationAction::Insert),
            (&UPDATE_RE, ModificationAction::Update),
            (&DELETE_RE, ModificationAction::Delete),
        ];

        for (pattern, action) in patterns {
            if let Some(name) = pattern.captures(head).and_then(|c| c.get(1)) {
                return Ok(TableAction {
                    table: unquote_name(name.as_str()),
                    action,
                });
            }
        }

        Err(BuildError::ExtractionFailed {
            sql: sql.to_string(),
        })
    }
}

fn unquote_name(name: &str) -> String {
    IDENT_PART
        .find_iter(name)
        .map(|part| unquote_part(part.as_str()))
        .collect::<Vec<_>>()
        .join(".")
}

fn unquote_part(part: &str) -> String {
    if let Some(ident) = enclosed(part, '"', '"') {
        ident.replace("\"\"", "\"")
    } else if let Some(ident) = enclosed(part, '`', '`').or_else(|| enclosed(part, '[', ']')) {
        ident.to_string()
    } else {
        part.to_string()
    }
}

fn enclosed(part: &str, open: char, close: char) -> Option<&str> {
    part.strip_prefix(open)?.strip_suffix(close)
}

// SPDX-License-Identifier: Apache-2.0

//! Data-modification classifier
//!
//! Every statement issued through an audited connection passes through here,
//! most of them reads. A cheap keyword check on the statement head rejects
//! those before the full PostgreSQL parser runs.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

static QUICK_DML: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(INSERT|UPDATE|DELETE)\b").unwrap());
static WITH_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^WITH(\s+RECURSIVE)?\b").unwrap());
static AS_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^AS\b").unwrap());

/// Outcome of classifying a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// INSERT, UPDATE or DELETE
    Modifying,
    /// Reads, DDL, session commands
    NotModifying,
    /// Looked like DML but could not be parsed
    Ambiguous,
}

impl Classification {
    /// Ambiguous statements are not audited.
    pub fn is_modifying(&self) -> bool {
        matches!(self, Self::Modifying)
    }
}

/// Decides whether a statement must produce an audit record
pub trait StatementClassifier: Send + Sync {
    fn classify(&self, sql: &str) -> Classification;

    fn is_modifying(&self, sql: &str) -> bool {
        self.classify(sql).is_modifying()
    }
}

/// Keyword pre-check followed by a full `sqlparser` parse
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl StatementClassifier for HeuristicClassifier {
    fn classify(&self, sql: &str) -> Classification {
        let head = strip_leading(sql);
        if head.is_empty() {
            return Classification::Ambiguous;
        }
        if !QUICK_DML.is_match(head) {
            return Classification::NotModifying;
        }

        match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
            Ok(statements) if statements.is_empty() => Classification::Ambiguous,
            Ok(statements) => {
                if statements.iter().any(is_modifying_statement) {
                    Classification::Modifying
                } else {
                    Classification::NotModifying
                }
            }
            Err(e) => {
                debug!(error = %e, "Unparseable statement treated as not modifying");
                Classification::Ambiguous
            }
        }
    }
}

fn is_modifying_statement(statement: &Statement) -> bool {
    match statement {
        Statement::Insert { .. } | Statement::Update { .. } | Statement::Delete { .. } => true,
        // `WITH ... INSERT` parses as a query wrapping the DML body
        Statement::Query(query) => !matches!(
            *query.body,
            SetExpr::Select(_)
                | SetExpr::Query(_)
                | SetExpr::SetOperation { .. }
                | SetExpr::Values(_)
                | SetExpr::Table(_)
        ),
        _ => false,
    }
}

/// Returns the statement starting at its leading verb.
///
/// Skips whitespace, `--` and `/* */` comments, and a leading
/// `WITH [RECURSIVE]` clause. Returns an empty string when nothing but
/// comments remain.
pub fn strip_leading(sql: &str) -> &str {
    let s = skip_trivia(sql);
    match strip_with_clause(s) {
        Some(rest) => rest,
        None => s,
    }
}

fn skip_trivia(mut s: &str) -> &str {
    loop {
        s = s.trim_start();
        if let Some(rest) = s.strip_prefix("--") {
            match rest.find('\n') {
                Some(idx) => s = &rest[idx + 1..],
                None => return "",
            }
        } else if let Some(rest) = s.strip_prefix("/*") {
            match rest.find("*/") {
                Some(idx) => s = &rest[idx + 2..],
                None => return "",
            }
        } else {
            return s;
        }
    }
}

/// Skips `WITH name [(cols)] AS [[NOT] MATERIALIZED] (body) [, ...]`.
///
/// Bodies are matched by paren depth; quotes and comments inside them are
/// honored. `None` when the clause is absent or never closes.
fn strip_with_clause(s: &str) -> Option<&str> {
    let prefix = WITH_PREFIX.find(s)?;
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = prefix.end();

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => match s[i..].find('\n') {
                Some(idx) => i += idx,
                None => return None,
            },
            b'/' if bytes.get(i + 1) == Some(&b'*') => match s[i + 2..].find("*/") {
                Some(idx) => i += idx + 3,
                None => return None,
            },
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let rest = skip_trivia(&s[i + 1..]);
                    // a column list is followed by AS, a CTE body by a comma
                    // or the main statement
                    if !rest.starts_with(',') && !AS_KEYWORD.is_match(rest) {
                        return Some(rest);
                    }
                    i = s.len() - rest.len();
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

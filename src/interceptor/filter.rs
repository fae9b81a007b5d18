// SPDX-License-Identifier: Apache-2.0

//! Table filters
//!
//! Decide which tables are in audit scope. Filters are pure predicates over
//! the extracted table name; a [`TableFilters`] chain accepts a table only
//! when every member does.

use std::fmt;
use std::sync::Arc;

use glob::{Pattern, PatternError};

/// Predicate deciding whether modifications of a table are recorded
pub trait TableFilter: Send + Sync {
    fn should_log(&self, table: &str) -> bool;
}

impl<F> TableFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn should_log(&self, table: &str) -> bool {
        self(table)
    }
}

/// Rejects tables whose name starts with any of the prefixes
#[derive(Debug, Clone)]
pub struct ExcludePrefixFilter {
    prefixes: Vec<String>,
}

impl ExcludePrefixFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl TableFilter for ExcludePrefixFilter {
    fn should_log(&self, table: &str) -> bool {
        !self.prefixes.iter().any(|prefix| table.starts_with(prefix.as_str()))
    }
}

/// Accepts only tables matching at least one shell-style pattern
#[derive(Debug, Clone)]
pub struct IncludePatternFilter {
    patterns: Vec<Pattern>,
}

impl IncludePatternFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: compile(patterns)?,
        })
    }
}

impl TableFilter for IncludePatternFilter {
    fn should_log(&self, table: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(table))
    }
}

/// Rejects tables matching any shell-style pattern
#[derive(Debug, Clone)]
pub struct ExcludePatternFilter {
    patterns: Vec<Pattern>,
}

impl ExcludePatternFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: compile(patterns)?,
        })
    }
}

impl TableFilter for ExcludePatternFilter {
    fn should_log(&self, table: &str) -> bool {
        !self.patterns.iter().any(|p| p.matches(table))
    }
}

fn compile<I, S>(patterns: I) -> Result<Vec<Pattern>, PatternError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| Pattern::new(p.as_ref()))
        .collect()
}

/// Ordered AND-chain of filters. An empty chain audits every table.
#[derive(Clone, Default)]
pub struct TableFilters {
    filters: Vec<Arc<dyn TableFilter>>,
}

impl TableFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl TableFilter + 'static) -> Self {
        self.push(filter);
        self
    }

    pub fn push(&mut self, filter: impl TableFilter + 'static) {
        self.filters.push(Arc::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl TableFilter for TableFilters {
    fn should_log(&self, table: &str) -> bool {
        self.filters.iter().all(|f| f.should_log(table))
    }
}

impl fmt::Debug for TableFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFilters")
            .field("len", &self.filters.len())
            .finish()
    }
}

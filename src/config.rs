// SPDX-License-Identifier: Apache-2.0

//! Audit Configuration
//!
//! JSON configuration of the audit driver. Every field is optional; a
//! missing file yields the defaults (audit everything into
//! `database_modifications`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::interceptor::{
    AuditOptions, AuditTable, ExcludePatternFilter, ExcludePrefixFilter, IncludePatternFilter,
    TableFilters, DEFAULT_AUDIT_TABLE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid table pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
    /// Write to a daily rolling file in this directory instead of stderr
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
            directory: None,
        }
    }
}

fn default_log_filter() -> String {
    "sqlaudit=info".to_string()
}

fn default_audit_table() -> String {
    DEFAULT_AUDIT_TABLE.to_string()
}

/// Audit driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Table receiving audit rows (may be schema-qualified)
    #[serde(default = "default_audit_table")]
    pub audit_table: String,
    /// Disable auditing and force read-only transactions
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub exclude_table_prefixes: Vec<String>,
    #[serde(default)]
    pub exclude_table_patterns: Vec<String>,
    /// When non-empty, only matching tables are audited
    #[serde(default)]
    pub include_table_patterns: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            audit_table: default_audit_table(),
            read_only: false,
            exclude_table_prefixes: Vec::new(),
            exclude_table_patterns: Vec::new(),
            include_table_patterns: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No audit config file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AuditConfig = serde_json::from_str(&content)?;

        info!("Loaded audit configuration from {:?}", path);
        Ok(config)
    }

    /// Builds the filter chain; empty lists add no filter
    pub fn table_filters(&self) -> Result<TableFilters, ConfigError> {
        let mut filters = TableFilters::new();

        if !self.exclude_table_prefixes.is_empty() {
            filters.push(ExcludePrefixFilter::new(self.exclude_table_prefixes.iter().cloned()));
        }
        if !self.exclude_table_patterns.is_empty() {
            filters.push(
                ExcludePatternFilter::new(&self.exclude_table_patterns)
                    .map_err(|source| invalid_pattern(&self.exclude_table_patterns, source))?,
            );
        }
        if !self.include_table_patterns.is_empty() {
            filters.push(
                IncludePatternFilter::new(&self.include_table_patterns)
                    .map_err(|source| invalid_pattern(&self.include_table_patterns, source))?,
            );
        }

        Ok(filters)
    }

    /// Options with the default strategies and this configuration's switches
    pub fn into_options(self) -> Result<AuditOptions, ConfigError> {
        let table_filters = self.table_filters()?;
        Ok(AuditOptions {
            table_filters,
            read_only: self.read_only,
            audit_table: AuditTable::new(self.audit_table),
            ..AuditOptions::default()
        })
    }
}

/// Names the first offending pattern of the list
fn invalid_pattern(patterns: &[String], source: glob::PatternError) -> ConfigError {
    let pattern = patterns
        .iter()
        .find(|p| glob::Pattern::new(p).is_err())
        .cloned()
        .unwrap_or_default();
    ConfigError::Pattern { pattern, source }
}

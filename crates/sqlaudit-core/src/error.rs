// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the audit driver
//!
//! Driver failures are mapped to [`EngineError`]. Failures of the audit
//! pipeline itself are carried by [`AuditError`] and surface to callers as
//! [`EngineError::Audit`], so "the data write failed" stays distinguishable
//! from "the data write was refused or rolled back because it could not be
//! audited".

use std::fmt;

use thiserror::Error;

/// Unified error type for all operations on a (wrapped) connection
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Query syntax error: {message}")]
    SyntaxError { message: String },

    #[error("Query execution error: {message}")]
    ExecutionError { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Feature not supported: {message}")]
    NotSupported { message: String },

    #[error("Transaction error: {message}")]
    TransactionError { message: String },

    #[error("Audit failure: {0}")]
    Audit(Box<AuditError>),
}

impl EngineError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: msg.into() }
    }

    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError { message: msg.into() }
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported { message: msg.into() }
    }

    pub fn transaction_error(msg: impl Into<String>) -> Self {
        Self::TransactionError { message: msg.into() }
    }

    /// Returns the audit failure, if this error was raised by the audit layer
    pub fn audit_error(&self) -> Option<&AuditError> {
        match self {
            Self::Audit(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_audit_failure(&self) -> bool {
        matches!(self, Self::Audit(_))
    }
}

impl From<AuditError> for EngineError {
    fn from(err: AuditError) -> Self {
        Self::Audit(Box::new(err))
    }
}

impl From<BuildError> for EngineError {
    fn from(err: BuildError) -> Self {
        Self::Audit(Box::new(AuditError::Build(err)))
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of the modification-capture pipeline
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to build database modification: {0}")]
    Build(#[from] BuildError),

    #[error("{target} does not support {capability}")]
    CapabilityUnsupported {
        target: CapabilityTarget,
        capability: Capability,
    },

    #[error("failed to log database modification: {source}")]
    WriteFailed {
        #[source]
        source: Box<EngineError>,
    },

    /// The batched insert at commit failed and the transaction was rolled
    /// back instead of committed.
    #[error(
        "failed to flush {count} buffered database modification(s) at commit, transaction rolled back{}: {source}",
        rollback_note(.rollback)
    )]
    FlushFailed {
        count: usize,
        #[source]
        source: Box<EngineError>,
        rollback: Option<Box<EngineError>>,
    },

    #[error("commit aborted by cancellation, transaction rolled back{}", rollback_note(.rollback))]
    CommitAborted { rollback: Option<Box<EngineError>> },

    /// An audited statement of the transaction never reported completion
    /// (its future was dropped), so whether it was applied is unknown. The
    /// transaction was rolled back rather than committed without its record.
    #[error(
        "audited statement was interrupted before completing, transaction rolled back{}",
        rollback_note(.rollback)
    )]
    StatementInterrupted { rollback: Option<Box<EngineError>> },
}

fn rollback_note(rollback: &Option<Box<EngineError>>) -> String {
    match rollback {
        Some(err) => format!(" (rollback also failed: {err})"),
        None => String::new(),
    }
}

/// A statement classified as modifying could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("could not parse action and table from SQL: {sql}")]
    ExtractionFailed { sql: String },

    #[error("{0} not found in context")]
    IdentityMissing(Identity),
}

/// The attribution values carried by an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Operator,
    Execution,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator => f.write_str("operator ID"),
            Self::Execution => f.write_str("execution ID"),
        }
    }
}

/// Optional facets of a wrapped connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Exec,
    Query,
    Prepare,
    Transactions,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exec => f.write_str("statement execution"),
            Self::Query => f.write_str("query execution"),
            Self::Prepare => f.write_str("statement preparation"),
            Self::Transactions => f.write_str("transactions"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityTarget {
    Connection,
    Transaction,
}

impl fmt::Display for CapabilityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => f.write_str("connection"),
            Self::Transaction => f.write_str("transaction"),
        }
    }
}

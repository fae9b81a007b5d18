// SQL Audit - transparent audit trail for database modifications
// Core library

pub mod config;
pub mod engine;
pub mod interceptor;
pub mod observability;

pub use config::{AuditConfig, ConfigError, LoggingConfig};
pub use engine::drivers::{PostgresConfig, PostgresConnection};
pub use interceptor::{AuditDriver, AuditOptions, AuditedConnection};
pub use observability::init_tracing;

pub use sqlaudit_core::{
    AuditError, BuildError, Capability, CapabilityTarget, EngineError, EngineResult, ExecContext,
    Identity, ModificationAction, ModificationRecord,
};
pub use sqlaudit_sql::{Classification, StatementClassifier, TableAction, TableActionExtractor};

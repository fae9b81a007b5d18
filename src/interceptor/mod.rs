//! Audit Interceptor
//!
//! Captures every data-modifying statement issued through a wrapped
//! connection:
//! - **Builder**: classification, table extraction, identity and filters
//! - **Direct path**: one audit insert ahead of each statement outside a transaction
//! - **Commit gate**: buffered records flushed in one batch inside the transaction
//!
//! Audit failures abort the operation they would have recorded.

pub mod buffer;
pub mod builder;
pub mod connection;
pub mod driver;
pub mod filter;
pub mod logger;
pub mod storage;
pub mod transaction;

pub use buffer::ModificationBuffer;
pub use builder::{
    ContextExecutionId, ContextOperatorId, ExecutionIdExtractor, IdGenerator, ModificationBuilder,
    OperatorIdExtractor, UuidGenerator,
};
pub use connection::AuditedConnection;
pub use driver::{AuditDriver, AuditOptions};
pub use filter::{
    ExcludePatternFilter, ExcludePrefixFilter, IncludePatternFilter, TableFilter, TableFilters,
};
pub use logger::{ModificationLogger, NoopLogger, TracingLogger};
pub use storage::{AuditInsert, AuditTable, DEFAULT_AUDIT_TABLE};
pub use transaction::TxState;

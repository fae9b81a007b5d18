// SPDX-License-Identifier: Apache-2.0

//! Secondary logger for audit write failures
//!
//! Invoked when a direct audit insert fails. The failed operation is still
//! reported to the caller; this hook only makes the lost record observable.

use tracing::error;

use sqlaudit_core::{EngineError, ExecContext, ModificationRecord};

use crate::observability::Sensitive;

pub trait ModificationLogger: Send + Sync {
    fn log_failure(&self, ctx: &ExecContext, record: &ModificationRecord, error: &EngineError);
}

/// Emits an `error` event; the interpolated SQL is redacted
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ModificationLogger for TracingLogger {
    fn log_failure(&self, _ctx: &ExecContext, record: &ModificationRecord, error: &EngineError) {
        error!(
            record_id = %record.id,
            operator_id = %record.operator_id,
            execution_id = %record.execution_id,
            table = %record.table_name,
            action = %record.action,
            sql = %Sensitive::new(&record.sql),
            error = %error,
            "Failed to write database modification"
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl ModificationLogger for NoopLogger {
    fn log_failure(&self, _ctx: &ExecContext, _record: &ModificationRecord, _error: &EngineError) {}
}

// SPDX-License-Identifier: Apache-2.0

//! Modification builder
//!
//! Turns an intercepted statement into a [`ModificationRecord`], or decides
//! that none is needed. Every sourcing step is a pluggable strategy so the
//! surrounding application can change how IDs and identities are obtained.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use sqlaudit_core::{BuildError, ExecContext, Identity, ModificationRecord, Value};
use sqlaudit_sql::{interpolate, StatementClassifier, TableAction, TableActionExtractor};

use super::filter::{TableFilter, TableFilters};
use crate::observability::Sensitive;

/// Generates the primary key of each record
pub trait IdGenerator: Send + Sync {
    fn generate_id(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate_id(&self) -> String {
        self()
    }
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Resolves the acting operator of a statement
pub trait OperatorIdExtractor: Send + Sync {
    fn extract_operator_id(&self, ctx: &ExecContext) -> Result<String, BuildError>;
}

impl<F> OperatorIdExtractor for F
where
    F: Fn(&ExecContext) -> Result<String, BuildError> + Send + Sync,
{
    fn extract_operator_id(&self, ctx: &ExecContext) -> Result<String, BuildError> {
        self(ctx)
    }
}

/// Resolves the logical execution a statement belongs to
pub trait ExecutionIdExtractor: Send + Sync {
    fn extract_execution_id(&self, ctx: &ExecContext) -> Result<String, BuildError>;
}

impl<F> ExecutionIdExtractor for F
where
    F: Fn(&ExecContext) -> Result<String, BuildError> + Send + Sync,
{
    fn extract_execution_id(&self, ctx: &ExecContext) -> Result<String, BuildError> {
        self(ctx)
    }
}

/// Reads [`ExecContext::operator_id`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextOperatorId;

impl OperatorIdExtractor for ContextOperatorId {
    fn extract_operator_id(&self, ctx: &ExecContext) -> Result<String, BuildError> {
        ctx.operator_id().map(str::to_owned)
    }
}

/// Reads [`ExecContext::execution_id`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextExecutionId;

impl ExecutionIdExtractor for ContextExecutionId {
    fn extract_execution_id(&self, ctx: &ExecContext) -> Result<String, BuildError> {
        ctx.execution_id().map(str::to_owned)
    }
}

/// Builds modification records from intercepted statements
#[derive(Clone)]
pub struct ModificationBuilder {
    pub(crate) classifier: Arc<dyn StatementClassifier>,
    pub(crate) table_action_extractor: Arc<dyn TableActionExtractor>,
    pub(crate) id_generator: Arc<dyn IdGenerator>,
    pub(crate) operator_id_extractor: Arc<dyn OperatorIdExtractor>,
    pub(crate) execution_id_extractor: Arc<dyn ExecutionIdExtractor>,
    pub(crate) table_filters: TableFilters,
}

impl Default for ModificationBuilder {
    fn default() -> Self {
        Self {
            classifier: Arc::new(sqlaudit_sql::HeuristicClassifier),
            table_action_extractor: Arc::new(sqlaudit_sql::RegexExtractor),
            id_generator: Arc::new(UuidGenerator),
            operator_id_extractor: Arc::new(ContextOperatorId),
            execution_id_extractor: Arc::new(ContextExecutionId),
            table_filters: TableFilters::default(),
        }
    }
}

impl ModificationBuilder {
    /// Returns `None` for statements that do not modify data and for
    /// tables the filter chain excludes.
    ///
    /// A modifying statement whose table cannot be extracted, or that runs
    /// without an operator or execution ID, is an error: it must not reach
    /// the database unattributed.
    pub fn build(
        &self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> Result<Option<ModificationRecord>, BuildError> {
        if !self.classifier.is_modifying(sql) {
            return Ok(None);
        }

        let TableAction { table, action } = self.table_action_extractor.extract(sql)?;

        let operator_id = self.operator_id_extractor.extract_operator_id(ctx)?;
        if operator_id.is_empty() {
            return Err(BuildError::IdentityMissing(Identity::Operator));
        }
        let execution_id = self.execution_id_extractor.extract_execution_id(ctx)?;
        if execution_id.is_empty() {
            return Err(BuildError::IdentityMissing(Identity::Execution));
        }

        if !self.table_filters.should_log(&table) {
            debug!(table = %table, "Table excluded from audit");
            return Ok(None);
        }

        let record = ModificationRecord {
            id: self.id_generator.generate_id(),
            operator_id,
            execution_id,
            table_name: table,
            action,
            sql: interpolate(sql, args),
            modified_at: Utc::now(),
        };

        debug!(
            table = %record.table_name,
            action = %record.action,
            execution_id = %record.execution_id,
            sql = %Sensitive::new(&record.sql),
            "Built database modification"
        );

        Ok(Some(record))
    }
}

impl fmt::Debug for ModificationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModificationBuilder")
            .field("table_filters", &self.table_filters)
            .finish_non_exhaustive()
    }
}

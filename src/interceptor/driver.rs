// SPDX-License-Identifier: Apache-2.0

//! Audit driver factory
//!
//! An [`AuditDriver`] is assembled once from [`AuditOptions`] and is
//! immutable afterwards. Cloning it is cheap; every wrapped connection holds
//! its own clone and shares nothing mutable with other connections.

use std::sync::Arc;

use tracing::{debug, info};

use sqlaudit_core::{
    AuditError, BuildError, Connection, Execer, ExecContext, ModificationRecord, Value,
};
use sqlaudit_sql::{HeuristicClassifier, RegexExtractor, StatementClassifier, TableActionExtractor};

use super::builder::{
    ContextExecutionId, ContextOperatorId, ExecutionIdExtractor, IdGenerator,
    ModificationBuilder, OperatorIdExtractor, UuidGenerator,
};
use super::connection::AuditedConnection;
use super::filter::TableFilters;
use super::logger::{ModificationLogger, TracingLogger};
use super::storage::AuditTable;
use crate::engine::drivers::postgres::{PostgresConfig, PostgresConnection};
use crate::observability::Sensitive;

/// Strategies and switches of an [`AuditDriver`]
#[derive(Clone)]
pub struct AuditOptions {
    pub id_generator: Arc<dyn IdGenerator>,
    pub operator_id_extractor: Arc<dyn OperatorIdExtractor>,
    pub execution_id_extractor: Arc<dyn ExecutionIdExtractor>,
    pub table_filters: TableFilters,
    /// Suppresses all auditing and forces read-only transactions
    pub read_only: bool,
    /// Invoked when a direct audit insert fails
    pub logger: Arc<dyn ModificationLogger>,
    pub audit_table: AuditTable,
    pub classifier: Arc<dyn StatementClassifier>,
    pub table_action_extractor: Arc<dyn TableActionExtractor>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            id_generator: Arc::new(UuidGenerator),
            operator_id_extractor: Arc::new(ContextOperatorId),
            execution_id_extractor: Arc::new(ContextExecutionId),
            table_filters: TableFilters::default(),
            read_only: false,
            logger: Arc::new(TracingLogger),
            audit_table: AuditTable::default(),
            classifier: Arc::new(HeuristicClassifier),
            table_action_extractor: Arc::new(RegexExtractor),
        }
    }
}

struct DriverInner {
    builder: ModificationBuilder,
    audit_table: AuditTable,
    read_only: bool,
    logger: Arc<dyn ModificationLogger>,
}

/// Wraps connections so that every data modification is audited
#[derive(Clone)]
pub struct AuditDriver {
    inner: Arc<DriverInner>,
}

impl Default for AuditDriver {
    fn default() -> Self {
        Self::new(AuditOptions::default())
    }
}

impl AuditDriver {
    pub fn new(options: AuditOptions) -> Self {
        let builder = ModificationBuilder {
            classifier: options.classifier,
            table_action_extractor: options.table_action_extractor,
            id_generator: options.id_generator,
            operator_id_extractor: options.operator_id_extractor,
            execution_id_extractor: options.execution_id_extractor,
            table_filters: options.table_filters,
        };

        Self {
            inner: Arc::new(DriverInner {
                builder,
                audit_table: options.audit_table,
                read_only: options.read_only,
                logger: options.logger,
            }),
        }
    }

    /// Wraps an open connection
    pub fn wrap<C: Connection>(&self, conn: C) -> AuditedConnection<C> {
        AuditedConnection::new(conn, self.clone())
    }

    /// Opens a PostgreSQL connection and wraps it
    pub async fn connect_postgres(
        &self,
        config: &PostgresConfig,
    ) -> sqlaudit_core::EngineResult<AuditedConnection<PostgresConnection>> {
        let conn = PostgresConnection::connect(config).await?;
        info!(
            url = %config.url,
            audit_table = self.inner.audit_table.name(),
            read_only = self.inner.read_only,
            "Opened audited PostgreSQL connection"
        );
        Ok(self.wrap(conn))
    }

    pub fn read_only(&self) -> bool {
        self.inner.read_only
    }

    pub fn audit_table(&self) -> &AuditTable {
        &self.inner.audit_table
    }

    pub fn builder(&self) -> &ModificationBuilder {
        &self.inner.builder
    }

    /// Builds the record for a statement; never builds in read-only mode
    pub(crate) fn build(
        &self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> Result<Option<ModificationRecord>, BuildError> {
        if self.inner.read_only {
            return Ok(None);
        }
        self.inner.builder.build(ctx, sql, args)
    }

    /// Inserts one record through `execer`, outside any transaction
    pub(crate) async fn write_record(
        &self,
        ctx: &ExecContext,
        execer: &mut dyn Execer,
        record: &ModificationRecord,
    ) -> Result<(), AuditError> {
        let insert = self.inner.audit_table.insert_one(record);
        if let Err(e) = execer.exec(ctx, &insert.sql, &insert.args).await {
            self.inner.logger.log_failure(ctx, record, &e);
            return Err(AuditError::WriteFailed {
                source: Box::new(e),
            });
        }

        debug!(
            record_id = %record.id,
            table = %record.table_name,
            action = %record.action,
            execution_id = %record.execution_id,
            sql = %Sensitive::new(&record.sql),
            "Wrote database modification"
        );
        Ok(())
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Audited connection
//!
//! Decorates a wrapped [`Connection`] and implements every facet itself.
//! Outside a transaction a modifying statement is recorded with a direct
//! insert before it runs; if that insert fails the statement never runs.
//! Inside a transaction records are buffered and flushed at commit (see
//! [`super::transaction`]).

use async_trait::async_trait;
use tracing::warn;

use sqlaudit_core::{
    AuditError, Capability, CapabilityTarget, Connection, EngineResult, ExecContext, ExecResult,
    Execer, ModificationRecord, PreparedStatement, Preparer, QueryResult, Queryer,
    Transactional, Value,
};

use super::driver::AuditDriver;
use super::transaction::TxState;

/// A connection whose data modifications are audited
pub struct AuditedConnection<C> {
    pub(crate) inner: C,
    pub(crate) driver: AuditDriver,
    pub(crate) tx: TxState,
}

impl<C: Connection> AuditedConnection<C> {
    pub fn new(inner: C, driver: AuditDriver) -> Self {
        Self {
            inner,
            driver,
            tx: TxState::Idle,
        }
    }

    pub fn driver(&self) -> &AuditDriver {
        &self.driver
    }

    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Direct access to the wrapped connection; statements issued through it
    /// are not audited
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Unwraps the connection. A transaction still open is left to the
    /// wrapped connection and its buffered records are dropped.
    pub fn into_inner(self) -> C {
        self.inner
    }

    pub fn in_transaction(&self) -> bool {
        !matches!(self.tx, TxState::Idle)
    }

    /// Runs before the wrapped statement.
    ///
    /// Checks that `facet` exists and builds the record. Outside a
    /// transaction the record is written immediately; inside one it is
    /// returned so the caller can buffer it once the statement succeeded.
    async fn intercept(
        &mut self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
        facet: Capability,
    ) -> EngineResult<Option<ModificationRecord>> {
        self.settle().await?;

        let available = match facet {
            Capability::Exec => self.inner.as_execer().is_some(),
            Capability::Query => self.inner.as_queryer().is_some(),
            Capability::Prepare => self.inner.as_preparer().is_some(),
            Capability::Transactions => self.inner.as_transactional().is_some(),
        };
        if !available {
            return Err(unsupported(CapabilityTarget::Connection, facet).into());
        }

        let Some(record) = self.driver.build(ctx, sql, args)? else {
            return Ok(None);
        };

        if self.tx.is_open() {
            return Ok(Some(record));
        }

        let Self { inner, driver, .. } = self;
        let execer = inner
            .as_execer()
            .ok_or_else(|| unsupported(CapabilityTarget::Connection, Capability::Exec))?;
        driver.write_record(ctx, execer, &record).await?;
        Ok(None)
    }

    /// Rolls back a transaction left behind by a dropped future.
    ///
    /// A dropped `commit`/`rollback` leaves the wrapped transaction open
    /// with nothing left to flush its records; it must not commit. A dropped
    /// audited statement may already be applied without its record being
    /// buffered, so the caller's transaction is lost and the call fails.
    pub(crate) async fn settle(&mut self) -> EngineResult<()> {
        if !self.tx.is_interrupted() {
            return Ok(());
        }

        let statement_lost = matches!(self.tx, TxState::Executing { .. });
        warn!(
            state = self.tx.name(),
            "Rolling back transaction left open by an interrupted operation"
        );
        let result = match self.inner.as_transactional() {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        };
        self.tx = TxState::Idle;

        if statement_lost {
            return Err(AuditError::StatementInterrupted {
                rollback: result.err().map(Box::new),
            }
            .into());
        }
        result
    }
}

pub(crate) fn unsupported(target: CapabilityTarget, capability: Capability) -> AuditError {
    AuditError::CapabilityUnsupported { target, capability }
}

impl<C: Connection> Connection for AuditedConnection<C> {
    fn driver_id(&self) -> &'static str {
        self.inner.driver_id()
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        Some(self)
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        Some(self)
    }

    fn as_preparer(&mut self) -> Option<&mut dyn Preparer> {
        Some(self)
    }

    fn as_transactional(&mut self) -> Option<&mut dyn Transactional> {
        Some(self)
    }
}

#[async_trait]
impl<C: Connection> Execer for AuditedConnection<C> {
    async fn exec(
        &mut self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> EngineResult<ExecResult> {
        let pending = self.intercept(ctx, sql, args, Capability::Exec).await?;

        let Self { inner, tx, .. } = self;
        let execer = inner
            .as_execer()
            .ok_or_else(|| unsupported(CapabilityTarget::Connection, Capability::Exec))?;
        if pending.is_some() {
            tx.start_statement();
        }
        let result = execer.exec(ctx, sql, args).await;

        tx.finish_statement(pending.filter(|_| result.is_ok()));
        result
    }
}

#[async_trait]
impl<C: Connection> Queryer for AuditedConnection<C> {
    /// Reads pass through; `INSERT … RETURNING` and friends are audited
    /// like [`Execer::exec`].
    async fn query(
        &mut self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> EngineResult<QueryResult> {
        let pending = self.intercept(ctx, sql, args, Capability::Query).await?;

        let Self { inner, tx, .. } = self;
        let queryer = inner
            .as_queryer()
            .ok_or_else(|| unsupported(CapabilityTarget::Connection, Capability::Query))?;
        if pending.is_some() {
            tx.start_statement();
        }
        let result = queryer.query(ctx, sql, args).await;

        tx.finish_statement(pending.filter(|_| result.is_ok()));
        result
    }
}

#[async_trait]
impl<C: Connection> Preparer for AuditedConnection<C> {
    async fn prepare(&mut self, ctx: &ExecContext, sql: &str) -> EngineResult<PreparedStatement> {
        self.settle().await?;
        let preparer = self
            .inner
            .as_preparer()
            .ok_or_else(|| unsupported(CapabilityTarget::Connection, Capability::Prepare))?;
        preparer.prepare(ctx, sql).await
    }
}

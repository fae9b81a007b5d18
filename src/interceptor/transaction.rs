// SPDX-License-Identifier: Apache-2.0

//! Transactional buffer and commit gate
//!
//! Records built inside a transaction are buffered and written with one
//! batched insert on the same transaction right before it commits. If that
//! insert fails, or the governing context is cancelled, the transaction is
//! rolled back instead: data and audit rows become visible together or not
//! at all. A rollback discards the buffer without writing anything.

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use sqlaudit_core::{
    AuditError, Capability, CapabilityTarget, Connection, EngineError, EngineResult, ExecContext,
    ModificationRecord, Transactional, TxOptions,
};

use super::buffer::ModificationBuffer;
use super::connection::{unsupported, AuditedConnection};

/// Transaction state of an audited connection
#[derive(Debug, Default)]
pub enum TxState {
    #[default]
    Idle,
    /// Statements run inside the wrapped transaction; `ctx` is the context
    /// the transaction was begun with and governs cancellation of its commit
    Open {
        buffer: ModificationBuffer,
        ctx: ExecContext,
    },
    /// An audited statement is running inside the transaction. Observed by
    /// a later call only when the statement future was dropped.
    Executing {
        buffer: ModificationBuffer,
        ctx: ExecContext,
    },
    /// Set while a commit is in flight. Observed by a later call only when
    /// the commit future was dropped.
    Committing,
    /// Set while a rollback is in flight
    Aborting,
}

impl TxState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub(crate) fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::Executing { .. } | Self::Committing | Self::Aborting
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Open { .. } => "open",
            Self::Executing { .. } => "executing",
            Self::Committing => "committing",
            Self::Aborting => "aborting",
        }
    }

    /// Open -> Executing, ahead of an audited statement
    pub(crate) fn start_statement(&mut self) {
        *self = match std::mem::take(self) {
            Self::Open { buffer, ctx } => Self::Executing { buffer, ctx },
            other => other,
        };
    }

    /// Executing -> Open once the statement returned; `record` is buffered
    /// only for a statement that succeeded
    pub(crate) fn finish_statement(&mut self, record: Option<ModificationRecord>) {
        *self = match std::mem::take(self) {
            Self::Executing { mut buffer, ctx } => {
                if let Some(record) = record {
                    buffer.push(record);
                }
                Self::Open { buffer, ctx }
            }
            other => other,
        };
    }
}

enum Flush {
    Written,
    Failed(EngineError),
    Cancelled,
    Unsupported,
}

impl<C: Connection> AuditedConnection<C> {
    /// Number of records waiting for the commit of the open transaction
    pub fn buffered(&self) -> usize {
        match &self.tx {
            TxState::Open { buffer, .. } | TxState::Executing { buffer, .. } => buffer.len(),
            _ => 0,
        }
    }

    async fn finish_commit(
        &mut self,
        ctx: &ExecContext,
        records: Vec<ModificationRecord>,
    ) -> EngineResult<()> {
        let cancel = ctx.cancellation().clone();
        if cancel.is_cancelled() {
            return Err(self.abort_cancelled_commit().await);
        }

        let count = records.len();
        if count > 0 {
            let insert = self.driver.audit_table().insert_batch(&records);
            let flush = match self.inner.as_execer() {
                Some(execer) => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Flush::Cancelled,
                    result = execer.exec(ctx, &insert.sql, &insert.args) => match result {
                        Ok(_) => Flush::Written,
                        Err(e) => Flush::Failed(e),
                    },
                },
                None => Flush::Unsupported,
            };

            match flush {
                Flush::Written => {}
                Flush::Cancelled => return Err(self.abort_cancelled_commit().await),
                Flush::Failed(source) => {
                    error!(count, error = %source, "Failed to flush database modifications, rolling back");
                    let rollback = self.rollback_inner().await.err().map(Box::new);
                    return Err(AuditError::FlushFailed {
                        count,
                        source: Box::new(source),
                        rollback,
                    }
                    .into());
                }
                Flush::Unsupported => {
                    if let Err(e) = self.rollback_inner().await {
                        warn!(error = %e, "Rollback after unsupported audit flush failed");
                    }
                    return Err(unsupported(CapabilityTarget::Transaction, Capability::Exec).into());
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(self.abort_cancelled_commit().await);
        }

        let tx = self
            .inner
            .as_transactional()
            .ok_or_else(|| unsupported(CapabilityTarget::Connection, Capability::Transactions))?;
        tx.commit().await?;

        info!(count, "Committed transaction with audited modifications");
        Ok(())
    }

    async fn abort_cancelled_commit(&mut self) -> EngineError {
        warn!("Commit cancelled, rolling back transaction");
        let rollback = self.rollback_inner().await.err().map(Box::new);
        AuditError::CommitAborted { rollback }.into()
    }

    async fn rollback_inner(&mut self) -> EngineResult<()> {
        match self.inner.as_transactional() {
            Some(tx) => tx.rollback().await,
            None => Err(unsupported(CapabilityTarget::Connection, Capability::Transactions).into()),
        }
    }
}

#[async_trait]
impl<C: Connection> Transactional for AuditedConnection<C> {
    async fn begin(&mut self, ctx: &ExecContext, options: TxOptions) -> EngineResult<()> {
        self.settle().await?;
        if self.tx.is_open() {
            return Err(EngineError::transaction_error(
                "A transaction is already active on this connection",
            ));
        }

        let options = if self.driver.read_only() {
            TxOptions {
                read_only: true,
                ..options
            }
        } else {
            options
        };

        let tx = self
            .inner
            .as_transactional()
            .ok_or_else(|| unsupported(CapabilityTarget::Connection, Capability::Transactions))?;
        tx.begin(ctx, options).await?;

        self.tx = TxState::Open {
            buffer: ModificationBuffer::new(),
            ctx: ctx.clone(),
        };
        Ok(())
    }

    #[instrument(skip_all)]
    async fn commit(&mut self) -> EngineResult<()> {
        self.settle().await?;

        let (mut buffer, ctx) = match std::mem::replace(&mut self.tx, TxState::Committing) {
            TxState::Open { buffer, ctx } => (buffer, ctx),
            other => {
                self.tx = other;
                return Err(EngineError::transaction_error(
                    "No active transaction to commit",
                ));
            }
        };

        let records = buffer.drain();
        let result = self.finish_commit(&ctx, records).await;
        self.tx = TxState::Idle;
        result
    }

    #[instrument(skip_all)]
    async fn rollback(&mut self) -> EngineResult<()> {
        match std::mem::replace(&mut self.tx, TxState::Aborting) {
            TxState::Open { mut buffer, .. } | TxState::Executing { mut buffer, .. } => {
                let discarded = buffer.drain().len();
                debug!(discarded, "Discarding buffered database modifications");
            }
            TxState::Idle => {
                self.tx = TxState::Idle;
                return Err(EngineError::transaction_error(
                    "No active transaction to rollback",
                ));
            }
            // interrupted commit or rollback; the wrapped transaction is still open
            TxState::Committing | TxState::Aborting => {}
        }

        let result = self.rollback_inner().await;
        self.tx = TxState::Idle;
        result
    }
}

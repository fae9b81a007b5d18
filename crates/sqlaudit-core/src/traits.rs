//! Capability traits for wrapped database connections
//!
//! A [`Connection`] advertises what it can do through optional facets. The
//! audit layer asks for the facet it needs and reports
//! [`AuditError::CapabilityUnsupported`](crate::error::AuditError) when a
//! driver does not provide it, instead of assuming availability.
//!
//! A connection serves one caller at a time, so every facet takes
//! `&mut self`. Transactions are a state of the connection: once
//! [`Transactional::begin`] succeeded, statements issued through the other
//! facets of the same connection run inside that transaction until
//! [`Transactional::commit`] or [`Transactional::rollback`].

use async_trait::async_trait;

use crate::context::ExecContext;
use crate::error::EngineResult;
use crate::types::{ExecResult, PreparedStatement, QueryResult, TxOptions, Value};

/// Core trait every wrapped connection implements
pub trait Connection: Send {
    /// Returns the identifier of the underlying driver (e.g. "postgres")
    fn driver_id(&self) -> &'static str;

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        None
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        None
    }

    fn as_preparer(&mut self) -> Option<&mut dyn Preparer> {
        None
    }

    fn as_transactional(&mut self) -> Option<&mut dyn Transactional> {
        None
    }
}

/// Executes a statement with positional arguments (`$1`, `$2`, ...)
#[async_trait]
pub trait Execer: Send {
    async fn exec(&mut self, ctx: &ExecContext, sql: &str, args: &[Value])
        -> EngineResult<ExecResult>;
}

/// Executes a statement and returns its rows
#[async_trait]
pub trait Queryer: Send {
    async fn query(
        &mut self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> EngineResult<QueryResult>;
}

/// Prepares a statement on the server
#[async_trait]
pub trait Preparer: Send {
    async fn prepare(&mut self, ctx: &ExecContext, sql: &str) -> EngineResult<PreparedStatement>;
}

/// Transaction control on the connection
#[async_trait]
pub trait Transactional: Send {
    async fn begin(&mut self, ctx: &ExecContext, options: TxOptions) -> EngineResult<()>;

    async fn commit(&mut self) -> EngineResult<()>;

    async fn rollback(&mut self) -> EngineResult<()>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn driver_id(&self) -> &'static str {
        (**self).driver_id()
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        (**self).as_execer()
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        (**self).as_queryer()
    }

    fn as_preparer(&mut self) -> Option<&mut dyn Preparer> {
        (**self).as_preparer()
    }

    fn as_transactional(&mut self) -> Option<&mut dyn Transactional> {
        (**self).as_transactional()
    }
}

//! In-memory connection used by the integration tests.
//!
//! Statements land in a per-connection staging area while a transaction is
//! open and in the shared [`Store`] once committed (or immediately outside a
//! transaction). Inserts into the audit table are decoded back into
//! [`AuditRow`]s, seven arguments per row.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use sqlaudit::interceptor::DEFAULT_AUDIT_TABLE;
use sqlaudit_core::{
    Connection, EngineError, EngineResult, ExecContext, ExecResult, Execer, PreparedStatement,
    Preparer, QueryResult, Queryer, Transactional, TxOptions, Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditRow {
    pub id: String,
    pub operator_id: String,
    pub execution_id: String,
    pub table_name: String,
    pub action: String,
    pub sql: String,
    pub modified_at: Value,
}

#[derive(Debug, Default)]
pub struct Store {
    pub data: Vec<Statement>,
    pub audit: Vec<AuditRow>,
    /// Every statement received, including transaction control
    pub log: Vec<String>,
    pub begins: Vec<TxOptions>,
    pub commits: usize,
    pub rollbacks: usize,
    /// Statements containing one of these fragments fail
    pub fail_on: Vec<String>,
    /// Statements containing this fragment never complete
    pub hang_on: Option<String>,
    /// Statements containing this fragment are applied, then never complete
    pub stall_after: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreHandle(Arc<Mutex<Store>>);

impl StoreHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, Store> {
        self.0.lock().unwrap()
    }

    pub fn fail_on(&self, fragment: &str) {
        self.lock().fail_on.push(fragment.to_string());
    }

    pub fn hang_on(&self, fragment: &str) {
        self.lock().hang_on = Some(fragment.to_string());
    }

    pub fn stall_after(&self, fragment: &str) {
        self.lock().stall_after = Some(fragment.to_string());
    }

    pub fn heal(&self) {
        let mut store = self.lock();
        store.fail_on.clear();
        store.hang_on = None;
        store.stall_after = None;
    }

    pub fn audit_rows(&self) -> Vec<AuditRow> {
        self.lock().audit.clone()
    }

    pub fn data(&self) -> Vec<Statement> {
        self.lock().data.clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    pub fn connection(&self) -> MockConnection {
        MockConnection::new(self.clone())
    }
}

#[derive(Default)]
struct Staged {
    data: Vec<Statement>,
    audit: Vec<AuditRow>,
}

pub struct MockConnection {
    store: StoreHandle,
    staged: Option<Staged>,
    pub exec: bool,
    pub query: bool,
    pub prepare: bool,
    pub transactions: bool,
}

impl MockConnection {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            staged: None,
            exec: true,
            query: true,
            prepare: true,
            transactions: true,
        }
    }

    pub fn without_exec(mut self) -> Self {
        self.exec = false;
        self
    }

    pub fn without_query(mut self) -> Self {
        self.query = false;
        self
    }

    pub fn without_prepare(mut self) -> Self {
        self.prepare = false;
        self
    }

    pub fn without_transactions(mut self) -> Self {
        self.transactions = false;
        self
    }

    /// Logs the statement and applies failure injection
    async fn receive(&self, sql: &str) -> EngineResult<()> {
        let hang = {
            let mut store = self.store.lock();
            store.log.push(sql.to_string());
            if store.fail_on.iter().any(|f| sql.contains(f.as_str())) {
                return Err(EngineError::execution_error(format!(
                    "injected failure: {sql}"
                )));
            }
            store.hang_on.as_ref().is_some_and(|h| sql.contains(h.as_str()))
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    /// Never returns once a statement matching `stall_after` was applied
    async fn acknowledge(&self, sql: &str) {
        let stall = self
            .store
            .lock()
            .stall_after
            .as_ref()
            .is_some_and(|f| sql.contains(f.as_str()));
        if stall {
            std::future::pending::<()>().await;
        }
    }

    /// Records writes; reads and DDL leave no trace besides the log
    fn apply(&mut self, sql: &str, args: &[Value]) -> u64 {
        let head = sql.trim_start().to_ascii_uppercase();
        if ["SELECT", "WITH", "EXPLAIN", "CREATE"]
            .iter()
            .any(|kw| head.starts_with(kw))
        {
            return 0;
        }

        let audit_prefix = format!("INSERT INTO {DEFAULT_AUDIT_TABLE} ");
        let mut store = self.store.lock();

        if sql.starts_with(&audit_prefix) {
            let rows: Vec<AuditRow> = args.chunks(7).map(decode_audit_row).collect();
            let count = rows.len() as u64;
            match &mut self.staged {
                Some(staged) => staged.audit.extend(rows),
                None => store.audit.extend(rows),
            }
            return count;
        }

        let statement = Statement {
            sql: sql.to_string(),
            args: args.to_vec(),
        };
        match &mut self.staged {
            Some(staged) => staged.data.push(statement),
            None => store.data.push(statement),
        }
        1
    }
}

fn decode_audit_row(args: &[Value]) -> AuditRow {
    let text = |i: usize| match &args[i] {
        Value::Text(s) => s.clone(),
        other => panic!("audit column {i} is not text: {other:?}"),
    };
    AuditRow {
        id: text(0),
        operator_id: text(1),
        execution_id: text(2),
        table_name: text(3),
        action: text(4),
        sql: text(5),
        modified_at: args[6].clone(),
    }
}

impl Connection for MockConnection {
    fn driver_id(&self) -> &'static str {
        "mock"
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        if self.exec {
            Some(self)
        } else {
            None
        }
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        if self.query {
            Some(self)
        } else {
            None
        }
    }

    fn as_preparer(&mut self) -> Option<&mut dyn Preparer> {
        if self.prepare {
            Some(self)
        } else {
            None
        }
    }

    fn as_transactional(&mut self) -> Option<&mut dyn Transactional> {
        if self.transactions {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl Execer for MockConnection {
    async fn exec(
        &mut self,
        _ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> EngineResult<ExecResult> {
        self.receive(sql).await?;
        let rows_affected = self.apply(sql, args);
        self.acknowledge(sql).await;
        Ok(ExecResult::new(rows_affected))
    }
}

#[async_trait]
impl Queryer for MockConnection {
    async fn query(
        &mut self,
        _ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> EngineResult<QueryResult> {
        self.receive(sql).await?;
        self.apply(sql, args);
        self.acknowledge(sql).await;
        Ok(QueryResult::empty())
    }
}

#[async_trait]
impl Preparer for MockConnection {
    async fn prepare(&mut self, _ctx: &ExecContext, sql: &str) -> EngineResult<PreparedStatement> {
        self.receive(sql).await?;
        Ok(PreparedStatement {
            sql: sql.to_string(),
            parameters: None,
        })
    }
}

#[async_trait]
impl Transactional for MockConnection {
    async fn begin(&mut self, _ctx: &ExecContext, options: TxOptions) -> EngineResult<()> {
        self.receive(&options.begin_sql()).await?;
        if self.staged.is_some() {
            return Err(EngineError::transaction_error("already in a transaction"));
        }
        self.store.lock().begins.push(options);
        self.staged = Some(Staged::default());
        Ok(())
    }

    async fn commit(&mut self) -> EngineResult<()> {
        self.receive("COMMIT").await?;
        let staged = self
            .staged
            .take()
            .ok_or_else(|| EngineError::transaction_error("no transaction"))?;
        let mut store = self.store.lock();
        store.data.extend(staged.data);
        store.audit.extend(staged.audit);
        store.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> EngineResult<()> {
        self.receive("ROLLBACK").await?;
        self.staged
            .take()
            .ok_or_else(|| EngineError::transaction_error("no transaction"))?;
        self.store.lock().rollbacks += 1;
        Ok(())
    }
}

pub fn ctx(operator_id: &str, execution_id: &str) -> ExecContext {
    ExecContext::new()
        .with_operator_id(operator_id)
        .with_execution_id(execution_id)
}

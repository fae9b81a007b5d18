// SPDX-License-Identifier: Apache-2.0

//! Audit storage statements
//!
//! Renders the inserts that persist modification records and the DDL of the
//! audit table. Statements go through the wrapped connection like any other,
//! so they share its transaction.

use sqlaudit_core::{ModificationRecord, Value};

pub const DEFAULT_AUDIT_TABLE: &str = "database_modifications";

const COLUMNS: [&str; 7] = [
    "id",
    "operator_id",
    "execution_id",
    "table_name",
    "action",
    "sql",
    "modified_at",
];

/// A rendered statement with its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct AuditInsert {
    pub sql: String,
    pub args: Vec<Value>,
}

/// The table receiving audit rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTable {
    name: String,
}

impl Default for AuditTable {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_TABLE)
    }
}

impl AuditTable {
    /// `name` is used verbatim and may be schema-qualified
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Single-row insert used outside transactions
    pub fn insert_one(&self, record: &ModificationRecord) -> AuditInsert {
        self.insert_batch(std::slice::from_ref(record))
    }

    /// One multi-row insert for all records, in order.
    ///
    /// Placeholders are numbered sequentially across the whole statement:
    /// `($1, …, $7), ($8, …, $14), …`.
    pub fn insert_batch(&self, records: &[ModificationRecord]) -> AuditInsert {
        let mut tuples = Vec::with_capacity(records.len());
        let mut args = Vec::with_capacity(records.len() * COLUMNS.len());

        for (i, record) in records.iter().enumerate() {
            let base = i * COLUMNS.len();
            let placeholders: Vec<String> = (1..=COLUMNS.len())
                .map(|n| format!("${}", base + n))
                .collect();
            tuples.push(format!("({})", placeholders.join(", ")));
            args.extend(record_args(record));
        }

        AuditInsert {
            sql: format!(
                "INSERT INTO {} ({}) VALUES {}",
                self.name,
                COLUMNS.join(", "),
                tuples.join(", ")
            ),
            args,
        }
    }

    /// DDL for the audit table and its lookup indexes
    pub fn create_table_statements(&self) -> Vec<String> {
        let index_prefix = format!("idx_{}", self.name.replace('.', "_"));
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                 id TEXT PRIMARY KEY,\n    \
                 operator_id TEXT NOT NULL,\n    \
                 execution_id TEXT NOT NULL,\n    \
                 table_name TEXT NOT NULL,\n    \
                 action TEXT NOT NULL CHECK (action IN ('insert', 'update', 'delete')),\n    \
                 sql TEXT NOT NULL,\n    \
                 modified_at TIMESTAMPTZ NOT NULL DEFAULT now()\n)",
                self.name
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {index_prefix}_execution_id ON {} (execution_id)",
                self.name
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {index_prefix}_operator_id ON {} (operator_id)",
                self.name
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {index_prefix}_table_action ON {} (table_name, action)",
                self.name
            ),
        ]
    }

    pub fn create_table_sql(&self) -> String {
        let mut sql = self.create_table_statements().join(";\n");
        sql.push(';');
        sql
    }
}

fn record_args(record: &ModificationRecord) -> [Value; 7] {
    [
        Value::Text(record.id.clone()),
        Value::Text(record.operator_id.clone()),
        Value::Text(record.execution_id.clone()),
        Value::Text(record.table_name.clone()),
        Value::Text(record.action.as_str().to_string()),
        Value::Text(record.sql.clone()),
        Value::from(record.modified_at),
    ]
}

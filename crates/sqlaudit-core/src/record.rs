// SPDX-License-Identifier: Apache-2.0

//! The audit unit: one record per intercepted data-modifying statement.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of data modification (closed enumeration, serialized as text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationAction {
    Insert,
    Update,
    Delete,
}

impl ModificationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ModificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModificationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown modification action: {other}")),
        }
    }
}

/// A database modification performed by an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationRecord {
    pub id: String,

    /// Principal who performed the modification
    pub operator_id: String,

    /// Correlates every modification issued by one logical operation
    pub execution_id: String,

    /// Table targeted by the statement, e.g. `users`
    pub table_name: String,

    pub action: ModificationAction,

    /// Statement text with every bound argument rendered as a literal
    pub sql: String,

    /// When the statement was intercepted
    pub modified_at: DateTime<Utc>,
}

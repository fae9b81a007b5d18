// SPDX-License-Identifier: Apache-2.0

//! Per-transaction buffer of built modification records

use std::mem;

use sqlaudit_core::ModificationRecord;

/// Records of statements that succeeded inside the open transaction, in
/// execution order. Owned by exactly one transaction.
#[derive(Debug, Default)]
pub struct ModificationBuffer {
    records: Vec<ModificationRecord>,
}

impl ModificationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ModificationRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Moves every record out, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<ModificationRecord> {
        mem::take(&mut self.records)
    }
}

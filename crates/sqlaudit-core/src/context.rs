// SPDX-License-Identifier: Apache-2.0

//! Call-scoped execution context
//!
//! Every operation on a connection receives an [`ExecContext`]. It carries
//! the acting operator, the logical execution the statement belongs to,
//! free-form attributes for custom identity extractors, and the cancellation
//! token governing the operation. Nothing here is process-global: callers
//! build a context per request and pass it down explicitly.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::error::{BuildError, Identity};

#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    operator_id: Option<String>,
    execution_id: Option<String>,
    attributes: HashMap<String, String>,
    cancellation: CancellationToken,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operator_id(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    /// Attaches an arbitrary attribute (tenant, request path, ...)
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Replaces the cancellation token governing this context
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The acting operator; missing or empty values are an error
    pub fn operator_id(&self) -> Result<&str, BuildError> {
        non_empty(self.operator_id.as_deref(), Identity::Operator)
    }

    /// The logical execution; missing or empty values are an error
    pub fn execution_id(&self) -> Result<&str, BuildError> {
        non_empty(self.execution_id.as_deref(), Identity::Execution)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

fn non_empty(value: Option<&str>, identity: Identity) -> Result<&str, BuildError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BuildError::IdentityMissing(identity)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_round_trip() {
        let ctx = ExecContext::new()
            .with_operator_id("op-1")
            .with_execution_id("ex-1");
        assert_eq!(ctx.operator_id(), Ok("op-1"));
        assert_eq!(ctx.execution_id(), Ok("ex-1"));
    }

    #[test]
    fn missing_or_empty_identity_is_an_error() {
        let ctx = ExecContext::new().with_operator_id("");
        assert_eq!(
            ctx.operator_id(),
            Err(BuildError::IdentityMissing(Identity::Operator))
        );
        assert_eq!(
            ctx.execution_id(),
            Err(BuildError::IdentityMissing(Identity::Execution))
        );
    }

    #[test]
    fn derived_contexts_share_cancellation() {
        let token = CancellationToken::new();
        let ctx = ExecContext::new().with_cancellation(token.clone());
        let child = ctx.clone().with_attribute("tenant", "acme");
        assert!(!child.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(child.is_cancelled());
        assert_eq!(child.attribute("tenant"), Some("acme"));
        assert_eq!(ctx.attribute("tenant"), None);
    }
}

// ============================================================================
// Rules - handler trait, compiled rules, ordered registry
// ============================================================================
//
// Each detectable pattern is one handler behind a single-method trait. A
// CompiledRule pairs the handler with its stable id, severity, message and
// the node kinds it applies to; the registry keeps them in registration
// order so violation ordering is reproducible before the final sort.
//
// ============================================================================

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::report::Severity;
use crate::tree::{NodeKind, NodeRef, Span, SyntaxTree};

pub mod handlers;

/// Read-only evaluation context handed to every rule invocation. Rules see
/// the ancestor chain and siblings through the node itself; they must not
/// retain references beyond the call.
pub struct RuleContext<'a> {
    pub tree: &'a SyntaxTree,
    pub file: &'a Path,
}

/// What a rule reports when it fires: the anchor span plus optional detail
/// appended to the rule's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub span: Span,
    pub detail: Option<String>,
}

impl Finding {
    pub fn at(span: Span) -> Self {
        Self { span, detail: None }
    }

    pub fn with_detail(span: Span, detail: impl Into<String>) -> Self {
        Self { span, detail: Some(detail.into()) }
    }
}

/// One detectable pattern. Pure predicate: no tree mutation, zero-or-one
/// finding per node.
pub trait RuleHandler: Send + Sync {
    fn check(&self, node: NodeRef<'_>, ctx: &RuleContext<'_>) -> Option<Finding>;
}

/// Handler plus the metadata the engine needs to dispatch it and turn its
/// findings into violations.
pub struct CompiledRule {
    pub id: String,
    pub severity: Severity,
    pub message: String,
    pub kinds: Vec<NodeKind>,
    pub handler: Box<dyn RuleHandler>,
}

impl CompiledRule {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        kinds: Vec<NodeKind>,
        handler: Box<dyn RuleHandler>,
    ) -> Self {
        Self { id: id.into(), severity, message: message.into(), kinds, handler }
    }

    pub fn applies_to(&self, kind: NodeKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

/// Registry misconfiguration. Fail-fast at build time, before any file scan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate rule id {0:?}")]
    DuplicateRuleId(String),

    #[error("rule {id:?} references unknown kind {kind:?}")]
    UnknownRuleKind { id: String, kind: String },

    #[error("rule {id:?} has invalid params: {reason}")]
    InvalidParams { id: String, reason: String },
}

/// Ordered, deduplicated-by-id rule collection. Built once, read-only during
/// traversal.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<CompiledRule>,
    ids: HashSet<String>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: CompiledRule) -> Result<(), RegistryError> {
        if !self.ids.insert(rule.id.clone()) {
            return Err(RegistryError::DuplicateRuleId(rule.id));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Rules in registration order.
    pub fn all(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverFires;

    impl RuleHandler for NeverFires {
        fn check(&self, _node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
            None
        }
    }

    fn rule(id: &str) -> CompiledRule {
        CompiledRule::new(id, Severity::Warning, "msg", vec![NodeKind::CallExpr], Box::new(NeverFires))
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register(rule("R-001")).unwrap();
        let err = registry.register(rule("R-001")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateRuleId("R-001".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = RuleRegistry::new();
        for id in ["R-003", "R-001", "R-002"] {
            registry.register(rule(id)).unwrap();
        }
        let ids: Vec<_> = registry.all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["R-003", "R-001", "R-002"]);
    }
}

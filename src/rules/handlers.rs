// ============================================================================
// Concrete rule handlers
// ============================================================================
//
// One handler per detectable pattern. Handlers assume the engine already
// filtered by applicable node kind; each check is O(1) or O(depth).
//
// ============================================================================

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::{Finding, RuleContext, RuleHandler};
use crate::tree::{NodeKind, NodeRef};

/// Default casing pattern for the naming-convention rule: camelCase.
pub static CAMEL_CASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap()
});

/// Flags calls to a configured set of disallowed function/method names
/// (direct console output, banned APIs).
pub struct ForbiddenCallHandler {
    pub names: HashSet<String>,
}

impl RuleHandler for ForbiddenCallHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        let name = node.name()?;
        if self.names.contains(name) {
            Some(Finding::with_detail(node.span(), name))
        } else {
            None
        }
    }
}

/// Flags equality/inequality comparisons against a null literal.
/// `x.equals(null)` is a call expression and never reaches this handler.
pub struct NullComparisonHandler;

impl RuleHandler for NullComparisonHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        if !is_equality_op(node) {
            return None;
        }
        if node.children().any(|c| c.kind() == NodeKind::NullLiteral) {
            Some(Finding::at(node.span()))
        } else {
            None
        }
    }
}

/// Flags reference-equality comparison where value equality was intended.
/// Uses the operands' static type hint when the parser supplied one, else
/// falls back to literal-vs-variable shape.
pub struct StringIdentityHandler;

impl StringIdentityHandler {
    fn is_string_literal(node: NodeRef<'_>) -> bool {
        node.kind() == NodeKind::Literal
            && (node.type_name() == Some("String")
                || node.name().is_some_and(|n| n.starts_with('"')))
    }
}

impl RuleHandler for StringIdentityHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        if !is_equality_op(node) {
            return None;
        }
        let operands: Vec<NodeRef<'_>> = node.children().take(2).collect();
        if operands.len() != 2 {
            return None;
        }
        // null comparisons belong to the null-comparison rule
        if operands.iter().any(|o| o.kind() == NodeKind::NullLiteral) {
            return None;
        }

        let typed_string = operands.iter().any(|o| o.type_name() == Some("String"));
        let literal_vs_var = operands.iter().any(|o| Self::is_string_literal(*o))
            && operands.iter().any(|o| o.kind() == NodeKind::Identifier);

        if typed_string || literal_vs_var {
            Some(Finding::at(node.span()))
        } else {
            None
        }
    }
}

/// Flags construction of a configured disallowed type (legacy collections).
pub struct DisallowedNewHandler {
    pub types: HashSet<String>,
}

impl RuleHandler for DisallowedNewHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        let type_name = node.type_name()?;
        if self.types.contains(type_name) {
            Some(Finding::with_detail(node.span(), type_name))
        } else {
            None
        }
    }
}

/// Flags an exception handler whose body holds no statements. Comments are
/// not tree nodes, so a comment-only body counts as empty.
pub struct EmptyCatchHandler;

impl RuleHandler for EmptyCatchHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        let body = node.children().find(|c| c.kind() == NodeKind::Block)?;
        if body.child_count() == 0 {
            Some(Finding::at(node.span()))
        } else {
            None
        }
    }
}

/// Flags handlers that catch the broadest available exception types instead
/// of a specific one.
pub struct GenericCatchHandler {
    pub types: HashSet<String>,
}

impl RuleHandler for GenericCatchHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        let caught = node.type_name()?;
        if self.types.contains(caught) {
            Some(Finding::with_detail(node.span(), caught))
        } else {
            None
        }
    }
}

/// Flags a conditional/loop node whose ancestor chain, within the same
/// method body, already holds `threshold` conditional/loop nodes. With four
/// nested `if`s and the default threshold of 3, exactly the innermost node
/// past the threshold fires.
pub struct NestingDepthHandler {
    pub threshold: usize,
}

impl RuleHandler for NestingDepthHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        let mut enclosing = 0usize;
        for ancestor in node.ancestors() {
            if ancestor.kind().is_body_boundary() {
                break;
            }
            if ancestor.kind().is_branch_or_loop() {
                enclosing += 1;
            }
        }
        if enclosing >= self.threshold {
            Some(Finding::with_detail(
                node.span(),
                format!("nesting depth {} exceeds {}", enclosing + 1, self.threshold),
            ))
        } else {
            None
        }
    }
}

/// Flags declarations whose identifier does not match the configured casing
/// pattern. Constants are exempt.
pub struct NamingConventionHandler {
    pub pattern: Regex,
}

impl RuleHandler for NamingConventionHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        if node.is_const() {
            return None;
        }
        let name = node.name()?;
        if self.pattern.is_match(name) {
            None
        } else {
            Some(Finding::with_detail(node.span(), name))
        }
    }
}

/// Flags a field that is both process-wide-scoped and non-constant.
pub struct MutableStaticHandler;

impl RuleHandler for MutableStaticHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        if node.is_static() && !node.is_const() {
            Some(Finding::at(node.span()))
        } else {
            None
        }
    }
}

/// Flags a constructor body containing any call expression. The finding is
/// anchored at the constructor span, so several calls inside one constructor
/// dedup to a single violation.
pub struct CtorCallHandler;

impl RuleHandler for CtorCallHandler {
    fn check(&self, node: NodeRef<'_>, _ctx: &RuleContext<'_>) -> Option<Finding> {
        for ancestor in node.ancestors() {
            match ancestor.kind() {
                NodeKind::CtorDecl => return Some(Finding::at(ancestor.span())),
                // calls inside a nested method body belong to that method
                NodeKind::MethodDecl => return None,
                _ => {}
            }
        }
        None
    }
}

fn is_equality_op(node: NodeRef<'_>) -> bool {
    matches!(node.operator(), Some("==") | Some("!="))
}

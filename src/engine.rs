// ============================================================================
// Traversal engine - single pre-order walk, per-rule failure isolation
// ============================================================================

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::report::{Diagnostic, ReportError, Reporter, Violation};
use crate::rules::{CompiledRule, Finding, RuleContext, RuleRegistry};
use crate::tree::{NodeRef, SyntaxTree};

/// Walks the tree once, depth-first pre-order, dispatching each node to every
/// applicable rule in registration order. A panicking rule is recorded as a
/// diagnostic at per-rule-per-node granularity and never aborts the walk.
pub fn scan_tree(
    registry: &RuleRegistry,
    tree: &SyntaxTree,
    file: &Path,
    reporter: &mut Reporter,
) -> Result<(), ReportError> {
    let ctx = RuleContext { tree, file };
    let mut stack = vec![tree.root()];

    while let Some(node) = stack.pop() {
        for rule in registry.all() {
            if !rule.applies_to(node.kind()) {
                continue;
            }
            match evaluate(rule, node, &ctx) {
                Ok(Some(finding)) => {
                    reporter.record(to_violation(rule, file, finding))?;
                }
                Ok(None) => {}
                Err(message) => {
                    warn!(rule = %rule.id, file = %file.display(), "rule evaluation failed");
                    reporter.diagnostic(Diagnostic {
                        rule_id: Some(rule.id.clone()),
                        file: file.to_path_buf(),
                        span: Some(node.span()),
                        message: format!("rule evaluation failed: {message}"),
                    })?;
                }
            }
        }

        // push in reverse so the leftmost child is visited first
        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    debug!(file = %file.display(), nodes = tree.len(), "traversal complete");
    Ok(())
}

/// One rule on one node, inside its own unwind boundary. A buggy rule must
/// not take the rest of the scan down with it.
fn evaluate(
    rule: &CompiledRule,
    node: NodeRef<'_>,
    ctx: &RuleContext<'_>,
) -> Result<Option<Finding>, String> {
    // pass the payload itself, not the box: &Box<dyn Any> downcasts as the box
    panic::catch_unwind(AssertUnwindSafe(|| rule.handler.check(node, ctx)))
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn to_violation(rule: &CompiledRule, file: &Path, finding: Finding) -> Violation {
    let message = match finding.detail {
        Some(detail) => format!("{}: {detail}", rule.message),
        None => rule.message.clone(),
    };
    Violation {
        rule_id: rule.id.clone(),
        file: file.to_path_buf(),
        span: finding.span,
        severity: rule.severity,
        message,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

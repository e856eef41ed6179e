//! Rule-based static source-pattern detector.
//!
//! An external parser supplies a language-agnostic syntax tree per file; the
//! detector walks each tree once, dispatches every node to the applicable
//! rules of an immutable registry, and collects the findings into an ordered,
//! deduplicated report. Files scan in parallel; a buggy rule or a malformed
//! tree degrades into a diagnostic instead of aborting the run.
//!
//! ```
//! use stylecheck::config::default_rules;
//! use stylecheck::scan::scan_one;
//! use stylecheck::tree::{Attrs, NodeKind, Span, TreeBuilder};
//!
//! let mut b = TreeBuilder::new(NodeKind::ClassDecl, Span::new(1, 1, 10, 1));
//! let method = b.add_node(b.root_id(), NodeKind::MethodDecl, Span::new(2, 5, 9, 5));
//! let block = b.add_node(method, NodeKind::Block, Span::new(2, 20, 9, 5));
//! b.add(block, NodeKind::CallExpr, Span::line(3, 9, 30), Attrs::named("println"));
//! let tree = b.finish().unwrap();
//!
//! let registry = default_rules().build_registry().unwrap();
//! let report = scan_one(&registry, &tree, std::path::Path::new("Demo.java")).unwrap();
//! assert_eq!(report.violations[0].rule_id, "JAVA-001");
//! ```

pub mod config;
pub mod engine;
pub mod report;
pub mod rules;
pub mod scan;
pub mod tree;

pub use config::{default_rules, ConfigError, RuleSetConfig, RuleSpec};
pub use engine::scan_tree;
pub use report::{Diagnostic, Report, ReportError, Reporter, Severity, Violation};
pub use rules::{CompiledRule, Finding, RegistryError, RuleContext, RuleHandler, RuleRegistry};
pub use scan::{scan_files, scan_one, CancelToken, TreeProvider};
pub use tree::{Attrs, NodeId, NodeKind, NodeRef, Span, SyntaxTree, TreeBuilder, TreeError};

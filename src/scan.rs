// ============================================================================
// Multi-file scan driver - parallel per file, join-then-merge
// ============================================================================
//
// Files are independent: each worker parses and traverses one file with only
// the read-only registry shared. Results are collected per file and merged
// into the final report in a single-threaded step, so no locks are needed.
//
// ============================================================================

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::engine::scan_tree;
use crate::report::{Diagnostic, Report, ReportError, Reporter};
use crate::rules::RuleRegistry;
use crate::tree::{SyntaxTree, TreeError};

/// External parser contract: supplies one syntax tree per input file. The
/// detector only consumes the tree through its read-only queries.
pub trait TreeProvider: Sync {
    fn tree_for(&self, path: &Path) -> Result<SyntaxTree, TreeError>;
}

/// Cooperative cancellation handle. Checked between files, never mid-walk,
/// so no file ends up with a partially built violation list.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Scans one already-parsed tree into a standalone report.
pub fn scan_one(
    registry: &RuleRegistry,
    tree: &SyntaxTree,
    file: &Path,
) -> Result<Report, ReportError> {
    let mut reporter = Reporter::new();
    scan_tree(registry, tree, file, &mut reporter)?;
    reporter.finalize()
}

/// Scans many files in parallel. A malformed tree fails only that file's
/// scan and surfaces as a diagnostic; cancellation skips files that have not
/// started yet. The completed per-file results are merged and sorted once,
/// after all workers join.
pub fn scan_files(
    registry: &RuleRegistry,
    provider: &dyn TreeProvider,
    files: &[PathBuf],
    cancel: &CancelToken,
) -> Result<Report, ReportError> {
    let per_file: Vec<Report> = files
        .par_iter()
        .filter_map(|path| {
            if cancel.is_cancelled() {
                debug!(file = %path.display(), "skipped, scan cancelled");
                return None;
            }
            Some(scan_file(registry, provider, path))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut merged = Reporter::new();
    for report in per_file {
        for violation in report.violations {
            merged.record(violation)?;
        }
        for diagnostic in report.diagnostics {
            merged.diagnostic(diagnostic)?;
        }
    }
    let report = merged.finalize()?;
    info!(
        files = files.len(),
        violations = report.violations.len(),
        diagnostics = report.diagnostics.len(),
        "scan complete"
    );
    Ok(report)
}

fn scan_file(
    registry: &RuleRegistry,
    provider: &dyn TreeProvider,
    path: &Path,
) -> Result<Report, ReportError> {
    let mut reporter = Reporter::new();
    match provider.tree_for(path) {
        Ok(tree) => scan_tree(registry, &tree, path, &mut reporter)?,
        Err(err) => reporter.diagnostic(Diagnostic {
            rule_id: None,
            file: path.to_path_buf(),
            span: None,
            message: format!("malformed tree: {err}"),
        })?,
    }
    reporter.finalize()
}

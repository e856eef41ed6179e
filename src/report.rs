// ============================================================================
// Violation reporter - ordered, deduplicated result set
// ============================================================================

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::Span;

/// Severity attached to a rule and carried into its violations. Report
/// metadata only; it never affects whether a rule runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Warning
    }
}

/// One rule firing at one source location. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub file: PathBuf,
    pub span: Span,
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    /// Sort key: file, span start (line then column), rule id. Span end
    /// breaks any remaining tie so equal occurrences land adjacent and the
    /// finalize-time dedup sees them as one run.
    fn sort_key(&self) -> (&Path, u32, u32, &str, u32, u32) {
        (
            &self.file,
            self.span.start_line,
            self.span.start_col,
            &self.rule_id,
            self.span.end_line,
            self.span.end_col,
        )
    }

    fn same_occurrence(&self, other: &Violation) -> bool {
        self.rule_id == other.rule_id && self.file == other.file && self.span == other.span
    }
}

/// Non-violation finding surfaced alongside the real results: an internal
/// rule-evaluation failure, or a per-file malformed-tree error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: Option<String>,
    pub file: PathBuf,
    pub span: Option<Span>,
    pub message: String,
}

/// Recording after `finalize()` is a contract violation in the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("reporter already finalized")]
    Closed,
}

/// Final, deterministically ordered scan output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub violations: Vec<Violation>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.diagnostics.is_empty()
    }

    /// Canonical JSON rendering, stable across runs for identical input.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Collects violations during traversal. `finalize()` sorts, deduplicates
/// on (rule id, file, span) and closes the reporter; `record` itself is a
/// plain append so the hot path allocates nothing.
#[derive(Debug, Default)]
pub struct Reporter {
    violations: Vec<Violation>,
    diagnostics: Vec<Diagnostic>,
    closed: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one violation. A rule firing twice on the same node yields a
    /// single entry in the finalized report.
    pub fn record(&mut self, violation: Violation) -> Result<(), ReportError> {
        if self.closed {
            return Err(ReportError::Closed);
        }
        self.violations.push(violation);
        Ok(())
    }

    /// Appends one diagnostic. Diagnostics are not deduplicated.
    pub fn diagnostic(&mut self, diagnostic: Diagnostic) -> Result<(), ReportError> {
        if self.closed {
            return Err(ReportError::Closed);
        }
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    /// Returns the sorted, immutable report and closes the reporter. Any
    /// later `record` fails with `ReportError::Closed`.
    pub fn finalize(&mut self) -> Result<Report, ReportError> {
        if self.closed {
            return Err(ReportError::Closed);
        }
        self.closed = true;

        let mut violations = std::mem::take(&mut self.violations);
        violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        violations.dedup_by(|a, b| a.same_occurrence(b));

        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        diagnostics.sort_by(|a, b| {
            (&a.file, a.span, &a.rule_id, &a.message).cmp(&(&b.file, b.span, &b.rule_id, &b.message))
        });

        Ok(Report { violations, diagnostics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Span;

    fn violation(rule: &str, file: &str, line: u32) -> Violation {
        Violation {
            rule_id: rule.to_string(),
            file: PathBuf::from(file),
            span: Span::line(line, 1, 10),
            severity: Severity::Warning,
            message: "test".to_string(),
        }
    }

    #[test]
    fn test_dedup_on_rule_file_span() {
        let mut reporter = Reporter::new();
        reporter.record(violation("R-001", "A.java", 3)).unwrap();
        reporter.record(violation("R-001", "A.java", 3)).unwrap();
        reporter.record(violation("R-002", "A.java", 3)).unwrap();

        let report = reporter.finalize().unwrap();
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_dedup_collapses_nonadjacent_duplicates_only() {
        // same rule, file and span start, but a different span end: distinct
        let mut reporter = Reporter::new();
        let narrow = violation("R-001", "A.java", 3);
        let mut wide = narrow.clone();
        wide.span = Span::new(3, 1, 4, 2);

        reporter.record(narrow.clone()).unwrap();
        reporter.record(wide).unwrap();
        reporter.record(narrow).unwrap();

        let report = reporter.finalize().unwrap();
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_sorted_by_file_span_rule() {
        let mut reporter = Reporter::new();
        reporter.record(violation("R-002", "B.java", 1)).unwrap();
        reporter.record(violation("R-001", "A.java", 9)).unwrap();
        reporter.record(violation("R-002", "A.java", 2)).unwrap();
        reporter.record(violation("R-001", "A.java", 2)).unwrap();

        let report = reporter.finalize().unwrap();
        let keys: Vec<_> = report
            .violations
            .iter()
            .map(|v| (v.file.to_string_lossy().into_owned(), v.span.start_line, v.rule_id.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A.java".to_string(), 2, "R-001".to_string()),
                ("A.java".to_string(), 2, "R-002".to_string()),
                ("A.java".to_string(), 9, "R-001".to_string()),
                ("B.java".to_string(), 1, "R-002".to_string()),
            ]
        );
    }

    #[test]
    fn test_record_after_finalize_fails() {
        let mut reporter = Reporter::new();
        reporter.record(violation("R-001", "A.java", 1)).unwrap();
        reporter.finalize().unwrap();

        assert_eq!(reporter.record(violation("R-001", "A.java", 2)), Err(ReportError::Closed));
        assert_eq!(reporter.finalize(), Err(ReportError::Closed));
    }
}

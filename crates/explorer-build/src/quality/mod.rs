//! Lint and coverage gates.

mod coverage;
mod lint;
mod tool;

pub use coverage::{
    check_coverage, CategoryFailure, CoverageCategory, CoverageError, CoverageSummary, CoverageThresholds,
};
pub use lint::{check_whitespace, lint_whitespace, FileSet, Indentation, LintError, Violation, WhitespaceRule, WhitespaceRules};
pub use tool::{ExternalTool, ToolError};

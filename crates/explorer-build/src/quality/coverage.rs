//! Coverage threshold gate.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::tool::ToolError;

/// A coverage measurement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageCategory {
    Statements,
    Branches,
    Functions,
    Lines,
}

impl CoverageCategory {
    pub const ALL: [CoverageCategory; 4] = [
        CoverageCategory::Statements,
        CoverageCategory::Branches,
        CoverageCategory::Functions,
        CoverageCategory::Lines,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CoverageCategory::Statements => "statements",
            CoverageCategory::Branches => "branches",
            CoverageCategory::Functions => "functions",
            CoverageCategory::Lines => "lines",
        }
    }
}

impl fmt::Display for CoverageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum percentages per category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageThresholds {
    #[serde(default = "default_threshold")]
    pub statements: f64,
    #[serde(default = "default_threshold")]
    pub branches: f64,
    #[serde(default = "default_threshold")]
    pub functions: f64,
    #[serde(default = "default_threshold")]
    pub lines: f64,
}

fn default_threshold() -> f64 {
    80.0
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self {
            statements: default_threshold(),
            branches: default_threshold(),
            functions: default_threshold(),
            lines: default_threshold(),
        }
    }
}

impl CoverageThresholds {
    pub fn get(&self, category: CoverageCategory) -> f64 {
        match category {
            CoverageCategory::Statements => self.statements,
            CoverageCategory::Branches => self.branches,
            CoverageCategory::Functions => self.functions,
            CoverageCategory::Lines => self.lines,
        }
    }
}

/// Measured coverage percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageSummary {
    pub statements: f64,
    pub branches: f64,
    pub functions: f64,
    pub lines: f64,
}

impl CoverageSummary {
    pub fn get(&self, category: CoverageCategory) -> f64 {
        match category {
            CoverageCategory::Statements => self.statements,
            CoverageCategory::Branches => self.branches,
            CoverageCategory::Functions => self.functions,
            CoverageCategory::Lines => self.lines,
        }
    }

    /// Parse an istanbul `json-summary` report (`total.<category>.pct`).
    ///
    /// istanbul writes `"Unknown"` when a category has nothing to measure;
    /// that counts as fully covered.
    pub fn from_json(content: &str) -> Result<Self, String> {
        let json: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let total = json.get("total").ok_or("missing \"total\" section")?;

        let pct = |category: CoverageCategory| -> Result<f64, String> {
            let value = total
                .get(category.as_str())
                .and_then(|c| c.get("pct"))
                .ok_or_else(|| format!("missing total.{category}.pct"))?;
            match value {
                serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| format!("invalid total.{category}.pct")),
                serde_json::Value::String(s) if s == "Unknown" => Ok(100.0),
                _ => Err(format!("invalid total.{category}.pct")),
            }
        };

        Ok(Self {
            statements: pct(CoverageCategory::Statements)?,
            branches: pct(CoverageCategory::Branches)?,
            functions: pct(CoverageCategory::Functions)?,
            lines: pct(CoverageCategory::Lines)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CoverageError> {
        let content = std::fs::read_to_string(path).map_err(|source| CoverageError::MissingSummary {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|message| CoverageError::MalformedSummary {
            path: path.to_path_buf(),
            message,
        })
    }
}

/// One category below its threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryFailure {
    pub category: CoverageCategory,
    pub measured: f64,
    pub threshold: f64,
}

impl fmt::Display for CategoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}% < {}%", self.category, self.measured, self.threshold)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    #[error("Inadequate test coverage: {}", format_failures(.0))]
    BelowThreshold(Vec<CategoryFailure>),

    #[error("Coverage summary not found at {}: {source}", path.display())]
    MissingSummary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed coverage summary {}: {message}", path.display())]
    MalformedSummary { path: PathBuf, message: String },

    #[error("Test run failed: {0}")]
    Runner(#[from] ToolError),
}

impl CoverageError {
    /// Failing categories, when this is a threshold failure.
    pub fn failed_categories(&self) -> Vec<CoverageCategory> {
        match self {
            CoverageError::BelowThreshold(failures) => failures.iter().map(|f| f.category).collect(),
            _ => Vec::new(),
        }
    }
}

fn format_failures(failures: &[CategoryFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Compare measured coverage against thresholds. Equal values pass.
pub fn check_coverage(summary: &CoverageSummary, thresholds: &CoverageThresholds) -> Result<(), CoverageError> {
    let failures: Vec<CategoryFailure> = CoverageCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let measured = summary.get(category);
            let threshold = thresholds.get(category);
            (measured < threshold).then_some(CategoryFailure {
                category,
                measured,
                threshold,
            })
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CoverageError::BelowThreshold(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn summary(statements: f64, branches: f64, functions: f64, lines: f64) -> CoverageSummary {
        CoverageSummary {
            statements,
            branches,
            functions,
            lines,
        }
    }

    #[test]
    fn reports_exactly_the_failing_category() {
        let err = check_coverage(&summary(79.0, 85.0, 90.0, 95.0), &CoverageThresholds::default()).unwrap_err();

        assert_eq!(err.failed_categories(), vec![CoverageCategory::Statements]);
        assert_eq!(err.to_string(), "Inadequate test coverage: statements 79% < 80%");
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(check_coverage(&summary(80.0, 80.0, 80.0, 80.0), &CoverageThresholds::default()).is_ok());
    }

    #[test]
    fn reports_every_failing_category_in_order() {
        let err = check_coverage(&summary(50.0, 100.0, 10.0, 79.9), &CoverageThresholds::default()).unwrap_err();

        assert_eq!(
            err.failed_categories(),
            vec![
                CoverageCategory::Statements,
                CoverageCategory::Functions,
                CoverageCategory::Lines
            ]
        );
    }

    #[test]
    fn parses_istanbul_summary() {
        let json = r#"{
            "total": {
                "lines": {"total": 10, "covered": 9, "skipped": 0, "pct": 90},
                "statements": {"total": 10, "covered": 8, "skipped": 0, "pct": 80},
                "functions": {"total": 0, "covered": 0, "skipped": 0, "pct": "Unknown"},
                "branches": {"total": 4, "covered": 3, "skipped": 0, "pct": 75}
            },
            "/src/a.js": {}
        }"#;

        let parsed = CoverageSummary::from_json(json).unwrap();

        assert_eq!(parsed, summary(80.0, 75.0, 100.0, 90.0));
    }

    #[test]
    fn rejects_incomplete_summary() {
        let err = CoverageSummary::from_json(r#"{"total": {"lines": {"pct": 90}}}"#).unwrap_err();

        assert!(err.contains("statements"));
    }
}

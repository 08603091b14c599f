//! Post-publish validation
//!
//! Compares structural counts of the source page with those of the created
//! block tree, and scans every piece of remote text for marker tokens. Count
//! drift is judged against tolerance bands; a leaked marker is always an
//! issue.

pub mod counts;
pub mod tolerance;

pub use counts::{StructuralCounts, count_blocks, count_html};
pub use tolerance::{Category, ToleranceBand, ToleranceTable, Verdict, mismatch_ratio};

use serde::{Deserialize, Serialize};

use crate::block_converter::deep_nesting::find_markers;
use crate::blocks::{Block, walk_blocks};
use crate::config::ConversionConfig;
use crate::error::Result;

/// Explicit expected counts, replacing those derived from the HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountOverrides {
    pub headings: Option<usize>,
    pub lists: Option<usize>,
    pub tables: Option<usize>,
    pub images: Option<usize>,
    pub code_blocks: Option<usize>,
    pub callouts: Option<usize>,
}

impl CountOverrides {
    fn get(&self, category: Category) -> Option<usize> {
        match category {
            Category::Headings => self.headings,
            Category::Lists => self.lists,
            Category::Tables => self.tables,
            Category::Images => self.images,
            Category::CodeBlocks => self.code_blocks,
            Category::Callouts => self.callouts,
        }
    }
}

/// Validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Expectations {
    pub tolerances: ToleranceTable,
    pub expected: CountOverrides,
    /// Chrome classes skipped when counting source elements
    pub chrome_classes: Vec<String>,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            tolerances: ToleranceTable::default(),
            expected: CountOverrides::default(),
            chrome_classes: ConversionConfig::default().chrome_classes,
        }
    }
}

impl Expectations {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// What a finding is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    CountMismatch {
        category: Category,
        expected: usize,
        actual: usize,
        ratio: f64,
    },
    MarkerLeak {
        token: String,
        block_type: &'static str,
    },
}

/// One issue or warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    #[serde(flatten)]
    pub kind: FindingKind,
    pub message: String,
}

/// Source and remote counts side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub html: StructuralCounts,
    pub remote: StructuralCounts,
}

/// Result of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.warnings.is_empty()
    }
}

/// Validate a created block tree against its source page.
pub fn validate(
    source_html: &str,
    remote_blocks: &[Block],
    expectations: Option<&Expectations>,
) -> ValidationReport {
    let defaults = Expectations::default();
    let expectations = expectations.unwrap_or(&defaults);

    let html = count_html(source_html, &expectations.chrome_classes);
    let remote = count_blocks(remote_blocks);
    let mut report = ValidationReport {
        stats: ValidationStats { html, remote },
        ..ValidationReport::default()
    };

    for category in Category::ALL {
        let expected = expectations
            .expected
            .get(category)
            .unwrap_or_else(|| html.get(category));
        let actual = remote.get(category);
        let verdict = expectations.tolerances.judge(category, expected, actual);
        if verdict == Verdict::Within {
            continue;
        }
        let ratio = mismatch_ratio(expected, actual);
        let finding = Finding {
            kind: FindingKind::CountMismatch {
                category,
                expected,
                actual,
                ratio,
            },
            message: format!(
                "{}: expected {expected}, found {actual} ({:.0}% off)",
                category.as_str(),
                ratio * 100.0
            ),
        };
        match verdict {
            Verdict::Hard => report.issues.push(finding),
            _ => report.warnings.push(finding),
        }
    }

    walk_blocks(remote_blocks, &mut |block, _| {
        for runs in block.text_runs() {
            let text: String = runs.iter().map(|run| run.content.as_str()).collect();
            for token in find_markers(&text) {
                report.issues.push(Finding {
                    kind: FindingKind::MarkerLeak {
                        token: token.to_string(),
                        block_type: block.type_name(),
                    },
                    message: format!("Marker {token} visible in a {} block", block.type_name()),
                });
            }
        }
    });

    if report.has_errors() {
        tracing::warn!(
            issues = report.issues.len(),
            warnings = report.warnings.len(),
            "Validation found issues"
        );
    } else {
        tracing::debug!(warnings = report.warnings.len(), "Validation passed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockKind, RichTextRun};

    fn heading(text: &str) -> Block {
        Block::heading(2, vec![RichTextRun::plain(text)])
    }

    #[test]
    fn matching_tree_is_clean() {
        let report = validate("<h2>A</h2><h2>B</h2>", &[heading("A"), heading("B")], None);
        assert!(report.is_clean());
        assert_eq!(report.stats.html.headings, 2);
    }

    #[test]
    fn missing_table_is_an_issue() {
        let html = "<table><tr><td>x</td></tr></table>";
        let report = validate(html, &[], None);
        assert!(report.has_errors());
        assert!(matches!(
            report.issues[0].kind,
            FindingKind::CountMismatch {
                category: Category::Tables,
                ..
            }
        ));
    }

    #[test]
    fn marker_leak_is_always_an_issue() {
        let blocks = vec![Block::new(BlockKind::TableRow {
            cells: vec![vec![RichTextRun::plain("cell (sn2n:abc)")]],
        })];
        let report = validate("", &blocks, None);
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            &report.issues[0].kind,
            FindingKind::MarkerLeak { token, .. } if token == "sn2n:abc"
        ));
    }

    #[test]
    fn overrides_replace_html_counts() {
        let expectations = Expectations {
            expected: CountOverrides {
                headings: Some(1),
                ..CountOverrides::default()
            },
            ..Expectations::default()
        };
        let report = validate("<h2>A</h2><h2>B</h2>", &[heading("A")], Some(&expectations));
        assert!(report.is_clean());
    }

    #[test]
    fn moderate_drift_is_a_warning() {
        let html = "<h2>1</h2><h2>2</h2><h2>3</h2><h2>4</h2><h2>5</h2>";
        let report = validate(html, &[heading("1"), heading("2"), heading("3")], None);
        assert!(!report.has_errors());
        assert_eq!(report.warnings.len(), 1);
    }
}

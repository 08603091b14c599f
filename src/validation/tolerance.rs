//! Tolerance bands for count comparison
//!
//! The defaults are pragmatic values observed to separate real conversion
//! defects from expected drift (nested-list flattening, decorative images).
//! Deployments may recalibrate them through [`Expectations`](super::Expectations).

use serde::{Deserialize, Serialize};

/// Structural count categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Headings,
    Lists,
    Tables,
    Images,
    CodeBlocks,
    Callouts,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Headings,
        Category::Lists,
        Category::Tables,
        Category::Images,
        Category::CodeBlocks,
        Category::Callouts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Headings => "headings",
            Category::Lists => "lists",
            Category::Tables => "tables",
            Category::Images => "images",
            Category::CodeBlocks => "code_blocks",
            Category::Callouts => "callouts",
        }
    }
}

/// Relative mismatch thresholds. Up to `soft` passes, up to `hard` is a
/// warning, beyond is an issue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceBand {
    pub soft: f64,
    pub hard: f64,
}

impl ToleranceBand {
    pub const fn new(soft: f64, hard: f64) -> Self {
        Self { soft, hard }
    }
}

/// How a count comparison came out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Within,
    Soft,
    Hard,
}

/// Mismatch of `actual` against `expected`, relative to `expected` (or 1
/// when nothing was expected).
pub fn mismatch_ratio(expected: usize, actual: usize) -> f64 {
    expected.abs_diff(actual) as f64 / expected.max(1) as f64
}

/// Per-category bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceTable {
    pub general: ToleranceBand,
    pub lists: ToleranceBand,
    pub tables: ToleranceBand,
}

impl Default for ToleranceTable {
    fn default() -> Self {
        Self {
            general: ToleranceBand::new(0.30, 0.60),
            lists: ToleranceBand::new(0.50, 1.00),
            tables: ToleranceBand::new(0.20, 0.40),
        }
    }
}

impl ToleranceTable {
    pub fn band(&self, category: Category) -> ToleranceBand {
        match category {
            Category::Lists => self.lists,
            Category::Tables => self.tables,
            _ => self.general,
        }
    }

    pub fn judge(&self, category: Category, expected: usize, actual: usize) -> Verdict {
        let band = self.band(category);
        let ratio = mismatch_ratio(expected, actual);
        if ratio <= band.soft {
            Verdict::Within
        } else if ratio <= band.hard {
            Verdict::Soft
        } else {
            Verdict::Hard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_bands_are_strict() {
        let table = ToleranceTable::default();
        assert_eq!(table.judge(Category::Tables, 10, 9), Verdict::Within);
        assert_eq!(table.judge(Category::Tables, 10, 7), Verdict::Soft);
        assert_eq!(table.judge(Category::Tables, 10, 5), Verdict::Hard);
    }

    #[test]
    fn lists_tolerate_flattening() {
        let table = ToleranceTable::default();
        assert_eq!(table.judge(Category::Lists, 4, 6), Verdict::Within);
        assert_eq!(table.judge(Category::Lists, 4, 8), Verdict::Soft);
    }

    #[test]
    fn nothing_expected() {
        assert_eq!(mismatch_ratio(0, 0), 0.0);
        assert_eq!(mismatch_ratio(0, 2), 2.0);
    }
}

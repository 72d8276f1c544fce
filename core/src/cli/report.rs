use crate::analysis::metrics::{MetricRow, ACE_INDEX};
use crate::analysis::RadiopediaSummary;
use crate::audit::{InventoryReport, OutlierReport};
use std::fmt;
use std::path::Path;

const RULE_WIDTH: usize = 60;

/// Text report for one dataset's file bookkeeping
pub struct InventoryTextReport<'a> {
    report: &'a InventoryReport,
}

impl<'a> InventoryTextReport<'a> {
    /// Creates a new text report
    pub fn new(report: &'a InventoryReport) -> Self {
        Self { report }
    }
}

impl<'a> fmt::Display for InventoryTextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.report.dataset.simple_name();
        let comparison = &self.report.comparison;

        writeln!(f)?;
        writeln!(f, "==== FILE STATS ====")?;
        writeln!(f, "Total {} files: {}", name, self.report.total_expected)?;
        writeln!(
            f,
            "Total data_dir ({} only) files: {}",
            name, self.report.total_found
        )?;
        writeln!(f, "Matched files: {}", comparison.matched.len())?;
        writeln!(
            f,
            "Missing in data_dir: {}",
            comparison.missing_in_data_dir.len()
        )?;
        writeln!(
            f,
            "Missing in {} mapping: {}",
            name,
            comparison.missing_in_mapping.len()
        )?;
        if let Some(count) = self.report.annotation_count.filter(|c| *c > 0) {
            writeln!(f, "Total files in JSONs: {}", count)?;
        }
        writeln!(f)?;
        writeln!(f, "Missing files breakdown:")?;
        for (reason, count) in self.report.exclusion_counts() {
            writeln!(f, "  - {}: {} files", reason, count)?;
        }
        write!(f, "====================")
    }
}

/// Text summary of an outlier scan
pub struct OutlierTextReport<'a> {
    report: &'a OutlierReport,
    output: &'a Path,
}

impl<'a> OutlierTextReport<'a> {
    /// Creates a new text report; `output` is where the JSON was written
    pub fn new(report: &'a OutlierReport, output: &'a Path) -> Self {
        Self { report, output }
    }
}

impl<'a> fmt::Display for OutlierTextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Outlier Report")?;
        writeln!(f, "==============")?;
        writeln!(f, "Frog-leg views:  {}", self.report.frog_leg_views.len())?;
        for (reason, stems) in &self.report.known_outliers {
            writeln!(f, "{}: {}", reason, stems.len())?;
        }
        writeln!(f, "Missing images:  {}", self.report.missing.len())?;
        writeln!(f, "Total excluded:  {}", self.report.total_excluded())?;
        write!(f, "Outliers written to {}", self.output.display())
    }
}

/// Rows removed from the MTDDH snapshot for a high ACE index
pub struct HighAceReport<'a> {
    rows: &'a [MetricRow],
    limit: f64,
}

impl<'a> HighAceReport<'a> {
    pub fn new(rows: &'a [MetricRow], limit: f64) -> Self {
        Self { rows, limit }
    }
}

impl<'a> fmt::Display for HighAceReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Files with {} > {} (removed from plot):",
            ACE_INDEX, self.limit
        )?;
        for row in self.rows {
            write!(
                f,
                "\n- {} (side: {}, ACE: {})",
                row.case_rel,
                row.side,
                row.get(ACE_INDEX).unwrap_or(f64::NAN)
            )?;
        }
        Ok(())
    }
}

/// Console summary of the Radiopedia dataset
pub struct RadiopediaTextReport<'a> {
    summary: &'a RadiopediaSummary,
}

impl<'a> RadiopediaTextReport<'a> {
    pub fn new(summary: &'a RadiopediaSummary) -> Self {
        Self { summary }
    }
}

fn fmt_range(range: Option<(f64, f64)>, unit: &str) -> String {
    match range {
        Some((lo, hi)) => format!("{:.1} - {:.1} {}", lo, hi, unit),
        None => "n/a".to_string(),
    }
}

impl<'a> fmt::Display for RadiopediaTextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(f, "{}", rule)?;
        writeln!(f, "RADIOPEDIA ULTRASOUND DATASET SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Total Images: {}", s.total_images)?;
        writeln!(f, "Unique Patients: {}", s.unique_patients)?;
        writeln!(f, "Age Range: {}", fmt_range(s.age_range_months, "months"))?;
        match s.mean_age_months {
            Some(m) => writeln!(f, "Mean Age: {:.1} months", m)?,
            None => writeln!(f, "Mean Age: n/a")?,
        }
        writeln!(
            f,
            "Breech Presentation: {:.1}% (of known cases)",
            s.breech_percent
        )?;
        writeln!(f, "Breech Data Available: {:.1}%", s.breech_available_percent)?;
        match s.most_common_graf() {
            Some((graf, count)) => {
                writeln!(f, "Most Common Graf Type: {} ({} cases)", graf, count)?
            }
            None => writeln!(f, "Most Common Graf Type: n/a")?,
        }
        writeln!(
            f,
            "Alpha Angle Range: {}",
            fmt_range(s.alpha_range, "degrees")
        )?;
        writeln!(f, "Beta Angle Range: {}", fmt_range(s.beta_range, "degrees"))?;
        write!(f, "{}", rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{DatasetKind, ExclusionReason, StemComparison};
    use crate::types::Side;
    use std::collections::BTreeMap;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_inventory_report_format() {
        let mut exclusions = BTreeMap::new();
        exclusions.insert(ExclusionReason::MissingFromJson, strings(&["a"]));
        exclusions.insert(ExclusionReason::ProcessingErrors, strings(&["x", "y"]));
        let report = InventoryReport {
            dataset: DatasetKind::Dataset1,
            total_expected: 5,
            total_found: 4,
            comparison: StemComparison {
                missing_in_data_dir: strings(&["a", "x", "y"]),
                missing_in_mapping: strings(&["d"]),
                matched: strings(&["b", "c"]),
            },
            annotation_count: Some(12),
            exclusions,
        };

        let output = InventoryTextReport::new(&report).to_string();
        assert!(output.contains("==== FILE STATS ===="));
        assert!(output.contains("Total dataset1 files: 5"));
        assert!(output.contains("Total data_dir (dataset1 only) files: 4"));
        assert!(output.contains("Matched files: 2"));
        assert!(output.contains("Missing in data_dir: 3"));
        assert!(output.contains("Missing in dataset1 mapping: 1"));
        assert!(output.contains("Total files in JSONs: 12"));
        assert!(output.contains("  - missing_from_json: 1 files"));
        assert!(output.contains("  - processing errors: 2 files"));
        assert!(output.ends_with("===================="));
    }

    #[test]
    fn test_inventory_report_without_annotations() {
        let report = InventoryReport {
            dataset: DatasetKind::Dataset2,
            total_expected: 0,
            total_found: 0,
            comparison: StemComparison::default(),
            annotation_count: None,
            exclusions: BTreeMap::new(),
        };
        let output = InventoryTextReport::new(&report).to_string();
        assert!(output.contains("Total dataset2 files: 0"));
        assert!(!output.contains("Total files in JSONs"));
    }

    #[test]
    fn test_outlier_report_format() {
        let report = OutlierReport {
            frog_leg_views: strings(&["dataset1_train_h1", "dataset1_train_h2"]),
            known_outliers: vec![("Old".to_string(), strings(&["dataset1_train_a1"]))],
            missing: strings(&["dataset1_train_q9"]),
            unflagged_h_views: Vec::new(),
        };
        let output = OutlierTextReport::new(&report, Path::new("outliers.json")).to_string();
        assert!(output.contains("Frog-leg views:  2"));
        assert!(output.contains("Old: 1"));
        assert!(output.contains("Missing images:  1"));
        assert!(output.contains("Total excluded:  3"));
        assert!(output.ends_with("Outliers written to outliers.json"));
    }

    #[test]
    fn test_high_ace_report() {
        let mut values = BTreeMap::new();
        values.insert(ACE_INDEX.to_string(), 85.5);
        let rows = vec![MetricRow {
            case_rel: "site/case_4b/metrics.json".to_string(),
            folder: "case_4b".to_string(),
            side: Side::Right,
            values,
        }];
        let output = HighAceReport::new(&rows, 80.0).to_string();
        assert_eq!(
            output,
            "Files with ace_index > 80 (removed from plot):\n- site/case_4b/metrics.json (side: right, ACE: 85.5)"
        );
    }

    #[test]
    fn test_radiopedia_report_empty() {
        let summary = RadiopediaSummary::from_records(&[]);
        let output = RadiopediaTextReport::new(&summary).to_string();
        assert!(output.contains("RADIOPEDIA ULTRASOUND DATASET SUMMARY"));
        assert!(output.contains("Total Images: 0"));
        assert!(output.contains("Age Range: n/a"));
        assert!(output.contains("Most Common Graf Type: n/a"));
    }
}

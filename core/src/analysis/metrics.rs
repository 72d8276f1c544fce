use crate::error::Result;
use crate::extraction::{find_metrics_files, load_metrics_file, split_side_key};
use crate::types::{Side, SnapshotFilter};
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const ACE_INDEX: &str = "ace_index";
pub const WIBERG_INDEX: &str = "wiberg_index";
pub const IHDI_GRADE: &str = "ihdi_grade";
pub const TONNIS_GRADE: &str = "tonnis_grade";

/// Columns every table has, whether or not any case reports them
pub const REQUIRED_COLUMNS: [&str; 4] = [ACE_INDEX, WIBERG_INDEX, IHDI_GRADE, TONNIS_GRADE];

/// Number of identifying columns (case_rel, folder, side)
const KEY_COLUMNS: usize = 3;

/// One hip (or an unsided case) from a `metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    /// Path of the metrics file relative to the scanned root
    pub case_rel: String,
    /// Name of the folder holding the metrics file
    pub folder: String,
    pub side: Side,
    /// Metric base name → value
    pub values: BTreeMap<String, f64>,
}

impl MetricRow {
    /// Value of a metric column; absent columns read as `None`
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().filter(|v| !v.is_nan())
    }

    /// Group letter encoded in the folder name
    pub fn group_letter(&self) -> Option<char> {
        folder_group_letter(&self.folder)
    }
}

/// Builds one row per side present in the metrics, or one `Both` row
///
/// Sided keys (`ace_index_left`) go to their side's row under the base name;
/// unsided keys are copied into every row.
pub fn build_case_side_rows(case_rel: &str, metrics: &BTreeMap<String, f64>) -> Vec<MetricRow> {
    let sides: BTreeSet<Side> = metrics
        .keys()
        .filter_map(|key| split_side_key(key).1)
        .collect();
    let sides: Vec<Side> = if sides.is_empty() {
        vec![Side::Both]
    } else {
        sides.into_iter().collect()
    };

    let folder = Path::new(case_rel)
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    sides
        .into_iter()
        .map(|side| {
            let values = metrics
                .iter()
                .filter_map(|(key, &value)| {
                    let (base, key_side) = split_side_key(key);
                    match key_side {
                        None => Some((base.to_string(), value)),
                        Some(s) if s == side => Some((base.to_string(), value)),
                        Some(_) => None,
                    }
                })
                .collect();
            MetricRow {
                case_rel: case_rel.to_string(),
                folder: folder.clone(),
                side,
                values,
            }
        })
        .collect()
}

/// Row table built from every `metrics.json` under a root
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsTable {
    pub rows: Vec<MetricRow>,
}

impl MetricsTable {
    pub fn new(rows: Vec<MetricRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Metric column names, including the required ones
    pub fn metric_columns(&self) -> BTreeSet<String> {
        let mut columns: BTreeSet<String> =
            REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        for row in &self.rows {
            columns.extend(row.values.keys().cloned());
        }
        columns
    }

    /// Total column count as shown in the load summary
    pub fn column_count(&self) -> usize {
        KEY_COLUMNS + self.metric_columns().len()
    }

    /// Non-missing values of one column
    pub fn column(&self, name: &str) -> Vec<f64> {
        column_values(&self.rows, name)
    }
}

/// Non-missing values of one column across rows
pub fn column_values(rows: &[MetricRow], name: &str) -> Vec<f64> {
    rows.iter().filter_map(|row| row.get(name)).collect()
}

/// Loads every `metrics.json` under `root` into a table
///
/// Files that fail to load are logged and skipped.
///
/// # Errors
///
/// Returns `DirectoryNotFound` if `root` does not exist.
pub fn build_metrics_table(root: &Path) -> Result<MetricsTable> {
    let files = find_metrics_files(root)?;
    info!("Found {} metrics files", files.len());

    let mut rows = Vec::new();
    for (rel, path) in &files {
        match load_metrics_file(path) {
            Ok(metrics) => rows.extend(build_case_side_rows(rel, &metrics)),
            Err(e) => warn!("Failed to load {}: {}", path.display(), e),
        }
    }
    Ok(MetricsTable::new(rows))
}

/// Group letter of a case folder
///
/// The first ASCII letter of the last `_`-separated token, lowercased
/// (`"site_3B"` → `'b'`).
pub fn folder_group_letter(folder: &str) -> Option<char> {
    folder
        .rsplit('_')
        .next()
        .and_then(|token| token.chars().find(|c| c.is_ascii_alphabetic()))
        .map(|c| c.to_ascii_lowercase())
}

/// Rows chosen for the MTDDH snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotSelection {
    /// Rows that are plotted
    pub rows: Vec<MetricRow>,
    /// Rows removed for an ACE index above the limit
    pub high_ace: Vec<MetricRow>,
}

impl SnapshotSelection {
    /// Non-missing values of one plotted column
    pub fn column(&self, name: &str) -> Vec<f64> {
        column_values(&self.rows, name)
    }

    /// Rows per grade for a grade column, keyed by the rounded grade
    pub fn grade_counts(&self, column: &str) -> BTreeMap<i64, usize> {
        grade_counts(&self.rows, column)
    }
}

/// Applies the snapshot filter to a table
///
/// Rows in excluded folder groups are dropped. Of the rest, rows with an ACE
/// index above the limit are set aside in `high_ace`; rows without an ACE index
/// are dropped.
pub fn select_for_snapshot(table: &MetricsTable, filter: &SnapshotFilter) -> SnapshotSelection {
    let mut selection = SnapshotSelection::default();

    for row in &table.rows {
        if filter.is_group_excluded(row.group_letter()) {
            continue;
        }
        match row.get(ACE_INDEX) {
            Some(ace) if ace > filter.ace_limit => selection.high_ace.push(row.clone()),
            Some(_) => selection.rows.push(row.clone()),
            None => {}
        }
    }

    selection
}

/// Counts rows per grade, keyed by the grade rounded to an integer
pub fn grade_counts(rows: &[MetricRow], column: &str) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for grade in column_values(rows, column) {
        if grade.is_finite() {
            *counts.entry(grade.round() as i64).or_insert(0) += 1;
        }
    }
    counts
}

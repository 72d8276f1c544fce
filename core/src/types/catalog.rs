use crate::error::{HipAuditError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Curated list of stems excluded for one reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierGroup {
    pub reason: String,
    pub stems: Vec<String>,
}

impl OutlierGroup {
    pub fn new(reason: impl Into<String>, stems: &[&str]) -> Self {
        Self {
            reason: reason.into(),
            stems: stems.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Manually curated exception lists for the X-ray outlier scan
///
/// `known_outliers` keeps its order; it is the order of the report keys.
/// `false_negatives` are matched as substrings of label stems and suppress
/// the frog-leg flag for those files.
///
/// # Example
///
/// ```
/// use hipaudit_core::OutlierCatalog;
///
/// let catalog = OutlierCatalog::empty()
///     .with_group("Blurry", &["dataset1_train_a1"])
///     .with_false_negative("dataset1_train_y3");
///
/// assert_eq!(catalog.known_outliers.len(), 1);
/// assert!(catalog.is_false_negative("dataset1_train_y3"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierCatalog {
    #[serde(default)]
    pub known_outliers: Vec<OutlierGroup>,

    #[serde(default)]
    pub false_negatives: Vec<String>,
}

impl Default for OutlierCatalog {
    fn default() -> Self {
        Self {
            known_outliers: vec![
                OutlierGroup::new(
                    "Old",
                    &["dataset2_90d75cba_img", "dataset2_3415d946_img"],
                ),
                OutlierGroup::new(
                    "Wrong Body Part",
                    &[
                        "dataset2_306feb9a_img",
                        "dataset2_e977cf36_img",
                        "dataset2_f68ab7a6_img",
                        "dataset2_8dd741ed_img",
                        "dataset2_6d4ff308_img",
                        "dataset2_f3e8f7f8_img",
                        "dataset2_5bb4943f_img",
                        "dataset2_bcbec32d_img",
                        "dataset2_aecbeb0b_img",
                        "dataset2_b20e2247_img",
                        "dataset2_fbdae91f_img",
                    ],
                ),
                OutlierGroup::new(
                    "Label Points Wrong Way Round",
                    &[
                        "dataset1_train_h81",
                        "dataset2_95481ad2_img",
                        "dataset2_6449bb8d_img",
                        "dataset1_train_y3",
                    ],
                ),
            ],
            false_negatives: [
                "dataset1_train_y3",
                "dataset1_train_y44",
                "dataset2_6b8b2988_img",
                "dataset2_9461a9ba_img",
                "dataset2_b67c3a4d_img",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl OutlierCatalog {
    /// Creates a catalog with no curated entries
    pub fn empty() -> Self {
        Self {
            known_outliers: Vec::new(),
            false_negatives: Vec::new(),
        }
    }

    /// Loads a catalog from a JSON file
    ///
    /// Missing keys fall back to empty lists, not to the built-in catalog.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(HipAuditError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Builder: Append a reason group
    pub fn with_group(mut self, reason: impl Into<String>, stems: &[&str]) -> Self {
        self.known_outliers.push(OutlierGroup::new(reason, stems));
        self
    }

    /// Builder: Add an exception to the frog-leg heuristic
    pub fn with_false_negative(mut self, stem: impl Into<String>) -> Self {
        self.false_negatives.push(stem.into());
        self
    }

    /// Returns whether the stem matches an entry of the exception list
    pub fn is_false_negative(&self, stem: &str) -> bool {
        self.false_negatives
            .iter()
            .any(|entry| stem.contains(entry.as_str()))
    }
}

use crate::error::{HipAuditError, Result};
use crate::extraction::load_pose_labels;
use crate::types::{OutlierCatalog, Pose};
use log::{debug, info, warn};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Pose class whose keypoints describe the pelvis outline
pub const FROG_LEG_CLASS: u32 = 1;

/// Report key for flagged frog-leg views
pub const FROG_LEG_KEY: &str = "Known Frog-Leg Views";

/// Report key for stems without an image
pub const MISSING_KEY: &str = "Missing";

/// Image extensions tried for a stem, in order of preference
const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Checks whether an X-ray was taken in a frog-leg (non-AP) view
///
/// A pose list is flagged if any pose of class [`FROG_LEG_CLASS`] has at least
/// two labeled keypoints spread wider horizontally than vertically.
pub fn is_frog_leg_view(poses: &[Pose]) -> bool {
    poses
        .iter()
        .filter(|pose| pose.class_id == FROG_LEG_CLASS)
        .filter_map(Pose::keypoint_extent)
        .any(|(x_range, y_range)| x_range > y_range)
}

/// Returns the image for a stem, preferring `.jpg` over `.png`
pub fn find_existing_image(stem: &str, data_dir: &Path) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| data_dir.join(format!("{}.{}", stem, ext)))
        .find(|path| path.is_file())
}

/// Outcome of an outlier scan
///
/// Serializes to the `outliers.json` layout: frog-leg views, missing stems,
/// then one key per catalog reason in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierReport {
    /// Flagged stems that have an image
    pub frog_leg_views: Vec<String>,

    /// Catalog reason → stems that have an image
    pub known_outliers: Vec<(String, Vec<String>)>,

    /// Flagged or catalogued stems without an image (sorted, unique)
    pub missing: Vec<String>,

    /// Stems with an `_h` marker that the heuristic did not flag
    pub unflagged_h_views: Vec<String>,
}

impl OutlierReport {
    /// Total number of stems excluded for any reason
    pub fn total_excluded(&self) -> usize {
        self.frog_leg_views.len()
            + self
                .known_outliers
                .iter()
                .map(|(_, stems)| stems.len())
                .sum::<usize>()
    }

    /// Writes the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Serialize for OutlierReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.known_outliers.len()))?;
        map.serialize_entry(FROG_LEG_KEY, &self.frog_leg_views)?;
        map.serialize_entry(MISSING_KEY, &self.missing)?;
        for (reason, stems) in &self.known_outliers {
            map.serialize_entry(reason, stems)?;
        }
        map.end()
    }
}

/// Lists `*.txt` label files directly inside `data_dir`, sorted by name
fn list_label_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(data_dir)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("Skipping entry in {}: {}", data_dir.display(), e);
                None
            }
        })
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Scans all label files in `data_dir` for non-standard and catalogued X-rays
///
/// # Errors
///
/// Returns `DirectoryNotFound` if `data_dir` does not exist. Unreadable label
/// files are logged and skipped.
pub fn find_outliers(data_dir: &Path, catalog: &OutlierCatalog) -> Result<OutlierReport> {
    if !data_dir.is_dir() {
        return Err(HipAuditError::DirectoryNotFound(data_dir.to_path_buf()));
    }

    let label_files = list_label_files(data_dir)?;
    info!("Scanning {} label files", label_files.len());

    let mut flagged = Vec::new();
    let mut unflagged_h_views = Vec::new();

    for label_file in &label_files {
        let stem = file_stem(label_file);
        let poses = match load_pose_labels(label_file) {
            Ok(poses) => poses,
            Err(e) => {
                warn!("Skipping {}: {}", label_file.display(), e);
                continue;
            }
        };

        if is_frog_leg_view(&poses) && !catalog.is_false_negative(&stem) {
            debug!("Frog-leg view: {}", stem);
            flagged.push(stem);
        } else if stem.contains("_h") {
            unflagged_h_views.push(stem);
        }
    }

    let mut missing = BTreeSet::new();
    let mut report = OutlierReport {
        unflagged_h_views,
        ..Default::default()
    };

    for stem in flagged {
        if find_existing_image(&stem, data_dir).is_some() {
            report.frog_leg_views.push(stem);
        } else {
            missing.insert(stem);
        }
    }

    for group in &catalog.known_outliers {
        let mut present = Vec::new();
        for stem in &group.stems {
            if find_existing_image(stem, data_dir).is_some() {
                present.push(stem.clone());
            } else {
                missing.insert(stem.clone());
            }
        }
        report.known_outliers.push((group.reason.clone(), present));
    }

    report.missing = missing.into_iter().collect();

    if !report.unflagged_h_views.is_empty() {
        info!(
            "{} '_h' labels were not flagged as frog-leg views",
            report.unflagged_h_views.len()
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Keypoint, Visibility};
    use tempfile::TempDir;

    fn pose(class_id: u32, points: &[(f64, f64, i64)]) -> Pose {
        Pose {
            class_id,
            bbox: BoundingBox::new(0.5, 0.5, 1.0, 1.0),
            keypoints: points
                .iter()
                .map(|&(x, y, v)| Keypoint::new(x, y, Visibility::from_flag(v)))
                .collect(),
        }
    }

    #[test]
    fn test_wide_spread_is_frog_leg() {
        // x-range 0.6, y-range 0.2
        let poses = vec![pose(1, &[(0.2, 0.4, 2), (0.8, 0.6, 2)])];
        assert!(is_frog_leg_view(&poses));
    }

    #[test]
    fn test_tall_spread_is_standard() {
        // x-range 0.1, y-range 0.5
        let poses = vec![pose(1, &[(0.4, 0.2, 2), (0.5, 0.7, 2)])];
        assert!(!is_frog_leg_view(&poses));
    }

    #[test]
    fn test_other_classes_ignored() {
        let poses = vec![pose(0, &[(0.1, 0.5, 2), (0.9, 0.5, 2)])];
        assert!(!is_frog_leg_view(&poses));
    }

    #[test]
    fn test_hidden_points_ignored() {
        let poses = vec![pose(1, &[(0.1, 0.5, 0), (0.9, 0.5, 2), (0.5, 0.1, 1)])];
        assert!(!is_frog_leg_view(&poses));
    }

    #[test]
    fn test_needs_two_visible_points() {
        let poses = vec![pose(1, &[(0.1, 0.5, 2)]), pose(1, &[])];
        assert!(!is_frog_leg_view(&poses));
    }

    #[test]
    fn test_equal_extent_is_not_horizontal() {
        let poses = vec![pose(1, &[(0.25, 0.25, 2), (0.75, 0.75, 2)])];
        assert!(!is_frog_leg_view(&poses));
    }

    #[test]
    fn test_find_existing_image_prefers_jpg() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), "png").unwrap();
        fs::write(dir.path().join("a.jpg"), "jpg").unwrap();
        fs::write(dir.path().join("b.png"), "png").unwrap();

        assert_eq!(find_existing_image("a", dir.path()), Some(dir.path().join("a.jpg")));
        assert_eq!(find_existing_image("b", dir.path()), Some(dir.path().join("b.png")));
        assert_eq!(find_existing_image("c", dir.path()), None);
    }

    const WIDE: &str = "1 0.5 0.5 1 1 0.2 0.4 2 0.8 0.6 2\n";
    const TALL: &str = "1 0.5 0.5 1 1 0.4 0.2 2 0.5 0.7 2\n";

    #[test]
    fn test_find_outliers_report() {
        let dir = TempDir::new().unwrap();
        let d = dir.path();
        fs::write(d.join("dataset1_train_a1.txt"), WIDE).unwrap();
        fs::write(d.join("dataset1_train_a1.jpg"), "").unwrap();
        // flagged but no image
        fs::write(d.join("dataset1_train_a2.txt"), WIDE).unwrap();
        // flagged but listed as exception
        fs::write(d.join("dataset1_train_y3.txt"), WIDE).unwrap();
        fs::write(d.join("dataset1_train_y3.jpg"), "").unwrap();
        // h marker, not flagged
        fs::write(d.join("dataset1_train_h9.txt"), TALL).unwrap();
        // catalogued with image
        fs::write(d.join("dataset2_90d75cba_img.png"), "").unwrap();

        let report = find_outliers(d, &OutlierCatalog::default()).unwrap();

        assert_eq!(report.frog_leg_views, vec!["dataset1_train_a1"]);
        assert_eq!(report.unflagged_h_views, vec!["dataset1_train_h9"]);
        assert_eq!(report.known_outliers[0].0, "Old");
        assert_eq!(report.known_outliers[0].1, vec!["dataset2_90d75cba_img"]);
        assert!(report.missing.contains(&"dataset1_train_a2".to_string()));
        assert!(report.missing.contains(&"dataset2_3415d946_img".to_string()));
        assert!(!report.missing.contains(&"dataset1_train_y3".to_string()));

        let mut sorted = report.missing.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(report.missing, sorted);
    }

    #[test]
    fn test_find_outliers_missing_dir() {
        let result = find_outliers(Path::new("/nonexistent/data"), &OutlierCatalog::default());
        assert!(matches!(result, Err(HipAuditError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_report_json_key_order() {
        let report = OutlierReport {
            frog_leg_views: vec!["a".to_string()],
            known_outliers: vec![
                ("Zeta".to_string(), vec![]),
                ("Alpha".to_string(), vec!["b".to_string()]),
            ],
            missing: vec!["c".to_string()],
            unflagged_h_views: vec!["h".to_string()],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"Known Frog-Leg Views":["a"],"Missing":["c"],"Zeta":[],"Alpha":["b"]}"#
        );
        assert_eq!(report.total_excluded(), 2);
    }

    #[test]
    fn test_write_json_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("outliers.json");
        OutlierReport::default().write_json(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"Known Frog-Leg Views\": []"));
    }
}

use crate::error::{HipAuditError, Result};
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Image file searched for inside each Dataset2 case folder
pub const DATASET2_IMAGE_NAME: &str = "img.png";

/// Which half of the MTDDH release a data directory is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Keypoint-annotated images named `dataset1_<split>_<id>`
    Dataset1,
    /// Folder-per-case images named `dataset2_<id>_img`
    Dataset2,
}

impl DatasetKind {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            DatasetKind::Dataset1 => "dataset1",
            DatasetKind::Dataset2 => "dataset2",
        }
    }

    /// Maps a stem from the processed data directory to the raw release's key
    ///
    /// Returns `None` for stems belonging to the other dataset.
    pub fn normalize_stem(&self, stem: &str) -> Option<String> {
        let is_dataset2 = stem.to_lowercase().contains("dataset2_");
        match self {
            DatasetKind::Dataset1 if is_dataset2 => None,
            DatasetKind::Dataset1 => Some(clean_dataset1_prefix(stem)),
            DatasetKind::Dataset2 if !is_dataset2 => None,
            DatasetKind::Dataset2 => {
                Some(extract_dataset2_id(stem).unwrap_or_else(|| stem.to_string()))
            }
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Why a stem from the raw release is absent from the data directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExclusionReason {
    /// Not referenced by any annotation JSON
    MissingFromJson,
    /// Annotated, so it was dropped during conversion
    ProcessingErrors,
}

impl ExclusionReason {
    pub fn simple_name(&self) -> &'static str {
        match self {
            ExclusionReason::MissingFromJson => "missing_from_json",
            ExclusionReason::ProcessingErrors => "processing errors",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

impl Serialize for ExclusionReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.simple_name())
    }
}

fn dataset1_prefix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^dataset1_(train|validation|test)_").expect("Failed to compile regex")
    })
}

fn dataset2_id_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^dataset2_([^_]+)_img").expect("Failed to compile regex"))
}

/// Removes the `dataset1_<split>_` prefix from a stem
pub fn clean_dataset1_prefix(stem: &str) -> String {
    dataset1_prefix_regex().replace(stem, "").into_owned()
}

/// Extracts the case ID from stems like `dataset2_8dd741ed_img`
pub fn extract_dataset2_id(stem: &str) -> Option<String> {
    dataset2_id_regex()
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("Skipping entry in {}: {}", dir.display(), e);
                None
            }
        })
        .collect();
    entries.sort();
    Ok(entries)
}

/// Maps file stems to paths for every regular file in `dir`
///
/// A `.jpg`/`.jpeg` file always owns its stem; for other extensions the first
/// file (by name) keeps it.
pub fn list_files_by_stem(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    if !dir.is_dir() {
        return Err(HipAuditError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut files = BTreeMap::new();
    for path in sorted_entries(dir)? {
        if !path.is_file() {
            continue;
        }
        let Some(stem) = stem_of(&path) else {
            continue;
        };
        let is_jpeg = path.extension().is_some_and(|ext| {
            ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg")
        });
        if is_jpeg || !files.contains_key(&stem) {
            files.insert(stem, path);
        }
    }
    Ok(files)
}

/// Finds the first `img.png` below each first-level folder of `base`
///
/// Keyed by the first-level folder name. Subfolders are searched depth-first
/// in name order; folders without an image are left out.
pub fn list_dataset2_images(base: &Path) -> Result<BTreeMap<String, PathBuf>> {
    if !base.is_dir() {
        return Err(HipAuditError::DirectoryNotFound(base.to_path_buf()));
    }

    let mut files = BTreeMap::new();
    for folder in sorted_entries(base)? {
        if !folder.is_dir() {
            continue;
        }
        let Some(name) = folder.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        match find_image_recursive(&folder)? {
            Some(image) => {
                files.insert(name, image);
            }
            None => debug!("No {} under {}", DATASET2_IMAGE_NAME, folder.display()),
        }
    }
    Ok(files)
}

fn find_image_recursive(dir: &Path) -> Result<Option<PathBuf>> {
    let candidate = dir.join(DATASET2_IMAGE_NAME);
    if candidate.is_file() {
        return Ok(Some(candidate));
    }
    for entry in sorted_entries(dir)? {
        if entry.is_dir() {
            if let Some(found) = find_image_recursive(&entry)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

#[derive(Debug, Deserialize)]
struct AnnotationFile {
    #[serde(default)]
    images: Vec<AnnotationImage>,
}

#[derive(Debug, Deserialize)]
struct AnnotationImage {
    #[serde(default)]
    file_name: String,
}

/// Collects the stems of all `images[].file_name` entries in COCO-style files
///
/// Missing files are logged and skipped.
///
/// # Errors
///
/// Returns an error if an existing file is not valid JSON.
pub fn load_annotation_stems(paths: &[PathBuf]) -> Result<HashSet<String>> {
    let mut stems = HashSet::new();
    for path in paths {
        if !path.is_file() {
            warn!("JSON file not found: {}", path.display());
            continue;
        }
        let text = fs::read_to_string(path)?;
        let data: AnnotationFile = serde_json::from_str(&text)?;
        stems.extend(
            data.images
                .iter()
                .filter(|image| !image.file_name.is_empty())
                .filter_map(|image| stem_of(Path::new(&image.file_name))),
        );
    }
    Ok(stems)
}

/// Stems present in the data directory for one dataset, normalized
pub fn collect_data_stems(data_dir: &Path, kind: DatasetKind) -> Result<BTreeSet<String>> {
    if !data_dir.is_dir() {
        return Err(HipAuditError::DirectoryNotFound(data_dir.to_path_buf()));
    }

    let mut stems = BTreeSet::new();
    for path in sorted_entries(data_dir)? {
        if !path.is_file() {
            continue;
        }
        if let Some(stem) = stem_of(&path).and_then(|s| kind.normalize_stem(&s)) {
            stems.insert(stem);
        }
    }
    Ok(stems)
}

/// Result of comparing the expected stems against those found on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StemComparison {
    /// Expected but not found in the data directory
    pub missing_in_data_dir: Vec<String>,
    /// Found in the data directory but not expected
    pub missing_in_mapping: Vec<String>,
    /// Present on both sides
    pub matched: Vec<String>,
}

/// Compares expected and found stems in both directions (all lists sorted)
pub fn compare_stems(expected: &BTreeSet<String>, found: &BTreeSet<String>) -> StemComparison {
    StemComparison {
        missing_in_data_dir: expected.difference(found).cloned().collect(),
        missing_in_mapping: found.difference(expected).cloned().collect(),
        matched: expected.intersection(found).cloned().collect(),
    }
}

/// Groups missing stems by the reason they were excluded
///
/// Without annotation stems every file counts as a processing error.
pub fn categorize_missing(
    missing: &[String],
    annotation_stems: Option<&HashSet<String>>,
) -> BTreeMap<ExclusionReason, Vec<String>> {
    let mut reasons: BTreeMap<ExclusionReason, Vec<String>> = BTreeMap::new();
    for stem in missing {
        let reason = match annotation_stems {
            Some(stems) if !stems.contains(stem) => ExclusionReason::MissingFromJson,
            _ => ExclusionReason::ProcessingErrors,
        };
        reasons.entry(reason).or_default().push(stem.clone());
    }
    reasons
}

/// File bookkeeping for one dataset against the processed data directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryReport {
    pub dataset: DatasetKind,
    pub total_expected: usize,
    pub total_found: usize,
    pub comparison: StemComparison,
    pub annotation_count: Option<usize>,
    pub exclusions: BTreeMap<ExclusionReason, Vec<String>>,
}

impl InventoryReport {
    /// Number of stems per exclusion reason
    pub fn exclusion_counts(&self) -> Vec<(ExclusionReason, usize)> {
        self.exclusions
            .iter()
            .map(|(reason, stems)| (*reason, stems.len()))
            .collect()
    }
}

/// Audits one dataset: expected files from the raw release vs the data dir
///
/// # Arguments
///
/// * `kind` - Which dataset's stems to pick from `data_dir`
/// * `expected` - Raw release files keyed by normalized stem
/// * `data_dir` - Processed data directory
/// * `annotation_stems` - Stems referenced by annotation JSON, if available
pub fn audit_dataset(
    kind: DatasetKind,
    expected: &BTreeMap<String, PathBuf>,
    data_dir: &Path,
    annotation_stems: Option<&HashSet<String>>,
) -> Result<InventoryReport> {
    let found = collect_data_stems(data_dir, kind)?;
    let expected_stems: BTreeSet<String> = expected.keys().cloned().collect();
    let comparison = compare_stems(&expected_stems, &found);
    let exclusions = categorize_missing(&comparison.missing_in_data_dir, annotation_stems);

    Ok(InventoryReport {
        dataset: kind,
        total_expected: expected_stems.len(),
        total_found: found.len(),
        comparison,
        annotation_count: annotation_stems.map(HashSet::len),
        exclusions,
    })
}

use crate::error::{HipAuditError, Result};
use crate::types::Side;
use log::warn;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the per-case measurement file
pub const METRICS_FILE_NAME: &str = "metrics.json";

/// Finds every `metrics.json` below `root`
///
/// # Returns
///
/// Map from the path relative to `root` (forward slashes) to the full path.
///
/// # Errors
///
/// Returns `DirectoryNotFound` if `root` is not a directory.
pub fn find_metrics_files(root: &Path) -> Result<BTreeMap<String, PathBuf>> {
    if !root.is_dir() {
        return Err(HipAuditError::DirectoryNotFound(root.to_path_buf()));
    }

    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir.as_path() != root => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            // Symlinked directories are not followed
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            let path = entry.path();
            if is_dir {
                pending.push(path);
            } else if path.file_name().is_some_and(|n| n == METRICS_FILE_NAME) {
                files.insert(relative_key(root, &path), path);
            }
        }
    }

    Ok(files)
}

fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Loads a `metrics.json` file into a flat `{metric_name: value}` map
///
/// The file holds `{"metrics": [{"name": value}, ...]}`. Entries that are not
/// single-key objects with a numeric value are ignored.
pub fn load_metrics_file(path: &Path) -> Result<BTreeMap<String, f64>> {
    let text = fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(&text)?;
    Ok(flatten_metrics(&data))
}

fn flatten_metrics(data: &Value) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    let Some(items) = data.get("metrics").and_then(Value::as_array) else {
        return metrics;
    };

    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        if obj.len() != 1 {
            continue;
        }
        if let Some((key, value)) = obj.iter().next() {
            if let Some(v) = value.as_f64() {
                metrics.insert(key.clone(), v);
            }
        }
    }

    metrics
}

/// Splits keys like `ace_index_left` into `("ace_index", Some(Side::Left))`
pub fn split_side_key(key: &str) -> (&str, Option<Side>) {
    for side in [Side::Left, Side::Right] {
        if let Some(suffix) = side.key_suffix() {
            if let Some(base) = key.strip_suffix(suffix) {
                return (base, Some(side));
            }
        }
    }
    (key, None)
}

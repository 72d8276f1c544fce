use crate::error::{HipAuditError, Result};
use crate::extraction::numeric::{is_missing, parse_numeric_value};
use crate::types::Side;
use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Per-image metadata of the Radiopedia ultrasound dataset
///
/// `row_data` is the patient's spreadsheet row, with sided columns such as
/// "R Alpha Angle" / "L Alpha Angle". `side` is the hip the image shows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UltrasoundRecord {
    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub side: Side,

    #[serde(default)]
    pub row_data: Map<String, Value>,
}

impl UltrasoundRecord {
    /// Raw value of a sheet column, `None` for absent/null/"NaN"
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.row_data.get(column).filter(|v| !is_missing(v))
    }

    /// Sheet column as display text
    pub fn get_string_value(&self, column: &str) -> Option<String> {
        self.value(column).map(value_to_text)
    }

    /// Sheet column parsed as a measurement
    pub fn get_numeric_value(&self, column: &str) -> Option<f64> {
        self.value(column).and_then(parse_numeric_value)
    }

    /// Sheet column for one side, e.g. `("Alpha Angle", Left)` → "L Alpha Angle"
    pub fn get_sided_string(&self, side: Side, column: &str) -> Option<String> {
        let prefix = side.column_prefix()?;
        self.get_string_value(&format!("{} {}", prefix, column))
    }

    /// Numeric sheet column for one side
    pub fn get_sided_numeric(&self, side: Side, column: &str) -> Option<f64> {
        let prefix = side.column_prefix()?;
        self.get_numeric_value(&format!("{} {}", prefix, column))
    }

    /// Text lines shown over an ultrasound overlay
    ///
    /// First line names the side ("LEFT side"), then one `key: value` line per
    /// non-missing sheet column in file order.
    pub fn metadata_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{} side", self.side.simple_name().to_uppercase())];
        for (key, value) in &self.row_data {
            if !is_missing(value) {
                lines.push(format!("{}: {}", key, value_to_text(value)));
            }
        }
        lines
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Loads one ultrasound metadata JSON file
pub fn load_ultrasound_record(path: &Path) -> Result<UltrasoundRecord> {
    if !path.is_file() {
        return Err(HipAuditError::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Loads every `*.json` metadata file in `dir`, sorted by file name
///
/// Files that fail to parse are logged and skipped.
pub fn load_ultrasound_records(dir: &Path) -> Result<Vec<UltrasoundRecord>> {
    if !dir.is_dir() {
        return Err(HipAuditError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("Skipping entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        match load_ultrasound_record(&path) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_record() -> UltrasoundRecord {
        serde_json::from_value(json!({
            "filename": "167854_0.png",
            "side": "left",
            "row_data": {
                "RadID": 167854,
                "Age": "6 weeks",
                "L Alpha Angle": "55-61",
                "R Alpha Angle": "NaN",
                "L Graf Type": "IIa",
                "Breech?": null
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_record_accessors() {
        let record = sample_record();
        assert_eq!(record.side, Side::Left);
        assert_eq!(record.get_string_value("RadID").as_deref(), Some("167854"));
        assert_eq!(record.get_numeric_value("L Alpha Angle"), Some(58.0));
        assert_eq!(record.get_numeric_value("R Alpha Angle"), None);
        assert_eq!(
            record.get_sided_string(Side::Left, "Graf Type").as_deref(),
            Some("IIa")
        );
        assert!(record.get_sided_string(Side::Both, "Graf Type").is_none());
        assert!(record.value("Breech?").is_none());
    }

    #[test]
    fn test_metadata_lines_skip_missing() {
        let lines = sample_record().metadata_lines();
        assert_eq!(lines[0], "LEFT side");
        assert!(lines.contains(&"L Graf Type: IIa".to_string()));
        assert!(lines.contains(&"RadID: 167854".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("R Alpha Angle")));
        assert!(!lines.iter().any(|l| l.starts_with("Breech?")));
    }

    #[test]
    fn test_metadata_lines_keep_file_order() {
        let record: UltrasoundRecord = serde_json::from_str(
            r#"{"side": "left", "row_data": {"RadID": 1, "L Alpha Angle": 58, "Age": "6 weeks"}}"#,
        )
        .unwrap();
        assert_eq!(
            record.metadata_lines(),
            vec!["LEFT side", "RadID: 1", "L Alpha Angle: 58", "Age: 6 weeks"]
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let record: UltrasoundRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.side, Side::Both);
        assert!(record.row_data.is_empty());
        assert_eq!(record.metadata_lines(), vec!["BOTH side".to_string()]);
    }

    #[test]
    fn test_load_records_sorted_and_skips_invalid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), r#"{"filename": "b", "side": "right"}"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{"filename": "a", "side": "left"}"#).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        fs::write(dir.path().join("a.png"), "png").unwrap();

        let records = load_ultrasound_records(dir.path()).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_load_records_missing_dir() {
        let result = load_ultrasound_records(Path::new("/nonexistent/data"));
        assert!(matches!(result, Err(HipAuditError::DirectoryNotFound(_))));
    }
}

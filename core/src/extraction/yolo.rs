use crate::error::Result;
use crate::types::{BoundingBox, Keypoint, Pose, Visibility};
use log::debug;
use std::fs;
use std::path::Path;

/// Minimum token count of a usable pose line (class, box, one coordinate)
const MIN_TOKENS: usize = 6;

/// Parses one line of a YOLO pose label file
///
/// Layout: `class xc yc w h (x y v)*`, whitespace separated.
///
/// # Returns
///
/// `None` if the line has fewer than 6 tokens or any complete field fails to
/// parse. A trailing incomplete keypoint triple is dropped.
pub fn parse_pose_line(line: &str) -> Option<Pose> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < MIN_TOKENS {
        return None;
    }

    let class_id: u32 = parts[0].parse().ok()?;
    let mut bbox = [0.0f64; 4];
    for (slot, token) in bbox.iter_mut().zip(&parts[1..5]) {
        *slot = token.parse().ok()?;
    }

    let keypoints = parts[5..]
        .chunks_exact(3)
        .map(parse_keypoint)
        .collect::<Option<Vec<_>>>()?;

    Some(Pose {
        class_id,
        bbox: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
        keypoints,
    })
}

/// Visibility is sometimes written float-like ("2.0")
fn parse_keypoint(triple: &[&str]) -> Option<Keypoint> {
    let x: f64 = triple[0].parse().ok()?;
    let y: f64 = triple[1].parse().ok()?;
    let v: f64 = triple[2].parse().ok()?;
    Some(Keypoint::new(x, y, Visibility::from_flag(v.trunc() as i64)))
}

/// Parses every usable pose in a label file's contents
pub fn parse_pose_labels(text: &str) -> Vec<Pose> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let pose = parse_pose_line(line);
            if pose.is_none() && !line.trim().is_empty() {
                debug!("Skipping malformed label line {}", idx + 1);
            }
            pose
        })
        .collect()
}

/// Loads and parses a YOLO pose label file
pub fn load_pose_labels(path: &Path) -> Result<Vec<Pose>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_pose_labels(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_line() {
        let pose = parse_pose_line("1 0.5 0.5 0.2 0.3 0.1 0.2 2 0.3 0.4 1").unwrap();
        assert_eq!(pose.class_id, 1);
        assert_eq!(pose.bbox, BoundingBox::new(0.5, 0.5, 0.2, 0.3));
        assert_eq!(pose.keypoints.len(), 2);
        assert_eq!(pose.keypoints[0], Keypoint::new(0.1, 0.2, Visibility::Visible));
        assert_eq!(pose.keypoints[1].visibility, Visibility::Occluded);
    }

    #[test]
    fn test_float_visibility() {
        let pose = parse_pose_line("0 0.5 0.5 1 1 0.1 0.2 2.0").unwrap();
        assert_eq!(pose.keypoints[0].visibility, Visibility::Visible);
    }

    #[test]
    fn test_incomplete_triple_is_dropped() {
        let pose = parse_pose_line("0 0.5 0.5 1 1 0.1 0.2 2 0.4").unwrap();
        assert_eq!(pose.keypoints.len(), 1);

        // Six tokens: box plus a lone coordinate, no complete keypoint
        let pose = parse_pose_line("0 0.5 0.5 1 1 0.1").unwrap();
        assert!(pose.keypoints.is_empty());
    }

    #[test]
    fn test_short_and_malformed_lines() {
        assert!(parse_pose_line("").is_none());
        assert!(parse_pose_line("0 0.5 0.5 1 1").is_none());
        assert!(parse_pose_line("x 0.5 0.5 1 1 0.1 0.2 2").is_none());
        assert!(parse_pose_line("0 0.5 abc 1 1 0.1 0.2 2").is_none());
        assert!(parse_pose_line("0 0.5 0.5 1 1 0.1 nan? 2").is_none());
    }

    #[test]
    fn test_parse_labels_skips_bad_lines() {
        let text = "1 0.5 0.5 1 1 0.1 0.1 2 0.2 0.2 2\n\ngarbage\n0 0.5 0.5 1 1 0.3 0.3 1\n";
        let poses = parse_pose_labels(text);
        assert_eq!(poses.len(), 2);
        assert_eq!(poses[0].class_id, 1);
        assert_eq!(poses[1].class_id, 0);
    }

    #[test]
    fn test_load_pose_labels() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1 0.5 0.5 0.4 0.4 0.2 0.4 2 0.8 0.5 2").unwrap();
        let poses = load_pose_labels(file.path()).unwrap();
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].keypoints.len(), 2);
    }
}

use super::{draw_on, fonts_available, save_image, text_style};
use crate::error::{HipAuditError, Result};
use crate::extraction::{load_pose_labels, load_ultrasound_record};
use crate::types::{Pose, Visibility};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use log::info;
use plotters::prelude::*;
use std::path::Path;

/// Mask opacity used for ultrasound overlays
pub const ULTRASOUND_MASK_ALPHA: f32 = 0.4;

const BOX_COLOR: RGBColor = RGBColor(0, 255, 0);
const OCCLUDED_COLOR: RGBColor = RGBColor(255, 0, 0);
const VISIBLE_COLOR: RGBColor = RGBColor(0, 0, 255);
const KEYPOINT_RADIUS: i32 = 3;

fn open_rgb(path: &Path) -> Result<RgbImage> {
    if !path.is_file() {
        return Err(HipAuditError::FileNotFound(path.to_path_buf()));
    }
    Ok(image::open(path)?.to_rgb8())
}

/// Draws pose boxes and keypoints onto an image
///
/// Each pose gets a green box labeled `class N`. Occluded keypoints are red,
/// visible ones blue, unlabeled ones are skipped; each drawn point carries its
/// index in white.
pub fn draw_poses(image: &mut RgbImage, poses: &[Pose]) -> Result<()> {
    let (width, height) = image.dimensions();
    let with_text = fonts_available();

    draw_on(image, |root| {
        for pose in poses {
            let (x1, y1, x2, y2) = pose.bbox.to_pixels(width, height);
            root.draw(&Rectangle::new(
                [(x1, y1), (x2, y2)],
                BOX_COLOR.stroke_width(2),
            ))?;
            if with_text {
                root.draw(&Text::new(
                    format!("class {}", pose.class_id),
                    (x1, y1.saturating_sub(16)),
                    text_style(14, &BOX_COLOR),
                ))?;
            }

            for (idx, keypoint) in pose.keypoints.iter().enumerate() {
                let color = match keypoint.visibility {
                    Visibility::Hidden => continue,
                    Visibility::Occluded => OCCLUDED_COLOR,
                    Visibility::Visible => VISIBLE_COLOR,
                };
                let (px, py) = keypoint.to_pixels(width, height);
                root.draw(&Circle::new((px, py), KEYPOINT_RADIUS, color.filled()))?;
                if with_text {
                    root.draw(&Text::new(
                        idx.to_string(),
                        (px.saturating_add(5), py.saturating_sub(14)),
                        text_style(12, &WHITE),
                    ))?;
                }
            }
        }
        Ok(())
    })
}

/// Renders a YOLO pose label over its X-ray and writes a PNG
pub fn render_pose_overlay(image_path: &Path, label_path: &Path, out_path: &Path) -> Result<()> {
    let mut image = open_rgb(image_path)?;
    if !label_path.is_file() {
        return Err(HipAuditError::FileNotFound(label_path.to_path_buf()));
    }
    let poses = load_pose_labels(label_path)?;
    info!("Drawing {} poses on {}", poses.len(), image_path.display());

    draw_poses(&mut image, &poses)?;
    save_image(&image, out_path)
}

/// Blends a color mask onto an image: `(1 - alpha) * image + alpha * mask`
///
/// The mask is resized (nearest neighbour) to the image if the sizes differ.
pub fn blend_mask(image: &RgbImage, mask: &RgbImage, alpha: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    let resized;
    let mask = if mask.dimensions() != (width, height) {
        resized = imageops::resize(mask, width, height, FilterType::Nearest);
        &resized
    } else {
        mask
    };

    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let base = image.get_pixel(x, y);
        let over = mask.get_pixel(x, y);
        let mut channels = [0u8; 3];
        for c in 0..3 {
            let v = (1.0 - alpha) * base[c] as f32 + alpha * over[c] as f32;
            channels[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        *pixel = Rgb(channels);
    }
    out
}

/// Renders a segmentation mask over an ultrasound image and writes a PNG
///
/// With a metadata file, the side and non-missing sheet values are written in
/// the top-left corner.
pub fn render_ultrasound_overlay(
    image_path: &Path,
    mask_path: &Path,
    json_path: Option<&Path>,
    out_path: &Path,
) -> Result<()> {
    let image = open_rgb(image_path)?;
    let mask = open_rgb(mask_path)?;

    let lines = match json_path.filter(|p| p.is_file()) {
        Some(path) => load_ultrasound_record(path)?.metadata_lines(),
        None => Vec::new(),
    };

    let mut blended = blend_mask(&image, &mask, ULTRASOUND_MASK_ALPHA);
    if !lines.is_empty() && fonts_available() {
        draw_metadata_text(&mut blended, &lines)?;
    }
    save_image(&blended, out_path)
}

fn draw_metadata_text(image: &mut RgbImage, lines: &[String]) -> Result<()> {
    const LINE_HEIGHT: i32 = 14;
    let block_height = LINE_HEIGHT * lines.len() as i32 + 8;

    draw_on(image, |root| {
        root.draw(&Rectangle::new(
            [(0, 0), (260, block_height)],
            BLACK.mix(0.5).filled(),
        ))?;
        for (i, line) in lines.iter().enumerate() {
            root.draw(&Text::new(
                line.clone(),
                (4, 4 + LINE_HEIGHT * i as i32),
                text_style(11, &WHITE),
            ))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Keypoint};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_blend_mask_same_size() {
        let image = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        let mask = RgbImage::from_pixel(4, 4, Rgb([200, 0, 100]));
        let out = blend_mask(&image, &mask, 0.5);
        assert_eq!(out.get_pixel(0, 0), &Rgb([150, 50, 100]));
    }

    #[test]
    fn test_blend_mask_resizes() {
        let image = RgbImage::from_pixel(8, 6, Rgb([0, 0, 0]));
        let mask = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let out = blend_mask(&image, &mask, 0.4);
        assert_eq!(out.dimensions(), (8, 6));
        assert_eq!(out.get_pixel(7, 5), &Rgb([102, 102, 102]));
    }

    #[test]
    fn test_draw_poses_marks_keypoints() {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let poses = vec![Pose {
            class_id: 1,
            bbox: BoundingBox::new(0.5, 0.5, 0.8, 0.8),
            keypoints: vec![
                Keypoint::new(0.3, 0.5, Visibility::Occluded),
                Keypoint::new(0.7, 0.5, Visibility::Visible),
                Keypoint::new(0.5, 0.3, Visibility::Hidden),
            ],
        }];
        draw_poses(&mut image, &poses).unwrap();

        assert_eq!(image.get_pixel(30, 50), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(70, 50), &Rgb([0, 0, 255]));
        assert_eq!(image.get_pixel(50, 30), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_poses_out_of_range_coordinates() {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        let poses = crate::extraction::parse_pose_labels(
            "1 0.5 -1e12 0.2 0.2 0.5 0.5 2\n0 1e30 0.5 0.1 0.1 -1e30 1e30 1\n",
        );
        assert_eq!(poses.len(), 2);

        draw_poses(&mut image, &poses).unwrap();
        assert_eq!(image.get_pixel(20, 20), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_render_pose_overlay_writes_png() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("dataset1_train_h69.png");
        let label_path = dir.path().join("dataset1_train_h69.txt");
        let out_path = dir.path().join("docs").join("overlay.png");
        RgbImage::from_pixel(64, 48, Rgb([20, 20, 20]))
            .save(&image_path)
            .unwrap();
        fs::write(&label_path, "1 0.5 0.5 0.5 0.5 0.4 0.5 2 0.6 0.5 1\nbad line\n").unwrap();

        render_pose_overlay(&image_path, &label_path, &out_path).unwrap();
        let out = image::open(&out_path).unwrap();
        assert_eq!((out.width(), out.height()), (64, 48));
    }

    #[test]
    fn test_render_pose_overlay_missing_image() {
        let dir = TempDir::new().unwrap();
        let result = render_pose_overlay(
            &dir.path().join("missing.jpg"),
            &dir.path().join("missing.txt"),
            &dir.path().join("out.png"),
        );
        assert!(matches!(result, Err(HipAuditError::FileNotFound(_))));
    }

    #[test]
    fn test_render_ultrasound_overlay() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("167854_0.png");
        let mask_path = dir.path().join("167854_0_label.png");
        let json_path = dir.path().join("167854_0.json");
        let out_path = dir.path().join("overlay.png");
        RgbImage::from_pixel(80, 60, Rgb([50, 50, 50]))
            .save(&image_path)
            .unwrap();
        RgbImage::from_pixel(40, 30, Rgb([0, 200, 0]))
            .save(&mask_path)
            .unwrap();
        fs::write(
            &json_path,
            r#"{"side": "left", "row_data": {"L Alpha Angle": 58, "R Alpha Angle": "NaN"}}"#,
        )
        .unwrap();

        render_ultrasound_overlay(&image_path, &mask_path, Some(&json_path), &out_path).unwrap();
        let out = image::open(&out_path).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (80, 60));
        // bottom-right corner is outside the text block
        assert_eq!(out.get_pixel(79, 59), &Rgb([30, 110, 30]));
    }
}

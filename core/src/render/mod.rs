//! PNG rendering for overlays and dataset snapshots
//!
//! Everything is drawn into an in-memory RGB buffer through the plotters
//! bitmap backend and written with `image`. Text needs a TrueType font; see
//! [`init_fonts`]. Without one, figures are still produced, minus their text.

pub mod mtddh;
pub mod overlay;
pub mod radiopedia;

pub use mtddh::render_mtddh_snapshot;
pub use overlay::{blend_mask, draw_poses, render_pose_overlay, render_ultrasound_overlay};
pub use radiopedia::render_radiopedia_snapshot;

use crate::error::Result;
use image::{Rgb, RgbImage};
use log::{debug, info, warn};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Font family every text element is drawn with
pub const FONT_FAMILY: &str = "sans-serif";

/// Environment variable naming a TTF file to use
pub const FONT_ENV_VAR: &str = "HIPAUDIT_FONT";

/// Common locations of a sans-serif TTF
const SYSTEM_FONT_PATHS: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_LOADED: OnceLock<bool> = OnceLock::new();

/// Registers a font for text rendering, once per process
///
/// Candidates in order: `explicit`, `$HIPAUDIT_FONT`, then common system
/// paths. Only the first call has an effect.
///
/// # Returns
///
/// Whether a font is available.
pub fn init_fonts(explicit: Option<&Path>) -> bool {
    *FONT_LOADED.get_or_init(|| {
        let mut candidates: Vec<PathBuf> = Vec::new();
        candidates.extend(explicit.map(Path::to_path_buf));
        candidates.extend(std::env::var_os(FONT_ENV_VAR).map(PathBuf::from));
        candidates.extend(SYSTEM_FONT_PATHS.iter().map(PathBuf::from));

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            match register_font_file(&path) {
                Ok(()) => {
                    info!("Using font {}", path.display());
                    return true;
                }
                Err(e) => warn!("Could not load font {}: {}", path.display(), e),
            }
        }
        warn!("No usable font found; figures will be drawn without text");
        false
    })
}

fn register_font_file(path: &Path) -> Result<()> {
    let bytes = fs::read(path)?;
    // Registered fonts live for the rest of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    for style in [FontStyle::Normal, FontStyle::Bold] {
        register_font(FONT_FAMILY, style, bytes)
            .map_err(|_| format!("invalid font: {}", path.display()))?;
    }
    Ok(())
}

/// Whether text can be drawn
pub fn fonts_available() -> bool {
    init_fonts(None)
}

/// White canvas of the given size
pub fn blank_canvas(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

/// Runs drawing code against an image buffer
pub fn draw_on<F>(image: &mut RgbImage, draw: F) -> Result<()>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()>,
{
    let (width, height) = image.dimensions();
    let buffer: &mut [u8] = image;
    let root = BitMapBackend::with_buffer(buffer, (width, height)).into_drawing_area();
    draw(&root)?;
    root.present()?;
    Ok(())
}

/// Writes an image, creating the parent directory if needed
pub fn save_image(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    image.save(path)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Text style in the shared font family
pub fn text_style(size: u32, color: &RGBColor) -> TextStyle<'static> {
    (FONT_FAMILY, size as f64).into_font().color(color)
}

/// Drawing area handed to each figure panel
pub type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Chart with `f64` axes on the bitmap backend
pub type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Starts a chart in a panel, with caption and label areas only when text can
/// be drawn
pub fn build_chart<'a, 'b>(
    area: &'a Panel<'b>,
    caption: &str,
    x_range: Range<f64>,
    y_range: Range<f64>,
) -> Result<Chart<'a, 'b>> {
    let mut builder = ChartBuilder::on(area);
    builder.margin(20);
    if fonts_available() {
        builder
            .caption(caption, text_style(28, &BLACK))
            .x_label_area_size(50)
            .y_label_area_size(70);
    }
    Ok(builder.build_cartesian_2d(x_range, y_range)?)
}

/// Draws grid and axes, labeled when text can be drawn
pub fn draw_mesh(
    chart: &mut Chart<'_, '_>,
    x_desc: &str,
    y_desc: &str,
    x_formatter: Option<&dyn Fn(&f64) -> String>,
) -> Result<()> {
    let mut mesh = chart.configure_mesh();
    if fonts_available() {
        mesh.x_desc(x_desc)
            .y_desc(y_desc)
            .label_style(text_style(16, &BLACK))
            .axis_desc_style(text_style(18, &BLACK));
        if let Some(formatter) = x_formatter {
            mesh.x_label_formatter(formatter);
        }
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw()?;
    Ok(())
}

/// Draws the legend box of a chart; no-op without a font
pub fn draw_legend<'a, 'b: 'a>(chart: &mut Chart<'a, 'b>) -> Result<()> {
    if fonts_available() {
        chart
            .configure_series_labels()
            .label_font(text_style(16, &BLACK))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }
    Ok(())
}

/// Label for integer tick positions of a categorical axis
pub fn category_label(categories: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    categories.get(idx as usize).cloned().unwrap_or_default()
}

/// Distinct colors for categorical series
pub const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(23, 190, 207),
];

/// Palette color for a series index, wrapping around
pub fn palette_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Pads a data range so it is never empty
pub fn padded_range(range: Option<(f64, f64)>, pad_fraction: f64) -> Range<f64> {
    match range {
        Some((lo, hi)) if hi > lo => {
            let pad = (hi - lo) * pad_fraction;
            (lo - pad)..(hi + pad)
        }
        Some((v, _)) => (v - 1.0)..(v + 1.0),
        None => 0.0..1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(Some((0.0, 10.0)), 0.1), -1.0..11.0);
        assert_eq!(padded_range(Some((5.0, 5.0)), 0.1), 4.0..6.0);
        assert_eq!(padded_range(None, 0.1), 0.0..1.0);
    }

    #[test]
    fn test_draw_on_and_save() {
        let mut canvas = blank_canvas(40, 30);
        draw_on(&mut canvas, |root| {
            root.draw(&Rectangle::new([(0, 0), (9, 9)], RED.filled()))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(canvas.get_pixel(5, 5), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(30, 20), &Rgb([255, 255, 255]));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("canvas.png");
        save_image(&canvas, &path).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (40, 30));
    }

    #[test]
    fn test_category_label() {
        let categories = vec!["I".to_string(), "IIa".to_string()];
        assert_eq!(category_label(&categories, 1.0), "IIa");
        assert_eq!(category_label(&categories, 0.5), "");
        assert_eq!(category_label(&categories, 2.0), "");
        assert_eq!(category_label(&categories, -1.0), "");
    }

    #[test]
    fn test_register_invalid_font() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.ttf");
        fs::write(&path, b"not a font").unwrap();

        let err = register_font_file(&path).unwrap_err();
        assert!(err.to_string().contains("invalid font"));
        assert!(err.to_string().contains("broken.ttf"));
    }

    #[test]
    fn test_chart_with_legend() {
        let mut canvas = blank_canvas(200, 150);
        draw_on(&mut canvas, |root| {
            let mut chart = build_chart(root, "Legend", 0.0..1.0, 0.0..1.0)?;
            draw_mesh(&mut chart, "x", "y", None)?;
            chart
                .draw_series(std::iter::once(Circle::new((0.5, 0.5), 4, RED.filled())))?
                .label("points");
            draw_legend(&mut chart)
        })
        .unwrap();
        assert_eq!(canvas.dimensions(), (200, 150));
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), palette_color(PALETTE.len()));
    }
}

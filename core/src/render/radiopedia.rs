use super::{
    blank_canvas, build_chart, category_label, draw_legend, draw_mesh, draw_on, fonts_available,
    save_image, text_style, Panel,
};
use crate::analysis::radiopedia::{
    age_months, sided_values, RadiopediaSummary, ALPHA_ANGLE, BETA_ANGLE,
};
use crate::analysis::stats::{histogram, min_max, Histogram};
use crate::error::Result;
use crate::extraction::UltrasoundRecord;
use crate::types::Side;
use image::imageops::{self, FilterType};
use image::RgbImage;
use log::{info, warn};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

pub const SNAPSHOT_TITLE: &str = "Radiopedia Ultrasound Dataset Snapshot";
pub const SNAPSHOT_SIZE: (u32, u32) = (2400, 1800);

const AGE_BINS: usize = 20;
const ANGLE_BINS: usize = 15;

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144);
const LIGHT_GRAY: RGBColor = RGBColor(211, 211, 211);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const DARK_GREEN: RGBColor = RGBColor(0, 128, 0);

/// Space kept above a panel's content for its title
const PANEL_TITLE_HEIGHT: i32 = 60;

/// Renders the 2x3 Radiopedia snapshot and writes it as PNG
///
/// `sample_image` is shown in the first panel; when it is absent or cannot be
/// decoded the panel shows a placeholder instead.
pub fn render_radiopedia_snapshot(
    records: &[UltrasoundRecord],
    summary: &RadiopediaSummary,
    sample_image: Option<&Path>,
    out_path: &Path,
) -> Result<()> {
    let (width, height) = SNAPSHOT_SIZE;
    let mut canvas = blank_canvas(width, height);

    let sample = sample_image.and_then(|path| match image::open(path) {
        Ok(img) => Some(img.to_rgb8()),
        Err(e) => {
            warn!("Could not load sample image {}: {}", path.display(), e);
            None
        }
    });

    let mut sample_slot = None;
    draw_on(&mut canvas, |root| {
        let body = if fonts_available() {
            root.titled(SNAPSHOT_TITLE, text_style(48, &BLACK))?
        } else {
            root.margin(70, 0, 0, 0)
        };
        let panels = body.split_evenly((2, 3));

        sample_slot = draw_sample_panel(&panels[0], sample.is_some(), sample_image)?;
        draw_age_histogram(&panels[1], records)?;
        draw_sided_histogram(&panels[2], records, ALPHA_ANGLE, "Alpha Angle", (&RED, &BLUE))?;
        draw_graf_counts(&panels[3], summary)?;
        draw_sided_histogram(&panels[4], records, BETA_ANGLE, "Beta Angle", (&ORANGE, &DARK_GREEN))?;
        draw_summary_panel(&panels[5], summary)?;
        Ok(())
    })?;

    if let (Some(img), Some(slot)) = (sample, sample_slot) {
        paste_fitted(&mut canvas, &img, slot);
    }

    save_image(&canvas, out_path)?;
    info!("Snapshot saved to {}", out_path.display());
    Ok(())
}

/// Panel content area as `(x, y, width, height)` in canvas pixels
type Slot = (i32, i32, u32, u32);

fn draw_sample_panel(area: &Panel<'_>, has_image: bool, path: Option<&Path>) -> Result<Option<Slot>> {
    let (xs, ys) = area.get_pixel_range();
    let with_text = fonts_available();

    if with_text {
        area.draw(&Text::new(
            "Sample Labeled Image",
            ((xs.end - xs.start) / 2, 15),
            text_style(28, &BLACK).pos(Pos::new(HPos::Center, VPos::Top)),
        ))?;
    }

    let slot_x = xs.start + 20;
    let slot_y = ys.start + PANEL_TITLE_HEIGHT;
    let slot_w = (xs.end - xs.start - 40).max(1) as u32;
    let slot_h = (ys.end - ys.start - PANEL_TITLE_HEIGHT - 20).max(1) as u32;

    if has_image {
        return Ok(Some((slot_x, slot_y, slot_w, slot_h)));
    }

    let (cx, cy) = ((xs.end - xs.start) / 2, (ys.end - ys.start) / 2);
    area.draw(&Rectangle::new(
        [(cx - 250, cy - 50), (cx + 250, cy + 50)],
        LIGHT_GRAY.filled(),
    ))?;
    if with_text {
        let shown = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());
        for (i, line) in ["Image not found:".to_string(), shown].iter().enumerate() {
            area.draw(&Text::new(
                line.clone(),
                (cx, cy - 20 + 30 * i as i32),
                text_style(20, &BLACK).pos(Pos::new(HPos::Center, VPos::Center)),
            ))?;
        }
    }
    Ok(None)
}

/// Scales `img` to fit the slot, keeping its aspect ratio, and centers it
fn paste_fitted(canvas: &mut RgbImage, img: &RgbImage, slot: Slot) {
    let (x, y, w, h) = slot;
    let (iw, ih) = img.dimensions();
    if iw == 0 || ih == 0 {
        return;
    }
    let scale = (w as f64 / iw as f64).min(h as f64 / ih as f64);
    let nw = ((iw as f64 * scale) as u32).max(1);
    let nh = ((ih as f64 * scale) as u32).max(1);
    let resized = imageops::resize(img, nw, nh, FilterType::Triangle);

    let left = x as i64 + (w.saturating_sub(nw) / 2) as i64;
    let top = y as i64 + (h.saturating_sub(nh) / 2) as i64;
    imageops::overlay(canvas, &resized, left, top);
}

fn draw_age_histogram(area: &Panel<'_>, records: &[UltrasoundRecord]) -> Result<()> {
    let ages: Vec<f64> = records.iter().filter_map(age_months).collect();
    let hist = histogram(&ages, AGE_BINS);

    let mut chart = build_chart(
        area,
        "Age Distribution",
        histogram_x_range(&[hist.as_ref()]),
        0.0..histogram_y_top(&[hist.as_ref()]),
    )?;
    draw_mesh(&mut chart, "Age (months)", "Count", None)?;

    if let Some(hist) = &hist {
        chart.draw_series(bars(hist, &SKY_BLUE, 0.7))?;
        chart.draw_series(outlines(hist))?;
    }
    Ok(())
}

fn draw_sided_histogram(
    area: &Panel<'_>,
    records: &[UltrasoundRecord],
    column: &str,
    title: &str,
    (right_color, left_color): (&RGBColor, &RGBColor),
) -> Result<()> {
    let right = histogram(&sided_values(records, Side::Right, column), ANGLE_BINS);
    let left = histogram(&sided_values(records, Side::Left, column), ANGLE_BINS);
    let both = [right.as_ref(), left.as_ref()];

    let mut chart = build_chart(
        area,
        &format!("{} Distribution", title),
        histogram_x_range(&both),
        0.0..histogram_y_top(&both),
    )?;
    draw_mesh(&mut chart, &format!("{} (degrees)", title), "Count", None)?;

    for (hist, color, label) in [
        (&right, *right_color, "Right Hip"),
        (&left, *left_color, "Left Hip"),
    ] {
        let Some(hist) = hist else {
            continue;
        };
        chart
            .draw_series(bars(hist, &color, 0.6))?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 20, y + 6)], color.mix(0.6).filled()));
        chart.draw_series(outlines(hist))?;
    }
    draw_legend(&mut chart)
}

fn draw_graf_counts(area: &Panel<'_>, summary: &RadiopediaSummary) -> Result<()> {
    let labels: Vec<String> = summary.graf_counts.iter().map(|(g, _)| g.clone()).collect();
    let tallest = summary.graf_counts.iter().map(|(_, c)| *c).max().unwrap_or(0);

    let mut chart = build_chart(
        area,
        "Graf Type Distribution (Correct Side)",
        -0.5..(labels.len().max(1) as f64 - 0.5),
        0.0..(tallest as f64 * 1.1 + 1.0),
    )?;
    let formatter: &dyn Fn(&f64) -> String = &|x| category_label(&labels, *x);
    draw_mesh(&mut chart, "Graf Type", "Count", Some(formatter))?;

    chart.draw_series(summary.graf_counts.iter().enumerate().map(|(i, (_, count))| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *count as f64)], LIGHT_GREEN.mix(0.7).filled())
    }))?;
    chart.draw_series(summary.graf_counts.iter().enumerate().map(|(i, (_, count))| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *count as f64)], BLACK.stroke_width(1))
    }))?;
    Ok(())
}

fn draw_summary_panel(area: &Panel<'_>, summary: &RadiopediaSummary) -> Result<()> {
    const LINE_HEIGHT: i32 = 34;
    let (xs, ys) = area.get_pixel_range();
    let (w, h) = (xs.end - xs.start, ys.end - ys.start);

    area.draw(&Rectangle::new(
        [(30, 30), (w - 30, h - 30)],
        LIGHT_GRAY.mix(0.8).filled(),
    ))?;
    if !fonts_available() {
        return Ok(());
    }
    for (i, line) in summary.summary_lines().into_iter().enumerate() {
        area.draw(&Text::new(
            line,
            (50, 50 + LINE_HEIGHT * i as i32),
            text_style(24, &BLACK),
        ))?;
    }
    Ok(())
}

fn bars<'a>(
    hist: &'a Histogram,
    color: &RGBColor,
    opacity: f64,
) -> impl Iterator<Item = Rectangle<(f64, f64)>> + 'a {
    let style = color.mix(opacity).filled();
    hist.bins()
        .map(move |(start, end, count)| Rectangle::new([(start, 0.0), (end, count as f64)], style))
}

fn outlines(hist: &Histogram) -> impl Iterator<Item = Rectangle<(f64, f64)>> + '_ {
    hist.bins().map(|(start, end, count)| {
        Rectangle::new([(start, 0.0), (end, count as f64)], BLACK.stroke_width(1))
    })
}

fn histogram_x_range(hists: &[Option<&Histogram>]) -> std::ops::Range<f64> {
    let edges: Vec<f64> = hists
        .iter()
        .flatten()
        .flat_map(|h| [h.edges[0], h.edges[h.edges.len() - 1]])
        .collect();
    match min_max(&edges) {
        Some((lo, hi)) if hi > lo => lo..hi,
        _ => 0.0..1.0,
    }
}

fn histogram_y_top(hists: &[Option<&Histogram>]) -> f64 {
    let tallest = hists.iter().flatten().map(|h| h.max_count()).max().unwrap_or(0);
    tallest as f64 * 1.1 + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use serde_json::json;
    use tempfile::TempDir;

    fn records() -> Vec<UltrasoundRecord> {
        [
            json!({"filename": "1_0.png", "side": "left", "row_data": {
                "RadID": 1, "Age": "6 weeks", "Gender": "F",
                "L Alpha Angle": 55, "R Alpha Angle": 62, "L Beta Angle": 70,
                "L Graf Type": "IIa"}}),
            json!({"filename": "2_0.png", "side": "right", "row_data": {
                "RadID": 2, "Age": "3 months", "Gender": "M",
                "R Alpha Angle": "60-64", "R Beta Angle": ">77",
                "R Graf Type": "I"}}),
        ]
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect()
    }

    #[test]
    fn test_render_with_placeholder() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("docs").join("radiopedia_snapshot.png");
        let records = records();
        let summary = RadiopediaSummary::from_records(&records);

        render_radiopedia_snapshot(&records, &summary, Some(&dir.path().join("missing.jpg")), &out)
            .unwrap();
        let image = image::open(&out).unwrap();
        assert_eq!((image.width(), image.height()), SNAPSHOT_SIZE);
    }

    #[test]
    fn test_render_with_sample_image() {
        let dir = TempDir::new().unwrap();
        let sample = dir.path().join("sample.png");
        RgbImage::from_pixel(200, 100, Rgb([255, 0, 0]))
            .save(&sample)
            .unwrap();
        let out = dir.path().join("snapshot.png");
        let records = records();
        let summary = RadiopediaSummary::from_records(&records);

        render_radiopedia_snapshot(&records, &summary, Some(&sample), &out).unwrap();
        let image = image::open(&out).unwrap().to_rgb8();
        // center of the first panel is covered by the scaled sample
        let (w, h) = SNAPSHOT_SIZE;
        assert_eq!(image.get_pixel(w / 6, h / 4 + 30), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_paste_fitted_keeps_aspect() {
        let mut canvas = RgbImage::new(100, 100);
        let img = RgbImage::from_pixel(50, 25, Rgb([9, 9, 9]));
        paste_fitted(&mut canvas, &img, (0, 0, 100, 100));
        // 100x50 centered vertically
        assert_eq!(canvas.get_pixel(50, 50), &Rgb([9, 9, 9]));
        assert_eq!(canvas.get_pixel(50, 10), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_empty_dataset() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("empty.png");
        let summary = RadiopediaSummary::from_records(&[]);
        render_radiopedia_snapshot(&[], &summary, None, &out).unwrap();
        assert!(out.is_file());
    }
}

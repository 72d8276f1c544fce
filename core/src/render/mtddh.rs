use super::{
    blank_canvas, build_chart, category_label, draw_legend, draw_mesh, draw_on, fonts_available,
    padded_range, palette_color, save_image, text_style, Panel,
};
use crate::analysis::metrics::{
    SnapshotSelection, ACE_INDEX, IHDI_GRADE, TONNIS_GRADE, WIBERG_INDEX,
};
use crate::analysis::stats::{gaussian_kde, mean, min_max, sample_std, KDE_GRID_SIZE};
use crate::error::Result;
use log::info;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const SNAPSHOT_TITLE: &str = "MTDDH Dataset Snapshot";
pub const SNAPSHOT_SIZE: (u32, u32) = (2700, 900);

/// Grades whose bars get their count written above them
const ANNOTATED_GRADES: [i64; 3] = [2, 3, 4];

const UNGRADED_COLOR: RGBColor = RGBColor(150, 150, 150);

/// Renders the three-panel MTDDH snapshot and writes it as PNG
///
/// # Arguments
///
/// * `selection` - Rows kept after filtering (see `select_for_snapshot`)
/// * `out_path` - Destination PNG; parent directories are created
pub fn render_mtddh_snapshot(selection: &SnapshotSelection, out_path: &Path) -> Result<()> {
    let (width, height) = SNAPSHOT_SIZE;
    let mut canvas = blank_canvas(width, height);

    draw_on(&mut canvas, |root| {
        let body = if fonts_available() {
            root.titled(SNAPSHOT_TITLE, text_style(40, &BLACK))?
        } else {
            root.margin(50, 0, 0, 0)
        };
        let panels = body.split_evenly((1, 3));
        draw_distributions(&panels[0], selection)?;
        draw_ace_vs_wiberg(&panels[1], selection)?;
        draw_grade_counts(&panels[2], selection)?;
        Ok(())
    })?;

    save_image(&canvas, out_path)?;
    info!("Snapshot saved to {}", out_path.display());
    Ok(())
}

fn draw_distributions(area: &Panel<'_>, selection: &SnapshotSelection) -> Result<()> {
    let curves: Vec<(String, Vec<(f64, f64)>)> = [ACE_INDEX, WIBERG_INDEX]
        .iter()
        .map(|column| {
            let values = selection.column(column);
            let label = format!(
                "{} (μ={:.1}, σ={:.1})",
                column,
                mean(&values).unwrap_or(f64::NAN),
                sample_std(&values).unwrap_or(f64::NAN)
            );
            (label, gaussian_kde(&values, KDE_GRID_SIZE))
        })
        .collect();

    let xs: Vec<f64> = curves
        .iter()
        .flat_map(|(_, curve)| curve.iter().map(|p| p.0))
        .collect();
    let peak = curves
        .iter()
        .flat_map(|(_, curve)| curve.iter().map(|p| p.1))
        .fold(0.0_f64, f64::max);
    let y_top = if peak > 0.0 { peak * 1.1 } else { 1.0 };

    let mut chart = build_chart(area, "Distributions", padded_range(min_max(&xs), 0.0), 0.0..y_top)?;
    draw_mesh(&mut chart, "value", "Density", None)?;

    for (i, (label, curve)) in curves.into_iter().enumerate() {
        if curve.is_empty() {
            continue;
        }
        let color = palette_color(i);
        chart
            .draw_series(AreaSeries::new(curve, 0.0, &color.mix(0.3)).border_style(&color))?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 20, y + 6)], color.mix(0.3).filled()));
    }
    draw_legend(&mut chart)
}

fn draw_ace_vs_wiberg(area: &Panel<'_>, selection: &SnapshotSelection) -> Result<()> {
    let mut by_grade: BTreeMap<Option<i64>, Vec<(f64, f64)>> = BTreeMap::new();
    for row in &selection.rows {
        if let (Some(ace), Some(wiberg)) = (row.get(ACE_INDEX), row.get(WIBERG_INDEX)) {
            let grade = row.get(IHDI_GRADE).map(|g| g.round() as i64);
            by_grade.entry(grade).or_default().push((ace, wiberg));
        }
    }

    let points: Vec<&(f64, f64)> = by_grade.values().flatten().collect();
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();

    let mut chart = build_chart(
        area,
        "ACE vs Wiberg Index",
        padded_range(min_max(&xs), 0.05),
        padded_range(min_max(&ys), 0.05),
    )?;
    draw_mesh(&mut chart, ACE_INDEX, WIBERG_INDEX, None)?;

    for (i, (grade, points)) in by_grade.into_iter().enumerate() {
        let (color, label) = match grade {
            Some(g) => (palette_color(i), format!("{} {}", IHDI_GRADE, g)),
            None => (UNGRADED_COLOR, format!("{} n/a", IHDI_GRADE)),
        };
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 5, color.filled())))?
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 5, color.filled()));
    }
    draw_legend(&mut chart)
}

fn draw_grade_counts(area: &Panel<'_>, selection: &SnapshotSelection) -> Result<()> {
    let grade_types = [IHDI_GRADE, TONNIS_GRADE];
    let counts: Vec<BTreeMap<i64, usize>> = grade_types
        .iter()
        .map(|column| selection.grade_counts(column))
        .collect();

    let grades: Vec<i64> = counts
        .iter()
        .flat_map(|c| c.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let labels: Vec<String> = grades.iter().map(|g| g.to_string()).collect();
    let tallest = counts
        .iter()
        .flat_map(|c| c.values().copied())
        .max()
        .unwrap_or(0);

    let mut chart = build_chart(
        area,
        "Grade Counts",
        -0.5..(grades.len().max(1) as f64 - 0.5),
        0.0..(tallest as f64 * 1.15 + 1.0),
    )?;
    let formatter: &dyn Fn(&f64) -> String = &|x| category_label(&labels, *x);
    draw_mesh(&mut chart, "Grade", "count", Some(formatter))?;

    let bar_width = 0.8 / grade_types.len() as f64;
    for (t, (grade_type, type_counts)) in grade_types.iter().zip(&counts).enumerate() {
        let color = palette_color(t);
        let offset = -0.4 + bar_width * t as f64;
        let bars: Vec<(f64, usize)> = grades
            .iter()
            .enumerate()
            .filter_map(|(i, g)| type_counts.get(g).map(|&c| (i as f64 + offset, c)))
            .collect();

        chart
            .draw_series(bars.iter().map(|&(x0, count)| {
                Rectangle::new([(x0, 0.0), (x0 + bar_width, count as f64)], color.filled())
            }))?
            .label(*grade_type)
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 20, y + 6)], color.filled()));

        if fonts_available() {
            for (i, grade) in grades.iter().enumerate() {
                if !ANNOTATED_GRADES.contains(grade) {
                    continue;
                }
                let count = type_counts.get(grade).copied().unwrap_or(0);
                if count == 0 {
                    continue;
                }
                let x = i as f64 + offset + bar_width / 2.0;
                chart.draw_series(std::iter::once(Text::new(
                    count.to_string(),
                    (x, count as f64 + 0.5),
                    text_style(16, &BLACK).pos(Pos::new(HPos::Center, VPos::Bottom)),
                )))?;
            }
        }
    }
    draw_legend(&mut chart)
}

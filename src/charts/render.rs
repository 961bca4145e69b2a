//! Chart rendering.
//!
//! Turns employee rows into PNG images: single pie, donut and bar charts, the
//! 2x2 composite, and the "no data" / error placeholders.

use std::f64::consts::TAU;

use image::Rgb;

use super::canvas::{
    Canvas, Region, BLACK, ERROR_RED, GREY, LIGHT_GREY, LINE_HEIGHT, PALETTE, SKY_BLUE,
    TEXT_HEIGHT, WHITE,
};
use super::ChartType;
use crate::analytics::{self, RECENT_DAYS};
use crate::errors::AppError;
use crate::models::Employee;

const SINGLE_SIZE: (u32, u32) = (1000, 800);
const ATTENDANCE_SIZE: (u32, u32) = (1200, 800);
const COMBINED_SIZE: (u32, u32) = (1500, 1200);
const PLACEHOLDER_SIZE: (u32, u32) = (600, 400);

/// Slices below this share of the total get no percentage label.
const MIN_LABELLED_SHARE: f64 = 0.04;

/// How a grouping is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Pie,
    Donut,
    Bar,
}

/// One chart: a title, a kind and the ordered values to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: &'static str,
    pub kind: ChartKind,
    pub data: Vec<(String, u64)>,
    pub empty_text: &'static str,
}

impl Panel {
    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encoded image plus whether it is a real chart worth caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub png: Vec<u8>,
    pub cacheable: bool,
}

/// Build the panel for a single chart type. `Combined` has no single panel.
pub fn panel_for(chart: ChartType, rows: &[Employee]) -> Option<Panel> {
    let panel = match chart {
        ChartType::Departments => Panel {
            title: "Department Distribution",
            kind: ChartKind::Pie,
            data: analytics::ranked(&analytics::count_by_department(rows)),
            empty_text: "No department data",
        },
        ChartType::Roles => Panel {
            title: "Role Distribution",
            kind: ChartKind::Pie,
            data: analytics::ranked(&analytics::count_by_role(rows)),
            empty_text: "No role data",
        },
        ChartType::Attendance => Panel {
            title: "Daily Attendance (Recent Days)",
            kind: ChartKind::Bar,
            data: analytics::recent_days(&analytics::count_by_day(rows), RECENT_DAYS),
            empty_text: "No attendance data",
        },
        ChartType::Signatures => Panel {
            title: "Check-in vs Check-out",
            kind: ChartKind::Donut,
            data: analytics::ranked(&analytics::count_by_signature(rows)),
            empty_text: "No signature data",
        },
        ChartType::Combined => return None,
    };
    Some(panel)
}

/// Render the image for `chart` from the given rows.
///
/// A single chart with nothing to show becomes a non-cacheable "no data"
/// placeholder. The composite is cacheable as long as one panel has data.
pub fn render_chart(chart: ChartType, rows: &[Employee]) -> Result<RenderOutput, AppError> {
    if chart == ChartType::Combined {
        return render_combined(rows);
    }

    let panel = panel_for(chart, rows)
        .ok_or_else(|| AppError::Internal(format!("No panel for chart {}", chart.as_str())))?;

    if panel.is_empty() {
        return Ok(RenderOutput {
            png: placeholder(panel.empty_text, GREY)?,
            cacheable: false,
        });
    }

    let (w, h) = if panel.kind == ChartKind::Bar {
        ATTENDANCE_SIZE
    } else {
        SINGLE_SIZE
    };
    let mut canvas = Canvas::new(w, h)?;
    let region = canvas.bounds();
    draw_panel(&mut canvas, region, &panel, 3);

    Ok(RenderOutput {
        png: canvas.encode_png()?,
        cacheable: true,
    })
}

fn render_combined(rows: &[Employee]) -> Result<RenderOutput, AppError> {
    let panels: Vec<Panel> = [
        ChartType::Departments,
        ChartType::Roles,
        ChartType::Attendance,
        ChartType::Signatures,
    ]
    .into_iter()
    .filter_map(|chart| panel_for(chart, rows))
    .collect();

    let (w, h) = COMBINED_SIZE;
    let mut canvas = Canvas::new(w, h)?;
    let cell_w = i64::from(w) / 2;
    let cell_h = i64::from(h) / 2;

    for (i, panel) in panels.iter().enumerate() {
        let col = (i % 2) as i64;
        let row = (i / 2) as i64;
        let region = Region::new(col * cell_w, row * cell_h, cell_w, cell_h);
        draw_panel(&mut canvas, region, panel, 2);
    }

    Ok(RenderOutput {
        png: canvas.encode_png()?,
        cacheable: panels.iter().any(|p| !p.is_empty()),
    })
}

/// Error placeholder carrying the failure text. Never fails: if even the
/// placeholder cannot be encoded, an empty body is returned.
pub fn error_image(message: &str) -> Vec<u8> {
    let text = format!("Error generating chart: {}", message);
    placeholder(&text, ERROR_RED).unwrap_or_else(|e| {
        tracing::error!("Failed to encode error image: {}", e);
        Vec::new()
    })
}

fn placeholder(text: &str, color: Rgb<u8>) -> Result<Vec<u8>, AppError> {
    let (w, h) = PLACEHOLDER_SIZE;
    let mut canvas = Canvas::new(w, h)?;
    let bounds = canvas.bounds();
    let inner = Region::new(bounds.x + 30, bounds.y + 30, bounds.w - 60, bounds.h - 60);
    canvas.paragraph(inner, text, 2, color);
    Ok(canvas.encode_png()?)
}

fn draw_panel(canvas: &mut Canvas, region: Region, panel: &Panel, scale: i64) {
    let padding = 10 * scale;
    let inner = Region::new(
        region.x + padding,
        region.y + padding,
        region.w - 2 * padding,
        region.h - 2 * padding,
    );

    if panel.is_empty() {
        canvas.paragraph(inner, panel.empty_text, scale, GREY);
        return;
    }

    canvas.text_centered(inner.center_x(), inner.y, panel.title, scale + 1, BLACK);
    let title_h = (LINE_HEIGHT + 4) * (scale + 1);
    let body = Region::new(inner.x, inner.y + title_h, inner.w, inner.h - title_h);

    match panel.kind {
        ChartKind::Pie => draw_ring(canvas, body, &panel.data, false, scale),
        ChartKind::Donut => draw_ring(canvas, body, &panel.data, true, scale),
        ChartKind::Bar => draw_bars(canvas, body, &panel.data, scale),
    }
}

/// Pie or donut with a legend on the right.
fn draw_ring(canvas: &mut Canvas, body: Region, data: &[(String, u64)], hole: bool, scale: i64) {
    let total: u64 = data.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return;
    }

    let chart_w = body.w * 62 / 100;
    let radius = (chart_w.min(body.h) / 2 - 4 * scale).max(1);
    let inner = if hole { radius / 2 } else { 0 };
    let cx = body.x + chart_w / 2;
    let cy = body.y + body.h / 2;

    let mut start = 0.0_f64;
    for (i, (_, count)) in data.iter().enumerate() {
        let share = *count as f64 / total as f64;
        let end = if i + 1 == data.len() {
            TAU + 1.0
        } else {
            start + share * TAU
        };
        canvas.fill_sector(cx, cy, radius, inner, start, end, slice_color(i));
        start = end;
    }

    // Percentages at the middle of each slice.
    let mut start = 0.0_f64;
    for (_, count) in data {
        let share = *count as f64 / total as f64;
        let mid = start + share * TAU / 2.0;
        start += share * TAU;
        if share < MIN_LABELLED_SHARE {
            continue;
        }
        let label_r = if hole {
            (radius + inner) as f64 / 2.0
        } else {
            radius as f64 * 0.65
        };
        let lx = cx + (mid.sin() * label_r) as i64;
        let ly = cy - (mid.cos() * label_r) as i64;
        let text = percent(share);
        canvas.text_centered(lx, ly - TEXT_HEIGHT * scale / 2, &text, scale, WHITE);
    }

    draw_legend(canvas, body, chart_w, data, total, scale);
}

fn draw_legend(
    canvas: &mut Canvas,
    body: Region,
    chart_w: i64,
    data: &[(String, u64)],
    total: u64,
    scale: i64,
) {
    let swatch = TEXT_HEIGHT * scale;
    let row_h = LINE_HEIGHT * scale + 2 * scale;
    let x = body.x + chart_w + 6 * scale;
    let text_x = x + swatch + 3 * scale;
    let room = body.right() - text_x;

    let max_rows = (body.h / row_h).max(1) as usize;
    let shown = data.len().min(max_rows);
    let mut y = body.y + (body.h - shown as i64 * row_h) / 2;

    for (i, (label, count)) in data.iter().take(shown).enumerate() {
        canvas.fill_rect(x, y, swatch, swatch, slice_color(i));
        let share = *count as f64 / total as f64;
        let label = if label.is_empty() { "(blank)" } else { label.as_str() };
        let entry = format!("{} {} ({})", label, percent(share), count);
        let entry = canvas.fit(&entry, room, scale);
        canvas.text(text_x, y, &entry, scale, BLACK);
        y += row_h;
    }
}

/// Vertical bars with count labels above each bar.
fn draw_bars(canvas: &mut Canvas, body: Region, data: &[(String, u64)], scale: i64) {
    let max = data.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);

    let axis_label_w = canvas.text_width(&max.to_string(), scale) + 6 * scale;
    let label_h = 2 * LINE_HEIGHT * scale;
    let top_room = LINE_HEIGHT * scale;
    let plot = Region::new(
        body.x + axis_label_w,
        body.y + top_room,
        body.w - axis_label_w,
        body.h - top_room - label_h,
    );
    if plot.w <= 0 || plot.h <= 0 {
        return;
    }

    // Gridlines and y-axis ticks.
    let step = (max + 4) / 5;
    let mut tick = 0;
    while tick <= max {
        let y = plot.bottom() - (tick as i64 * plot.h / max as i64);
        canvas.fill_rect(plot.x, y, plot.w, 1, LIGHT_GREY);
        let text = tick.to_string();
        let text_x = plot.x - canvas.text_width(&text, scale) - 3 * scale;
        canvas.text(text_x, y - TEXT_HEIGHT * scale / 2, &text, scale, GREY);
        tick += step.max(1);
    }

    let slot = plot.w / data.len() as i64;
    let bar_w = (slot * 6 / 10).max(1);
    for (i, (day, count)) in data.iter().enumerate() {
        let slot_x = plot.x + i as i64 * slot;
        let bar_h = *count as i64 * plot.h / max as i64;
        let bar_x = slot_x + (slot - bar_w) / 2;
        canvas.fill_rect(bar_x, plot.bottom() - bar_h, bar_w, bar_h, SKY_BLUE);

        let center = slot_x + slot / 2;
        canvas.text_centered(
            center,
            plot.bottom() - bar_h - LINE_HEIGHT * scale,
            &count.to_string(),
            scale,
            BLACK,
        );

        let label = day_label(canvas, day, slot, scale);
        canvas.text_centered(center, plot.bottom() + 3 * scale, &label, scale, BLACK);
    }

    // Axes.
    canvas.fill_rect(plot.x, plot.y, 2, plot.h, BLACK);
    canvas.fill_rect(plot.x, plot.bottom(), plot.w, 2, BLACK);
    canvas.text_centered(
        plot.center_x(),
        plot.bottom() + LINE_HEIGHT * scale + 3 * scale,
        "Date",
        scale,
        GREY,
    );
}

/// Full ISO date if it fits the bar slot, otherwise month and day only.
fn day_label(canvas: &Canvas, day: &str, slot: i64, scale: i64) -> String {
    if canvas.text_width(day, scale) <= slot || day.len() < 10 {
        day.to_string()
    } else {
        day[5..].to_string()
    }
}

fn percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

fn slice_color(i: usize) -> Rgb<u8> {
    PALETTE[i % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn rows() -> Vec<Employee> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        (0..14)
            .map(|i| Employee {
                id: i,
                first_name: format!("First{i}"),
                last_name: format!("Last{i}"),
                email: format!("user{i}@example.com"),
                phone_number: "555-0100".to_string(),
                role: if i % 3 == 0 { "Manager" } else { "Engineer" }.to_string(),
                department: ["Sales", "Ops", "R&D"][(i % 3) as usize].to_string(),
                signature: if i % 2 == 0 { "check-in" } else { "check-out" }.to_string(),
                time_posted: base + Duration::days(i),
            })
            .collect()
    }

    fn decode(png: &[u8]) -> image::RgbImage {
        image::load_from_memory(png).unwrap().to_rgb8()
    }

    #[test]
    fn test_single_charts_are_cacheable_pngs() {
        let rows = rows();
        for chart in [
            ChartType::Departments,
            ChartType::Roles,
            ChartType::Attendance,
            ChartType::Signatures,
        ] {
            let out = render_chart(chart, &rows).unwrap();
            assert!(out.cacheable, "{}", chart.as_str());
            assert_eq!(&out.png[..8], &PNG_MAGIC);
        }
    }

    #[test]
    fn test_empty_single_chart_is_placeholder() {
        let out = render_chart(ChartType::Departments, &[]).unwrap();
        assert!(!out.cacheable);
        let img = decode(&out.png);
        assert_eq!(img.dimensions(), PLACEHOLDER_SIZE);
    }

    #[test]
    fn test_combined_dimensions_and_cacheability() {
        let out = render_chart(ChartType::Combined, &rows()).unwrap();
        assert!(out.cacheable);
        assert_eq!(decode(&out.png).dimensions(), COMBINED_SIZE);

        let empty = render_chart(ChartType::Combined, &[]).unwrap();
        assert!(!empty.cacheable);
    }

    #[test]
    fn test_attendance_panel_keeps_recent_days() {
        let panel = panel_for(ChartType::Attendance, &rows()).unwrap();
        assert_eq!(panel.kind, ChartKind::Bar);
        assert_eq!(panel.data.len(), RECENT_DAYS);
        assert_eq!(panel.data[0].0, "2024-05-05");
        assert!(panel_for(ChartType::Combined, &rows()).is_none());
    }

    #[test]
    fn test_legend_keeps_case_and_accents() {
        let with_department = |name: &str| {
            let mut rows = rows();
            for row in &mut rows {
                row.department = name.to_string();
            }
            render_chart(ChartType::Departments, &rows).unwrap().png
        };

        let accented = with_department("Ingénierie");
        assert_ne!(accented, with_department("Ingenierie"));
        assert_ne!(accented, with_department("INGÉNIERIE"));
        assert_ne!(with_department("check-in"), with_department("Check-In"));
    }

    #[test]
    fn test_error_image_is_png() {
        let png = error_image("database is locked");
        assert_eq!(&png[..8], &PNG_MAGIC);
        assert_eq!(decode(&png).dimensions(), PLACEHOLDER_SIZE);
    }

    #[test]
    fn test_day_label_shortens_when_narrow() {
        let canvas = Canvas::new(1, 1).unwrap();
        assert_eq!(day_label(&canvas, "2024-05-01", 1000, 2), "2024-05-01");
        assert_eq!(day_label(&canvas, "2024-05-01", 30, 2), "05-01");
    }
}

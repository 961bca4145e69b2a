//! Raster drawing surface used by the chart renderer.
//!
//! Wraps an `image::RgbImage` with the few primitives charts need: filled
//! rectangles, pie/ring sectors and text set in an embedded DejaVu Sans face.
//! Coordinates are signed and everything is clipped to the image bounds.

use std::f64::consts::TAU;
use std::io::Cursor;

use ab_glyph::{FontRef, InvalidFont, PxScale};
use image::codecs::png::PngEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

/// DejaVu Sans, see `assets/fonts/LICENSE-DejaVu.txt`.
static FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const GREY: Rgb<u8> = Rgb([90, 90, 90]);
pub const LIGHT_GREY: Rgb<u8> = Rgb([220, 220, 220]);
pub const SKY_BLUE: Rgb<u8> = Rgb([135, 206, 235]);
pub const ERROR_RED: Rgb<u8> = Rgb([180, 30, 30]);

/// Slice colors, cycled when there are more labels than entries.
pub const PALETTE: [Rgb<u8>; 10] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
    Rgb([188, 189, 34]),
    Rgb([23, 190, 207]),
];

/// Font size per unit of text scale, in pixels.
pub const TEXT_HEIGHT: i64 = 8;
/// Vertical advance per line, per unit of text scale.
pub const LINE_HEIGHT: i64 = TEXT_HEIGHT + 3;

/// An axis-aligned area of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Region {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    pub fn center_x(&self) -> i64 {
        self.x + self.w / 2
    }

    pub fn right(&self) -> i64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.h
    }
}

pub struct Canvas {
    img: RgbImage,
    font: FontRef<'static>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self, InvalidFont> {
        Ok(Self {
            img: RgbImage::from_pixel(width, height, WHITE),
            font: FontRef::try_from_slice(FONT_DATA)?,
        })
    }

    pub fn width(&self) -> i64 {
        i64::from(self.img.width())
    }

    pub fn height(&self) -> i64 {
        i64::from(self.img.height())
    }

    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width(), self.height())
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.img.get_pixel(x, y)
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.width() && y < self.height() {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Rgb<u8>) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width());
        let y1 = (y + h).min(self.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.img.put_pixel(px as u32, py as u32, color);
            }
        }
    }

    /// Fill the part of a ring between `inner` and `outer` radius whose angle
    /// lies in `[start, end)`. Angles are radians, clockwise from 12 o'clock.
    pub fn fill_sector(
        &mut self,
        cx: i64,
        cy: i64,
        outer: i64,
        inner: i64,
        start: f64,
        end: f64,
        color: Rgb<u8>,
    ) {
        let outer_sq = outer * outer;
        let inner_sq = inner * inner;
        for dy in -outer..=outer {
            for dx in -outer..=outer {
                let dist_sq = dx * dx + dy * dy;
                if dist_sq > outer_sq || dist_sq < inner_sq {
                    continue;
                }
                let angle = clockwise_angle(dx, dy);
                if angle >= start && angle < end {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Rendered width of a single line of text.
    pub fn text_width(&self, text: &str, scale: i64) -> i64 {
        if text.is_empty() {
            return 0;
        }
        let (width, _) = text_size(px_scale(scale), &self.font, text);
        i64::from(width)
    }

    /// Draw a single line of text with its top-left corner at `(x, y)`.
    pub fn text(&mut self, x: i64, y: i64, text: &str, scale: i64, color: Rgb<u8>) {
        if text.is_empty() {
            return;
        }
        draw_text_mut(
            &mut self.img,
            color,
            clamp_coord(x),
            clamp_coord(y),
            px_scale(scale),
            &self.font,
            text,
        );
    }

    /// Draw text horizontally centered on `cx`.
    pub fn text_centered(&mut self, cx: i64, y: i64, text: &str, scale: i64, color: Rgb<u8>) {
        let width = self.text_width(text, scale);
        self.text(cx - width / 2, y, text, scale, color);
    }

    /// Word-wrap `text` to the width of `region` and draw it centered in it,
    /// both horizontally and vertically.
    pub fn paragraph(&mut self, region: Region, text: &str, scale: i64, color: Rgb<u8>) {
        let lines = self.wrap(text, region.w, scale);
        let total = lines.len() as i64 * LINE_HEIGHT * scale;
        let mut y = region.y + (region.h - total) / 2;
        for line in &lines {
            self.text_centered(region.center_x(), y, line, scale, color);
            y += LINE_HEIGHT * scale;
        }
    }

    /// Shorten `text` to fit `max_width`, marking the cut with `..`.
    pub fn fit(&self, text: &str, max_width: i64, scale: i64) -> String {
        if self.text_width(text, scale) <= max_width {
            return text.to_string();
        }
        let chars: Vec<char> = text.chars().collect();
        for keep in (1..chars.len()).rev() {
            let mut candidate: String = chars[..keep].iter().collect();
            candidate.push_str("..");
            if self.text_width(&candidate, scale) <= max_width {
                return candidate;
            }
        }
        "..".to_string()
    }

    /// Greedy word wrap to `max_width`. Words wider than a line are split.
    pub fn wrap(&self, text: &str, max_width: i64, scale: i64) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            if !current.is_empty() {
                let joined = format!("{} {}", current, word);
                if self.text_width(&joined, scale) <= max_width {
                    current = joined;
                    continue;
                }
                lines.push(std::mem::take(&mut current));
            }

            let mut rest = word;
            while self.text_width(rest, scale) > max_width {
                let cut = self.fitting_prefix(rest, max_width, scale);
                if cut == rest.len() {
                    break;
                }
                lines.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            current = rest.to_string();
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    /// Byte length of the longest prefix of `text` that fits `max_width`.
    /// Always at least one character.
    fn fitting_prefix(&self, text: &str, max_width: i64, scale: i64) -> usize {
        let mut end = 0;
        for (i, ch) in text.char_indices() {
            let next = i + ch.len_utf8();
            if end > 0 && self.text_width(&text[..next], scale) > max_width {
                break;
            }
            end = next;
        }
        end
    }

    /// Encode the canvas as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buffer = Vec::new();
        {
            let mut cursor = Cursor::new(&mut buffer);
            let encoder = PngEncoder::new(&mut cursor);
            self.img.write_with_encoder(encoder)?;
        }
        Ok(buffer)
    }
}

fn px_scale(scale: i64) -> PxScale {
    PxScale::from((TEXT_HEIGHT * scale.max(1)) as f32)
}

fn clamp_coord(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Angle of `(dx, dy)` measured clockwise from straight up, in `[0, TAU)`.
/// Screen coordinates: `dy` grows downward.
pub fn clockwise_angle(dx: i64, dy: i64) -> f64 {
    let angle = (dx as f64).atan2(-(dy as f64));
    if angle < 0.0 {
        angle + TAU
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn rendered(text: &str) -> RgbImage {
        let mut canvas = Canvas::new(200, 40).unwrap();
        canvas.text(4, 4, text, 2, BLACK);
        canvas.img
    }

    #[test]
    fn test_clockwise_angle_quadrants() {
        assert!((clockwise_angle(0, -10) - 0.0).abs() < 1e-9);
        assert!((clockwise_angle(10, 0) - PI / 2.0).abs() < 1e-9);
        assert!((clockwise_angle(0, 10) - PI).abs() < 1e-9);
        assert!((clockwise_angle(-10, 0) - 3.0 * PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_marks_pixels() {
        let blank = Canvas::new(200, 40).unwrap().img;
        assert_ne!(rendered("Sales"), blank);
    }

    #[test]
    fn test_labels_differing_by_case_or_accent_render_differently() {
        assert_ne!(rendered("check-in"), rendered("Check-In"));
        assert_ne!(rendered("Ingénierie"), rendered("Ingenierie"));
        assert_ne!(rendered("Ingeniería"), rendered("Ingénierie"));
        assert_ne!(rendered("ü"), rendered("ß"));
    }

    #[test]
    fn test_text_width_grows_with_text_and_scale() {
        let canvas = Canvas::new(1, 1).unwrap();
        assert_eq!(canvas.text_width("", 2), 0);
        let short = canvas.text_width("Ops", 1);
        assert!(short > 0);
        assert!(canvas.text_width("Operations", 1) > short);
        assert!(canvas.text_width("Ops", 3) > short);
    }

    #[test]
    fn test_wrap_and_fit() {
        let canvas = Canvas::new(1, 1).unwrap();
        let narrow = canvas.text_width("generating", 1);

        let lines = canvas.wrap("error generating chart", narrow, 1);
        assert_eq!(lines, vec!["error", "generating", "chart"]);
        assert!(canvas.wrap("   ", narrow, 1).is_empty());

        let split = canvas.wrap("abcdefghijklmnop", canvas.text_width("abcd", 1), 1);
        assert!(split.len() > 1);
        assert_eq!(split.concat(), "abcdefghijklmnop");

        let room = canvas.text_width("Engin..", 1);
        let fitted = canvas.fit("Engineering", room, 1);
        assert!(fitted.ends_with(".."));
        assert!(canvas.text_width(&fitted, 1) <= room);
        assert_eq!(canvas.fit("Ops", room, 1), "Ops");
        assert_eq!(canvas.fit("Ingénierie", 10_000, 1), "Ingénierie");
    }

    #[test]
    fn test_sector_fills_only_its_half() {
        let mut canvas = Canvas::new(41, 41).unwrap();
        canvas.fill_sector(20, 20, 15, 0, 0.0, PI, BLACK);
        // Right half is painted, left half is not.
        assert_eq!(canvas.pixel(30, 20), BLACK);
        assert_eq!(canvas.pixel(10, 20), WHITE);
    }

    #[test]
    fn test_ring_leaves_hole() {
        let mut canvas = Canvas::new(41, 41).unwrap();
        canvas.fill_sector(20, 20, 15, 8, 0.0, TAU + 1.0, BLACK);
        assert_eq!(canvas.pixel(20, 20), WHITE);
        assert_eq!(canvas.pixel(20, 8), BLACK);
    }

    #[test]
    fn test_drawing_is_clipped() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        canvas.fill_rect(-5, -5, 100, 100, BLACK);
        canvas.text(-20, 8, "Clipped text", 3, WHITE);
        assert_eq!(canvas.pixel(9, 0), BLACK);
    }

    #[test]
    fn test_encode_png_signature() {
        let png = Canvas::new(4, 4).unwrap().encode_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}

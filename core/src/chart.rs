//! Chart rendering sink.
//!
//! Renderers turn an already-ordered aggregation result (or raw values,
//! for the histogram) into a raster image. No ordering or filtering
//! decisions are made here; bars and slices follow the input order.

use crate::{aggregate::AggregationResult, error::ReportResult};
use image::{ImageFormat, Rgb, RgbImage};
use std::f64::consts::PI;
use std::path::Path;

/// The contract every chart sink must fulfill.
pub trait ChartRenderer {
    fn bar_chart(&self, result: &AggregationResult, path: &Path) -> ReportResult<()>;

    fn pie_chart(&self, result: &AggregationResult, path: &Path) -> ReportResult<()>;

    /// `values` are binned into `bins` equal-width bins over `range`.
    fn histogram(&self, values: &[f64], bins: usize, range: (f64, f64), path: &Path) -> ReportResult<()>;
}

/// Count `values` into `bins` equal-width bins over `[min, max]`.
///
/// The last bin is closed, so `max` lands in it. Values outside the
/// range are not counted.
pub fn histogram_counts(values: &[f64], bins: usize, (min, max): (f64, f64)) -> Vec<u64> {
    let mut counts = vec![0u64; bins];
    if bins == 0 || max <= min {
        return counts;
    }
    let width = (max - min) / bins as f64;
    for &v in values {
        if v < min || v > max {
            continue;
        }
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

// ── PNG renderer ─────────────────────────────────────────────────────────────

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const PALETTE: [Rgb<u8>; 8] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
];

/// Plain PNG charts drawn pixel by pixel.
#[derive(Debug, Clone, Copy)]
pub struct PngRenderer {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self { width: 1280, height: 720, margin: 48 }
    }
}

impl PngRenderer {
    fn canvas(&self) -> RgbImage {
        RgbImage::from_pixel(self.width, self.height, BACKGROUND)
    }

    fn save(&self, img: &RgbImage, path: &Path) -> ReportResult<()> {
        img.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
        let x1 = x1.min(img.width());
        let y1 = y1.min(img.height());
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, color);
            }
        }
    }

    fn draw_axes(&self, img: &mut RgbImage) {
        let m = self.margin;
        let bottom = self.height - m;
        Self::fill_rect(img, m, bottom, self.width - m, bottom + 2, AXIS);
        Self::fill_rect(img, m.saturating_sub(2), m, m, bottom + 2, AXIS);
    }

    /// Vertical bars scaled to the largest value, one per entry.
    fn draw_bars(&self, img: &mut RgbImage, values: &[f64], single_color: bool) {
        if values.is_empty() {
            return;
        }
        let m = self.margin;
        let plot_w = self.width - 2 * m;
        let plot_h = self.height - 2 * m;
        let bottom = self.height - m;
        let max = values.iter().cloned().fold(0.0f64, f64::max);
        let slot = plot_w / values.len() as u32;
        let gap = (slot / 8).max(1);

        for (i, &v) in values.iter().enumerate() {
            let h = if max > 0.0 { (v / max * plot_h as f64).round() as u32 } else { 0 };
            let x0 = m + i as u32 * slot + gap;
            let x1 = (m + (i as u32 + 1) * slot).saturating_sub(gap);
            let color = if single_color { PALETTE[0] } else { PALETTE[i % PALETTE.len()] };
            Self::fill_rect(img, x0, bottom - h, x1, bottom, color);
        }
    }
}

impl ChartRenderer for PngRenderer {
    fn bar_chart(&self, result: &AggregationResult, path: &Path) -> ReportResult<()> {
        let mut img = self.canvas();
        self.draw_axes(&mut img);
        let values: Vec<f64> = result.rows.iter().map(|r| r.value).collect();
        self.draw_bars(&mut img, &values, false);
        self.save(&img, path)
    }

    fn pie_chart(&self, result: &AggregationResult, path: &Path) -> ReportResult<()> {
        let mut img = self.canvas();
        let total = result.total();
        let cx = self.width as f64 / 2.0;
        let cy = self.height as f64 / 2.0;
        let radius = (self.width.min(self.height) as f64 / 2.0) - self.margin as f64;

        // Cumulative slice boundaries as fractions of a full turn.
        let mut bounds = Vec::with_capacity(result.rows.len());
        let mut acc = 0.0;
        for row in &result.rows {
            acc += if total > 0.0 { row.value / total } else { 0.0 };
            bounds.push(acc);
        }

        if total > 0.0 {
            for y in 0..self.height {
                for x in 0..self.width {
                    let dx = x as f64 + 0.5 - cx;
                    let dy = cy - (y as f64 + 0.5);
                    if dx * dx + dy * dy > radius * radius {
                        continue;
                    }
                    // Clockwise from 12 o'clock.
                    let turn = (dx.atan2(dy) + 2.0 * PI) % (2.0 * PI) / (2.0 * PI);
                    let slice = bounds.iter().position(|&b| turn < b).unwrap_or(bounds.len() - 1);
                    img.put_pixel(x, y, PALETTE[slice % PALETTE.len()]);
                }
            }
        }
        self.save(&img, path)
    }

    fn histogram(&self, values: &[f64], bins: usize, range: (f64, f64), path: &Path) -> ReportResult<()> {
        let mut img = self.canvas();
        self.draw_axes(&mut img);
        let counts: Vec<f64> = histogram_counts(values, bins, range)
            .into_iter()
            .map(|c| c as f64)
            .collect();
        self.draw_bars(&mut img, &counts, true);
        self.save(&img, path)
    }
}

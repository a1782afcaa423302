//! Gradient Hough transform for circular objects.
//!
//! Every Canny edge pixel votes along its gradient line, in both directions,
//! for centers between `min_radius` and `max_radius` away. Coin outlines
//! produce accumulator peaks at their centers even when part of the boundary
//! is missing. Each peak then gets a radius from the distances of the edge
//! pixels around it.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detection::preprocessing::{Gradients, edges_from_gradients};
use crate::error::{CoinError, Result};
use crate::models::DetectedCircle;

/// Finest accumulator cell accepted, in pixels. Caps the grid at 16 cells
/// per image pixel.
pub const MIN_ACCUMULATOR_RESOLUTION: f32 = 0.25;

/// Largest searchable radius in pixels.
pub const MAX_SEARCH_RADIUS: u32 = 8192;

/// Circle detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Accumulator cell size in image pixels.
    pub accumulator_resolution: f32,
    /// Minimum distance between accepted circle centers (pixels).
    pub min_center_distance: f32,
    /// Canny high threshold; the low threshold is half of it.
    pub edge_threshold: f32,
    /// Votes a center needs, and edge pixels its radius needs.
    pub accumulator_threshold: u32,
    pub min_radius: u32,
    pub max_radius: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            accumulator_resolution: 1.2,
            min_center_distance: 30.0,
            edge_threshold: 200.0,
            accumulator_threshold: 30,
            min_radius: 5,
            max_radius: 50,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.accumulator_resolution.is_finite()
            && self.accumulator_resolution >= MIN_ACCUMULATOR_RESOLUTION)
        {
            return Err(CoinError::config(format!(
                "accumulator_resolution must be at least {}, got {}",
                MIN_ACCUMULATOR_RESOLUTION, self.accumulator_resolution
            )));
        }
        if !(self.min_center_distance.is_finite() && self.min_center_distance >= 0.0) {
            return Err(CoinError::config(format!(
                "min_center_distance must be non-negative, got {}",
                self.min_center_distance
            )));
        }
        if !(self.edge_threshold.is_finite() && self.edge_threshold > 0.0) {
            return Err(CoinError::config(format!(
                "edge_threshold must be positive, got {}",
                self.edge_threshold
            )));
        }
        if self.accumulator_threshold == 0 {
            return Err(CoinError::config("accumulator_threshold must be positive"));
        }
        if self.max_radius > MAX_SEARCH_RADIUS {
            return Err(CoinError::config(format!(
                "max_radius {} exceeds {}",
                self.max_radius, MAX_SEARCH_RADIUS
            )));
        }
        if self.max_radius < self.min_radius {
            return Err(CoinError::config(format!(
                "max_radius {} is smaller than min_radius {}",
                self.max_radius, self.min_radius
            )));
        }
        Ok(())
    }
}

/// Vote grid with a one-cell border on every side.
struct Accumulator {
    cols: usize,
    rows: usize,
    resolution: f32,
    votes: Vec<u32>,
}

impl Accumulator {
    fn new(width: u32, height: u32, resolution: f32) -> Self {
        let cols = (width as f32 / resolution).ceil() as usize + 2;
        let rows = (height as f32 / resolution).ceil() as usize + 2;
        Self {
            cols,
            rows,
            resolution,
            votes: vec![0; cols * rows],
        }
    }

    /// Cell index for an image position, `None` outside the grid interior.
    fn cell(&self, x: f32, y: f32) -> Option<usize> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let col = (x / self.resolution) as usize + 1;
        let row = (y / self.resolution) as usize + 1;
        if col >= self.cols - 1 || row >= self.rows - 1 {
            return None;
        }
        Some(row * self.cols + col)
    }

    /// One vote per cell crossed by the ray from `(x, y)` along `(ux, uy)`.
    fn vote_ray(&mut self, x: f32, y: f32, ux: f32, uy: f32, min_r: u32, max_r: u32) {
        let mut last = None;
        for r in min_r..=max_r {
            let r = r as f32;
            let Some(idx) = self.cell(x + ux * r, y + uy * r) else {
                break;
            };
            if last != Some(idx) {
                self.votes[idx] += 1;
                last = Some(idx);
            }
        }
    }

    /// Local maxima above `threshold`, strongest first.
    fn peaks(&self, threshold: u32) -> Vec<(f32, f32, u32)> {
        let cols = self.cols;
        let mut found = Vec::new();
        for row in 1..self.rows - 1 {
            for col in 1..cols - 1 {
                let idx = row * cols + col;
                let v = self.votes[idx];
                if v > threshold
                    && v > self.votes[idx - 1]
                    && v >= self.votes[idx + 1]
                    && v > self.votes[idx - cols]
                    && v >= self.votes[idx + cols]
                {
                    let cx = (col as f32 - 0.5) * self.resolution;
                    let cy = (row as f32 - 0.5) * self.resolution;
                    found.push((cx, cy, v));
                }
            }
        }
        // Stable: equal scores keep scan order.
        found.sort_by(|a, b| b.2.cmp(&a.2));
        found
    }
}

/// Detect circles in a smoothed grayscale image.
///
/// Finding nothing is a successful, empty result.
pub fn detect_circles(img: &GrayImage, params: &DetectorParams) -> Result<Vec<DetectedCircle>> {
    params.validate()?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(CoinError::detection(format!(
            "input image has zero size ({}x{})",
            width, height
        )));
    }

    let gradients = Gradients::of(img);
    let low_threshold = params.edge_threshold / 2.0;
    let edges = edges_from_gradients(&gradients, low_threshold, params.edge_threshold);

    let mut accumulator = Accumulator::new(width, height, params.accumulator_resolution);
    let mut edge_points = Vec::new();

    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        let (dx, dy) = gradients.at(x, y);
        let magnitude = (dx * dx + dy * dy).sqrt();
        if magnitude < 1e-3 {
            continue;
        }
        let (ux, uy) = (dx / magnitude, dy / magnitude);
        let (xf, yf) = (x as f32, y as f32);
        accumulator.vote_ray(xf, yf, ux, uy, params.min_radius, params.max_radius);
        accumulator.vote_ray(xf, yf, -ux, -uy, params.min_radius, params.max_radius);
        edge_points.push((xf, yf));
    }

    let centers = accumulator.peaks(params.accumulator_threshold);
    debug!(
        edge_pixels = edge_points.len(),
        candidate_centers = centers.len(),
        "accumulated circle votes"
    );

    let min_dist_sq = params.min_center_distance * params.min_center_distance;
    let mut accepted: Vec<(f32, f32)> = Vec::new();
    let mut circles = Vec::new();

    for (cx, cy, _) in centers {
        let too_close = accepted.iter().any(|&(ax, ay)| {
            let (dx, dy) = (cx - ax, cy - ay);
            dx * dx + dy * dy < min_dist_sq
        });
        if too_close {
            continue;
        }

        let Some((radius, support)) = estimate_radius(&edge_points, cx, cy, params) else {
            continue;
        };
        if support < params.accumulator_threshold {
            continue;
        }

        accepted.push((cx, cy));
        circles.push(DetectedCircle {
            x: cx.round() as i32,
            y: cy.round() as i32,
            radius,
            votes: support,
        });
    }

    debug!(circles = circles.len(), "circle detection finished");
    Ok(circles)
}

/// Radius with the most edge support around `(cx, cy)`.
///
/// Distances are binned to whole pixels and scored over a 3-pixel window; the
/// result is the rounded mean distance inside the winning window.
fn estimate_radius(
    edge_points: &[(f32, f32)],
    cx: f32,
    cy: f32,
    params: &DetectorParams,
) -> Option<(i32, u32)> {
    let min_r = params.min_radius as usize;
    let max_r = params.max_radius as usize;

    let mut distances = Vec::new();
    let mut histogram = vec![0u32; max_r + 2];
    for &(x, y) in edge_points {
        let (dx, dy) = (x - cx, y - cy);
        let d = (dx * dx + dy * dy).sqrt();
        let bin = d.round() as usize;
        if bin < min_r || bin > max_r {
            continue;
        }
        histogram[bin] += 1;
        distances.push(d);
    }
    if distances.is_empty() {
        return None;
    }

    let mut best_r = min_r;
    let mut best_support = 0;
    for r in min_r..=max_r {
        let lo = r.saturating_sub(1).max(min_r);
        let hi = (r + 1).min(max_r);
        let support: u32 = histogram[lo..=hi].iter().sum();
        if support > best_support {
            best_support = support;
            best_r = r;
        }
    }
    if best_support == 0 {
        return None;
    }

    let lo = best_r.saturating_sub(1) as f32 - 0.5;
    let hi = best_r as f32 + 1.5;
    let (sum, count) = distances
        .iter()
        .filter(|&&d| d >= lo && d < hi)
        .fold((0.0f32, 0u32), |(s, n), &d| (s + d, n + 1));
    if count == 0 {
        return None;
    }

    Some(((sum / count as f32).round() as i32, best_support))
}

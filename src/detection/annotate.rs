use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;
use serde::{Deserialize, Serialize};

use crate::detection::glyphs;
use crate::models::CoinMatch;

/// How coins are marked on the output image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    /// Outline thickness in pixels.
    pub stroke_width: u32,
    pub matched_color: [u8; 3],
    pub unmatched_color: [u8; 3],
    pub label_color: [u8; 3],
    /// Pixel size of one font cell.
    pub label_scale: u32,
    /// Currency marker placed before the value.
    pub label_prefix: String,
    /// Outline circles that matched no denomination.
    pub draw_unmatched: bool,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            stroke_width: 5,
            matched_color: [0, 255, 0],
            unmatched_color: [255, 165, 0],
            label_color: [255, 0, 0],
            label_scale: 3,
            label_prefix: "P".to_string(),
            draw_unmatched: true,
        }
    }
}

/// Label text for a coin, e.g. `P0.25`, or `?` when unmatched.
pub fn label_for(coin: &CoinMatch, style: &AnnotationStyle) -> String {
    match coin.value {
        Some(value) => format!("{}{}", style.label_prefix, value),
        None => "?".to_string(),
    }
}

/// Draw the outline and value label of one coin in place.
pub fn annotate_coin(img: &mut RgbImage, coin: &CoinMatch, style: &AnnotationStyle) {
    let matched = coin.value.is_some();
    if !matched && !style.draw_unmatched {
        return;
    }

    let color = if matched {
        style.matched_color
    } else {
        style.unmatched_color
    };
    let circle = &coin.circle;
    draw_ring(img, circle.center(), circle.radius, style.stroke_width, Rgb(color));

    // The label's bottom-left corner sits up and left of the center.
    let label = label_for(coin, style);
    let (_, text_height) = glyphs::text_size(&label, style.label_scale);
    glyphs::draw_text_mut(
        img,
        &label,
        circle.x - 10,
        circle.y - 10 - text_height as i32,
        style.label_scale,
        Rgb(style.label_color),
    );
}

/// Copy `base` and draw every coin onto the copy.
pub fn annotate_all(base: &RgbImage, coins: &[CoinMatch], style: &AnnotationStyle) -> RgbImage {
    let mut annotated = base.clone();
    for coin in coins {
        annotate_coin(&mut annotated, coin, style);
    }
    annotated
}

/// Concentric outlines centred on `radius`, `stroke` pixels thick.
fn draw_ring(img: &mut RgbImage, center: (i32, i32), radius: i32, stroke: u32, color: Rgb<u8>) {
    let stroke = stroke.max(1) as i32;
    let inner = radius - stroke / 2;
    for r in inner..inner + stroke {
        if r >= 0 {
            draw_hollow_circle_mut(img, center, r, color);
        }
    }
}

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::definitions::Image;
use imageproc::filter::separable_filter_equal;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};

use crate::error::{CoinError, Result};

/// Smoothing kernel parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurParams {
    /// Side of the square kernel; must be odd and positive.
    pub kernel_size: u32,
    /// Gaussian sigma; 0 derives it from the kernel size.
    pub sigma: f32,
}

impl Default for BlurParams {
    fn default() -> Self {
        Self {
            kernel_size: 15,
            sigma: 0.0,
        }
    }
}

impl BlurParams {
    pub fn validate(&self) -> Result<()> {
        let kernel_ok = self.kernel_size > 0 && self.kernel_size % 2 == 1;
        let sigma_ok = self.sigma.is_finite() && self.sigma >= 0.0;
        if kernel_ok && sigma_ok {
            Ok(())
        } else {
            Err(CoinError::InvalidKernel {
                kernel_size: self.kernel_size,
                sigma: self.sigma,
            })
        }
    }

    /// Sigma actually used for the kernel.
    pub fn effective_sigma(&self) -> f32 {
        if self.sigma > 0.0 {
            self.sigma
        } else {
            0.3 * ((self.kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
        }
    }

    /// Normalized 1-D Gaussian weights of length `kernel_size`.
    pub fn kernel(&self) -> Vec<f32> {
        let sigma = self.effective_sigma();
        let half = (self.kernel_size / 2) as i32;
        let scale = -0.5 / (sigma * sigma);
        let mut weights: Vec<f32> = (-half..=half)
            .map(|i| (scale * (i * i) as f32).exp())
            .collect();
        let sum: f32 = weights.iter().sum();
        for w in &mut weights {
            *w /= sum;
        }
        weights
    }
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply a square Gaussian kernel to suppress edge noise.
///
/// The output has the input's dimensions. Pixels past the border repeat the
/// edge pixel.
pub fn apply_blur(img: &GrayImage, params: &BlurParams) -> Result<GrayImage> {
    params.validate()?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || params.kernel_size == 1 {
        return Ok(img.clone());
    }

    // Filter in f32 so both passes round once instead of truncating twice.
    let levels: Image<Luma<f32>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([img.get_pixel(x, y)[0] as f32]));
    let blurred = separable_filter_equal(&levels, &params.kernel());

    Ok(GrayImage::from_fn(width, height, |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    }))
}

/// Sobel derivatives of a grayscale image.
pub struct Gradients {
    pub gx: Image<Luma<i16>>,
    pub gy: Image<Luma<i16>>,
}

impl Gradients {
    pub fn of(img: &GrayImage) -> Self {
        Self {
            gx: horizontal_sobel(img),
            gy: vertical_sobel(img),
        }
    }

    pub fn at(&self, x: u32, y: u32) -> (f32, f32) {
        (self.gx.get_pixel(x, y)[0] as f32, self.gy.get_pixel(x, y)[0] as f32)
    }

    /// L1 gradient magnitude `|gx| + |gy|`.
    pub fn magnitude(&self, x: u32, y: u32) -> f32 {
        let (dx, dy) = self.at(x, y);
        dx.abs() + dy.abs()
    }
}

/// Canny edge map of an already smoothed image.
///
/// Thresholds apply to the L1 Sobel magnitude. No extra smoothing is done
/// here; the blur stage owns that.
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    edges_from_gradients(&Gradients::of(img), low_threshold, high_threshold)
}

/// Thin the gradient ridges and keep the ones connected to a strong pixel.
///
/// Pixels above `high_threshold` seed an edge; pixels above `low_threshold`
/// extend it through 8-connected neighbours.
pub fn edges_from_gradients(
    gradients: &Gradients,
    low_threshold: f32,
    high_threshold: f32,
) -> GrayImage {
    let thinned = suppress_non_maxima(gradients);
    let (width, height) = thinned.dimensions();

    let candidates = GrayImage::from_fn(width, height, |x, y| {
        Luma([if thinned.get_pixel(x, y)[0] > low_threshold { 255 } else { 0 }])
    });
    let labels = connected_components(&candidates, Connectivity::Eight, Luma([0u8]));

    let label_count = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut strong = vec![false; label_count + 1];
    for (x, y, label) in labels.enumerate_pixels() {
        if label[0] != 0 && thinned.get_pixel(x, y)[0] > high_threshold {
            strong[label[0] as usize] = true;
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y)[0] as usize;
        Luma([if label != 0 && strong[label] { 255 } else { 0 }])
    })
}

/// Keep a magnitude only where it peaks across the edge.
///
/// The gradient direction is quantized to horizontal, vertical or one of the
/// diagonals. The one-pixel border is always zero.
fn suppress_non_maxima(gradients: &Gradients) -> Image<Luma<f32>> {
    // tan(22.5°) and tan(67.5°)
    const TAN_22_5: f32 = 0.414_213_57;
    const TAN_67_5: f32 = 2.414_213_6;

    let (width, height) = gradients.gx.dimensions();
    let mut out: Image<Luma<f32>> = ImageBuffer::new(width, height);
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let (dx, dy) = gradients.at(x, y);
            let m = dx.abs() + dy.abs();
            if m == 0.0 {
                continue;
            }

            let (ax, ay, bx, by) = if dy.abs() < dx.abs() * TAN_22_5 {
                (x - 1, y, x + 1, y)
            } else if dy.abs() > dx.abs() * TAN_67_5 {
                (x, y - 1, x, y + 1)
            } else if (dx > 0.0) == (dy > 0.0) {
                (x - 1, y - 1, x + 1, y + 1)
            } else {
                (x + 1, y - 1, x - 1, y + 1)
            };

            if m > gradients.magnitude(ax, ay) && m >= gradients.magnitude(bx, by) {
                out.put_pixel(x, y, Luma([m]));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_circle_mut;

    #[test]
    fn rejects_even_or_zero_kernel() {
        let img = GrayImage::new(8, 8);
        for kernel_size in [0, 2, 14] {
            let params = BlurParams {
                kernel_size,
                sigma: 0.0,
            };
            assert!(matches!(
                apply_blur(&img, &params),
                Err(CoinError::InvalidKernel { .. })
            ));
        }
        let negative_sigma = BlurParams {
            kernel_size: 5,
            sigma: -1.0,
        };
        assert!(apply_blur(&img, &negative_sigma).is_err());
    }

    #[test]
    fn auto_sigma_follows_kernel_size() {
        let params = BlurParams::default();
        assert!((params.effective_sigma() - 2.6).abs() < 1e-5);
        let kernel = params.kernel();
        assert_eq!(kernel.len(), 15);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(kernel[7] > kernel[6] && kernel[0] == kernel[14]);
    }

    #[test]
    fn blur_keeps_dimensions_and_flat_regions() {
        let img = GrayImage::from_pixel(23, 9, Luma([120]));
        let blurred = apply_blur(&img, &BlurParams::default()).unwrap();
        assert_eq!(blurred.dimensions(), (23, 9));
        assert!(blurred.pixels().all(|p| p[0] == 120));
    }

    #[test]
    fn blur_softens_a_step_edge() {
        let img = GrayImage::from_fn(40, 10, |x, _| if x < 20 { Luma([0]) } else { Luma([255]) });
        let blurred = apply_blur(&img, &BlurParams::default()).unwrap();
        let left = blurred.get_pixel(19, 5)[0];
        let right = blurred.get_pixel(20, 5)[0];
        assert!(left > 0 && left < 128);
        assert!(right > 128 && right < 255);
        assert_eq!(blurred.get_pixel(0, 5)[0], 0);
        assert_eq!(blurred.get_pixel(39, 5)[0], 255);
    }

    fn blurred_disk(background: u8, disk: u8) -> GrayImage {
        let mut img = GrayImage::from_pixel(100, 100, Luma([background]));
        draw_filled_circle_mut(&mut img, (50, 50), 30, Luma([disk]));
        apply_blur(&img, &BlurParams::default()).unwrap()
    }

    fn edge_count(edges: &GrayImage) -> usize {
        edges.pixels().filter(|p| p[0] == 255).count()
    }

    #[test]
    fn edges_form_a_thin_ring() {
        let edges = detect_edges(&blurred_disk(255, 0), 100.0, 200.0);
        let count = edge_count(&edges);
        // Circumference of r=30 is about 188 pixels.
        assert!((150..=300).contains(&count), "{} edge pixels", count);
        assert_eq!(edges.get_pixel(50, 50)[0], 0);
        assert_eq!(edges.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn mid_contrast_outline_survives_default_thresholds() {
        let edges = detect_edges(&blurred_disk(200, 50), 100.0, 200.0);
        assert!(edge_count(&edges) > 150);
    }

    #[test]
    fn faint_outline_is_dropped() {
        let edges = detect_edges(&blurred_disk(140, 110), 100.0, 200.0);
        assert_eq!(edge_count(&edges), 0);
    }

    #[test]
    fn tiny_images_have_no_edges() {
        let edges = detect_edges(&GrayImage::from_pixel(2, 2, Luma([9])), 1.0, 2.0);
        assert_eq!(edges.dimensions(), (2, 2));
        assert_eq!(edge_count(&edges), 0);
    }
}

//! Connected-region extraction from frame differences.
//!
//! The difference image is binarized at a caller threshold, dilated to
//! close small holes, and swept for 8-connected regions via flood-fill
//! growth. Each surviving region carries its bounding box, pixel area, and
//! a scale-invariant shape signature used for optional deduplication of
//! recurring static shapes.

use image::{GrayImage, Rgb, RgbImage};

/// A connected region of sufficient pixel-difference area.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionRegion {
    /// Bounding box in frame coordinates.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,

    /// Number of set pixels in the region.
    pub area: u32,

    /// Moment-invariant shape signature.
    pub signature: ShapeSignature,
}

/// Two normalized moment invariants, enough to tell "same static object
/// showing up again" from genuinely new shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeSignature {
    h1: f64,
    h2: f64,
}

impl ShapeSignature {
    /// Build from a region's pixel coordinates.
    fn from_pixels(pixels: &[(u32, u32)]) -> Self {
        let n = pixels.len() as f64;
        let (sum_x, sum_y) = pixels
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + *x as f64, sy + *y as f64));
        let (cx, cy) = (sum_x / n, sum_y / n);

        let (mut mu20, mut mu02, mut mu11) = (0.0, 0.0, 0.0);
        for (x, y) in pixels {
            let dx = *x as f64 - cx;
            let dy = *y as f64 - cy;
            mu20 += dx * dx;
            mu02 += dy * dy;
            mu11 += dx * dy;
        }

        // Normalized central moments for p+q = 2 divide by area^2.
        let norm = n * n;
        let eta20 = mu20 / norm;
        let eta02 = mu02 / norm;
        let eta11 = mu11 / norm;

        Self {
            h1: eta20 + eta02,
            h2: (eta20 - eta02).powi(2) + 4.0 * eta11 * eta11,
        }
    }

    /// Log-scale distance between two signatures; 0 for identical shapes,
    /// growing as shapes diverge. Invariant to translation and scale.
    pub fn distance(&self, other: &ShapeSignature) -> f64 {
        let term = |a: f64, b: f64| {
            let (la, lb) = (log_moment(a), log_moment(b));
            match (la, lb) {
                (Some(la), Some(lb)) => (1.0 / la - 1.0 / lb).abs(),
                (None, None) => 0.0,
                // One degenerate moment: maximally different.
                _ => f64::INFINITY,
            }
        };
        term(self.h1, other.h1) + term(self.h2, other.h2)
    }
}

/// Signed log10 of a moment, `None` when the moment is degenerate.
fn log_moment(value: f64) -> Option<f64> {
    if value.abs() < 1e-12 {
        None
    } else {
        Some(value.signum() * value.abs().log10())
    }
}

/// Extract external connected regions from a difference image.
///
/// Binarize at `threshold`, dilate twice (3x3) to merge adjacent noisy
/// blobs, grow 8-connected regions, drop those under `min_area`.
pub fn find_regions(diff: &GrayImage, threshold: u8, min_area: u32) -> Vec<MotionRegion> {
    let mask = dilate(&binarize(diff, threshold), 2);
    extract_components(&mask, min_area)
}

/// Per-pixel absolute difference of two equally sized grayscale frames.
pub fn abs_diff(reference: &GrayImage, current: &GrayImage) -> GrayImage {
    debug_assert_eq!(reference.dimensions(), current.dimensions());
    let mut out = GrayImage::new(reference.width(), reference.height());
    for (r, (c, o)) in reference
        .pixels()
        .zip(current.pixels().zip(out.pixels_mut()))
    {
        o.0[0] = r.0[0].abs_diff(c.0[0]);
    }
    out
}

/// Binary mask of pixels strictly above the threshold.
fn binarize(diff: &GrayImage, threshold: u8) -> Mask {
    let (width, height) = diff.dimensions();
    let mut bits = vec![false; (width * height) as usize];
    for (i, pixel) in diff.pixels().enumerate() {
        bits[i] = pixel.0[0] > threshold;
    }
    Mask {
        bits,
        width,
        height,
    }
}

/// Flat binary mask; avoids rebuilding GrayImages between passes.
struct Mask {
    bits: Vec<bool>,
    width: u32,
    height: u32,
}

impl Mask {
    fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            false
        } else {
            self.bits[(y as u32 * self.width + x as u32) as usize]
        }
    }
}

/// 3x3 binary dilation, `iterations` passes.
fn dilate(mask: &Mask, iterations: u32) -> Mask {
    let mut current = Mask {
        bits: mask.bits.clone(),
        width: mask.width,
        height: mask.height,
    };

    for _ in 0..iterations {
        let mut next = vec![false; current.bits.len()];
        for y in 0..current.height as i64 {
            for x in 0..current.width as i64 {
                'probe: for dy in -1..=1 {
                    for dx in -1..=1 {
                        if current.get(x + dx, y + dy) {
                            next[(y as u32 * current.width + x as u32) as usize] = true;
                            break 'probe;
                        }
                    }
                }
            }
        }
        current.bits = next;
    }

    current
}

/// Grow 8-connected components over the mask, keeping those that clear
/// the area floor.
fn extract_components(mask: &Mask, min_area: u32) -> Vec<MotionRegion> {
    let mut visited = vec![false; mask.bits.len()];
    let mut regions = Vec::new();

    for start_y in 0..mask.height {
        for start_x in 0..mask.width {
            let start_idx = (start_y * mask.width + start_x) as usize;
            if !mask.bits[start_idx] || visited[start_idx] {
                continue;
            }

            // Flood fill from this seed.
            let mut pixels = Vec::new();
            let mut queue = vec![(start_x, start_y)];
            visited[start_idx] = true;

            while let Some((x, y)) = queue.pop() {
                pixels.push((x, y));
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                        if !mask.get(nx, ny) {
                            continue;
                        }
                        let idx = (ny as u32 * mask.width + nx as u32) as usize;
                        if !visited[idx] {
                            visited[idx] = true;
                            queue.push((nx as u32, ny as u32));
                        }
                    }
                }
            }

            if (pixels.len() as u32) < min_area {
                continue;
            }

            let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0, 0);
            for (x, y) in &pixels {
                min_x = min_x.min(*x);
                min_y = min_y.min(*y);
                max_x = max_x.max(*x);
                max_y = max_y.max(*y);
            }

            regions.push(MotionRegion {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
                area: pixels.len() as u32,
                signature: ShapeSignature::from_pixels(&pixels),
            });
        }
    }

    regions
}

/// Box color for annotated motion regions.
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Draw a region's bounding box onto the frame, `thickness` pixels wide.
pub fn draw_bounding_box(frame: &mut RgbImage, region: &MotionRegion, thickness: u32) {
    let (fw, fh) = frame.dimensions();
    if fw == 0 || fh == 0 {
        return;
    }

    let x1 = region.x.min(fw - 1);
    let y1 = region.y.min(fh - 1);
    let x2 = (region.x + region.width).min(fw).saturating_sub(1);
    let y2 = (region.y + region.height).min(fh).saturating_sub(1);

    for t in 0..thickness {
        let top = (y1 + t).min(fh - 1);
        let bottom = y2.saturating_sub(t);
        for x in x1..=x2 {
            frame.put_pixel(x, top, BOX_COLOR);
            frame.put_pixel(x, bottom, BOX_COLOR);
        }
        let left = (x1 + t).min(fw - 1);
        let right = x2.saturating_sub(t);
        for y in y1..=y2 {
            frame.put_pixel(left, y, BOX_COLOR);
            frame.put_pixel(right, y, BOX_COLOR);
        }
    }
}

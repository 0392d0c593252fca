//! Reference pupil and corner locators.
//!
//! The pupil locator implements the means-of-gradients eye center estimator
//! from "Accurate Eye Centre Localisation by Means of Gradients" (Timm & Barth,
//! 2011): the pupil is the point whose displacement vectors best align with the
//! image gradient directions around it. The corner locator filters the region
//! with a small oriented corner kernel and takes the strongest response.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::frame::{GrayImage, ImageAccess};
use crate::locator::{CornerLocator, PupilLocator};
use crate::regions::{Eye, Side};
use crate::types::Point;

/// Tuning for [`GradientPupilLocator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientPupilParams {
    /// Width the eye region is resampled to before the search.
    pub fast_width: u32,
    /// Gradients weaker than `mean + threshold * stddev / sqrt(n)` are ignored.
    pub gradient_threshold: f32,
    /// Weight candidate centers by inverted (dark = heavy) intensity.
    pub enable_weight: bool,
    /// Sigma of the blur applied before computing weights.
    pub weight_blur_sigma: f32,
    pub weight_divisor: f32,
    /// Discard maxima connected to the region border.
    pub enable_post_process: bool,
    /// Fraction of the global maximum above which the objective counts as a peak.
    pub post_process_threshold: f32,
}

impl Default for GradientPupilParams {
    fn default() -> Self {
        Self {
            fast_width: 50,
            gradient_threshold: 50.0,
            enable_weight: true,
            weight_blur_sigma: 1.1,
            weight_divisor: 1.0,
            enable_post_process: true,
            post_process_threshold: 0.97,
        }
    }
}

/// Means-of-gradients pupil center estimator.
#[derive(Debug, Clone, Default)]
pub struct GradientPupilLocator {
    params: GradientPupilParams,
}

impl GradientPupilLocator {
    pub fn new(params: GradientPupilParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GradientPupilParams {
        &self.params
    }
}

impl PupilLocator for GradientPupilLocator {
    fn locate(&self, roi: &GrayImage) -> Point {
        if roi.is_empty() {
            return Point::new(roi.width() as i32 / 2, roi.height() as i32 / 2);
        }

        let p = &self.params;
        let fast_width = p.fast_width.max(1);
        let scale = fast_width as f32 / roi.width() as f32;
        let fast_height = ((roi.height() as f32 * scale).round() as u32).max(1);
        let eye = roi.resize(fast_width, fast_height);

        let w = eye.width() as usize;
        let h = eye.height() as usize;

        let (mut grad_x, mut grad_y) = gradients(&eye);
        let magnitudes: Vec<f32> = grad_x
            .iter()
            .zip(&grad_y)
            .map(|(gx, gy)| (gx * gx + gy * gy).sqrt())
            .collect();
        let threshold = dynamic_threshold(&magnitudes, p.gradient_threshold);

        for i in 0..magnitudes.len() {
            let m = magnitudes[i];
            if m > threshold {
                grad_x[i] /= m;
                grad_y[i] /= m;
            } else {
                grad_x[i] = 0.0;
                grad_y[i] = 0.0;
            }
        }

        let weight: Vec<f32> = eye
            .gaussian_blur(p.weight_blur_sigma)
            .as_raw()
            .iter()
            .map(|&v| 255.0 - v as f32)
            .collect();

        let mut objective = vec![0.0f32; w * h];
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let (gx, gy) = (grad_x[i], grad_y[i]);
                if gx == 0.0 && gy == 0.0 {
                    continue;
                }
                accumulate_center_votes(x, y, gx, gy, w, h, &weight, p, &mut objective);
            }
        }

        let n = (w * h) as f32;
        for v in objective.iter_mut() {
            *v /= n;
        }

        let (max_idx, max_val) = argmax(&objective, None).unwrap_or((0, 0.0));
        let mut best = max_idx;

        if p.enable_post_process && max_val > 0.0 {
            let cutoff = max_val * p.post_process_threshold;
            let peaks: Vec<f32> = objective
                .iter()
                .map(|&v| if v > cutoff { v } else { 0.0 })
                .collect();
            let mask = flood_kill_edges(&peaks, w, h);
            if let Some((idx, _)) = argmax(&objective, Some(mask.as_slice())) {
                best = idx;
            }
        }

        let fx = (best % w) as f32;
        let fy = (best / w) as f32;
        Point::new(
            (fx / scale).round() as i32,
            (fy * roi.height() as f32 / h as f32).round() as i32,
        )
    }
}

/// Central-difference gradients, one-sided at the borders.
fn gradients(img: &GrayImage) -> (Vec<f32>, Vec<f32>) {
    let w = img.width() as i32;
    let h = img.height() as i32;
    let px = |x: i32, y: i32| img.get_pixel(x, y) as f32;

    let mut gx = Vec::with_capacity((w * h) as usize);
    let mut gy = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            gx.push(if w < 2 {
                0.0
            } else if x == 0 {
                px(1, y) - px(0, y)
            } else if x == w - 1 {
                px(x, y) - px(x - 1, y)
            } else {
                (px(x + 1, y) - px(x - 1, y)) / 2.0
            });
            gy.push(if h < 2 {
                0.0
            } else if y == 0 {
                px(x, 1) - px(x, 0)
            } else if y == h - 1 {
                px(x, y) - px(x, y - 1)
            } else {
                (px(x, y + 1) - px(x, y - 1)) / 2.0
            });
        }
    }
    (gx, gy)
}

fn dynamic_threshold(magnitudes: &[f32], std_dev_factor: f32) -> f32 {
    let n = magnitudes.len() as f32;
    if n == 0.0 {
        return 0.0;
    }
    let mean = magnitudes.iter().sum::<f32>() / n;
    let variance = magnitudes.iter().map(|m| (m - mean) * (m - mean)).sum::<f32>() / n;
    std_dev_factor * variance.sqrt() / n.sqrt() + mean
}

/// Add one gradient's vote to every candidate center.
#[allow(clippy::too_many_arguments)]
fn accumulate_center_votes(
    x: usize,
    y: usize,
    gx: f32,
    gy: f32,
    w: usize,
    h: usize,
    weight: &[f32],
    params: &GradientPupilParams,
    objective: &mut [f32],
) {
    for cy in 0..h {
        for cx in 0..w {
            if cx == x && cy == y {
                continue;
            }
            let dx = x as f32 - cx as f32;
            let dy = y as f32 - cy as f32;
            let len = (dx * dx + dy * dy).sqrt();
            let dot = ((dx / len) * gx + (dy / len) * gy).max(0.0);
            let i = cy * w + cx;
            if params.enable_weight {
                objective[i] += dot * dot * (weight[i] / params.weight_divisor);
            } else {
                objective[i] += dot * dot;
            }
        }
    }
}

/// Index and value of the largest element, optionally restricted by a mask.
fn argmax(values: &[f32], mask: Option<&[bool]>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if mask.is_some_and(|m| !m[i]) {
            continue;
        }
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best
}

/// Mask out every peak region that touches the border.
///
/// The border itself always counts as a peak, so the flood starting at the
/// top-left corner runs around the whole frame and into anything attached to
/// it. Returns `true` for pixels that remain eligible.
fn flood_kill_edges(peaks: &[f32], w: usize, h: usize) -> Vec<bool> {
    let alive = |x: usize, y: usize| {
        x == 0 || y == 0 || x + 1 == w || y + 1 == h || peaks[y * w + x] != 0.0
    };

    let mut mask = vec![true; w * h];
    let mut queue = VecDeque::from([(0usize, 0usize)]);
    while let Some((x, y)) = queue.pop_front() {
        let i = y * w + x;
        if !mask[i] || !alive(x, y) {
            continue;
        }
        mask[i] = false;
        if x > 0 {
            queue.push_back((x - 1, y));
        }
        if x + 1 < w {
            queue.push_back((x + 1, y));
        }
        if y > 0 {
            queue.push_back((x, y - 1));
        }
        if y + 1 < h {
            queue.push_back((x, y + 1));
        }
    }
    mask
}

/// Corner kernel for a corner at the right end of a region; mirrored for the left.
const CORNER_KERNEL: [[f32; 6]; 4] = [
    [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
    [-1.0, -1.0, -1.0, -1.0, 1.0, 1.0],
    [-1.0, -1.0, -1.0, -1.0, 0.0, 3.0],
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
];

/// Oriented corner-kernel filter.
///
/// The kernel faces away from the pupil: left-side regions search for a
/// corner at their left end, right-side regions at their right end.
#[derive(Debug, Clone, Copy, Default)]
pub struct CornerKernelLocator;

impl CornerKernelLocator {
    fn kernel_weight(side: Side, row: usize, col: usize) -> f32 {
        match side {
            Side::Right => CORNER_KERNEL[row][col],
            Side::Left => CORNER_KERNEL[row][5 - col],
        }
    }

    /// Filter response at every pixel, with reflected borders.
    fn response_map(roi: &GrayImage, side: Side) -> Vec<f32> {
        let w = roi.width() as i32;
        let h = roi.height() as i32;
        let (anchor_x, anchor_y) = (3, 2);

        let mut out = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for row in 0..4 {
                    for col in 0..6 {
                        let sx = reflect(x + col as i32 - anchor_x, w);
                        let sy = reflect(y + row as i32 - anchor_y, h);
                        acc += Self::kernel_weight(side, row, col) * roi.get_pixel(sx, sy) as f32;
                    }
                }
                out.push(acc);
            }
        }
        out
    }
}

impl CornerLocator for CornerKernelLocator {
    fn locate(&self, roi: &GrayImage, eye: Eye, side: Side) -> Point {
        if roi.is_empty() {
            return Point::zero();
        }
        let response = Self::response_map(roi, side);
        let w = roi.width() as usize;
        match argmax(&response, None) {
            Some((idx, _)) => {
                tracing::trace!(?eye, ?side, idx, "Corner response peak");
                Point::new((idx % w) as i32, (idx / w) as i32)
            }
            None => Point::new(roi.width() as i32 / 2, roi.height() as i32 / 2),
        }
    }
}

/// Reflect an out-of-range index back into `0..len` without repeating the edge.
fn reflect(i: i32, len: i32) -> i32 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut m = i.rem_euclid(period);
    if m >= len {
        m = period - m;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bright background with a dark disc centered at (cx, cy).
    fn synthetic_eye(width: u32, height: u32, cx: f32, cy: f32, radius: f32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if (dx * dx + dy * dy).sqrt() <= radius {
                20
            } else {
                220
            }
        })
    }

    #[test]
    fn finds_dark_disc_center() {
        let roi = synthetic_eye(50, 30, 22.0, 14.0, 6.0);
        let p = GradientPupilLocator::default().locate(&roi);
        assert!((p.x - 22).abs() <= 2, "x = {}", p.x);
        assert!((p.y - 14).abs() <= 2, "y = {}", p.y);
    }

    #[test]
    fn rescales_to_roi_coordinates() {
        let roi = synthetic_eye(100, 60, 60.0, 30.0, 12.0);
        let p = GradientPupilLocator::default().locate(&roi);
        assert!((p.x - 60).abs() <= 4, "x = {}", p.x);
        assert!((p.y - 30).abs() <= 4, "y = {}", p.y);
    }

    #[test]
    fn flat_roi_still_yields_a_point_inside() {
        let roi = GrayImage::from_fn(40, 20, |_, _| 128);
        let p = GradientPupilLocator::default().locate(&roi);
        assert!(p.x >= 0 && p.x < 40);
        assert!(p.y >= 0 && p.y < 20);
    }

    #[test]
    fn empty_roi_returns_center() {
        let roi = GrayImage::from_fn(0, 12, |_, _| 0);
        assert_eq!(GradientPupilLocator::default().locate(&roi), Point::new(0, 6));
    }

    #[test]
    fn dynamic_threshold_of_constant_is_mean() {
        assert!((dynamic_threshold(&[3.0; 16], 50.0) - 3.0).abs() < 1e-6);
        assert_eq!(dynamic_threshold(&[], 50.0), 0.0);
    }

    #[test]
    fn gradients_on_ramp() {
        let img = GrayImage::from_fn(4, 3, |x, _| (x * 10) as u8);
        let (gx, gy) = gradients(&img);
        assert!(gx.iter().all(|&g| (g - 10.0).abs() < 1e-6));
        assert!(gy.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn flood_kill_removes_border_connected_peaks() {
        // 7x7 objective with a border-touching ridge and an isolated interior peak.
        let w = 7;
        let h = 7;
        let mut peaks = vec![0.0; w * h];
        peaks[w] = 1.0;
        peaks[w + 1] = 1.0;
        peaks[3 * w + 3] = 1.0;

        let mask = flood_kill_edges(&peaks, w, h);
        assert!(!mask[w]);
        assert!(!mask[w + 1]);
        assert!(mask[3 * w + 3]);
        assert!(mask[2 * w + 2]);
        assert!(!mask[6 * w + 6]);
    }

    #[test]
    fn reflect_indices() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(-2, 5), 2);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(2, 5), 2);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn corner_locator_total_on_degenerate_regions() {
        let locator = CornerKernelLocator;
        let empty = GrayImage::from_fn(0, 15, |_, _| 0);
        assert_eq!(locator.locate(&empty, Eye::Left, Side::Left), Point::zero());

        let sliver = GrayImage::from_fn(1, 15, |_, y| (y * 10) as u8);
        let p = locator.locate(&sliver, Eye::Right, Side::Right);
        assert_eq!(p.x, 0);
        assert!(p.y >= 0 && p.y < 15);
    }

    #[test]
    fn corner_orientation_follows_side() {
        // Dark horizontal slit on a bright background.
        let roi = GrayImage::from_fn(30, 16, |x, y| {
            if (8..=22).contains(&x) && (6..=9).contains(&y) {
                30
            } else {
                200
            }
        });
        let locator = CornerKernelLocator;
        let left = locator.locate(&roi, Eye::Right, Side::Left);
        let right = locator.locate(&roi, Eye::Left, Side::Right);
        assert!(left.x < 15, "left = {:?}", left);
        assert!(right.x > 15, "right = {:?}", right);
    }
}

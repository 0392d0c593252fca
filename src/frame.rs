use std::path::Path;

use crate::error::Result;
use crate::types::BoundingBox;

/// Trait for accessing pixel intensities from an image.
pub trait ImageAccess {
    /// Get the grayscale intensity at (x, y). Returns 0 for out-of-bounds pixels.
    fn get_pixel(&self, x: i32, y: i32) -> u8;

    /// Image dimensions.
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// An owned grayscale frame or region of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    /// Wrap a row-major pixel buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` is not `width * height`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize,
            "pixel buffer does not match {}x{} image",
            width,
            height
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> u8,
    {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { data, width, height }
    }

    /// Load an image file and convert it to grayscale.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let img = ::image::open(path)?;
        Ok(Self::from_luma(&img.to_luma8()))
    }

    /// Build a frame from an `image` crate luma buffer.
    pub fn from_luma(img: &::image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.as_raw().clone(), width, height)
    }

    /// Convert into an `image` crate luma buffer.
    pub fn to_luma(&self) -> ::image::GrayImage {
        ::image::GrayImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| ::image::GrayImage::new(self.width, self.height))
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Copy out a region of interest given in this image's coordinates.
    ///
    /// The result always has the region's size; pixels falling outside this
    /// image read as 0. A zero-width or zero-height region yields an empty image.
    pub fn crop(&self, roi: &BoundingBox) -> GrayImage {
        let width = roi.width.max(0) as u32;
        let height = roi.height.max(0) as u32;
        GrayImage::from_fn(width, height, |x, y| {
            self.get_pixel(roi.x + x as i32, roi.y + y as i32)
        })
    }

    /// Gaussian blur with the given standard deviation. Non-positive sigma is a no-op.
    pub fn gaussian_blur(&self, sigma: f32) -> GrayImage {
        if sigma <= 0.0 || !sigma.is_finite() || self.is_empty() {
            return self.clone();
        }
        Self::from_luma(&::image::imageops::blur(&self.to_luma(), sigma))
    }

    /// Apply `p' = gain * p + bias`, saturating to the u8 range.
    pub fn adjust(&self, gain: f32, bias: f32) -> GrayImage {
        if gain == 1.0 && bias == 0.0 {
            return self.clone();
        }
        let data = self
            .data
            .iter()
            .map(|&p| (gain * p as f32 + bias).round().clamp(0.0, 255.0) as u8)
            .collect();
        Self::new(data, self.width, self.height)
    }

    /// Mirror the image around its vertical axis.
    pub fn flip_horizontal(&self) -> GrayImage {
        let w = self.width;
        GrayImage::from_fn(self.width, self.height, |x, y| {
            self.data[(y * w + (w - 1 - x)) as usize]
        })
    }

    /// Spread intensities over the full range using the cumulative histogram.
    pub fn equalize_histogram(&self) -> GrayImage {
        let total = self.data.len();
        if total == 0 {
            return self.clone();
        }

        let mut histogram = [0usize; 256];
        for &p in &self.data {
            histogram[p as usize] += 1;
        }

        let mut cdf = [0usize; 256];
        let mut running = 0;
        for (i, count) in histogram.iter().enumerate() {
            running += count;
            cdf[i] = running;
        }

        let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
        if total == cdf_min {
            // Single intensity: nothing to spread.
            return self.clone();
        }

        let scale = 255.0 / (total - cdf_min) as f32;
        let mut lut = [0u8; 256];
        for (i, entry) in lut.iter_mut().enumerate() {
            let v = cdf[i].saturating_sub(cdf_min) as f32 * scale;
            *entry = v.round().clamp(0.0, 255.0) as u8;
        }

        let data = self.data.iter().map(|&p| lut[p as usize]).collect();
        Self::new(data, self.width, self.height)
    }

    /// Resample to a new size with bilinear interpolation.
    pub fn resize(&self, width: u32, height: u32) -> GrayImage {
        if width == self.width && height == self.height {
            return self.clone();
        }
        if self.is_empty() {
            return GrayImage::from_fn(width, height, |_, _| 0);
        }

        let sx = self.width as f32 / width.max(1) as f32;
        let sy = self.height as f32 / height.max(1) as f32;
        GrayImage::from_fn(width, height, |x, y| {
            // Sample at pixel centers, clamped so edges don't fade to black.
            let fx = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, (self.width - 1) as f32);
            let fy = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, (self.height - 1) as f32);
            sample_bilinear(self, fx, fy).round().clamp(0.0, 255.0) as u8
        })
    }
}

impl ImageAccess for GrayImage {
    fn get_pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Sample a pixel with bilinear interpolation for sub-pixel accuracy.
#[inline]
pub(crate) fn sample_bilinear<I: ImageAccess>(image: &I, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = image.get_pixel(x0, y0) as f32;
    let p10 = image.get_pixel(x1, y0) as f32;
    let p01 = image.get_pixel(x0, y1) as f32;
    let p11 = image.get_pixel(x1, y1) as f32;

    let top = p00 * (1.0 - fx) + p10 * fx;
    let bottom = p01 * (1.0 - fx) + p11 * fx;
    top * (1.0 - fy) + bottom * fy
}

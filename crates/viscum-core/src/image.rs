use serde::{Deserialize, Serialize};

/// Errors raised when wrapping raw grayscale buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid grayscale buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
    #[error("invalid grayscale dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Wrap a row-major buffer, checking that its length matches the dimensions.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions { width, height });
        }
        let expected = width
            .checked_mul(height)
            .ok_or(ImageError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

impl<'a> GrayImageView<'a> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// Minimum and maximum intensity inside `rect` (clipped to the image).
    ///
    /// Returns `None` when the clipped rectangle is empty.
    pub fn min_max_in(&self, rect: PixelRect) -> Option<(u8, u8)> {
        let rect = rect.clip(self.width, self.height);
        if rect.is_empty() {
            return None;
        }
        let mut lo = u8::MAX;
        let mut hi = u8::MIN;
        for y in rect.y0..rect.y1 {
            for &v in &self.row(y)[rect.x0..rect.x1] {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        Some((lo, hi))
    }

    /// Copy out the pixels covered by `roi`.
    ///
    /// Returns `None` if the ROI is empty or does not fit inside the image.
    pub fn crop(&self, roi: Roi) -> Option<GrayImage> {
        if !roi.fits_within(self.width, self.height) {
            return None;
        }
        let mut data = Vec::with_capacity(roi.width * roi.height);
        for y in roi.y..roi.y + roi.height {
            data.extend_from_slice(&self.row(y)[roi.x..roi.x + roi.width]);
        }
        Some(GrayImage {
            width: roi.width,
            height: roi.height,
            data,
        })
    }
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelRect {
    #[inline]
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn clip(self, width: usize, height: usize) -> Self {
        Self {
            x0: self.x0.min(width),
            y0: self.y0.min(height),
            x1: self.x1.min(width),
            y1: self.y1.min(height),
        }
    }
}

/// Region of interest inside a full video frame, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    /// Build from two opposite corners `(x1, y1)` and `(x2, y2)`, `x2 > x1`, `y2 > y1`.
    pub fn from_corners(x1: usize, y1: usize, x2: usize, y2: usize) -> Option<Self> {
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }

    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.width > 0
            && self.height > 0
            && self.x + self.width <= width
            && self.y + self.height <= height
    }
}

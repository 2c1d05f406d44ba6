//! Per-row cumulative sums for O(1) horizontal span queries.
//!
//! A disc is a stack of horizontal spans, so its pixel sum costs one lookup
//! per row instead of one per pixel.

use crate::GrayImageView;

#[derive(Clone, Debug)]
pub struct RowPrefixSums {
    width: usize,
    height: usize,
    // (width + 1) entries per row, first entry of each row is 0
    sums: Vec<u64>,
}

impl RowPrefixSums {
    pub fn new(img: &GrayImageView<'_>) -> Self {
        let stride = img.width + 1;
        let mut sums = vec![0u64; stride * img.height];
        for y in 0..img.height {
            let row = img.row(y);
            let out = &mut sums[y * stride..(y + 1) * stride];
            let mut acc = 0u64;
            for (x, &v) in row.iter().enumerate() {
                acc += v as u64;
                out[x + 1] = acc;
            }
        }
        Self {
            width: img.width,
            height: img.height,
            sums,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum of row `y` over the half-open column range `[x0, x1)`.
    #[inline]
    pub fn row_sum(&self, y: usize, x0: usize, x1: usize) -> u64 {
        debug_assert!(x0 <= x1 && x1 <= self.width && y < self.height);
        let base = y * (self.width + 1);
        self.sums[base + x1] - self.sums[base + x0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrayImage;

    #[test]
    fn row_sums_match_direct_sums() {
        let img = GrayImage::from_fn(7, 4, |x, y| ((x * 37 + y * 11) % 256) as u8);
        let view = img.view();
        let sums = RowPrefixSums::new(&view);
        for y in 0..4 {
            for x0 in 0..7 {
                for x1 in x0..=7 {
                    let direct: u64 = view.row(y)[x0..x1].iter().map(|&v| v as u64).sum();
                    assert_eq!(sums.row_sum(y, x0, x1), direct);
                }
            }
        }
    }
}

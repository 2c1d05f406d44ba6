//! Rasterized discs and their mean intensity.
//!
//! A disc of radius `r` covers every pixel `(dx, dy)` with `dx^2 + dy^2 <= r^2`.
//! It is stored as one horizontal half-width per row so the pixel sum is a
//! handful of prefix-sum lookups.

use viscum_core::RowPrefixSums;

#[derive(Clone, Debug)]
pub(crate) struct DiscSpans {
    pub radius: usize,
    /// `half_widths[dy + r]` = largest `dx` with `dx^2 + dy^2 <= r^2`.
    half_widths: Vec<usize>,
    pub pixel_count: u64,
}

impl DiscSpans {
    pub fn new(radius: usize) -> Self {
        let r2 = radius * radius;
        let mut half_widths = Vec::with_capacity(2 * radius + 1);
        let mut pixel_count = 0u64;
        for row in 0..=2 * radius {
            let dy = row.abs_diff(radius);
            let hw = isqrt(r2 - dy * dy);
            pixel_count += (2 * hw + 1) as u64;
            half_widths.push(hw);
        }
        Self {
            radius,
            half_widths,
            pixel_count,
        }
    }

    /// True if the disc centered at `(cx, cy)` lies entirely inside a
    /// `width x height` frame.
    #[inline]
    pub fn fits(&self, cx: usize, cy: usize, width: usize, height: usize) -> bool {
        cx >= self.radius
            && cy >= self.radius
            && cx + self.radius < width
            && cy + self.radius < height
    }

    /// Pixel sum of the disc centered at `(cx, cy)`. The disc must fit.
    #[inline]
    pub fn sum_at(&self, sums: &RowPrefixSums, cx: usize, cy: usize) -> u64 {
        let top = cy - self.radius;
        self.half_widths
            .iter()
            .enumerate()
            .map(|(row, &hw)| sums.row_sum(top + row, cx - hw, cx + hw + 1))
            .sum()
    }
}

/// Floor of the integer square root.
fn isqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}

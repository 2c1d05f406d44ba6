use std::cmp::Ordering;

use log::trace;
use nalgebra::Point2;
use viscum_core::{GrayImageView, PixelRect, RowPrefixSums};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::disc::DiscSpans;
use super::{BallDetection, DetectionResult, DetectorParams, MissReason};
use crate::error::ParamsError;

/// Darkest-circle ball detector.
///
/// Every center in the search window is tried with every radius in the
/// configured range; the disc with the lowest mean intensity wins. Discs
/// crossing the frame border are skipped rather than clipped.
#[derive(Clone, Debug)]
pub struct BallDetector {
    params: DetectorParams,
    discs: Vec<DiscSpans>,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    x: usize,
    y: usize,
    radius: usize,
    sum: u64,
    count: u64,
}

impl BallDetector {
    pub fn new(params: DetectorParams) -> Result<Self, ParamsError> {
        params.validate()?;
        let discs = (params.radius_min..=params.radius_max)
            .map(DiscSpans::new)
            .collect();
        Ok(Self { params, discs })
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Locate the darkest disc, optionally near `prior_center`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn detect(
        &self,
        frame: &GrayImageView<'_>,
        prior_center: Option<Point2<f64>>,
    ) -> DetectionResult {
        let window = search_window(
            frame.width,
            frame.height,
            prior_center,
            self.params.search_fraction,
        );
        let min_extent = 2 * self.params.radius_max;
        if window.width() < min_extent || window.height() < min_extent {
            return DetectionResult::NotFound(MissReason::WindowTooSmall);
        }

        let Some((lo, hi)) = frame.min_max_in(window) else {
            return DetectionResult::NotFound(MissReason::WindowTooSmall);
        };
        if lo == hi {
            return DetectionResult::NotFound(MissReason::NoContrast);
        }

        let sums = RowPrefixSums::new(frame);
        let Some(best) = self.scan(&sums, window) else {
            return DetectionResult::NotFound(MissReason::NoCandidates);
        };

        let mean = best.sum as f64 / best.count as f64;
        let confidence = ((hi as f64 - mean) / (hi as f64 - lo as f64)).clamp(0.0, 1.0);
        if confidence <= 0.0 {
            return DetectionResult::NotFound(MissReason::NoContrast);
        }
        trace!(
            "best disc r={} at ({}, {}) mean={mean:.2} window=[{lo}, {hi}]",
            best.radius,
            best.x,
            best.y
        );

        DetectionResult::Found(BallDetection {
            center: Point2::new(best.x as f64, best.y as f64),
            diameter: (2 * best.radius) as f64,
            confidence,
            mean_intensity: mean,
        })
    }

    fn scan(&self, sums: &RowPrefixSums, window: PixelRect) -> Option<Candidate> {
        #[cfg(feature = "rayon")]
        let rows = (window.y0..window.y1).into_par_iter();
        #[cfg(not(feature = "rayon"))]
        let rows = window.y0..window.y1;

        rows.filter_map(|y| self.best_in_row(sums, window, y))
            .min_by(rank)
    }

    fn best_in_row(&self, sums: &RowPrefixSums, window: PixelRect, y: usize) -> Option<Candidate> {
        let (width, height) = (sums.width(), sums.height());
        let mut best: Option<Candidate> = None;
        for disc in &self.discs {
            if y < disc.radius || y + disc.radius >= height {
                continue;
            }
            let x_start = window.x0.max(disc.radius);
            let x_end = window.x1.min(width.saturating_sub(disc.radius));
            for x in x_start..x_end {
                debug_assert!(disc.fits(x, y, width, height));
                let cand = Candidate {
                    x,
                    y,
                    radius: disc.radius,
                    sum: disc.sum_at(sums, x, y),
                    count: disc.pixel_count,
                };
                if best.map_or(true, |b| rank(&cand, &b) == Ordering::Less) {
                    best = Some(cand);
                }
            }
        }
        best
    }
}

/// Total order on candidates, best first: darker mean, then larger radius,
/// then smaller `y`, then smaller `x`.
///
/// Means are compared exactly by cross-multiplying the integer sums, so the
/// winner does not depend on evaluation order.
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    let lhs = a.sum as u128 * b.count as u128;
    let rhs = b.sum as u128 * a.count as u128;
    lhs.cmp(&rhs)
        .then_with(|| b.radius.cmp(&a.radius))
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Pixel window searched for candidate centers.
///
/// Without a prior the whole frame is searched. With one, the window spans
/// `prior +/- fraction * frame_size` per axis, clipped to the frame.
pub(crate) fn search_window(
    width: usize,
    height: usize,
    prior: Option<Point2<f64>>,
    fraction: f64,
) -> PixelRect {
    let Some(c) = prior else {
        return PixelRect {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
        };
    };
    let (x0, x1) = axis_span(c.x, fraction * width as f64, width);
    let (y0, y1) = axis_span(c.y, fraction * height as f64, height);
    PixelRect { x0, y0, x1, y1 }
}

fn axis_span(center: f64, half: f64, len: usize) -> (usize, usize) {
    if !center.is_finite() {
        return (0, 0);
    }
    let len_f = len as f64;
    let lo = (center - half).ceil().clamp(0.0, len_f) as usize;
    let hi = ((center + half).floor() + 1.0).clamp(0.0, len_f) as usize;
    (lo, hi.max(lo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use viscum_core::GrayImage;

    fn disc_frame(
        width: usize,
        height: usize,
        background: u8,
        discs: &[(usize, usize, usize, u8)],
    ) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            for &(cx, cy, r, v) in discs {
                let dx = x as i64 - cx as i64;
                let dy = y as i64 - cy as i64;
                if dx * dx + dy * dy <= (r * r) as i64 {
                    return v;
                }
            }
            background
        })
    }

    fn detector(r_min: usize, r_max: usize) -> BallDetector {
        BallDetector::new(DetectorParams::default().with_radius_range(r_min, r_max))
            .expect("valid params")
    }

    #[test]
    fn finds_single_dark_disc() {
        let img = disc_frame(120, 100, 230, &[(47, 58, 12, 20)]);
        let res = detector(6, 16).detect(&img.view(), None);
        let det = res.detection().expect("ball found");
        assert!((det.diameter - 24.0).abs() <= 1.0, "diameter {}", det.diameter);
        assert!(det.confidence > 0.9, "confidence {}", det.confidence);
        assert_eq!(det.center, Point2::new(47.0, 58.0));
    }

    #[test]
    fn uniform_frame_is_not_found() {
        let img = GrayImage::filled(80, 80, 128);
        let res = detector(5, 10).detect(&img.view(), None);
        assert_eq!(res, DetectionResult::NotFound(MissReason::NoContrast));
        assert_eq!(res.confidence(), 0.0);
    }

    #[test]
    fn window_smaller_than_largest_disc_is_not_found() {
        let img = disc_frame(30, 30, 200, &[(15, 15, 5, 10)]);
        let res = detector(4, 16).detect(&img.view(), None);
        assert_eq!(res, DetectionResult::NotFound(MissReason::WindowTooSmall));
    }

    #[test]
    fn prior_restricts_search_to_neighbourhood() {
        // The darker disc sits far from the prior and must be ignored.
        let img = disc_frame(200, 200, 220, &[(40, 40, 8, 60), (160, 160, 8, 5)]);
        let mut params = DetectorParams::default().with_radius_range(6, 8);
        params.search_fraction = 0.2;
        let det = BallDetector::new(params).expect("params");

        let near = det.detect(&img.view(), Some(Point2::new(45.0, 38.0)));
        assert_eq!(
            near.detection().map(|d| d.center),
            Some(Point2::new(40.0, 40.0))
        );

        let global = det.detect(&img.view(), None);
        assert_eq!(
            global.detection().map(|d| d.center),
            Some(Point2::new(160.0, 160.0))
        );
    }

    #[test]
    fn equal_discs_break_ties_towards_smaller_y() {
        let img = disc_frame(100, 100, 210, &[(70, 72, 7, 30), (30, 25, 7, 30)]);
        let det = detector(5, 9).detect(&img.view(), None);
        let found = det.detection().expect("found");
        assert_eq!(found.center, Point2::new(30.0, 25.0));
        assert_eq!(found.diameter, 14.0);
    }

    #[test]
    fn darker_ball_scores_higher_confidence() {
        // A single black pixel pins the window minimum so that the ball's own
        // darkness drives the confidence.
        let mut confidences = Vec::new();
        for ball in [150u8, 100, 50] {
            let mut img = disc_frame(90, 90, 200, &[(45, 45, 8, ball)]);
            img.data[5 * 90 + 80] = 0;
            let res = detector(6, 8).detect(&img.view(), None);
            let found = res.detection().expect("ball found");
            assert_eq!(found.center, Point2::new(45.0, 45.0));
            confidences.push(found.confidence);
        }
        assert!(confidences[0] < confidences[1] && confidences[1] < confidences[2]);
    }

    #[test]
    fn disc_crossing_border_is_not_clipped() {
        // The ball is cut by the left border. A clipped r=8 disc at the true
        // center would be all dark; only whole discs count, and the largest
        // fully dark one that fits has r=5.
        let img = disc_frame(80, 80, 200, &[(3, 40, 8, 10)]);
        let res = detector(4, 8).detect(&img.view(), None);
        let found = res.detection().expect("found");
        assert_eq!(found.diameter, 10.0);
        assert!(found.center.x >= 5.0);
        assert_eq!(found.mean_intensity, 10.0);
    }

    /// Direct pixel sums over every candidate, compared without `rank`.
    /// Returns `(x, y, radius, sum, count)`.
    fn brute_force_best(
        frame: &GrayImage,
        window: PixelRect,
        radii: std::ops::RangeInclusive<usize>,
    ) -> Option<(usize, usize, usize, u64, u64)> {
        let mut best: Option<(usize, usize, usize, u64, u64)> = None;
        for r in radii.rev() {
            for x in (window.x0..window.x1).rev() {
                for y in (window.y0..window.y1).rev() {
                    if x < r || y < r || x + r >= frame.width || y + r >= frame.height {
                        continue;
                    }
                    let (mut sum, mut count) = (0u64, 0u64);
                    for py in y - r..=y + r {
                        for px in x - r..=x + r {
                            let dx = px as i64 - x as i64;
                            let dy = py as i64 - y as i64;
                            if dx * dx + dy * dy <= (r * r) as i64 {
                                sum += frame.data[py * frame.width + px] as u64;
                                count += 1;
                            }
                        }
                    }
                    let better = match best {
                        None => true,
                        Some((bx, by, br, bsum, bcount)) => {
                            let lhs = sum as u128 * bcount as u128;
                            let rhs = bsum as u128 * count as u128;
                            lhs < rhs
                                || (lhs == rhs
                                    && (r > br || (r == br && (y < by || (y == by && x < bx)))))
                        }
                    };
                    if better {
                        best = Some((x, y, r, sum, count));
                    }
                }
            }
        }
        best
    }

    fn scan_result(
        det: &BallDetector,
        frame: &GrayImage,
        window: PixelRect,
    ) -> Option<(usize, usize, usize, u64, u64)> {
        let sums = RowPrefixSums::new(&frame.view());
        det.scan(&sums, window)
            .map(|c| (c.x, c.y, c.radius, c.sum, c.count))
    }

    #[test]
    fn scan_matches_brute_force_on_equally_dark_discs() {
        // Four identical discs on a noisy background. Every sub-disc inside
        // them is equally dark, so the winner is decided purely by tie-breaks.
        let mut seed = 0x2545_f491u32;
        let mut img = disc_frame(
            96,
            72,
            0,
            &[(70, 20, 6, 25), (20, 20, 6, 25), (45, 50, 6, 25), (80, 60, 6, 25)],
        );
        for px in img.data.iter_mut().filter(|v| **v == 0) {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            *px = 120 + (seed >> 24) as u8 % 100;
        }

        let det = detector(3, 7);
        let full = PixelRect {
            x0: 0,
            y0: 0,
            x1: img.width,
            y1: img.height,
        };
        let expected = brute_force_best(&img, full, 3..=7);
        assert_eq!(scan_result(&det, &img, full), expected);
        let (x, y, r, sum, count) = expected.expect("candidate");
        assert_eq!((x, y, r), (20, 20, 6));
        assert_eq!(sum, 25 * count);

        // A window excluding the top discs picks the next one by the same rule.
        let lower = search_window(img.width, img.height, Some(Point2::new(60.0, 55.0)), 0.35);
        let expected = brute_force_best(&img, lower, 3..=7);
        assert_eq!(scan_result(&det, &img, lower), expected);
        assert_eq!(expected.map(|b| (b.0, b.1, b.2)), Some((45, 50, 6)));
    }

    #[test]
    fn scan_matches_brute_force_on_noise() {
        let mut seed = 7u32;
        let img = GrayImage::from_fn(40, 36, |_, _| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 24) as u8
        });
        let det = detector(2, 5);
        let full = PixelRect {
            x0: 0,
            y0: 0,
            x1: img.width,
            y1: img.height,
        };
        assert_eq!(
            scan_result(&det, &img, full),
            brute_force_best(&img, full, 2..=5)
        );
    }

    #[test]
    fn search_window_clips_to_frame() {
        let w = search_window(100, 50, Some(Point2::new(10.0, 45.0)), 0.25);
        assert_eq!(
            w,
            PixelRect {
                x0: 0,
                y0: 33,
                x1: 36,
                y1: 50
            }
        );
        let off = search_window(100, 50, Some(Point2::new(-500.0, 20.0)), 0.25);
        assert!(off.is_empty());
    }

    #[test]
    fn rejects_inverted_radius_range() {
        let params = DetectorParams::default().with_radius_range(10, 4);
        assert!(matches!(
            BallDetector::new(params),
            Err(ParamsError::RadiusRange { min: 10, max: 4 })
        ));
    }
}

use log::{debug, info};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{central_gradient, polyfit, polyval, trailing_moving_average};
use crate::error::{EstimateError, EstimateStage, ParamsError};
use crate::trajectory::TrajectorySequence;

/// Tuning of the smoothing / differentiation / fit chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    /// Lower bound on the moving-average window.
    pub min_window: usize,
    /// Upper bound on the moving-average window.
    pub max_window: usize,
    /// Window is `round(n / window_divisor)` before clamping.
    pub window_divisor: usize,
    /// Maximum number of leading samples discarded as acceleration phase.
    pub skip_cap: usize,
    /// Samples always kept after the skip (when available).
    pub skip_reserve: usize,
    pub poly_degree: usize,
    /// Minimum velocity points before the polynomial fit is used.
    pub min_fit_points: usize,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            min_window: 3,
            max_window: 20,
            window_divisor: 3,
            skip_cap: 24,
            skip_reserve: 5,
            poly_degree: 3,
            min_fit_points: 4,
        }
    }
}

impl EstimatorParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.min_window == 0 || self.min_window > self.max_window {
            return Err(ParamsError::WindowBounds {
                min: self.min_window,
                max: self.max_window,
            });
        }
        if self.window_divisor == 0 {
            return Err(ParamsError::WindowDivisor);
        }
        if self.min_fit_points <= self.poly_degree {
            return Err(ParamsError::FitPoints {
                degree: self.poly_degree,
                min_points: self.min_fit_points,
            });
        }
        Ok(())
    }

    /// `clamp(round(n / divisor), min_window, max_window)`.
    pub fn window_for(&self, n: usize) -> usize {
        let raw = (n as f64 / self.window_divisor.max(1) as f64).round() as usize;
        raw.clamp(self.min_window, self.max_window.max(self.min_window))
    }

    /// `clamp(n - skip_reserve, 0, skip_cap)`.
    pub fn skip_for(&self, n: usize) -> usize {
        n.saturating_sub(self.skip_reserve).min(self.skip_cap)
    }
}

/// Intermediate series of one estimate, for diagnostics and plotting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VelocityProfile {
    /// Seconds since the first sample.
    pub times: Vec<f64>,
    /// Raw fall-axis positions.
    pub positions: Vec<f64>,
    pub smoothed: Vec<f64>,
    pub window: usize,
    /// Leading samples excluded from differentiation.
    pub skip: usize,
    /// Velocity of the smoothed series at `times[skip..]`.
    pub velocity: Vec<f64>,
    /// Polynomial fit evaluated at `times[skip..]`, when a fit was made.
    pub fitted: Option<Vec<f64>>,
    /// Fit coefficients in ascending powers of `t`.
    pub coefficients: Option<Vec<f64>>,
    /// Terminal velocity with its sign (negative when moving towards smaller `y`).
    pub signed_terminal_velocity: f64,
}

/// Result handed to the physics stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VelocityEstimate {
    /// Terminal fall speed, pixels per second.
    pub terminal_velocity_px_s: f64,
    /// Mean diameter over measured samples.
    pub mean_diameter_px: f64,
    /// Mean confidence over all samples.
    pub mean_confidence: f64,
    pub profile: VelocityProfile,
}

/// Terminal velocity of the fall-axis (`y`) motion in `sequence`.
///
/// Steps: trailing moving average, drop the acceleration phase, central
/// differences, then a least-squares polynomial evaluated at the last time
/// when enough points remain (the last raw velocity otherwise).
///
/// Times are taken from the samples; `fps` is only checked for validity.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(sequence, params), fields(samples = sequence.len()))
)]
pub fn estimate(
    sequence: &TrajectorySequence,
    fps: f64,
    params: &EstimatorParams,
) -> Result<VelocityEstimate, EstimateError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(EstimateError::InvalidFrameRate(fps));
    }
    params.validate()?;

    let n = sequence.len();
    if n < params.min_window {
        return Err(EstimateError::InsufficientData {
            stage: EstimateStage::Smoothing,
            required: params.min_window,
            available: n,
        });
    }

    let samples = sequence.samples();
    let t0 = samples[0].time;
    let times: Vec<f64> = samples.iter().map(|s| s.time - t0).collect();
    let positions: Vec<f64> = samples.iter().map(|s| s.y).collect();

    let window = params.window_for(n);
    let smoothed = trailing_moving_average(&positions, window);

    let skip = params.skip_for(n);
    let remaining = n - skip.min(n);
    if remaining < 2 {
        return Err(EstimateError::InsufficientData {
            stage: EstimateStage::Differentiation,
            required: 2,
            available: remaining,
        });
    }
    let t_tail = &times[skip..];
    let velocity = central_gradient(t_tail, &smoothed[skip..]);
    debug!("n={n} window={window} skip={skip} velocity points={}", velocity.len());

    let (signed, fitted, coefficients) = if velocity.len() >= params.min_fit_points {
        let coeffs = polyfit(t_tail, &velocity, params.poly_degree)?;
        let fitted: Vec<f64> = t_tail.iter().map(|&t| polyval(&coeffs, t)).collect();
        let last = fitted[fitted.len() - 1];
        (last, Some(fitted), Some(coeffs))
    } else {
        (velocity[velocity.len() - 1], None, None)
    };

    let mean_diameter_px = sequence
        .mean_measured_diameter()
        .ok_or(EstimateError::InsufficientData {
            stage: EstimateStage::Smoothing,
            required: 1,
            available: 0,
        })?;
    let mean_confidence = sequence.mean_confidence().unwrap_or(0.0);

    info!(
        "terminal velocity {:.2} px/s (mean diameter {mean_diameter_px:.2} px, mean confidence {mean_confidence:.2})",
        signed.abs()
    );
    Ok(VelocityEstimate {
        terminal_velocity_px_s: signed.abs(),
        mean_diameter_px,
        mean_confidence,
        profile: VelocityProfile {
            times,
            positions,
            smoothed,
            window,
            skip,
            velocity,
            fitted,
            coefficients,
            signed_terminal_velocity: signed,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{SampleSource, TrajectorySample};
    use approx::assert_relative_eq;

    fn linear_sequence(n: usize, fps: f64, y0: f64, px_per_frame: f64) -> TrajectorySequence {
        let samples = (0..n)
            .map(|i| TrajectorySample {
                frame_index: i,
                time: i as f64 / fps,
                x: 50.0,
                y: y0 + px_per_frame * i as f64,
                diameter: 20.0,
                confidence: 0.8,
                source: SampleSource::Measured,
            })
            .collect();
        TrajectorySequence::from_samples(samples).expect("ordered")
    }

    #[test]
    fn constant_fall_rate_is_recovered() {
        let seq = linear_sequence(40, 25.0, 10.0, 4.0);
        let est = estimate(&seq, 25.0, &EstimatorParams::default()).expect("estimate");
        assert_relative_eq!(est.terminal_velocity_px_s, 100.0, epsilon = 1e-6);
        assert_relative_eq!(est.profile.signed_terminal_velocity, 100.0, epsilon = 1e-6);
        assert_eq!(est.profile.window, 13);
        assert_eq!(est.profile.skip, 24);
        assert_eq!(est.profile.velocity.len(), 16);
        assert!(est.profile.fitted.is_some());
        assert_eq!(est.mean_diameter_px, 20.0);
        assert_relative_eq!(est.mean_confidence, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn upward_motion_reports_speed() {
        let seq = linear_sequence(30, 10.0, 500.0, -3.0);
        let est = estimate(&seq, 10.0, &EstimatorParams::default()).expect("estimate");
        assert_relative_eq!(est.terminal_velocity_px_s, 30.0, epsilon = 1e-6);
        assert!(est.profile.signed_terminal_velocity < 0.0);
    }

    #[test]
    fn short_series_uses_last_raw_velocity() {
        // n = 3: window 3, skip 0, three velocity points, no fit.
        let seq = linear_sequence(3, 1.0, 0.0, 10.0);
        let est = estimate(&seq, 1.0, &EstimatorParams::default()).expect("estimate");
        assert_eq!(est.profile.smoothed, vec![0.0, 5.0, 10.0]);
        assert_eq!(est.profile.velocity, vec![5.0, 5.0, 5.0]);
        assert!(est.profile.fitted.is_none());
        assert_eq!(est.terminal_velocity_px_s, 5.0);
    }

    #[test]
    fn two_samples_cannot_be_smoothed() {
        let seq = linear_sequence(2, 30.0, 0.0, 1.0);
        assert_eq!(
            estimate(&seq, 30.0, &EstimatorParams::default()),
            Err(EstimateError::InsufficientData {
                stage: EstimateStage::Smoothing,
                required: 3,
                available: 2
            })
        );
    }

    #[test]
    fn nothing_left_after_skip_cannot_be_differentiated() {
        let params = EstimatorParams {
            skip_reserve: 0,
            skip_cap: 100,
            ..EstimatorParams::default()
        };
        let seq = linear_sequence(3, 30.0, 0.0, 1.0);
        let err = estimate(&seq, 30.0, &params).unwrap_err();
        assert_eq!(
            err,
            EstimateError::InsufficientData {
                stage: EstimateStage::Differentiation,
                required: 2,
                available: 0
            }
        );
        assert!(err.to_string().contains("widen the frame range"));
    }

    #[test]
    fn times_come_from_samples() {
        // Frame 2 is missing from the sequence; its slot still takes time.
        let samples = [0usize, 1, 3, 4, 5]
            .into_iter()
            .map(|k| TrajectorySample {
                frame_index: k + 7,
                time: 0.5 + k as f64 / 10.0,
                x: 0.0,
                y: 2.0 * k as f64,
                diameter: 12.0,
                confidence: 1.0,
                source: SampleSource::Measured,
            })
            .collect();
        let seq = TrajectorySequence::from_samples(samples).expect("ordered");
        let est = estimate(&seq, 10.0, &EstimatorParams::default()).expect("estimate");
        assert_eq!(est.profile.times.len(), 5);
        assert_relative_eq!(est.profile.times[0], 0.0);
        assert_relative_eq!(est.profile.times[2], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn velocity_uses_recorded_times_not_the_fps_argument() {
        // Samples were recorded at 25 fps; a different fps must not rescale.
        let seq = linear_sequence(40, 25.0, 10.0, 4.0);
        let est = estimate(&seq, 100.0, &EstimatorParams::default()).expect("estimate");
        assert_relative_eq!(est.terminal_velocity_px_s, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let seq = linear_sequence(10, 30.0, 0.0, 1.0);
        let params = EstimatorParams {
            min_fit_points: 3,
            ..EstimatorParams::default()
        };
        assert!(matches!(
            estimate(&seq, 30.0, &params),
            Err(EstimateError::Params(ParamsError::FitPoints { .. }))
        ));
        assert!(matches!(
            estimate(&seq, 0.0, &EstimatorParams::default()),
            Err(EstimateError::InvalidFrameRate(_))
        ));
    }
}

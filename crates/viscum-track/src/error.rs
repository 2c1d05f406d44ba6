//! Error taxonomy for tracking and estimation.
//!
//! Per-frame detection misses are not errors: they are absorbed by the
//! trajectory builder. Everything here aborts the current run.

use serde::{Deserialize, Serialize};

/// Invalid tuning parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("radius range must satisfy 0 < r_min <= r_max (got [{min}, {max}])")]
    RadiusRange { min: usize, max: usize },
    #[error("search fraction must lie in (0, 1] (got {0})")]
    SearchFraction(f64),
    #[error("noise term `{name}` must be finite and non-negative (got {value})")]
    Noise { name: &'static str, value: f64 },
    #[error("moving-average bounds must satisfy 1 <= min <= max (got [{min}, {max}])")]
    WindowBounds { min: usize, max: usize },
    #[error("moving-average window divisor must be positive")]
    WindowDivisor,
    #[error("polynomial fit of degree {degree} needs more than {degree} points (got {min_points})")]
    FitPoints { degree: usize, min_points: usize },
}

/// Misuse or numerical failure of the motion filter.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    #[error("motion filter used before initialize()")]
    NotInitialized,
    #[error("motion filter initialized twice")]
    AlreadyInitialized,
    #[error("innovation covariance H P H^T + R is singular; check process/measurement noise")]
    SingularInnovation,
}

/// Failures of the per-frame tracking loop.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error("frame rate must be finite and positive (got {0})")]
    InvalidFrameRate(f64),
    #[error("invalid frame range [{start}, {end}) for a source with {frame_count} frames")]
    InvalidRange {
        start: usize,
        end: usize,
        frame_count: usize,
    },
    #[error("frame {index} arrived after frame {last}; frames must be strictly increasing")]
    FrameOutOfOrder { index: usize, last: usize },
    #[error("predicted sample at frame {index} precedes any measured sample")]
    PredictedBeforeMeasured { index: usize },
}

/// Stage of the velocity pipeline that ran out of data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStage {
    Smoothing,
    Differentiation,
}

impl std::fmt::Display for EstimateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimateStage::Smoothing => f.write_str("smoothing"),
            EstimateStage::Differentiation => f.write_str("differentiation"),
        }
    }
}

/// Failures of terminal-velocity estimation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error(
        "insufficient trajectory data for {stage}: need {required} samples, have {available}; widen the frame range"
    )]
    InsufficientData {
        stage: EstimateStage,
        required: usize,
        available: usize,
    },
    #[error("frame rate must be finite and positive (got {0})")]
    InvalidFrameRate(f64),
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error("velocity polynomial fit failed: {0}")]
    FitFailed(String),
}

/// Any failure of a full track-then-estimate run.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

impl PipelineError {
    /// True when the run failed only because too few samples were collected.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            PipelineError::Estimate(EstimateError::InsufficientData { .. })
        )
    }
}

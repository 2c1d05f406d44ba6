use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A located ball.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallDetection {
    /// Disc center in frame pixels.
    pub center: Point2<f64>,
    pub diameter: f64,
    /// Darkness of the disc relative to its search window, in `[0, 1]`.
    pub confidence: f64,
    /// Mean gray level inside the winning disc.
    pub mean_intensity: f64,
}

/// Why a frame produced no detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// The search window is narrower or shorter than the largest disc.
    WindowTooSmall,
    /// Every candidate disc extended past the frame border.
    NoCandidates,
    /// The window is flat, or the best disc is as bright as the window maximum.
    NoContrast,
}

/// Outcome of one detector call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DetectionResult {
    Found(BallDetection),
    NotFound(MissReason),
}

impl DetectionResult {
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, DetectionResult::Found(_))
    }

    /// Detection confidence; misses report 0.
    pub fn confidence(&self) -> f64 {
        match self {
            DetectionResult::Found(det) => det.confidence,
            DetectionResult::NotFound(_) => 0.0,
        }
    }

    pub fn detection(&self) -> Option<&BallDetection> {
        match self {
            DetectionResult::Found(det) => Some(det),
            DetectionResult::NotFound(_) => None,
        }
    }
}

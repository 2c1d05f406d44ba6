//! Per-frame ball localization.
//!
//! The detector scores dark discs over a candidate grid of centers and radii
//! and reports the darkest one together with a contrast-based confidence.

mod detect;
mod disc;
mod params;
mod result;

pub use detect::BallDetector;
pub use params::DetectorParams;
pub use result::{BallDetection, DetectionResult, MissReason};

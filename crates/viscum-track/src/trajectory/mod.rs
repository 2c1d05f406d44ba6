//! Per-frame fusion of detections and motion-model predictions.

mod builder;
mod sample;
mod source;

pub use builder::{TrackerParams, TrajectoryBuilder, TrajectoryRun, PREDICTED_CONFIDENCE};
pub use sample::{SampleSource, TrajectorySample, TrajectorySequence};
pub use source::{CancelToken, FrameRange, FrameSource, FrameStack, MissingFrame};

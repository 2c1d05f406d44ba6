//! Falling-ball tracking and terminal-velocity estimation.
//!
//! The pipeline has four stages:
//! - [`BallDetector`]: darkest-circle localization with a contrast confidence,
//! - [`MotionFilter`]: constant-velocity Kalman filter over `[x, y, vx, vy]`,
//! - [`TrajectoryBuilder`]: per-frame fusion into a [`TrajectorySequence`],
//! - [`estimate`]: smoothing, acceleration-phase removal, differentiation and
//!   a polynomial fit, giving the terminal velocity in pixels per second.
//!
//! [`track_and_estimate`] wires them together over a [`FrameSource`].
//!
//! ```no_run
//! use viscum_core::GrayImage;
//! use viscum_track::{track_and_estimate, CancelToken, FrameStack, TrackConfig};
//!
//! let frames: Vec<GrayImage> = Vec::new(); // ROI-cropped frames
//! let source = FrameStack::new(100.0, frames).unwrap();
//! let outcome = track_and_estimate(&source, &TrackConfig::default(), &CancelToken::new());
//! match outcome {
//!     Ok(out) => println!("v = {:.1} px/s", out.estimate.terminal_velocity_px_s),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

mod detector;
mod error;
mod filter;
mod io;
mod pipeline;
mod trajectory;
mod velocity;

pub use detector::{BallDetection, BallDetector, DetectionResult, DetectorParams, MissReason};
pub use error::{
    EstimateError, EstimateStage, FilterError, ParamsError, PipelineError, TrackError,
};
pub use filter::{FilterState, KalmanParams, MotionFilter};
pub use io::{TrackConfig, TrackIoError, TrackReport};
pub use pipeline::{track, track_and_estimate, TrackingOutcome};
pub use trajectory::{
    CancelToken, FrameRange, FrameSource, FrameStack, MissingFrame, SampleSource, TrackerParams,
    TrajectoryBuilder, TrajectoryRun, TrajectorySample, TrajectorySequence,
    PREDICTED_CONFIDENCE,
};
pub use velocity::{
    acceleration_skip, central_gradient, estimate, moving_average_window, polyfit, polyval,
    trailing_moving_average, EstimatorParams, VelocityEstimate, VelocityProfile,
};

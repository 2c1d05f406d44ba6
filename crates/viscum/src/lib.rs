//! High-level facade crate for the `viscum-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core image types and the tracking/estimation crate,
//! - (feature `image`) an image-sequence [`FrameSource`](viscum_track::FrameSource)
//!   and conversions from `image::GrayImage` and raw buffers.
//!
//! ## Quickstart
//!
//! ```no_run
//! use viscum::frames::ImageSequenceSource;
//! use viscum::{track_and_estimate, CancelToken, Roi, TrackConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let roi = Roi { x: 120, y: 0, width: 200, height: 900 };
//! let source = ImageSequenceSource::open("frames/", 250.0, Some(roi))?;
//! let out = track_and_estimate(&source, &TrackConfig::default(), &CancelToken::new())?;
//! println!("terminal velocity: {:.1} px/s", out.estimate.terminal_velocity_px_s);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `viscum::core`: grayscale frames, ROI, prefix sums, logger setup.
//! - `viscum::track`: detector, Kalman filter, trajectory builder, velocity estimator.
//! - `viscum::frames` (feature `image`): decoding frames from disk.

pub use viscum_core as core;
pub use viscum_track as track;

pub use viscum_core::{GrayImage, GrayImageView, Roi};
pub use viscum_track::{
    track_and_estimate, CancelToken, FrameRange, FrameSource, PipelineError, TrackConfig,
    TrackReport, TrackingOutcome, TrajectorySequence, VelocityEstimate,
};

#[cfg(feature = "image")]
pub mod frames;

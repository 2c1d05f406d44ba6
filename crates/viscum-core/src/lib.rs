//! Core types for falling-ball tracking.
//!
//! This crate is intentionally small: grayscale frame buffers, ROI cropping,
//! row prefix sums and logger installation. It knows nothing about balls,
//! filters or velocities.

mod image;
mod logger;
mod prefix;

pub use image::{GrayImage, GrayImageView, ImageError, PixelRect, Roi};
pub use prefix::RowPrefixSums;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV_VAR};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use viscum_core::{GrayImage, ImageError};

use crate::error::TrackError;

/// Provider of ROI-cropped grayscale frames.
///
/// Frames are requested in increasing index order, one at a time. A failed
/// read is reported per frame and does not end the run.
pub trait FrameSource {
    type Error: std::error::Error;

    /// Frames per second of the underlying capture.
    fn fps(&self) -> f64;

    fn frame_count(&self) -> usize;

    fn frame(&self, index: usize) -> Result<GrayImage, Self::Error>;
}

impl<S: FrameSource + ?Sized> FrameSource for &S {
    type Error = S::Error;

    fn fps(&self) -> f64 {
        (**self).fps()
    }

    fn frame_count(&self) -> usize {
        (**self).frame_count()
    }

    fn frame(&self, index: usize) -> Result<GrayImage, Self::Error> {
        (**self).frame(index)
    }
}

/// Frame index outside a [`FrameStack`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("frame {index} out of range (stack holds {len} frames)")]
pub struct MissingFrame {
    pub index: usize,
    pub len: usize,
}

/// In-memory frame sequence of uniform size.
#[derive(Clone, Debug)]
pub struct FrameStack {
    fps: f64,
    frames: Vec<GrayImage>,
}

impl FrameStack {
    /// Wrap `frames`; all of them must share the first frame's dimensions.
    pub fn new(fps: f64, frames: Vec<GrayImage>) -> Result<Self, ImageError> {
        if let Some(first) = frames.first() {
            let (w, h) = (first.width, first.height);
            if let Some(bad) = frames.iter().find(|f| f.width != w || f.height != h) {
                return Err(ImageError::InvalidDimensions {
                    width: bad.width,
                    height: bad.height,
                });
            }
        }
        Ok(Self { fps, frames })
    }

    pub fn frames(&self) -> &[GrayImage] {
        &self.frames
    }
}

impl FrameSource for FrameStack {
    type Error = MissingFrame;

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Result<GrayImage, MissingFrame> {
        self.frames.get(index).cloned().ok_or(MissingFrame {
            index,
            len: self.frames.len(),
        })
    }
}

/// Half-open frame index range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: usize,
    pub end: usize,
}

impl FrameRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The whole source.
    pub fn full(frame_count: usize) -> Self {
        Self::new(0, frame_count)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Require `start < end <= frame_count`.
    pub fn validate(&self, frame_count: usize) -> Result<(), TrackError> {
        if self.start < self.end && self.end <= frame_count {
            Ok(())
        } else {
            Err(TrackError::InvalidRange {
                start: self.start,
                end: self.end,
                frame_count,
            })
        }
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Cooperative cancellation flag, checked once per frame.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

//! JSON configuration and report helpers for tracking runs.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{PipelineError, TrackError};
use crate::trajectory::{FrameRange, TrackerParams, TrajectoryRun, TrajectorySequence};
use crate::velocity::{EstimatorParams, VelocityEstimate, VelocityProfile};

#[derive(thiserror::Error, Debug)]
pub enum TrackIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Everything the core needs besides the frames themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// First frame to track.
    #[serde(default)]
    pub start_frame: usize,
    /// One past the last frame; `None` tracks to the end of the source.
    #[serde(default)]
    pub end_frame: Option<usize>,
    #[serde(default)]
    pub tracker: TrackerParams,
    #[serde(default)]
    pub estimator: EstimatorParams,
}

impl TrackConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, TrackIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TrackIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn frame_range(&self, frame_count: usize) -> FrameRange {
        FrameRange::new(self.start_frame, self.end_frame.unwrap_or(frame_count))
    }

    /// Check the config against a source with `frame_count` frames at `fps`
    /// and return the frame range to track.
    pub fn validate(&self, frame_count: usize, fps: f64) -> Result<FrameRange, TrackError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(TrackError::InvalidFrameRate(fps));
        }
        let range = self.frame_range(frame_count);
        range.validate(frame_count)?;
        self.tracker.validate()?;
        self.estimator.validate()?;
        Ok(range)
    }
}

/// Serializable summary of one run; populated incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackReport {
    pub config: TrackConfig,
    #[serde(default)]
    pub source: Option<String>,
    pub fps: f64,
    pub frames_seen: usize,
    pub frames_dropped: usize,
    pub frames_unreadable: usize,
    pub cancelled: bool,
    pub samples: TrajectorySequence,
    #[serde(default)]
    pub terminal_velocity_px_s: Option<f64>,
    #[serde(default)]
    pub mean_diameter_px: Option<f64>,
    #[serde(default)]
    pub mean_confidence: Option<f64>,
    #[serde(default)]
    pub profile: Option<VelocityProfile>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TrackReport {
    /// Build a base report from the config and frame rate; no samples yet.
    pub fn new(config: &TrackConfig, fps: f64) -> Self {
        Self {
            config: config.clone(),
            source: None,
            fps,
            frames_seen: 0,
            frames_dropped: 0,
            frames_unreadable: 0,
            cancelled: false,
            samples: TrajectorySequence::new(),
            terminal_velocity_px_s: None,
            mean_diameter_px: None,
            mean_confidence: None,
            profile: None,
            error: None,
        }
    }

    /// Copy the trajectory and frame counters of a finished tracking loop.
    pub fn set_run(&mut self, run: &TrajectoryRun) {
        self.frames_seen = run.frames_seen;
        self.frames_dropped = run.frames_dropped;
        self.frames_unreadable = run.frames_unreadable;
        self.cancelled = run.cancelled;
        self.samples = run.sequence.clone();
        self.mean_diameter_px = run.mean_diameter_px;
        self.mean_confidence = run.sequence.mean_confidence();
    }

    /// Populate the scalar results from a successful estimate.
    pub fn set_estimate(&mut self, est: VelocityEstimate) {
        self.terminal_velocity_px_s = Some(est.terminal_velocity_px_s);
        self.mean_diameter_px = Some(est.mean_diameter_px);
        self.mean_confidence = Some(est.mean_confidence);
        self.profile = Some(est.profile);
        self.error = None;
    }

    /// Record a failure. Every numeric result is cleared; the trajectory and
    /// frame counters stay for diagnostics.
    pub fn set_error(&mut self, err: &PipelineError) {
        self.terminal_velocity_px_s = None;
        self.mean_diameter_px = None;
        self.mean_confidence = None;
        self.profile = None;
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, TrackIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TrackIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

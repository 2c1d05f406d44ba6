use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use viscum_core::GrayImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{
    CancelToken, FrameRange, FrameSource, SampleSource, TrajectorySample, TrajectorySequence,
};
use crate::detector::{BallDetector, DetectionResult, DetectorParams};
use crate::error::{FilterError, TrackError};
use crate::filter::{KalmanParams, MotionFilter};

/// Confidence assigned to positions synthesized by the motion model.
pub const PREDICTED_CONFIDENCE: f64 = 0.3;

/// Parameters of the per-frame tracking loop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    pub detector: DetectorParams,
    pub kalman: KalmanParams,
}

impl TrackerParams {
    pub fn validate(&self) -> Result<(), TrackError> {
        self.detector.validate()?;
        self.kalman.validate()?;
        Ok(())
    }
}

/// Tracking state. The filter exists only once a ball has been measured.
#[derive(Clone, Debug)]
enum TrackerState {
    Uninitialized,
    Tracking(Track),
}

#[derive(Clone, Debug)]
struct Track {
    filter: MotionFilter,
    last_diameter: f64,
}

/// A fused position before it is stamped with frame index and time.
struct Fix {
    x: f64,
    y: f64,
    diameter: f64,
    confidence: f64,
    source: SampleSource,
}

impl Track {
    /// Predict, search near the prediction, and fuse the outcome.
    fn advance(
        &mut self,
        detector: &BallDetector,
        frame: &GrayImageView<'_>,
    ) -> Result<Fix, FilterError> {
        let predicted = self.filter.predict()?;
        match detector.detect(frame, Some(predicted)) {
            DetectionResult::Found(det) => {
                self.filter.update(det.center.x, det.center.y)?;
                self.last_diameter = det.diameter;
                Ok(Fix {
                    x: det.center.x,
                    y: det.center.y,
                    diameter: det.diameter,
                    confidence: det.confidence,
                    source: SampleSource::Measured,
                })
            }
            DetectionResult::NotFound(reason) => {
                warn!(
                    "ball not found ({reason:?}); using prediction ({:.1}, {:.1})",
                    predicted.x, predicted.y
                );
                Ok(Fix {
                    x: predicted.x,
                    y: predicted.y,
                    diameter: self.last_diameter,
                    confidence: PREDICTED_CONFIDENCE,
                    source: SampleSource::Predicted,
                })
            }
        }
    }
}

/// Outcome of a tracking loop.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryRun {
    pub sequence: TrajectorySequence,
    /// Mean diameter over measured samples; `None` if nothing was measured.
    pub mean_diameter_px: Option<f64>,
    /// Frames handed to the state machine.
    pub frames_seen: usize,
    /// Frames seen before the first detection; they produce no sample.
    pub frames_dropped: usize,
    /// Frames the source failed to deliver.
    pub frames_unreadable: usize,
    pub cancelled: bool,
}

/// Drives the per-frame state machine and accumulates the trajectory.
///
/// | state         | detection | action                          |
/// |---------------|-----------|---------------------------------|
/// | uninitialized | found     | initialize filter, `Measured`   |
/// | uninitialized | missing   | drop frame                      |
/// | tracking      | found     | predict + update, `Measured`    |
/// | tracking      | missing   | predict, `Predicted` at 0.3     |
///
/// In the tracking state the prediction also seeds the detector's search
/// window for the same frame.
#[derive(Clone, Debug)]
pub struct TrajectoryBuilder {
    detector: BallDetector,
    kalman: KalmanParams,
    fps: f64,
    state: TrackerState,
    sequence: TrajectorySequence,
    first_frame: Option<usize>,
    last_frame: Option<usize>,
    frames_seen: usize,
    frames_dropped: usize,
    frames_unreadable: usize,
    cancelled: bool,
}

impl TrajectoryBuilder {
    pub fn new(params: &TrackerParams, fps: f64) -> Result<Self, TrackError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(TrackError::InvalidFrameRate(fps));
        }
        params.validate()?;
        Ok(Self {
            detector: BallDetector::new(params.detector.clone())?,
            kalman: params.kalman.clone(),
            fps,
            state: TrackerState::Uninitialized,
            sequence: TrajectorySequence::new(),
            first_frame: None,
            last_frame: None,
            frames_seen: 0,
            frames_dropped: 0,
            frames_unreadable: 0,
            cancelled: false,
        })
    }

    #[inline]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    #[inline]
    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackerState::Tracking(_))
    }

    #[inline]
    pub fn sequence(&self) -> &TrajectorySequence {
        &self.sequence
    }

    /// Current filter estimate, if tracking.
    pub fn filter(&self) -> Option<&MotionFilter> {
        match &self.state {
            TrackerState::Tracking(track) => Some(&track.filter),
            TrackerState::Uninitialized => None,
        }
    }

    /// Process one frame. Returns the kind of sample recorded, or `None` if
    /// the frame was dropped.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame))
    )]
    pub fn step(
        &mut self,
        frame_index: usize,
        frame: &GrayImageView<'_>,
    ) -> Result<Option<SampleSource>, TrackError> {
        if let Some(last) = self.last_frame {
            if frame_index <= last {
                return Err(TrackError::FrameOutOfOrder {
                    index: frame_index,
                    last,
                });
            }
        }
        self.last_frame = Some(frame_index);
        self.frames_seen += 1;

        let fix = match &mut self.state {
            TrackerState::Tracking(track) => Some(track.advance(&self.detector, frame)?),
            TrackerState::Uninitialized => None,
        };
        let fix = match fix {
            Some(fix) => fix,
            None => match self.acquire(frame)? {
                Some(fix) => {
                    info!(
                        "ball acquired at frame {frame_index}: ({:.1}, {:.1}) d={:.1}",
                        fix.x, fix.y, fix.diameter
                    );
                    fix
                }
                None => {
                    self.frames_dropped += 1;
                    debug!("frame {frame_index}: no ball yet, frame dropped");
                    return Ok(None);
                }
            },
        };

        let first = *self.first_frame.get_or_insert(frame_index);
        let sample = TrajectorySample {
            frame_index,
            time: (frame_index - first) as f64 / self.fps,
            x: fix.x,
            y: fix.y,
            diameter: fix.diameter,
            confidence: fix.confidence,
            source: fix.source,
        };
        debug!(
            "frame {frame_index}: {:?} ({:.1}, {:.1}) conf={:.2}",
            sample.source, sample.x, sample.y, sample.confidence
        );
        self.sequence.push(sample)?;
        Ok(Some(fix.source))
    }

    /// Full-frame search while no ball has been seen.
    fn acquire(&mut self, frame: &GrayImageView<'_>) -> Result<Option<Fix>, TrackError> {
        let DetectionResult::Found(det) = self.detector.detect(frame, None) else {
            return Ok(None);
        };
        let mut filter = MotionFilter::new(&self.kalman, 1.0 / self.fps);
        filter.initialize(det.center.x, det.center.y)?;
        self.state = TrackerState::Tracking(Track {
            filter,
            last_diameter: det.diameter,
        });
        Ok(Some(Fix {
            x: det.center.x,
            y: det.center.y,
            diameter: det.diameter,
            confidence: det.confidence,
            source: SampleSource::Measured,
        }))
    }

    /// Feed `range` from `source` through [`step`](Self::step).
    ///
    /// Unreadable frames are logged and skipped. The cancel token is checked
    /// before each frame; on cancellation the partial trajectory is kept.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, source, cancel))
    )]
    pub fn run<S: FrameSource>(
        &mut self,
        source: &S,
        range: FrameRange,
        cancel: &CancelToken,
    ) -> Result<(), TrackError> {
        range.validate(source.frame_count())?;
        info!(
            "tracking frames {}..{} ({:.2} s at {} fps)",
            range.start,
            range.end,
            range.len() as f64 / self.fps,
            self.fps
        );
        for k in range.indices() {
            if cancel.is_cancelled() {
                info!("tracking cancelled before frame {k}");
                self.cancelled = true;
                break;
            }
            match source.frame(k) {
                Ok(img) => {
                    self.step(k, &img.view())?;
                }
                Err(err) => {
                    warn!("could not read frame {k}: {err}");
                    self.frames_unreadable += 1;
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> TrajectoryRun {
        let mean_diameter_px = self.sequence.mean_measured_diameter();
        info!(
            "trajectory: {} samples ({} predicted), {} dropped, {} unreadable",
            self.sequence.len(),
            self.sequence.count(SampleSource::Predicted),
            self.frames_dropped,
            self.frames_unreadable
        );
        TrajectoryRun {
            sequence: self.sequence,
            mean_diameter_px,
            frames_seen: self.frames_seen,
            frames_dropped: self.frames_dropped,
            frames_unreadable: self.frames_unreadable,
            cancelled: self.cancelled,
        }
    }
}

//! One-call tracking followed by terminal-velocity estimation.

use log::info;

use crate::error::{PipelineError, TrackError};
use crate::io::TrackConfig;
use crate::trajectory::{CancelToken, FrameSource, TrajectoryBuilder, TrajectoryRun};
use crate::velocity::{estimate, VelocityEstimate};

/// Trajectory plus the velocity derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingOutcome {
    pub run: TrajectoryRun,
    pub estimate: VelocityEstimate,
}

/// Validate `config` against `source` and run the tracking loop only.
pub fn track<S: FrameSource>(
    source: &S,
    config: &TrackConfig,
    cancel: &CancelToken,
) -> Result<TrajectoryRun, TrackError> {
    let fps = source.fps();
    let range = config.validate(source.frame_count(), fps)?;
    let mut builder = TrajectoryBuilder::new(&config.tracker, fps)?;
    builder.run(source, range, cancel)?;
    Ok(builder.finish())
}

/// Track `source` over the configured range and estimate terminal velocity.
///
/// Each call owns its own filter; nothing is shared between runs.
pub fn track_and_estimate<S: FrameSource>(
    source: &S,
    config: &TrackConfig,
    cancel: &CancelToken,
) -> Result<TrackingOutcome, PipelineError> {
    let run = track(source, config, cancel)?;
    let estimate = estimate(&run.sequence, source.fps(), &config.estimator)?;
    info!(
        "run complete: {:.2} px/s from {} samples",
        estimate.terminal_velocity_px_s,
        run.sequence.len()
    );
    Ok(TrackingOutcome { run, estimate })
}

use std::{env, fs, path::PathBuf};

use serde::Deserialize;
use viscum::frames::ImageSequenceSource;
use viscum::track::{estimate, track, CancelToken, PipelineError, TrackConfig, TrackReport};
use viscum::{FrameSource, Roi};

#[cfg(not(feature = "tracing"))]
use log::{info, warn};

#[cfg(feature = "tracing")]
use tracing::{info, warn};

#[cfg(feature = "tracing")]
use viscum::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use viscum::core::init_from_env;

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    frames_dir: String,
    fps: f64,
    #[serde(default)]
    roi: Option<Roi>,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    track: TrackConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    init_from_env()?;

    #[cfg(feature = "tracing")]
    init_tracing(false);

    run()
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info"))]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = parse_config_path();
    let raw = fs::read_to_string(&config_path)?;
    let cfg: ExampleConfig = serde_json::from_str(&raw)?;

    let source = ImageSequenceSource::open(&cfg.frames_dir, cfg.fps, cfg.roi)?;
    info!(
        "{} frames in {} at {} fps",
        source.frame_count(),
        cfg.frames_dir,
        cfg.fps
    );

    let mut report = TrackReport::new(&cfg.track, cfg.fps);
    report.source = Some(cfg.frames_dir.clone());

    let cancel = CancelToken::new();
    let outcome = track(&source, &cfg.track, &cancel)
        .map_err(PipelineError::from)
        .and_then(|run| {
            report.set_run(&run);
            estimate(&run.sequence, cfg.fps, &cfg.track.estimator).map_err(PipelineError::from)
        });
    match outcome {
        Ok(est) => {
            info!(
                "terminal velocity {:.2} px/s, ball diameter {:.2} px",
                est.terminal_velocity_px_s, est.mean_diameter_px
            );
            report.set_estimate(est);
        }
        Err(err) => {
            warn!("{err}");
            report.set_error(&err);
        }
    }

    let out_path = cfg
        .output_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tmpdata/track_frames_report.json"));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    report.write_json(&out_path)?;
    println!("wrote report JSON to {}", out_path.display());
    Ok(())
}

fn parse_config_path() -> PathBuf {
    env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("testdata/track_frames_config.json"))
}

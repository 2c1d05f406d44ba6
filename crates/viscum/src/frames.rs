//! Frames decoded from image files with the `image` crate.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::ImageReader;
use log::debug;
use viscum_core::{GrayImage, GrayImageView, Roi};
use viscum_track::FrameSource;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// File extensions recognised as frames.
pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "pgm"];

/// Errors produced while listing or decoding frames.
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("frame rate must be finite and positive (got {0})")]
    InvalidFrameRate(f64),

    #[error("no frame images found in {0}")]
    NoFrames(PathBuf),

    #[error("frame {index} out of range ({len} frames)")]
    OutOfRange { index: usize, len: usize },

    #[error("ROI {roi:?} does not fit the {width}x{height} frame {path}")]
    RoiOutOfBounds {
        roi: Roi,
        width: usize,
        height: usize,
        path: PathBuf,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Borrow an `image::GrayImage` as a core view.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Directory of still images, one per frame, ordered by file name.
///
/// Frames are decoded lazily, converted to luma and cropped to the ROI.
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    fps: f64,
    roi: Option<Roi>,
}

impl ImageSequenceSource {
    /// List the frame images in `dir`.
    pub fn open(dir: impl AsRef<Path>, fps: f64, roi: Option<Roi>) -> Result<Self, FrameError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && has_frame_extension(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(FrameError::NoFrames(dir.to_path_buf()));
        }
        paths.sort();
        debug!("{} frame images in {}", paths.len(), dir.display());
        Self::from_paths(paths, fps, roi)
    }

    /// Use an explicit, already ordered list of frame files.
    pub fn from_paths(paths: Vec<PathBuf>, fps: f64, roi: Option<Roi>) -> Result<Self, FrameError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FrameError::InvalidFrameRate(fps));
        }
        Ok(Self { paths, fps, roi })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn roi(&self) -> Option<Roi> {
        self.roi
    }
}

impl FrameSource for ImageSequenceSource {
    type Error = FrameError;

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> usize {
        self.paths.len()
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    fn frame(&self, index: usize) -> Result<GrayImage, FrameError> {
        let path = self.paths.get(index).ok_or(FrameError::OutOfRange {
            index,
            len: self.paths.len(),
        })?;
        let decoded = ImageReader::open(path)?
            .decode()
            .map_err(|source| FrameError::Decode {
                path: path.clone(),
                source,
            })?
            .to_luma8();
        let view = gray_view(&decoded);
        let Some(roi) = self.roi else {
            return Ok(GrayImage {
                width: view.width,
                height: view.height,
                data: decoded.into_raw(),
            });
        };
        view.crop(roi).ok_or_else(|| FrameError::RoiOutOfBounds {
            roi,
            width: view.width,
            height: view.height,
            path: path.clone(),
        })
    }
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use viscum_track::{track_and_estimate, CancelToken, DetectorParams, TrackConfig};

    fn write_ball(path: &Path, width: u32, height: u32, cx: i64, cy: i64, r: i64) {
        let img = ::image::GrayImage::from_fn(width, height, |x, y| {
            let dx = x as i64 - cx;
            let dy = y as i64 - cy;
            Luma([if dx * dx + dy * dy <= r * r { 35 } else { 210 }])
        });
        img.save(path).expect("save frame");
    }

    #[test]
    fn gray_view_borrows_image_pixels() {
        let img = ::image::GrayImage::from_fn(4, 3, |x, y| Luma([(10 * y + x) as u8]));
        let view = gray_view(&img);
        assert_eq!((view.width, view.height), (4, 3));
        assert_eq!(view.get(3, 2), 23);
    }

    #[test]
    fn lists_frames_in_name_order_and_crops() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_ball(&dir.path().join("f_002.png"), 30, 20, 20, 10, 3);
        write_ball(&dir.path().join("f_001.png"), 30, 20, 10, 10, 3);
        fs::write(dir.path().join("notes.txt"), "not a frame").expect("write");

        let roi = Roi {
            x: 5,
            y: 5,
            width: 10,
            height: 10,
        };
        let src = ImageSequenceSource::open(dir.path(), 10.0, Some(roi)).expect("open");
        assert_eq!(src.frame_count(), 2);
        assert!(src.paths()[0].ends_with("f_001.png"));

        let first = src.frame(0).expect("frame");
        assert_eq!((first.width, first.height), (10, 10));
        // Ball center (10, 10) lands at (5, 5) inside the ROI.
        assert_eq!(first.view().get(5, 5), 35);
        assert_eq!(first.view().get(0, 0), 210);

        assert!(matches!(
            src.frame(2),
            Err(FrameError::OutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn oversized_roi_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_ball(&dir.path().join("a.png"), 16, 16, 8, 8, 3);
        let roi = Roi {
            x: 10,
            y: 0,
            width: 10,
            height: 10,
        };
        let src = ImageSequenceSource::open(dir.path(), 10.0, Some(roi)).expect("open");
        assert!(matches!(
            src.frame(0),
            Err(FrameError::RoiOutOfBounds { .. })
        ));
    }

    #[test]
    fn empty_directory_has_no_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            ImageSequenceSource::open(dir.path(), 10.0, None),
            Err(FrameError::NoFrames(_))
        ));
    }

    #[test]
    fn tracks_ball_through_png_sequence() {
        let dir = tempfile::tempdir().expect("tempdir");
        for k in 0..20i64 {
            let path = dir.path().join(format!("frame_{k:03}.png"));
            write_ball(&path, 40, 120, 20, 15 + 4 * k, 5);
        }
        let src = ImageSequenceSource::open(dir.path(), 20.0, None).expect("open");
        let mut cfg = TrackConfig::default();
        cfg.tracker.detector = DetectorParams::default().with_radius_range(4, 6);

        let out = track_and_estimate(&src, &cfg, &CancelToken::new()).expect("pipeline");
        assert_eq!(out.run.sequence.len(), 20);
        let v = out.estimate.terminal_velocity_px_s;
        assert!((v - 80.0).abs() < 0.8, "v = {v}");
        assert_eq!(out.estimate.mean_diameter_px, 10.0);
    }
}

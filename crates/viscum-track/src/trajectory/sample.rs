use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/// Whether a sample is backed by a detection or by the motion model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    Measured,
    Predicted,
}

/// One fused ball position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub frame_index: usize,
    /// Seconds since the first recorded frame.
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub diameter: f64,
    pub confidence: f64,
    pub source: SampleSource,
}

impl TrajectorySample {
    #[inline]
    pub fn is_measured(&self) -> bool {
        self.source == SampleSource::Measured
    }
}

/// Samples in frame order, at most one per frame.
///
/// Frame indices and times are strictly increasing; the sequence can only be
/// extended at its end.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TrajectorySample>", into = "Vec<TrajectorySample>")]
pub struct TrajectorySequence {
    samples: Vec<TrajectorySample>,
}

impl TrajectorySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence from pre-recorded samples, checking their order.
    pub fn from_samples(samples: Vec<TrajectorySample>) -> Result<Self, TrackError> {
        let mut seq = Self::new();
        for s in samples {
            seq.push(s)?;
        }
        Ok(seq)
    }

    pub(crate) fn push(&mut self, sample: TrajectorySample) -> Result<(), TrackError> {
        if self.samples.is_empty() && !sample.is_measured() {
            return Err(TrackError::PredictedBeforeMeasured {
                index: sample.frame_index,
            });
        }
        if let Some(last) = self.samples.last() {
            if sample.frame_index <= last.frame_index || sample.time <= last.time {
                return Err(TrackError::FrameOutOfOrder {
                    index: sample.frame_index,
                    last: last.frame_index,
                });
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrajectorySample> {
        self.samples.iter()
    }

    pub fn count(&self, source: SampleSource) -> usize {
        self.samples.iter().filter(|s| s.source == source).count()
    }

    /// Mean diameter over measured samples only.
    pub fn mean_measured_diameter(&self) -> Option<f64> {
        mean(self.samples.iter().filter(|s| s.is_measured()).map(|s| s.diameter))
    }

    /// Mean confidence over all samples, predicted ones included.
    pub fn mean_confidence(&self) -> Option<f64> {
        mean(self.samples.iter().map(|s| s.confidence))
    }
}

impl TryFrom<Vec<TrajectorySample>> for TrajectorySequence {
    type Error = TrackError;

    fn try_from(samples: Vec<TrajectorySample>) -> Result<Self, Self::Error> {
        Self::from_samples(samples)
    }
}

impl From<TrajectorySequence> for Vec<TrajectorySample> {
    fn from(seq: TrajectorySequence) -> Self {
        seq.samples
    }
}

impl<'a> IntoIterator for &'a TrajectorySequence {
    type Item = &'a TrajectorySample;
    type IntoIter = std::slice::Iter<'a, TrajectorySample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

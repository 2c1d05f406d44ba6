use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

/// Configuration for the darkest-circle ball detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Smallest candidate radius in pixels.
    pub radius_min: usize,
    /// Largest candidate radius in pixels (inclusive).
    pub radius_max: usize,
    /// Half-size of the search window around a prior center, as a fraction
    /// of the frame size along each axis.
    pub search_fraction: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            radius_min: 8,
            radius_max: 35,
            search_fraction: 0.8,
        }
    }
}

impl DetectorParams {
    pub fn with_radius_range(mut self, radius_min: usize, radius_max: usize) -> Self {
        self.radius_min = radius_min;
        self.radius_max = radius_max;
        self
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.radius_min == 0 || self.radius_min > self.radius_max {
            return Err(ParamsError::RadiusRange {
                min: self.radius_min,
                max: self.radius_max,
            });
        }
        if !(self.search_fraction > 0.0 && self.search_fraction <= 1.0) {
            return Err(ParamsError::SearchFraction(self.search_fraction));
        }
        Ok(())
    }
}

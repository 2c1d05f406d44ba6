//! Constant-velocity Kalman filter over `[x, y, vx, vy]`.
//!
//! The filter has an explicit lifecycle: `new` creates it uninitialized,
//! `initialize` seeds it from the first detection, then `predict`/`update`
//! advance it. Using it out of order is an error, never a silent no-op.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Point2, Vector2, Vector4};
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, ParamsError};

/// Noise tuning, each term a multiple of the identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanParams {
    /// Process noise `Q = q * I4`.
    pub process_noise: f64,
    /// Measurement noise `R = r * I2`, in squared pixels.
    pub measurement_noise: f64,
    /// Initial state covariance `P0 = p * I4`.
    pub initial_covariance: f64,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            process_noise: 0.1,
            measurement_noise: 10.0,
            initial_covariance: 100.0,
        }
    }
}

impl KalmanParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, value) in [
            ("process_noise", self.process_noise),
            ("measurement_noise", self.measurement_noise),
            ("initial_covariance", self.initial_covariance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParamsError::Noise { name, value });
            }
        }
        Ok(())
    }
}

/// State estimate and its covariance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterState {
    /// `[x, y, vx, vy]`, positions in pixels, velocities in pixels per second.
    pub x: Vector4<f64>,
    pub p: Matrix4<f64>,
}

impl FilterState {
    #[inline]
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x[0], self.x[1])
    }

    #[inline]
    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(self.x[2], self.x[3])
    }
}

/// Single-target constant-velocity Kalman tracker, owned by one run.
#[derive(Clone, Debug)]
pub struct MotionFilter {
    f: Matrix4<f64>,
    h: Matrix2x4<f64>,
    q: Matrix4<f64>,
    r: Matrix2<f64>,
    p0: Matrix4<f64>,
    state: Option<FilterState>,
}

impl MotionFilter {
    /// Build an uninitialized filter stepping by `dt` seconds per frame.
    pub fn new(params: &KalmanParams, dt: f64) -> Self {
        #[rustfmt::skip]
        let f = Matrix4::new(
            1.0, 0.0, dt,  0.0,
            0.0, 1.0, 0.0, dt,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let h = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );
        Self {
            f,
            h,
            q: Matrix4::identity() * params.process_noise,
            r: Matrix2::identity() * params.measurement_noise,
            p0: Matrix4::identity() * params.initial_covariance,
            state: None,
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Current estimate, `None` before `initialize`.
    #[inline]
    pub fn state(&self) -> Option<&FilterState> {
        self.state.as_ref()
    }

    /// State covariance, `None` before `initialize`.
    #[inline]
    pub fn covariance(&self) -> Option<&Matrix4<f64>> {
        self.state.as_ref().map(|st| &st.p)
    }

    #[inline]
    pub fn transition(&self) -> &Matrix4<f64> {
        &self.f
    }

    /// Seed the state at `(x0, y0)` with zero velocity.
    pub fn initialize(&mut self, x0: f64, y0: f64) -> Result<(), FilterError> {
        if self.state.is_some() {
            return Err(FilterError::AlreadyInitialized);
        }
        self.state = Some(FilterState {
            x: Vector4::new(x0, y0, 0.0, 0.0),
            p: self.p0,
        });
        Ok(())
    }

    /// Propagate state and covariance one step; returns the predicted position.
    pub fn predict(&mut self) -> Result<Point2<f64>, FilterError> {
        let st = self.state.as_mut().ok_or(FilterError::NotInitialized)?;
        st.x = self.f * st.x;
        st.p = self.f * st.p * self.f.transpose() + self.q;
        Ok(st.position())
    }

    /// Fuse a position measurement; returns the corrected position.
    pub fn update(&mut self, zx: f64, zy: f64) -> Result<Point2<f64>, FilterError> {
        let st = self.state.as_mut().ok_or(FilterError::NotInitialized)?;
        let innovation = Vector2::new(zx, zy) - self.h * st.x;
        let s = self.h * st.p * self.h.transpose() + self.r;
        let s_inv = s.try_inverse().ok_or(FilterError::SingularInnovation)?;
        let k: Matrix4x2<f64> = st.p * self.h.transpose() * s_inv;
        st.x += k * innovation;
        st.p = (Matrix4::identity() - k * self.h) * st.p;
        Ok(st.position())
    }
}

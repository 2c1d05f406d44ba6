//! Terminal-velocity estimation from a tracked trajectory.

mod estimator;
mod fit;
mod signal;

pub use estimator::{estimate, EstimatorParams, VelocityEstimate, VelocityProfile};
pub use fit::{polyfit, polyval};
pub use signal::{
    acceleration_skip, central_gradient, moving_average_window, trailing_moving_average,
};

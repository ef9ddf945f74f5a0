//! Common traits defining interfaces for the planner and its building blocks

use nalgebra::Matrix3x2;

use crate::common::error::PlannerResult;
use crate::common::types::Pose2D;

/// Trait for pose-to-pose path planners
pub trait PathPlanner {
    /// Planning outcome type
    type Output;

    /// Plan a path from start to goal
    fn plan(&mut self, start: Pose2D, goal: Pose2D) -> PlannerResult<Self::Output>;
}

/// Trait for vehicle/robot motion models
pub trait MotionModel {
    /// State type
    type State;
    /// Control type
    type Control;

    /// Propagate state forward in time
    fn propagate(&self, state: &Self::State, control: &Self::Control, dt: f64) -> Self::State;

    /// Jacobian of the motion with respect to the control input
    fn jacobian_control(&self, state: &Self::State, dt: f64) -> Matrix3x2<f64>;
}

/// Trait for feedback controllers (PD, LQR, ...)
pub trait Controller {
    /// State type
    type State;
    /// Reference/target type
    type Reference;
    /// Output control type
    type Output;

    /// Compute control output
    fn compute(&mut self, state: &Self::State, reference: &Self::Reference) -> Self::Output;

    /// Reset controller state
    fn reset(&mut self);
}

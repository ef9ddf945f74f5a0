//! Unicycle motion model and linearized covariance propagation
//!
//! The pose is integrated additively, so the state Jacobian is the identity
//! and one step of propagation reduces to
//! `Sigma' = Sigma + G Q G^T + R` with `G` the control Jacobian at the
//! pre-step heading.

use nalgebra::{Matrix2, Matrix3, Matrix3x2};

use crate::common::{ControlInput, MotionModel, Pose2D};
use crate::path_planning::cc_rrt::config::UncertaintyConfig;

/// Unicycle kinematics with additive Gaussian process noise
#[derive(Debug, Clone)]
pub struct UnicycleModel {
    /// Additive process noise R over (x, y, yaw)
    process_noise: Matrix3<f64>,
    /// Control noise Q over (v, omega)
    control_noise: Matrix2<f64>,
}

impl UnicycleModel {
    pub fn new(process_noise: Matrix3<f64>, control_noise: Matrix2<f64>) -> Self {
        Self { process_noise, control_noise }
    }

    pub fn from_config(config: &UncertaintyConfig) -> Self {
        Self::new(config.process_noise_matrix(), config.control_noise_matrix())
    }

    /// Covariance after one step taken from a pose with heading `yaw`
    pub fn propagate_covariance(&self, covariance: &Matrix3<f64>, yaw: f64, dt: f64) -> Matrix3<f64> {
        let g = control_jacobian(yaw, dt);
        covariance + g * self.control_noise * g.transpose() + self.process_noise
    }
}

impl MotionModel for UnicycleModel {
    type State = Pose2D;
    type Control = ControlInput;

    fn propagate(&self, state: &Pose2D, control: &ControlInput, dt: f64) -> Pose2D {
        let delta = control_jacobian(state.yaw, dt) * control.to_vector();
        Pose2D::from(state.to_vector() + delta)
    }

    fn jacobian_control(&self, state: &Pose2D, dt: f64) -> Matrix3x2<f64> {
        control_jacobian(state.yaw, dt)
    }
}

fn control_jacobian(yaw: f64, dt: f64) -> Matrix3x2<f64> {
    #[rustfmt::skip]
    let jacobian = Matrix3x2::new(
        dt * yaw.cos(), 0.,
        dt * yaw.sin(), 0.,
        0., dt,
    );
    jacobian
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn model() -> UnicycleModel {
        UnicycleModel::from_config(&UncertaintyConfig::default())
    }

    #[test]
    fn test_propagate_straight_and_turning() {
        let m = model();
        let next = m.propagate(&Pose2D::origin(), &ControlInput::new(10.0, 0.0), 0.1);
        assert!((next.x - 1.0).abs() < 1e-12);
        assert!(next.y.abs() < 1e-12);

        let next = m.propagate(&Pose2D::new(0.0, 0.0, PI / 2.0), &ControlInput::new(10.0, 1.0), 0.1);
        assert!(next.x.abs() < 1e-12);
        assert!((next.y - 1.0).abs() < 1e-12);
        assert!((next.yaw - (PI / 2.0 + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_propagate_wraps_heading() {
        let m = model();
        let next = m.propagate(&Pose2D::new(0.0, 0.0, PI - 0.05), &ControlInput::new(0.0, 1.0), 0.1);
        assert!(next.yaw > -PI && next.yaw <= PI);
        assert!((next.yaw - (-PI + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn test_control_jacobian_matches_step() {
        let m = model();
        let pose = Pose2D::new(1.0, 2.0, 0.4);
        let u = ControlInput::new(3.0, -0.5);
        let g = m.jacobian_control(&pose, 0.2);
        let next = m.propagate(&pose, &u, 0.2);
        let predicted = pose.to_vector() + g * u.to_vector();
        assert!((next.to_vector() - predicted).norm() < 1e-12);
    }

    #[test]
    fn test_zero_control_noise_adds_process_noise() {
        let m = model();
        let sigma = UncertaintyConfig::default().initial_covariance_matrix();
        let next = m.propagate_covariance(&sigma, 0.7, 0.1);
        let expected = sigma + UncertaintyConfig::default().process_noise_matrix();
        assert!((next - expected).norm() < 1e-12);
    }

    #[test]
    fn test_control_noise_uses_pre_step_heading() {
        let q = Matrix2::from_diagonal(&nalgebra::Vector2::new(4.0, 9.0));
        let m = UnicycleModel::new(Matrix3::zeros(), q);
        let next = m.propagate_covariance(&Matrix3::zeros(), 0.0, 0.5);
        assert!((next[(0, 0)] - 1.0).abs() < 1e-12);
        assert!(next[(1, 1)].abs() < 1e-12);
        assert!((next[(2, 2)] - 2.25).abs() < 1e-12);
        assert!((next - next.transpose()).norm() < 1e-12);
    }

    #[test]
    fn test_covariance_grows_monotonically() {
        let m = model();
        let mut sigma = UncertaintyConfig::default().initial_covariance_matrix();
        for _ in 0..20 {
            let next = m.propagate_covariance(&sigma, 1.2, 0.1);
            assert!(next.trace() > sigma.trace());
            sigma = next;
        }
    }
}

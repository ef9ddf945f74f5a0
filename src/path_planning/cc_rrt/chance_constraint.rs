//! Gaussian chance-constraint evaluation
//!
//! The ego footprint is described by four halfplanes. An obstacle whose
//! position is uncertain (ego covariance plus a diagonal term derived from the
//! obstacle extents) violates an edge with probability
//! `0.5 * (1 - erf((a.c - b) / sqrt(2 a^T Sigma a)))`. The least violated edge
//! bounds the obstacle's contribution and contributions are summed over all
//! obstacles.

use std::f64::consts::PI;

use itertools::{Itertools, MinMaxResult};
use nalgebra::{Matrix2, Matrix3, Vector2};

use crate::common::{angle_wrap, Pose2D};
use crate::geometry::Halfplane;
use crate::path_planning::cc_rrt::obstacle::{Obstacle, VehicleFootprint};

/// Error function approximation (Abramowitz-Stegun 7.1.26, |error| < 1.5e-7)
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Whether an aggregated risk satisfies P(violation) < 1 - p_safe
pub fn is_chance_feasible(risk: f64, p_safe: f64) -> bool {
    risk < 1.0 - p_safe
}

/// Positional uncertainty contributed by an obstacle's extents
pub fn obstacle_uncertainty(obstacle: &Obstacle) -> Matrix2<f64> {
    let mut angle = angle_wrap(obstacle.yaw).abs();
    if angle > PI / 2.0 {
        angle = PI - angle;
    }
    let (sin, cos) = angle.sin_cos();
    Matrix2::from_diagonal(&Vector2::new(
        obstacle.half_width * sin + obstacle.half_length * cos,
        obstacle.half_length * sin + obstacle.half_width * cos,
    ))
}

/// Probability that a Gaussian obstacle center lies past `halfplane`'s edge
pub fn halfplane_violation(halfplane: &Halfplane, obstacle: &Obstacle, sigma: &Matrix2<f64>) -> f64 {
    let margin = halfplane.margin(&obstacle.center());
    let a = halfplane.normal.to_vector();
    let variance = (a.transpose() * sigma * a)[(0, 0)];

    if !(variance > 0.0) || !variance.is_finite() {
        // point mass: the tail collapses to a step
        return if margin > 0.0 {
            0.0
        } else if margin < 0.0 {
            1.0
        } else {
            0.5
        };
    }

    let z = margin / (2.0 * variance).sqrt();
    (0.5 * (1.0 - erf(z))).clamp(0.0, 1.0)
}

/// Evaluates the aggregated risk of ego poses against an obstacle list
#[derive(Debug, Clone, Copy)]
pub struct RiskEvaluator {
    footprint: VehicleFootprint,
}

impl RiskEvaluator {
    pub fn new(footprint: VehicleFootprint) -> Self {
        Self { footprint }
    }

    /// Violation probability of each ego edge for one obstacle
    pub fn edge_violations(&self, pose: &Pose2D, covariance: &Matrix3<f64>, obstacle: &Obstacle) -> Vec<f64> {
        let halfplanes = self.footprint.rect_at(pose).halfplanes();
        let sigma = position_block(covariance) + obstacle_uncertainty(obstacle);
        halfplanes
            .iter()
            .map(|h| halfplane_violation(h, obstacle, &sigma))
            .collect()
    }

    /// Sum over obstacles of the least violated edge probability
    pub fn risk(&self, pose: &Pose2D, covariance: &Matrix3<f64>, obstacles: &[Obstacle]) -> f64 {
        let halfplanes = self.footprint.rect_at(pose).halfplanes();
        let position_sigma = position_block(covariance);

        obstacles
            .iter()
            .map(|obstacle| {
                let sigma = position_sigma + obstacle_uncertainty(obstacle);
                halfplanes
                    .iter()
                    .map(|h| halfplane_violation(h, obstacle, &sigma))
                    .fold(f64::INFINITY, f64::min)
            })
            .sum()
    }

    /// Risk of every state along a path
    pub fn profile<'a, I>(&self, states: I, obstacles: &[Obstacle]) -> Vec<f64>
    where
        I: IntoIterator<Item = (&'a Pose2D, &'a Matrix3<f64>)>,
    {
        states
            .into_iter()
            .map(|(pose, covariance)| self.risk(pose, covariance, obstacles))
            .collect()
    }
}

fn position_block(covariance: &Matrix3<f64>) -> Matrix2<f64> {
    covariance.fixed_view::<2, 2>(0, 0).into_owned()
}

/// Min / max / mean of a risk profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl RiskSummary {
    /// `None` for an empty profile
    pub fn from_profile(profile: &[f64]) -> Option<Self> {
        let (min, max) = match profile.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(v) => (v, v),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        let mean = profile.iter().sum::<f64>() / profile.len() as f64;
        Some(Self { min, max, mean })
    }
}

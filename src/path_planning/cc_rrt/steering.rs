//! Closed-loop steering between a tree node and a target point
//!
//! A PD tracker drives the unicycle towards the target. Every step is
//! integrated, collision checked and turned into a node carrying its
//! propagated covariance and chance-constraint risk. The maneuver stops at
//! the first rejected step, on arrival, or after `max_steps` steps.

use nalgebra::Matrix3;

use crate::common::{angle_wrap, AreaBounds, ControlInput, Controller, MotionModel, Point2D, Pose2D};
use crate::geometry::OrientedRect;
use crate::path_planning::cc_rrt::chance_constraint::RiskEvaluator;
use crate::path_planning::cc_rrt::config::{CcRrtConfig, SteeringConfig};
use crate::path_planning::cc_rrt::obstacle::{Obstacle, VehicleFootprint};
use crate::path_planning::cc_rrt::tree::{CostModel, Node};
use crate::path_planning::cc_rrt::uncertainty::UnicycleModel;

/// PD tracker on (range, heading error) with gain bands keyed on |heading error|.
///
/// The derivative memory lives as long as one maneuver; a fresh tracker is
/// built for every call to [`Steering::steer`].
#[derive(Debug, Clone)]
pub struct PdTracker<'a> {
    config: &'a SteeringConfig,
    previous: Option<(f64, f64)>,
}

impl<'a> PdTracker<'a> {
    pub fn new(config: &'a SteeringConfig) -> Self {
        PdTracker { config, previous: None }
    }
}

impl Controller for PdTracker<'_> {
    type State = Pose2D;
    type Reference = Point2D;
    type Output = ControlInput;

    fn compute(&mut self, state: &Pose2D, target: &Point2D) -> ControlInput {
        let (range, error) = state.range_and_heading_error(target);
        let band = self.config.select_band(error);

        let mut v = band.kp[0] * range;
        let mut omega = band.kp[1] * error;
        if let Some((prev_range, prev_error)) = self.previous {
            v += band.kd[0] * (range - prev_range);
            omega += band.kd[1] * angle_wrap(error - prev_error);
        }
        self.previous = Some((range, error));

        let v = v.clamp(band.min_speed, self.config.max_speed);
        let omega = if omega.abs() > band.max_turn_rate {
            band.max_turn_rate.copysign(omega)
        } else {
            omega
        };
        ControlInput::new(v, omega)
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}

/// Local planner used by the tree search
pub struct Steering<'a> {
    footprint: VehicleFootprint,
    bounds: AreaBounds,
    obstacles: &'a [Obstacle],
    obstacle_rects: Vec<OrientedRect>,
    model: &'a UnicycleModel,
    risk: RiskEvaluator,
    cost_model: &'a CostModel,
    config: &'a SteeringConfig,
    dt: f64,
    arrival_radius: f64,
}

impl<'a> Steering<'a> {
    pub fn new(
        footprint: VehicleFootprint,
        bounds: AreaBounds,
        obstacles: &'a [Obstacle],
        model: &'a UnicycleModel,
        cost_model: &'a CostModel,
        config: &'a CcRrtConfig,
    ) -> Self {
        Steering {
            footprint,
            bounds,
            obstacles,
            obstacle_rects: obstacles.iter().map(Obstacle::rect).collect(),
            model,
            risk: RiskEvaluator::new(footprint),
            cost_model,
            config: &config.steering,
            dt: config.dt,
            arrival_radius: config.distance_threshold,
        }
    }

    /// Node for `pose` at time zero
    pub fn root_node(&self, pose: Pose2D, covariance: Matrix3<f64>) -> Node {
        let risk = self.risk.risk(&pose, &covariance, self.obstacles);
        self.cost_model.node(pose, covariance, 0.0, risk)
    }

    /// Steer from `from` towards `target`.
    ///
    /// Returns the accepted nodes in order, detached from the tree.
    pub fn steer(&self, from: &Node, target: &Point2D) -> Vec<Node> {
        let mut tracker = PdTracker::new(self.config);
        let mut nodes: Vec<Node> = Vec::new();

        let mut pose = from.pose;
        let mut covariance = from.covariance;
        let mut time = from.time;

        while pose.position().distance(target) > self.arrival_radius && nodes.len() < self.config.max_steps {
            let control = tracker.compute(&pose, target);
            let next = self.model.propagate(&pose, &control, self.dt);
            if !self.is_valid_step(&pose, &next) {
                break;
            }

            let next_covariance = self.model.propagate_covariance(&covariance, pose.yaw, self.dt);
            let risk = self.risk.risk(&next, &next_covariance, self.obstacles);
            time += self.dt;
            nodes.push(self.cost_model.node(next, next_covariance, time, risk));

            pose = next;
            covariance = next_covariance;
        }
        nodes
    }

    /// Whether the footprint at `pose` overlaps any obstacle
    pub fn collides(&self, pose: &Pose2D) -> bool {
        let ego = self.footprint.rect_at(pose);
        self.obstacle_rects.iter().any(|rect| ego.overlaps(rect))
    }

    /// Acceptance test for a single integration step
    pub fn is_valid_step(&self, from: &Pose2D, to: &Pose2D) -> bool {
        if !self.bounds.contains(to.x, to.y) {
            return false;
        }
        let center = to.position();
        if self.obstacle_rects.iter().any(|rect| rect.contains_point(&center)) {
            return false;
        }

        let start = from.position();
        let heading = if start == center { to.yaw } else { start.bearing_to(&center) };
        let samples = self.config.collision_samples;
        let swept_clear = (0..samples).all(|i| {
            let p = start.lerp(&center, i as f64 / samples as f64);
            !self.collides(&Pose2D::new(p.x, p.y, heading))
        });

        swept_clear && !self.collides(to)
    }
}

//! Configuration for the CC-RRT planner
//!
//! Every section deserializes with `#[serde(default)]`, so a YAML file only
//! needs the keys it wants to override.

use std::f64::consts::PI;
use std::path::Path;

use nalgebra::{Matrix2, Matrix3};
use serde::{Deserialize, Serialize};

use crate::common::{PlannerError, PlannerResult};

/// Top-level planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcRrtConfig {
    /// Target probability of staying clear of obstacles
    pub p_safe: f64,
    /// Weight of the risk value in node cost (cost = time + weight * risk)
    pub risk_weight: f64,
    /// Integration step [s]
    pub dt: f64,
    /// Radius of the goal region, also the steering arrival tolerance [m]
    pub distance_threshold: f64,
    /// RNG seed; entropy when absent
    pub seed: Option<u64>,
    /// Record timing and first-path metrics
    pub collect_metrics: bool,
    pub search: SearchConfig,
    pub heuristic: HeuristicConfig,
    pub steering: SteeringConfig,
    pub uncertainty: UncertaintyConfig,
}

impl Default for CcRrtConfig {
    fn default() -> Self {
        Self {
            p_safe: 0.8,
            risk_weight: 100.0,
            dt: 0.1,
            distance_threshold: 1.0,
            seed: None,
            collect_metrics: false,
            search: SearchConfig::default(),
            heuristic: HeuristicConfig::default(),
            steering: SteeringConfig::default(),
            uncertainty: UncertaintyConfig::default(),
        }
    }
}

/// Search budget and termination caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of samples
    pub max_iter: usize,
    /// Maximum number of tree nodes
    pub max_nodes: usize,
    /// Search stops once this many goal leaves are known
    pub max_goal_leaves: usize,
    /// Rejection-sampling retries before giving up
    pub max_sample_attempts: usize,
    /// Every n-th node of a fresh maneuver tries to connect to the goal
    pub goal_connect_stride: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            max_nodes: 8000,
            max_goal_leaves: 20,
            max_sample_attempts: 1000,
            goal_connect_stride: 8,
        }
    }
}

/// Neighbor ranking parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Probability of ranking by distance before `switch_goal_leaves` paths exist
    pub k_explore: f64,
    /// Probability of ranking by distance afterwards
    pub k_exploit: f64,
    /// Goal-leaf count at which the search turns from exploring to exploiting.
    ///
    /// Defaults to 10 on purpose. A value at or above `max_goal_leaves`
    /// (such as 25 with the default cap of 20) never switches.
    pub switch_goal_leaves: usize,
    /// Distance weight of the fallback endpoint heuristic
    pub k_no_path: f64,
    /// Number of nodes expanded per sample
    pub n_nearest: usize,
    /// Stride through the ranked node list
    pub stride: usize,
    /// Speed assumed by the time heuristics [m/s]
    pub expected_speed: f64,
    /// Turn rate assumed by the time heuristics [rad/s]
    pub expected_turn_rate: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            k_explore: 0.7,
            k_exploit: 0.3,
            switch_goal_leaves: 10,
            k_no_path: 0.85,
            n_nearest: 15,
            stride: 8,
            expected_speed: 9.0,
            expected_turn_rate: PI / 4.0,
        }
    }
}

/// Gains and limits used while the heading error is inside one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainBand {
    /// Proportional gains on [range, heading error]
    pub kp: [f64; 2],
    /// Derivative gains on [range change, heading error change]
    pub kd: [f64; 2],
    pub min_speed: f64,
    pub max_turn_rate: f64,
}

/// Local steering controller parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Maximum integration steps per maneuver
    pub max_steps: usize,
    pub max_speed: f64,
    /// Largest heading change accepted between a node and its target bearing
    pub max_heading_change: f64,
    /// Interpolated poses checked for collision between consecutive nodes
    pub collision_samples: usize,
    /// |error| above this uses the wide band
    pub wide_threshold: f64,
    /// |error| above this (and up to `wide_threshold`) uses the medium band
    pub medium_threshold: f64,
    pub wide: GainBand,
    pub medium: GainBand,
    pub narrow: GainBand,
}

impl SteeringConfig {
    /// Gains for the given heading error
    pub fn select_band(&self, heading_error: f64) -> GainBand {
        let error = heading_error.abs();
        if error > self.wide_threshold {
            self.wide
        } else if error > self.medium_threshold {
            self.medium
        } else {
            self.narrow
        }
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_steps: 30,
            max_speed: 18.0,
            max_heading_change: PI / 2.0,
            collision_samples: 10,
            wide_threshold: PI / 3.0,
            medium_threshold: PI / 6.0,
            wide: GainBand {
                kp: [0.05, 5.0],
                kd: [-0.1, -6.5],
                min_speed: 1.0,
                max_turn_rate: PI,
            },
            medium: GainBand {
                kp: [0.25, 5.0],
                kd: [-0.5, -6.5],
                min_speed: 6.5,
                max_turn_rate: PI,
            },
            narrow: GainBand {
                kp: [1.0, 5.0],
                kd: [-2.0, -6.5],
                min_speed: 13.0,
                max_turn_rate: PI / 2.0,
            },
        }
    }
}

/// Covariances over (x, y, yaw), stored row by row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyConfig {
    /// Covariance of the start pose
    pub initial_covariance: [[f64; 3]; 3],
    /// Additive process noise per step
    pub process_noise: [[f64; 3]; 3],
    /// Control noise over (v, omega)
    pub control_noise: [[f64; 2]; 2],
}

impl UncertaintyConfig {
    pub fn initial_covariance_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| self.initial_covariance[r][c])
    }

    pub fn process_noise_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| self.process_noise[r][c])
    }

    pub fn control_noise_matrix(&self) -> Matrix2<f64> {
        Matrix2::from_fn(|r, c| self.control_noise[r][c])
    }
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            initial_covariance: [[0.2, 0.0, 0.0], [0.0, 0.2, 0.0], [0.0, 0.0, 0.1]],
            process_noise: [[0.02, 0.01, 0.0], [0.01, 0.02, 0.0], [0.0, 0.0, 0.01]],
            control_noise: [[0.0, 0.0], [0.0, 0.0]],
        }
    }
}

impl CcRrtConfig {
    /// Parse a YAML document; absent keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> PlannerResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> PlannerResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject values the planner cannot run with
    pub fn validate(&self) -> PlannerResult<()> {
        fn check(ok: bool, msg: &str) -> PlannerResult<()> {
            if ok {
                Ok(())
            } else {
                Err(PlannerError::InvalidParameter(msg.to_string()))
            }
        }
        let probability = |p: f64| (0.0..=1.0).contains(&p);

        check(probability(self.p_safe), "p_safe must lie in [0, 1]")?;
        check(self.risk_weight >= 0.0, "risk_weight must be non-negative")?;
        check(self.dt > 0.0 && self.dt.is_finite(), "dt must be positive")?;
        check(self.distance_threshold > 0.0, "distance_threshold must be positive")?;

        check(self.search.max_iter > 0, "search.max_iter must be non-zero")?;
        check(self.search.max_nodes > 0, "search.max_nodes must be non-zero")?;
        check(self.search.max_goal_leaves > 0, "search.max_goal_leaves must be non-zero")?;
        check(self.search.max_sample_attempts > 0, "search.max_sample_attempts must be non-zero")?;
        check(self.search.goal_connect_stride > 0, "search.goal_connect_stride must be non-zero")?;

        let h = &self.heuristic;
        check(probability(h.k_explore), "heuristic.k_explore must lie in [0, 1]")?;
        check(probability(h.k_exploit), "heuristic.k_exploit must lie in [0, 1]")?;
        check(probability(h.k_no_path), "heuristic.k_no_path must lie in [0, 1]")?;
        check(h.n_nearest > 0, "heuristic.n_nearest must be non-zero")?;
        check(h.stride > 0, "heuristic.stride must be non-zero")?;
        check(h.expected_speed > 0.0, "heuristic.expected_speed must be positive")?;
        check(h.expected_turn_rate > 0.0, "heuristic.expected_turn_rate must be positive")?;

        let s = &self.steering;
        check(s.max_steps > 0, "steering.max_steps must be non-zero")?;
        check(s.collision_samples > 0, "steering.collision_samples must be non-zero")?;
        check(
            s.medium_threshold <= s.wide_threshold,
            "steering.medium_threshold must not exceed steering.wide_threshold",
        )?;
        for band in [&s.wide, &s.medium, &s.narrow] {
            check(
                band.min_speed <= s.max_speed,
                "steering band min_speed must not exceed max_speed",
            )?;
            check(band.max_turn_rate >= 0.0, "steering band max_turn_rate must be non-negative")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CcRrtConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.max_iter, 200);
        assert_eq!(config.steering.max_steps, 30);
    }

    #[test]
    fn test_default_switch_happens_before_leaf_cap() {
        let config = CcRrtConfig::default();
        assert_eq!(config.heuristic.switch_goal_leaves, 10);
        assert!(config.heuristic.switch_goal_leaves < config.search.max_goal_leaves);
    }

    #[test]
    fn test_band_selection() {
        let steering = SteeringConfig::default();
        assert_eq!(steering.select_band(PI / 2.0), steering.wide);
        assert_eq!(steering.select_band(-PI / 4.0), steering.medium);
        assert_eq!(steering.select_band(0.1), steering.narrow);
        assert_eq!(steering.select_band(PI / 6.0), steering.narrow);
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = "
p_safe: 0.9
seed: 7
search:
  max_iter: 50
heuristic:
  n_nearest: 5
";
        let config = CcRrtConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.p_safe, 0.9);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.search.max_iter, 50);
        assert_eq!(config.search.max_nodes, 8000);
        assert_eq!(config.heuristic.n_nearest, 5);
        assert_eq!(config.steering, SteeringConfig::default());
    }

    #[test]
    fn test_yaml_round_trip_keeps_defaults() {
        let config = CcRrtConfig::default();
        let text = config.to_yaml_string().unwrap();
        let parsed = CcRrtConfig::from_yaml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = CcRrtConfig::default();
        config.dt = 0.0;
        assert!(matches!(config.validate(), Err(PlannerError::InvalidParameter(_))));

        let mut config = CcRrtConfig::default();
        config.heuristic.k_explore = 1.5;
        assert!(config.validate().is_err());

        assert!(CcRrtConfig::from_yaml_str("search:\n  max_nodes: 0\n").is_err());
        assert!(matches!(
            CcRrtConfig::from_yaml_str("p_safe: [1, 2]"),
            Err(PlannerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_matrices() {
        let u = UncertaintyConfig::default();
        let r = u.process_noise_matrix();
        assert_eq!(r[(0, 1)], 0.01);
        assert_eq!(r[(1, 0)], 0.01);
        assert_eq!(u.initial_covariance_matrix()[(2, 2)], 0.1);
        assert_eq!(u.control_noise_matrix(), Matrix2::zeros());
    }
}

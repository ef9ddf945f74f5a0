//! Chance-Constrained RRT Module
//!
//! Kinodynamic RRT for a car-like vehicle among rectangular obstacles whose
//! positions are uncertain. Every tree node carries the vehicle pose, its
//! propagated covariance and the probability of violating the obstacle
//! constraints under a Gaussian model. The search keeps upper bounds on the
//! cost-to-goal and returns the path that minimizes the worst bound along it.
//!
//! # Components
//!
//! - `config`: planner parameters, loadable from YAML
//! - `obstacle`: obstacle descriptors and the ego footprint
//! - `uncertainty`: unicycle model and covariance propagation
//! - `chance_constraint`: halfplane violation probabilities and risk aggregation
//! - `steering`: PD tracking controller and collision-checked maneuvers
//! - `heuristic`: neighbor ranking and candidate selection
//! - `tree`: node arena, cost bounds, backpropagation and minimax selection
//! - `planner`: the search driver
//!
//! # Example
//!
//! ```no_run
//! use cc_rrt::common::{AreaBounds, PathPlanner, Pose2D};
//! use cc_rrt::path_planning::cc_rrt::{CcRrtConfig, CcRrtPlanner, Obstacle, VehicleFootprint};
//!
//! let obstacles = vec![Obstacle::from_dimensions(6.0, 1.0, 4.0, 2.0, 0.0)];
//! let mut planner = CcRrtPlanner::new(
//!     VehicleFootprint::default(),
//!     AreaBounds::new(-5.0, 20.0, -6.0, 6.0),
//!     obstacles.clone(),
//!     obstacles,
//!     CcRrtConfig::default(),
//! );
//! let result = planner.plan(Pose2D::new(0.0, -3.0, 0.0), Pose2D::new(15.0, 3.0, 0.0)).unwrap();
//! println!("{:?} with {} nodes", result.status, result.path.len());
//! ```
//!
//! # References
//!
//! - Luders, Kothari, How: "Chance Constrained RRT for Probabilistic Robustness
//!   to Environmental Uncertainty"
//! - Kuwata et al.: "Real-Time Motion Planning With Applications to Autonomous
//!   Urban Driving"

pub mod config;
pub mod obstacle;
pub mod uncertainty;
pub mod chance_constraint;
pub mod steering;
pub mod heuristic;
pub mod tree;
pub mod planner;

// Re-exports
pub use config::{CcRrtConfig, GainBand, HeuristicConfig, SearchConfig, SteeringConfig, UncertaintyConfig};
pub use obstacle::{Obstacle, VehicleFootprint};
pub use uncertainty::UnicycleModel;
pub use chance_constraint::{erf, is_chance_feasible, RiskEvaluator, RiskSummary};
pub use steering::{PdTracker, Steering};
pub use heuristic::Strategy;
pub use tree::{CostModel, Node, PathPoint, SearchTree};
pub use planner::{CcRrtPlanner, PlanMetrics, PlanResult, PlanStatus};

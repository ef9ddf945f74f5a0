//! cc_rrt - Chance-Constrained RRT motion planning in Rust
//!
//! This crate provides a kinodynamic RRT planner for a car-like vehicle
//! among rectangular obstacles with uncertain positions, together with the
//! geometry kernel and plotting helpers it is built on.

// Core modules
pub mod common;
pub mod geometry;
pub mod utils;

// Algorithm modules
pub mod path_planning;

// Re-export common types for convenience
pub use common::{angle_wrap, AreaBounds, ControlInput, Point2D, Pose2D};
pub use common::{Controller, MotionModel, PathPlanner};
pub use common::{PlannerError, PlannerResult};
pub use path_planning::cc_rrt::{CcRrtConfig, CcRrtPlanner, Obstacle, PlanResult, PlanStatus, VehicleFootprint};

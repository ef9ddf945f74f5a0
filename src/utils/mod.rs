//! Utility modules for cc_rrt

pub mod visualization;

pub use visualization::{Visualizer, PathStyle, PointStyle, colors};

//! Common types, traits, and error definitions for cc_rrt
//!
//! This module provides the foundational building blocks shared by the
//! geometry kernel, the planner and the visualizer.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;

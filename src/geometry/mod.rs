//! Geometry kernel
//!
//! Oriented rectangles for vehicle and obstacle footprints: corner
//! construction, halfplane extraction for the chance constraint, ray-casting
//! point containment and corner-based overlap.

pub mod oriented_rect;

pub use oriented_rect::{Halfplane, OrientedRect};

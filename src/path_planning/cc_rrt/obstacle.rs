//! Obstacle descriptors and the ego vehicle footprint

use serde::{Deserialize, Serialize};

use crate::common::{Point2D, Pose2D};
use crate::geometry::OrientedRect;

/// Rectangular obstacle (center, half extents, heading)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    /// Half extent along the heading
    pub half_length: f64,
    /// Half extent across the heading
    pub half_width: f64,
    pub yaw: f64,
}

impl Obstacle {
    pub fn new(x: f64, y: f64, half_length: f64, half_width: f64, yaw: f64) -> Self {
        Self { x, y, half_length, half_width, yaw }
    }

    /// Build from full length and width, as detections usually report them
    pub fn from_dimensions(x: f64, y: f64, length: f64, width: f64, yaw: f64) -> Self {
        Self::new(x, y, length / 2.0, width / 2.0, yaw)
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn rect(&self) -> OrientedRect {
        OrientedRect::centered(&Pose2D::new(self.x, self.y, self.yaw), self.half_length, self.half_width)
    }
}

/// Ego vehicle extents measured from the reference point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleFootprint {
    /// Distance from the reference point to the front bumper
    pub front: f64,
    /// Distance from the reference point to the rear bumper
    pub rear: f64,
    pub half_width: f64,
}

impl VehicleFootprint {
    pub fn new(front: f64, rear: f64, half_width: f64) -> Self {
        Self { front, rear, half_width }
    }

    pub fn rect_at(&self, pose: &Pose2D) -> OrientedRect {
        OrientedRect::new(pose, self.front, self.rear, self.half_width)
    }

    pub fn is_valid(&self) -> bool {
        self.front >= 0.0 && self.rear >= 0.0 && self.front + self.rear > 0.0 && self.half_width > 0.0
    }
}

impl Default for VehicleFootprint {
    /// A 4.51 m x 2.0 m car referenced at its center
    fn default() -> Self {
        Self {
            front: 4.51 * 0.5,
            rear: 4.51 * 0.5,
            half_width: 1.0,
        }
    }
}

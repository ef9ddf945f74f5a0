//! Oriented rectangles: corners, halfplanes, containment and overlap
//!
//! Corners are stored counter-clockwise starting at the front-right corner:
//! front-right, front-left, rear-left, rear-right.

use itertools::Itertools;

use crate::common::{Point2D, Pose2D};

/// Linear inequality `normal . p <= offset` describing one edge's inner side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halfplane {
    /// Unit outward normal
    pub normal: Point2D,
    pub offset: f64,
}

impl Halfplane {
    /// Signed distance of `point` past the edge; positive means outside
    pub fn margin(&self, point: &Point2D) -> f64 {
        self.normal.dot(point) - self.offset
    }

    pub fn contains(&self, point: &Point2D) -> bool {
        self.margin(point) <= 0.0
    }
}

/// Rectangle with arbitrary heading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
    corners: [Point2D; 4],
}

impl OrientedRect {
    /// Rectangle around `pose` reaching `front` ahead, `rear` behind and
    /// `half_width` to each side
    pub fn new(pose: &Pose2D, front: f64, rear: f64, half_width: f64) -> Self {
        let (sin, cos) = pose.yaw.sin_cos();
        let corner = |along: f64, left: f64| {
            Point2D::new(
                pose.x + along * cos - left * sin,
                pose.y + along * sin + left * cos,
            )
        };

        OrientedRect {
            corners: [
                corner(front, -half_width),
                corner(front, half_width),
                corner(-rear, half_width),
                corner(-rear, -half_width),
            ],
        }
    }

    /// Rectangle symmetric about its center
    pub fn centered(center: &Pose2D, half_length: f64, half_width: f64) -> Self {
        Self::new(center, half_length, half_length, half_width)
    }

    pub fn corners(&self) -> &[Point2D; 4] {
        &self.corners
    }

    pub fn center(&self) -> Point2D {
        self.corners[0].lerp(&self.corners[2], 0.5)
    }

    /// Consecutive corner pairs, closing the loop
    pub fn edges(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        self.corners
            .iter()
            .circular_tuple_windows()
            .map(|(start, end)| (*start, *end))
    }

    /// One halfplane per edge; a point is inside iff it satisfies all four
    pub fn halfplanes(&self) -> Vec<Halfplane> {
        self.edges()
            .map(|(prev, corner)| {
                let dx = corner.x - prev.x;
                let dy = corner.y - prev.y;
                let len = dx.hypot(dy);
                let normal = Point2D::new(dx / len, dy / len);
                Halfplane {
                    normal,
                    offset: normal.dot(&corner),
                }
            })
            .collect()
    }

    /// Even-odd crossing test with a ray cast towards +x
    pub fn contains_point(&self, point: &Point2D) -> bool {
        let crossings = self
            .edges()
            .filter(|(start, end)| ray_crosses_edge(point, start, end))
            .count();
        crossings % 2 == 1
    }

    /// Corner-containment overlap in both directions.
    ///
    /// Two rectangles crossing like a plus sign without either holding a
    /// corner of the other are reported as disjoint.
    pub fn overlaps(&self, other: &OrientedRect) -> bool {
        self.corners.iter().any(|c| other.contains_point(c))
            || other.corners.iter().any(|c| self.contains_point(c))
    }
}

/// Whether the horizontal ray from `point` towards +x crosses the edge.
///
/// Horizontal edges never count. An edge whose lower endpoint sits on the ray
/// is skipped while one whose upper endpoint does is counted, so a ray through
/// a vertex shared by a rising and a falling edge crosses exactly once.
fn ray_crosses_edge(point: &Point2D, start: &Point2D, end: &Point2D) -> bool {
    if start.y == end.y {
        return false;
    }
    if start.y > point.y && end.y > point.y {
        return false;
    }
    if start.y < point.y && end.y < point.y {
        return false;
    }
    if start.y == point.y && end.y > point.y {
        return false;
    }
    if end.y == point.y && start.y > point.y {
        return false;
    }

    let x_cross = end.x - (end.x - start.x) * (end.y - point.y) / (end.y - start.y);
    x_cross >= point.x
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn unit_square() -> OrientedRect {
        OrientedRect::centered(&Pose2D::origin(), 1.0, 1.0)
    }

    #[test]
    fn test_corners_counter_clockwise() {
        let rect = OrientedRect::new(&Pose2D::origin(), 2.0, 1.0, 0.5);
        let c = rect.corners();
        assert_eq!(c[0], Point2D::new(2.0, -0.5));
        assert_eq!(c[1], Point2D::new(2.0, 0.5));
        assert_eq!(c[2], Point2D::new(-1.0, 0.5));
        assert_eq!(c[3], Point2D::new(-1.0, -0.5));
    }

    #[test]
    fn test_rotated_corners() {
        let rect = OrientedRect::centered(&Pose2D::new(1.0, 1.0, PI / 2.0), 2.0, 1.0);
        let front_right = rect.corners()[0];
        assert!((front_right.x - 2.0).abs() < 1e-12);
        assert!((front_right.y - 3.0).abs() < 1e-12);
        let center = rect.center();
        assert!((center.x - 1.0).abs() < 1e-12 && (center.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_halfplanes_outward() {
        let rect = OrientedRect::new(&Pose2D::new(3.0, -2.0, 0.7), 2.0, 1.5, 0.8);
        let halfplanes = rect.halfplanes();
        assert_eq!(halfplanes.len(), 4);

        let center = Pose2D::new(3.0, -2.0, 0.7).position();
        for h in &halfplanes {
            assert!((h.normal.x.hypot(h.normal.y) - 1.0).abs() < 1e-12);
            assert!(h.contains(&center));
        }
        // every corner lies on two edges, so it is on the boundary of two halfplanes
        for corner in rect.corners() {
            let on_edge = halfplanes.iter().filter(|h| h.margin(corner).abs() < 1e-9).count();
            assert_eq!(on_edge, 2);
        }

        let far = Point2D::new(30.0, 30.0);
        assert!(halfplanes.iter().any(|h| !h.contains(&far)));
    }

    #[test]
    fn test_contains_centroid_and_far_point() {
        let rect = OrientedRect::new(&Pose2D::new(5.0, 5.0, 1.1), 2.255, 2.255, 1.0);
        assert!(rect.contains_point(&Point2D::new(5.0, 5.0)));
        assert!(!rect.contains_point(&Point2D::new(50.0, -50.0)));
    }

    #[test]
    fn test_contains_points_of_diamond() {
        let diamond = OrientedRect::centered(&Pose2D::new(0.0, 0.0, PI / 4.0), 1.0, 1.0);
        assert!(diamond.contains_point(&Point2D::new(0.3, 0.5)));
        assert!(diamond.contains_point(&Point2D::new(-0.5, -0.3)));
        assert!(diamond.contains_point(&Point2D::new(0.0, 1.3)));
        assert!(!diamond.contains_point(&Point2D::new(1.0, 1.0)));
    }

    #[test]
    fn test_corner_tie_break() {
        let rect = unit_square();
        // upper endpoint on the ray counts, lower endpoint does not
        assert!(rect.contains_point(&Point2D::new(1.0, 1.0)));
        assert!(!rect.contains_point(&Point2D::new(-1.0, -1.0)));
        assert!(!rect.contains_point(&Point2D::new(1.0, -1.0)));
        assert!(!rect.contains_point(&Point2D::new(-1.0, 1.0)));
        // repeated queries agree
        for _ in 0..3 {
            assert!(rect.contains_point(&Point2D::new(1.0, 1.0)));
        }
    }

    #[test]
    fn test_ray_through_vertex_counts_once() {
        // diamond: the ray from the center passes through the right vertex
        let diamond = OrientedRect::centered(&Pose2D::new(0.0, 0.0, PI / 4.0), 1.0, 1.0);
        assert!(diamond.contains_point(&Point2D::new(0.0, 0.0)));
        assert!(!diamond.contains_point(&Point2D::new(-3.0, 0.0)));
    }

    #[test]
    fn test_overlap_both_directions() {
        let big = OrientedRect::centered(&Pose2D::origin(), 3.0, 3.0);
        let small = OrientedRect::centered(&Pose2D::new(0.5, 0.5, 0.3), 0.5, 0.5);
        assert!(big.overlaps(&small));
        assert!(small.overlaps(&big));

        let far = OrientedRect::centered(&Pose2D::new(10.0, 0.0, 0.0), 1.0, 1.0);
        assert!(!big.overlaps(&far));
    }

    #[test]
    fn test_overlap_misses_plus_shape() {
        let horizontal = OrientedRect::centered(&Pose2D::origin(), 3.0, 0.2);
        let vertical = OrientedRect::centered(&Pose2D::new(0.0, 0.0, PI / 2.0), 3.0, 0.2);
        assert!(!horizontal.overlaps(&vertical));
    }
}

//! End-to-end planning scenarios

use std::f64::consts::PI;

use cc_rrt::common::{AreaBounds, PathPlanner, PlannerError, Point2D, Pose2D};
use cc_rrt::path_planning::cc_rrt::{CcRrtConfig, CcRrtPlanner, Obstacle, PlanStatus, VehicleFootprint};
use rstest::rstest;

fn corridor() -> AreaBounds {
    AreaBounds::new(-5.0, 15.0, -5.0, 5.0)
}

fn seeded(seed: u64, max_iter: usize) -> CcRrtConfig {
    let mut config = CcRrtConfig::default();
    config.seed = Some(seed);
    config.search.max_iter = max_iter;
    config
}

#[rstest]
#[case(1)]
#[case(17)]
#[case(2024)]
fn open_corridor_reaches_goal(#[case] seed: u64) {
    let goal = Pose2D::new(10.0, 0.0, 0.0);
    let mut planner = CcRrtPlanner::new(VehicleFootprint::default(), corridor(), Vec::new(), Vec::new(), seeded(seed, 50));
    let result = planner.plan(Pose2D::origin(), goal).unwrap();

    assert_eq!(result.status, PlanStatus::PathFound);
    let end = result.final_pose().unwrap();
    assert!(end.position().distance(&goal.position()) < 1.0);
    assert!(result.goal_leaves >= 1);
    assert!(result.tree_size <= planner.config().search.max_nodes);
}

#[test]
fn selected_path_minimizes_worst_upper_bound() {
    let goal = Pose2D::new(10.0, 2.0, 0.0);
    let mut planner = CcRrtPlanner::new(VehicleFootprint::default(), corridor(), Vec::new(), Vec::new(), seeded(8, 80));
    let result = planner.plan(Pose2D::origin(), goal).unwrap();
    assert!(result.is_path_found());

    let tree = planner.tree().unwrap();
    let selected = tree.select_minimax().unwrap();
    assert_eq!(tree.node(selected).pose, result.final_pose().unwrap());

    let best = tree.path_max_upper_bound(selected);
    for &leaf in tree.goal_leaves() {
        assert!(best <= tree.path_max_upper_bound(leaf));
    }
    for node in tree.nodes() {
        if node.cost_ub.is_finite() {
            assert!(node.cost_ub >= node.cost_lb);
        }
    }
}

#[test]
fn wall_blocks_every_path() {
    // solid wall over x in [3, 9] spanning the whole corridor
    let wall = Obstacle::new(6.0, 0.0, 3.0, 10.0, 0.0);
    let footprint = VehicleFootprint::default();
    let mut planner = CcRrtPlanner::new(footprint, corridor(), vec![wall], vec![wall], seeded(4, 60));
    let result = planner.plan(Pose2D::origin(), Pose2D::new(12.0, 0.0, 0.0)).unwrap();

    assert_eq!(result.status, PlanStatus::NoPathFound);
    assert!(!result.path.is_empty());
    assert_eq!(result.path[0].pose, Pose2D::origin());

    let wall_rect = wall.rect();
    for node in planner.tree().unwrap().nodes() {
        assert!(node.pose.x < 3.0);
        assert!(!footprint.rect_at(&node.pose).overlaps(&wall_rect));
    }
}

#[test]
fn parking_lot_scenario_scores_path() {
    let detections = [
        (1.83, 74.57, 3.82, 1.59, 90.0_f64, 2.48, 1.13),
        (5.44, 65.03, 3.56, 1.54, 89.0, 2.34, 1.11),
        (5.41, 94.42, 4.28, 1.65, 90.0, 3.15, 1.37),
        (9.124, 84.98, 3.93, 1.66, 90.0, 2.63, 1.23),
    ];
    let inflated: Vec<Obstacle> = detections
        .iter()
        .map(|&(x, y, l, w, yaw, _, _)| Obstacle::from_dimensions(x, y, l, w, yaw.to_radians()))
        .collect();
    let truth: Vec<Obstacle> = detections
        .iter()
        .map(|&(x, y, _, _, yaw, a, b)| Obstacle::new(x, y, a, b, yaw.to_radians()))
        .collect();

    let mut config = seeded(11, 60);
    config.collect_metrics = true;
    let start = Pose2D::new(1.86, 61.3, PI / 2.0);
    let goal = Pose2D::new(12.0, 95.0, PI / 2.0);
    let mut planner = CcRrtPlanner::new(
        VehicleFootprint::default(),
        AreaBounds::from_array([0.0, 15.0, 30.0, 100.0]),
        inflated.clone(),
        truth,
        config,
    );
    let result = planner.plan(start, goal).unwrap();

    assert_eq!(result.path[0].pose, start);
    assert_eq!(result.ground_truth_risk.len(), result.path.len());
    assert!(result.ground_truth_risk.iter().all(|r| *r >= 0.0 && r.is_finite()));
    let summary = result.risk_summary.unwrap();
    assert!(summary.min <= summary.mean && summary.mean <= summary.max);
    assert!(result.metrics.is_some());

    let footprint = VehicleFootprint::default();
    let rects: Vec<_> = inflated.iter().map(Obstacle::rect).collect();
    for point in &result.path[1..] {
        let ego = footprint.rect_at(&point.pose);
        assert!(rects.iter().all(|r| !ego.overlaps(r)));
    }
    for pair in result.path.windows(2) {
        assert!((pair[1].time - pair[0].time - 0.1).abs() < 1e-9);
    }
}

#[test]
fn same_seed_is_reproducible() {
    let run = || {
        let obstacles = vec![Obstacle::from_dimensions(6.0, 2.5, 4.0, 2.0, 0.3)];
        let mut planner =
            CcRrtPlanner::new(VehicleFootprint::default(), corridor(), obstacles.clone(), obstacles, seeded(99, 40));
        planner.plan(Pose2D::origin(), Pose2D::new(11.0, -2.0, 0.0)).unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.path, b.path);
    assert_eq!(a.tree_size, b.tree_size);
    assert_eq!(a.ground_truth_risk, b.ground_truth_risk);
}

#[test]
fn invalid_area_is_rejected() {
    let mut planner = CcRrtPlanner::new(
        VehicleFootprint::default(),
        AreaBounds::new(5.0, -5.0, -5.0, 5.0),
        Vec::new(),
        Vec::new(),
        seeded(0, 10),
    );
    let result = planner.plan(Pose2D::origin(), Pose2D::new(3.0, 0.0, 0.0));
    assert!(matches!(result, Err(PlannerError::InvalidParameter(_))));
}

#[test]
fn yaml_config_file_loads() {
    let config = CcRrtConfig::from_yaml_file("config/cc_rrt.yaml").unwrap();
    let defaults = CcRrtConfig::default();

    assert_eq!(config.seed, Some(7));
    assert!(config.collect_metrics);
    assert_eq!(config.search, defaults.search);
    assert_eq!(config.uncertainty, defaults.uncertainty);
    assert!((config.heuristic.expected_turn_rate - PI / 4.0).abs() < 1e-12);
    assert!((config.steering.narrow.max_turn_rate - PI / 2.0).abs() < 1e-12);
    assert_eq!(config.steering.max_steps, defaults.steering.max_steps);

    let missing = CcRrtConfig::from_yaml_file("config/does_not_exist.yaml");
    assert!(matches!(missing, Err(PlannerError::IoError(_))));
}

#[test]
fn goal_outside_area_is_never_reached() {
    let mut planner = CcRrtPlanner::new(VehicleFootprint::default(), corridor(), Vec::new(), Vec::new(), seeded(3, 30));
    let result = planner.plan(Pose2D::origin(), Pose2D::new(40.0, 0.0, 0.0)).unwrap();
    assert_eq!(result.status, PlanStatus::NoPathFound);
    let end = result.final_pose().unwrap();
    assert!(corridor().contains(end.x, end.y));
    assert!(end.position().distance(&Point2D::new(40.0, 0.0)) > 20.0);
}

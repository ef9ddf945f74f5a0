// CC-RRT demo: parallel parking lot with four detected vehicles
//
// usage: cc_rrt [config.yaml]

use std::error::Error;

use log::info;

use cc_rrt::common::{AreaBounds, PathPlanner, Pose2D};
use cc_rrt::path_planning::cc_rrt::{CcRrtConfig, CcRrtPlanner, Obstacle, VehicleFootprint};
use cc_rrt::utils::visualization::{colors, PathStyle, Visualizer};

/// (x, y, length, width, yaw [deg], semi-major axis, semi-minor axis)
const DETECTIONS: [(f64, f64, f64, f64, f64, f64, f64); 4] = [
    (1.83, 74.57, 3.82, 1.59, 90.0, 2.48, 1.13),
    (5.44, 65.03, 3.56, 1.54, 89.0, 2.34, 1.11),
    (5.41, 94.42, 4.28, 1.65, 90.0, 3.15, 1.37),
    (9.124, 84.98, 3.93, 1.66, 90.0, 2.63, 1.23),
];

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading config from {}", path);
            CcRrtConfig::from_yaml_file(&path)?
        }
        None => CcRrtConfig::default(),
    };

    let bounds = AreaBounds::from_array([0.0, 15.0, 30.0, 100.0]);
    let start = Pose2D::new(1.86, 61.3, 90.0_f64.to_radians());
    let goal = Pose2D::new(12.0, 95.0, 90.0_f64.to_radians());

    // planner sees the detection boxes, the path is scored against the fused extents
    let inflated: Vec<Obstacle> = DETECTIONS
        .iter()
        .map(|&(x, y, length, width, yaw, _, _)| Obstacle::from_dimensions(x, y, length, width, yaw.to_radians()))
        .collect();
    let ground_truth: Vec<Obstacle> = DETECTIONS
        .iter()
        .map(|&(x, y, _, _, yaw, a, b)| Obstacle::new(x, y, a, b, yaw.to_radians()))
        .collect();

    let mut planner = CcRrtPlanner::new(
        VehicleFootprint::default(),
        bounds,
        inflated.clone(),
        ground_truth.clone(),
        config,
    );
    let result = planner.plan(start, goal)?;

    info!(
        "{:?}: {} path nodes, {} tree nodes, {} goal leaves after {} iterations",
        result.status,
        result.path.len(),
        result.tree_size,
        result.goal_leaves,
        result.iterations
    );
    if let Some(summary) = result.risk_summary {
        info!(
            "path risk value: min {:.3}, max {:.3}, avg {:.3}",
            summary.min, summary.max, summary.mean
        );
    }
    if result.chance_violations > 0 {
        info!("{} path nodes exceed the chance constraint", result.chance_violations);
    }

    let mut vis = Visualizer::new();
    vis.set_title("CC-RRT")
        .set_x_range(bounds.xmin, bounds.xmax)
        .set_y_range(bounds.ymin, bounds.ymax);
    if let Some(tree) = planner.tree() {
        vis.plot_tree(tree.nodes());
    }
    let inflated_rects: Vec<_> = inflated.iter().map(Obstacle::rect).collect();
    let truth_rects: Vec<_> = ground_truth.iter().map(Obstacle::rect).collect();
    let footprints: Vec<_> = result
        .path
        .iter()
        .map(|p| planner.footprint().rect_at(&p.pose))
        .collect();
    vis.plot_rects(&inflated_rects, &PathStyle::new(colors::INFLATED, "Detections").with_line_width(1.0))
        .plot_rects(&truth_rects, &PathStyle::new(colors::OBSTACLE, "Ground truth").with_line_width(1.0))
        .plot_rects(&footprints, &PathStyle::new(colors::GRAY, "Ego footprint").with_line_width(0.5))
        .plot_path(&result.path, &PathStyle::default())
        .plot_start(&start)
        .plot_goal(&goal);

    let crate_dir = option_env!("CARGO_MANIFEST_DIR").unwrap_or(".");
    std::fs::create_dir_all(format!("{}/img", crate_dir))?;
    let out = format!("{}/img/cc_rrt.png", crate_dir);
    vis.save_png(&out, 600, 1200)?;
    info!("Plot saved to {}", out);

    Ok(())
}

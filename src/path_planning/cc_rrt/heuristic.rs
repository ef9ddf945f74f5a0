//! Neighbor ranking for tree expansion
//!
//! Each sample draws one strategy: rank by expected travel time to the
//! sample (explore) or by accumulated cost (exploit). Ranking is a pure
//! function of the tree; only the strategy draw consumes randomness.

use itertools::Itertools;
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::common::{Point2D, Pose2D};
use crate::path_planning::cc_rrt::config::HeuristicConfig;
use crate::path_planning::cc_rrt::tree::Node;

/// Ranking rule for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Expected travel time from the node to the sample
    ExploreDistance,
    /// Accumulated node cost
    ExploitCost,
}

/// Range over `speed` plus heading error over `turn_rate`
pub fn expected_travel_time(pose: &Pose2D, target: &Point2D, speed: f64, turn_rate: f64) -> f64 {
    let (range, error) = pose.range_and_heading_error(target);
    range / speed + error.abs() / turn_rate
}

/// Explore with probability `k_explore` until `switch_goal_leaves` paths exist,
/// with probability `k_exploit` afterwards
pub fn draw_strategy<R: Rng + ?Sized>(rng: &mut R, goal_leaves: usize, config: &HeuristicConfig) -> Strategy {
    let k = if goal_leaves < config.switch_goal_leaves {
        config.k_explore
    } else {
        config.k_exploit
    };
    if rng.gen_bool(k) {
        Strategy::ExploreDistance
    } else {
        Strategy::ExploitCost
    }
}

pub fn score(node: &Node, target: &Point2D, strategy: Strategy, config: &HeuristicConfig) -> f64 {
    match strategy {
        Strategy::ExploreDistance => {
            expected_travel_time(&node.pose, target, config.expected_speed, config.expected_turn_rate)
        }
        Strategy::ExploitCost => node.cost,
    }
}

/// Node indices, best first. Ties keep index order.
pub fn rank(nodes: &[Node], target: &Point2D, strategy: Strategy, config: &HeuristicConfig) -> Vec<usize> {
    let scores: Vec<f64> = nodes
        .iter()
        .map(|node| score(node, target, strategy, config))
        .collect();
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by_key(|&i| OrderedFloat(scores[i]));
    order
}

/// Every `stride`-th ranked node, at most `n_nearest` of them.
/// Small trees are returned whole.
pub fn select_candidates(ranked: &[usize], n_nearest: usize, stride: usize) -> Vec<usize> {
    if ranked.len() <= n_nearest {
        return ranked.to_vec();
    }
    ranked
        .iter()
        .step_by(stride.max(1))
        .take(n_nearest)
        .copied()
        .collect()
}

/// Endpoint score used when no goal leaf exists
pub fn fallback_score(node: &Node, goal: &Point2D, config: &HeuristicConfig) -> f64 {
    let time_to_goal = expected_travel_time(&node.pose, goal, config.expected_speed, config.expected_turn_rate);
    (1.0 - config.k_no_path) * node.cost + config.k_no_path * time_to_goal
}

pub fn best_fallback(nodes: &[Node], goal: &Point2D, config: &HeuristicConfig) -> Option<usize> {
    nodes
        .iter()
        .map(|node| OrderedFloat(fallback_score(node, goal, config)))
        .position_min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_planning::cc_rrt::tree::CostModel;
    use nalgebra::Matrix3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f64::consts::PI;

    fn config() -> HeuristicConfig {
        HeuristicConfig::default()
    }

    fn nodes() -> Vec<Node> {
        let model = CostModel::new(Pose2D::new(20.0, 0.0, 0.0), 100.0, 9.0, PI / 4.0);
        vec![
            model.node(Pose2D::new(0.0, 0.0, 0.0), Matrix3::zeros(), 0.0, 0.0),
            model.node(Pose2D::new(9.0, 0.0, 0.0), Matrix3::zeros(), 1.0, 0.0),
            model.node(Pose2D::new(4.0, 0.0, PI), Matrix3::zeros(), 0.5, 0.0),
            model.node(Pose2D::new(18.0, 0.0, 0.0), Matrix3::zeros(), 2.0, 0.05),
        ]
    }

    #[test]
    fn test_expected_travel_time() {
        let t = expected_travel_time(&Pose2D::new(0.0, 0.0, PI / 2.0), &Point2D::new(9.0, 0.0), 9.0, PI / 4.0);
        assert!((t - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_explore_ranks_by_travel_time() {
        let ranked = rank(&nodes(), &Point2D::new(10.0, 0.0), Strategy::ExploreDistance, &config());
        // node 2 is closer than node 0 but faces away
        assert_eq!(ranked, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_exploit_ranks_by_cost() {
        let ranked = rank(&nodes(), &Point2D::new(10.0, 0.0), Strategy::ExploitCost, &config());
        // costs 0.0, 1.0, 0.5 and 2.0 + 100 * 0.05
        assert_eq!(ranked, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_rank_is_pure() {
        let nodes = nodes();
        let target = Point2D::new(3.0, 1.0);
        let a = rank(&nodes, &target, Strategy::ExploreDistance, &config());
        let b = rank(&nodes, &target, Strategy::ExploreDistance, &config());
        assert_eq!(a, b);
    }

    #[test]
    fn test_select_candidates() {
        let ranked: Vec<usize> = (0..200).collect();
        let picked = select_candidates(&ranked, 15, 8);
        assert_eq!(picked.len(), 15);
        assert_eq!(picked[0], 0);
        assert_eq!(picked[1], 8);
        assert_eq!(picked[14], 112);

        let short: Vec<usize> = (0..20).rev().collect();
        assert_eq!(select_candidates(&short, 15, 8), vec![19, 11, 3]);

        let tiny = vec![4, 2, 9];
        assert_eq!(select_candidates(&tiny, 15, 8), tiny);
    }

    #[test]
    fn test_strategy_switches_with_goal_leaves() {
        let mut cfg = config();
        cfg.k_explore = 1.0;
        cfg.k_exploit = 0.0;
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(draw_strategy(&mut rng, 0, &cfg), Strategy::ExploreDistance);
        assert_eq!(draw_strategy(&mut rng, cfg.switch_goal_leaves - 1, &cfg), Strategy::ExploreDistance);
        assert_eq!(draw_strategy(&mut rng, cfg.switch_goal_leaves, &cfg), Strategy::ExploitCost);
    }

    #[test]
    fn test_fallback_balances_cost_and_progress() {
        let nodes = nodes();
        let goal = Point2D::new(20.0, 0.0);
        assert_eq!(best_fallback(&nodes, &goal, &config()), Some(1));
        assert_eq!(best_fallback(&[], &goal, &config()), None);
    }
}

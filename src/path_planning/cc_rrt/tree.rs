//! Search tree, cost bounds and path selection
//!
//! Nodes live in an append-only arena and refer to their parent by index.
//! Everything but `cost_ub` is fixed once a node is inserted; `cost_ub` only
//! ever decreases, through [`SearchTree::backpropagate`].

use nalgebra::Matrix3;
use ordered_float::OrderedFloat;

use crate::common::{Point2D, Pose2D};
use crate::path_planning::cc_rrt::config::CcRrtConfig;
use crate::path_planning::cc_rrt::heuristic::expected_travel_time;

/// Tree node
#[derive(Debug, Clone)]
pub struct Node {
    pub pose: Pose2D,
    /// Covariance over (x, y, yaw)
    pub covariance: Matrix3<f64>,
    pub parent: Option<usize>,
    /// Time since the start [s]
    pub time: f64,
    /// Aggregated chance-constraint violation
    pub risk: f64,
    /// time + risk_weight * risk
    pub cost: f64,
    /// Optimistic time to the goal
    pub cost_lb: f64,
    /// Best known bound on a goal-reaching path through this node
    pub cost_ub: f64,
}

/// Turns poses into nodes with cost and lower bound filled in
#[derive(Debug, Clone)]
pub struct CostModel {
    goal: Pose2D,
    risk_weight: f64,
    expected_speed: f64,
    expected_turn_rate: f64,
}

impl CostModel {
    pub fn new(goal: Pose2D, risk_weight: f64, expected_speed: f64, expected_turn_rate: f64) -> Self {
        Self {
            goal,
            risk_weight,
            expected_speed,
            expected_turn_rate,
        }
    }

    pub fn from_config(goal: Pose2D, config: &CcRrtConfig) -> Self {
        Self::new(
            goal,
            config.risk_weight,
            config.heuristic.expected_speed,
            config.heuristic.expected_turn_rate,
        )
    }

    pub fn goal(&self) -> &Pose2D {
        &self.goal
    }

    pub fn risk_weight(&self) -> f64 {
        self.risk_weight
    }

    pub fn cost(&self, time: f64, risk: f64) -> f64 {
        time + self.risk_weight * risk
    }

    /// Time to the goal at the expected speed and turn rate
    pub fn lower_bound(&self, pose: &Pose2D) -> f64 {
        expected_travel_time(
            pose,
            &self.goal.position(),
            self.expected_speed,
            self.expected_turn_rate,
        )
    }

    /// Detached node (no parent yet)
    pub fn node(&self, pose: Pose2D, covariance: Matrix3<f64>, time: f64, risk: f64) -> Node {
        Node {
            pose,
            covariance,
            parent: None,
            time,
            risk,
            cost: self.cost(time, risk),
            cost_lb: self.lower_bound(&pose),
            cost_ub: f64::INFINITY,
        }
    }
}

/// One node of a returned path
#[derive(Debug, Clone, PartialEq)]
pub struct PathPoint {
    pub pose: Pose2D,
    pub covariance: Matrix3<f64>,
    pub time: f64,
    pub risk: f64,
    pub cost_ub: f64,
}

impl From<&Node> for PathPoint {
    fn from(node: &Node) -> Self {
        Self {
            pose: node.pose,
            covariance: node.covariance,
            time: node.time,
            risk: node.risk,
            cost_ub: node.cost_ub,
        }
    }
}

/// Single-root tree of accepted nodes with a bounded size
#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<Node>,
    goal_leaves: Vec<usize>,
    max_nodes: usize,
}

impl SearchTree {
    pub fn new(mut root: Node, max_nodes: usize) -> Self {
        root.parent = None;
        SearchTree {
            nodes: vec![root],
            goal_leaves: Vec::new(),
            max_nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.nodes.len() >= self.max_nodes
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn goal_leaves(&self) -> &[usize] {
        &self.goal_leaves
    }

    /// Append `node` under `parent`; `None` once the tree is full
    pub fn insert(&mut self, parent: usize, mut node: Node) -> Option<usize> {
        if self.is_full() || parent >= self.nodes.len() {
            return None;
        }
        node.parent = Some(parent);
        self.nodes.push(node);
        Some(self.nodes.len() - 1)
    }

    pub fn add_goal_leaf(&mut self, index: usize) {
        self.goal_leaves.push(index);
    }

    /// Indices from `index` up to the root
    pub fn lineage(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(index), move |&i| self.nodes[i].parent)
    }

    /// Path from the root down to `index`
    pub fn path_to(&self, index: usize) -> Vec<PathPoint> {
        let mut path: Vec<PathPoint> = self.lineage(index).map(|i| PathPoint::from(&self.nodes[i])).collect();
        path.reverse();
        path
    }

    /// Tighten `cost_ub` along the branch ending at a goal leaf.
    ///
    /// Nodes inside the goal region take their lower bound. Above them the
    /// bound grows by one step per hop plus the node's weighted risk, floored
    /// at the node's own lower bound.
    pub fn backpropagate(&mut self, leaf: usize, goal: &Point2D, goal_radius: f64, dt: f64, risk_weight: f64) {
        let mut running = f64::INFINITY;
        let mut current = Some(leaf);

        while let Some(i) = current {
            let node = &mut self.nodes[i];
            if node.pose.position().distance(goal) >= goal_radius {
                break;
            }
            node.cost_ub = node.cost_ub.min(node.cost_lb);
            running = (running + dt).min(node.cost_ub);
            current = node.parent;
        }

        while let Some(i) = current {
            let node = &mut self.nodes[i];
            let candidate = (running + dt + node.risk * risk_weight).max(node.cost_lb);
            node.cost_ub = node.cost_ub.min(candidate);
            running = (running + dt).min(node.cost_ub);
            current = node.parent;
        }
    }

    /// Largest `cost_ub` on the path from the root to `index`
    pub fn path_max_upper_bound(&self, index: usize) -> f64 {
        self.lineage(index)
            .map(|i| self.nodes[i].cost_ub)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Goal leaf whose path has the smallest maximum `cost_ub`
    pub fn select_minimax(&self) -> Option<usize> {
        self.goal_leaves
            .iter()
            .copied()
            .min_by_key(|&leaf| OrderedFloat(self.path_max_upper_bound(leaf)))
    }
}

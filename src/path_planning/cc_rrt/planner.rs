//! CC-RRT search driver
//!
//! Grows a tree of closed-loop maneuvers from the start pose, keeps upper
//! bounds on the cost-to-goal current by backpropagation, and returns the
//! goal-reaching path whose worst upper bound is smallest.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;

use crate::common::{angle_wrap, AreaBounds, PathPlanner, PlannerError, PlannerResult, Point2D, Pose2D};
use crate::geometry::OrientedRect;
use crate::path_planning::cc_rrt::chance_constraint::{is_chance_feasible, RiskEvaluator, RiskSummary};
use crate::path_planning::cc_rrt::config::CcRrtConfig;
use crate::path_planning::cc_rrt::heuristic::{best_fallback, draw_strategy, rank, select_candidates};
use crate::path_planning::cc_rrt::obstacle::{Obstacle, VehicleFootprint};
use crate::path_planning::cc_rrt::steering::Steering;
use crate::path_planning::cc_rrt::tree::{CostModel, Node, PathPoint, SearchTree};
use crate::path_planning::cc_rrt::uncertainty::UnicycleModel;

/// How the search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    /// A goal leaf was selected by the minimax rule
    PathFound,
    /// No goal leaf; the path ends at the best-effort node
    NoPathFound,
}

/// Timing and first-path statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanMetrics {
    pub first_path_iteration: Option<usize>,
    pub first_path_nodes: Option<usize>,
    pub first_path_time: Option<Duration>,
    pub total_time: Duration,
}

/// Outcome of one planning run
#[derive(Debug, Clone)]
pub struct PlanResult {
    pub status: PlanStatus,
    /// Root first
    pub path: Vec<PathPoint>,
    /// Risk of every path node against the ground-truth obstacles
    pub ground_truth_risk: Vec<f64>,
    pub risk_summary: Option<RiskSummary>,
    /// Path nodes whose planning risk exceeds 1 - p_safe
    pub chance_violations: usize,
    pub iterations: usize,
    pub tree_size: usize,
    pub goal_leaves: usize,
    pub metrics: Option<PlanMetrics>,
}

impl PlanResult {
    pub fn is_path_found(&self) -> bool {
        self.status == PlanStatus::PathFound
    }

    pub fn poses(&self) -> Vec<Pose2D> {
        self.path.iter().map(|p| p.pose).collect()
    }

    pub fn final_pose(&self) -> Option<Pose2D> {
        self.path.last().map(|p| p.pose)
    }
}

/// Chance-constrained RRT planner
pub struct CcRrtPlanner {
    footprint: VehicleFootprint,
    bounds: AreaBounds,
    /// Obstacles as seen by the planner, usually inflated
    obstacles: Vec<Obstacle>,
    /// Obstacles used to score the final path
    ground_truth: Vec<Obstacle>,
    config: CcRrtConfig,
    rng: StdRng,
    tree: Option<SearchTree>,
}

impl CcRrtPlanner {
    pub fn new(
        footprint: VehicleFootprint,
        bounds: AreaBounds,
        obstacles: Vec<Obstacle>,
        ground_truth: Vec<Obstacle>,
        config: CcRrtConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        CcRrtPlanner {
            footprint,
            bounds,
            obstacles,
            ground_truth,
            config,
            rng,
            tree: None,
        }
    }

    pub fn config(&self) -> &CcRrtConfig {
        &self.config
    }

    pub fn bounds(&self) -> &AreaBounds {
        &self.bounds
    }

    pub fn footprint(&self) -> &VehicleFootprint {
        &self.footprint
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn ground_truth_obstacles(&self) -> &[Obstacle] {
        &self.ground_truth
    }

    /// Tree of the last run
    pub fn tree(&self) -> Option<&SearchTree> {
        self.tree.as_ref()
    }

    fn validate(&self, start: &Pose2D, goal: &Pose2D) -> PlannerResult<()> {
        self.config.validate()?;
        if !self.bounds.is_valid() {
            return Err(PlannerError::InvalidParameter(format!("invalid planning area {:?}", self.bounds)));
        }
        if !self.footprint.is_valid() {
            return Err(PlannerError::InvalidParameter(format!("invalid footprint {:?}", self.footprint)));
        }
        if !start.is_finite() || !goal.is_finite() {
            return Err(PlannerError::InvalidParameter("start and goal must be finite".to_string()));
        }
        if !self.bounds.contains(start.x, start.y) {
            return Err(PlannerError::InvalidParameter(format!(
                "start ({:.2}, {:.2}) lies outside the planning area",
                start.x, start.y
            )));
        }
        Ok(())
    }
}

impl PathPlanner for CcRrtPlanner {
    type Output = PlanResult;

    fn plan(&mut self, start: Pose2D, goal: Pose2D) -> PlannerResult<PlanResult> {
        self.validate(&start, &goal)?;
        info!("Begin CC-RRT");
        let started = Instant::now();

        let config = &self.config;
        let model = UnicycleModel::from_config(&config.uncertainty);
        let cost_model = CostModel::from_config(goal, config);
        let steering = Steering::new(self.footprint, self.bounds, &self.obstacles, &model, &cost_model, config);
        let root = steering.root_node(start, config.uncertainty.initial_covariance_matrix());

        let mut search = Search {
            config,
            steering: &steering,
            cost_model: &cost_model,
            sampler: Sampler::new(&self.bounds, &self.obstacles),
            rng: &mut self.rng,
            tree: SearchTree::new(root, config.search.max_nodes),
            goal: goal.position(),
            iterations: 0,
            started,
            metrics: PlanMetrics::default(),
        };
        search.run()?;

        let Search { tree, iterations, mut metrics, .. } = search;
        info!("Tree with {} nodes generated", tree.len());

        let (status, end) = match tree.select_minimax() {
            Some(leaf) => {
                info!("{} paths found, selected leaf {}", tree.goal_leaves().len(), leaf);
                (PlanStatus::PathFound, leaf)
            }
            None => {
                warn!("No path to the goal found, reporting the best-effort endpoint");
                let end = best_fallback(tree.nodes(), &goal.position(), &config.heuristic).unwrap_or(0);
                (PlanStatus::NoPathFound, end)
            }
        };

        let path = tree.path_to(end);
        let evaluator = RiskEvaluator::new(self.footprint);
        let ground_truth_risk =
            evaluator.profile(path.iter().map(|p| (&p.pose, &p.covariance)), &self.ground_truth);
        let chance_violations = path
            .iter()
            .filter(|p| !is_chance_feasible(p.risk, config.p_safe))
            .count();
        metrics.total_time = started.elapsed();

        let result = PlanResult {
            status,
            risk_summary: RiskSummary::from_profile(&ground_truth_risk),
            ground_truth_risk,
            path,
            chance_violations,
            iterations,
            tree_size: tree.len(),
            goal_leaves: tree.goal_leaves().len(),
            metrics: config.collect_metrics.then_some(metrics),
        };
        self.tree = Some(tree);
        Ok(result)
    }
}

/// Rejection sampler over the planning area
struct Sampler {
    x: Uniform<f64>,
    y: Uniform<f64>,
    bounds: AreaBounds,
    obstacle_rects: Vec<OrientedRect>,
}

impl Sampler {
    fn new(bounds: &AreaBounds, obstacles: &[Obstacle]) -> Self {
        Sampler {
            x: Uniform::new(bounds.xmin, bounds.xmax),
            y: Uniform::new(bounds.ymin, bounds.ymax),
            bounds: *bounds,
            obstacle_rects: obstacles.iter().map(Obstacle::rect).collect(),
        }
    }

    /// Uniform point strictly inside the area and outside every obstacle
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, max_attempts: usize) -> PlannerResult<Point2D> {
        for _ in 0..max_attempts {
            let p = Point2D::new(rng.sample(self.x), rng.sample(self.y));
            if self.bounds.contains(p.x, p.y) && !self.obstacle_rects.iter().any(|r| r.contains_point(&p)) {
                return Ok(p);
            }
        }
        Err(PlannerError::OverconstrainedSampling { attempts: max_attempts })
    }
}

/// State of one planning run
struct Search<'a> {
    config: &'a CcRrtConfig,
    steering: &'a Steering<'a>,
    cost_model: &'a CostModel,
    sampler: Sampler,
    rng: &'a mut StdRng,
    tree: SearchTree,
    goal: Point2D,
    iterations: usize,
    started: Instant,
    metrics: PlanMetrics,
}

impl Search<'_> {
    fn run(&mut self) -> PlannerResult<()> {
        let config = self.config;
        let search = &config.search;
        let heuristic = &config.heuristic;

        while self.iterations < search.max_iter && !self.is_done() {
            if self.iterations % 10 == 0 {
                debug!("Iter: {}, number of nodes: {}", self.iterations, self.tree.len());
            }
            self.iterations += 1;

            let sample = match self.sampler.sample(&mut *self.rng, search.max_sample_attempts) {
                Ok(sample) => sample,
                // a grown tree still yields a path or a fallback
                Err(err) if self.tree.len() > 1 => {
                    warn!("Stopping at iteration {}: {}", self.iterations, err);
                    break;
                }
                Err(err) => return Err(err),
            };
            let strategy = draw_strategy(&mut *self.rng, self.tree.goal_leaves().len(), heuristic);
            let ranked = rank(self.tree.nodes(), &sample, strategy, heuristic);

            for index in select_candidates(&ranked, heuristic.n_nearest, heuristic.stride) {
                let near = self.tree.node(index).pose;
                if near.position().distance(&sample) < config.distance_threshold {
                    continue;
                }
                if !self.heading_reachable(&near, &sample) {
                    continue;
                }
                self.extend(index, &sample);
                if self.is_done() {
                    break;
                }
            }
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.tree.goal_leaves().len() >= self.config.search.max_goal_leaves || self.tree.is_full()
    }

    fn in_goal_region(&self, node: &Node) -> bool {
        node.pose.position().distance(&self.goal) < self.config.distance_threshold
    }

    /// Bearing to `target` within the allowed heading change of `pose`
    fn heading_reachable(&self, pose: &Pose2D, target: &Point2D) -> bool {
        let bearing = pose.position().bearing_to(target);
        angle_wrap(pose.yaw - bearing).abs() <= self.config.steering.max_heading_change
    }

    /// Steer from `from` towards `sample`, then try connecting the new branch to the goal
    fn extend(&mut self, from: usize, sample: &Point2D) {
        let maneuver = self.steering.steer(self.tree.node(from), sample);
        let inserted = self.insert_chain(from, maneuver);

        if let Some(&last) = inserted.last() {
            if self.in_goal_region(self.tree.node(last)) {
                self.record_goal_leaf(last);
                return;
            }
        }

        let goal = self.goal;
        let stride = self.config.search.goal_connect_stride;
        for &index in inserted.iter().step_by(stride) {
            if self.is_done() {
                break;
            }
            let pose = self.tree.node(index).pose;
            if !self.heading_reachable(&pose, &goal) {
                continue;
            }
            let connection = self.steering.steer(self.tree.node(index), &goal);
            if !connection.last().is_some_and(|n| self.in_goal_region(n)) {
                continue;
            }
            let chain = self.insert_chain(index, connection);
            if let Some(&last) = chain.last() {
                if self.in_goal_region(self.tree.node(last)) {
                    self.record_goal_leaf(last);
                }
            }
        }
    }

    /// Insert `nodes` as a chain under `parent`, stopping when the tree is full
    fn insert_chain(&mut self, parent: usize, nodes: Vec<Node>) -> Vec<usize> {
        let mut ids = Vec::with_capacity(nodes.len());
        let mut parent = parent;
        for node in nodes {
            match self.tree.insert(parent, node) {
                Some(id) => {
                    ids.push(id);
                    parent = id;
                }
                None => break,
            }
        }
        ids
    }

    fn record_goal_leaf(&mut self, leaf: usize) {
        self.tree.add_goal_leaf(leaf);
        self.tree.backpropagate(
            leaf,
            &self.goal,
            self.config.distance_threshold,
            self.config.dt,
            self.cost_model.risk_weight(),
        );

        if self.metrics.first_path_iteration.is_none() {
            let elapsed = self.started.elapsed();
            info!(
                "First path found at iteration {} with {} nodes after {:.3} s",
                self.iterations,
                self.tree.len(),
                elapsed.as_secs_f64()
            );
            self.metrics.first_path_iteration = Some(self.iterations);
            self.metrics.first_path_nodes = Some(self.tree.len());
            self.metrics.first_path_time = Some(elapsed);
        }
    }
}

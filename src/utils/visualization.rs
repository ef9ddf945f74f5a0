//! Visualization utilities for cc_rrt
//!
//! Provides a unified interface for plotting planning scenes using gnuplot.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};
use nalgebra::{Matrix2, SymmetricEigen};

use crate::common::{PlannerError, PlannerResult, Point2D, Pose2D};
use crate::geometry::OrientedRect;
use crate::path_planning::cc_rrt::{Node, PathPoint};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const INFLATED: &str = ORANGE;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const PATH: &str = RED;
    pub const TREE: &str = GRAY;
    pub const UNCERTAINTY: &str = "#35C788";
}

/// Style for line rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: colors::PATH.to_string(),
            line_width: 2.0,
            caption: "Path".to_string(),
        }
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

/// One plotted series, drawn in insertion order
#[derive(Debug, Clone)]
enum Layer {
    Lines {
        x: Vec<f64>,
        y: Vec<f64>,
        color: String,
        line_width: f64,
        caption: Option<String>,
    },
    Points {
        x: Vec<f64>,
        y: Vec<f64>,
        style: PointStyle,
    },
}

/// Main visualizer struct
///
/// Series are collected first and drawn onto a single set of axes when the
/// figure is shown or saved.
pub struct Visualizer {
    layers: Vec<Layer>,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    /// Create a new visualizer
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    fn push_lines(&mut self, x: Vec<f64>, y: Vec<f64>, color: &str, line_width: f64, caption: Option<&str>) {
        self.layers.push(Layer::Lines {
            x,
            y,
            color: color.to_string(),
            line_width,
            caption: caption.map(str::to_string),
        });
    }

    /// Plot a polyline from x,y vectors
    pub fn plot_path_xy(&mut self, x: &[f64], y: &[f64], style: &PathStyle) -> &mut Self {
        self.push_lines(x.to_vec(), y.to_vec(), &style.color, style.line_width, Some(&style.caption));
        self
    }

    /// Plot the poses of a planned path
    pub fn plot_path(&mut self, path: &[PathPoint], style: &PathStyle) -> &mut Self {
        let (x, y): (Vec<f64>, Vec<f64>) = path.iter().map(|p| (p.pose.x, p.pose.y)).unzip();
        self.push_lines(x, y, &style.color, style.line_width, Some(&style.caption));
        self
    }

    /// Plot every parent-child edge of a search tree as one series.
    ///
    /// Edges are separated by NaN rows, which gnuplot draws as gaps.
    pub fn plot_tree(&mut self, nodes: &[Node]) -> &mut Self {
        let (x, y) = tree_segments(nodes);
        self.push_lines(x, y, colors::TREE, 0.5, Some("Tree"));
        self
    }

    /// Plot rectangle outlines; only the first one carries the caption
    pub fn plot_rects(&mut self, rects: &[OrientedRect], style: &PathStyle) -> &mut Self {
        for (i, rect) in rects.iter().enumerate() {
            let (x, y) = closed_outline(rect);
            let caption = (i == 0).then_some(style.caption.as_str());
            self.push_lines(x, y, &style.color, style.line_width, caption);
        }
        self
    }

    /// Plot the `n_sigma` ellipse of a 2x2 position covariance
    pub fn plot_covariance_ellipse(&mut self, pose: &Pose2D, covariance: &Matrix2<f64>, n_sigma: f64) -> &mut Self {
        let (x, y) = covariance_ellipse(&pose.position(), covariance, n_sigma);
        self.push_lines(x, y, colors::UNCERTAINTY, 1.0, None);
        self
    }

    /// Plot a single point (start, goal, etc.)
    pub fn plot_point(&mut self, point: Point2D, style: &PointStyle) -> &mut Self {
        self.layers.push(Layer::Points {
            x: vec![point.x],
            y: vec![point.y],
            style: style.clone(),
        });
        self
    }

    /// Plot start pose with a heading tick
    pub fn plot_start(&mut self, pose: &Pose2D) -> &mut Self {
        self.plot_heading(pose, colors::START);
        self.plot_point(pose.position(), &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    /// Plot goal pose with a heading tick
    pub fn plot_goal(&mut self, pose: &Pose2D) -> &mut Self {
        self.plot_heading(pose, colors::GOAL);
        self.plot_point(pose.position(), &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    fn plot_heading(&mut self, pose: &Pose2D, color: &str) {
        let len = 2.0;
        let end_x = pose.x + len * pose.yaw.cos();
        let end_y = pose.y + len * pose.yaw.sin();
        self.push_lines(vec![pose.x, end_x], vec![pose.y, end_y], color, 2.0, None);
    }

    /// Finalize and show the plot
    pub fn show(&self) -> PlannerResult<()> {
        self.render()
            .show()
            .map(|_| ())
            .map_err(|e| PlannerError::VisualizationError(e.to_string()))
    }

    /// Save plot to PNG file
    pub fn save_png(&self, path: &str, width: u32, height: u32) -> PlannerResult<()> {
        self.render()
            .save_to_png(path, width, height)
            .map_err(|e| PlannerError::VisualizationError(e.to_string()))
    }

    /// Save plot to SVG file
    pub fn save_svg(&self, path: &str) -> PlannerResult<()> {
        self.render()
            .save_to_svg(path, 800, 600)
            .map_err(|e| PlannerError::VisualizationError(e.to_string()))
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();

        for layer in &self.layers {
            match layer {
                Layer::Lines { x, y, color, line_width, caption } => match caption {
                    Some(caption) => {
                        axes.lines(x, y, &[Caption(caption), Color(color), LineWidth(*line_width)]);
                    }
                    None => {
                        axes.lines(x, y, &[Color(color), LineWidth(*line_width)]);
                    }
                },
                Layer::Points { x, y, style } => {
                    axes.points(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        PointSymbol(style.symbol),
                        PointSize(style.size),
                    ]);
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Corner coordinates with the first corner repeated at the end
fn closed_outline(rect: &OrientedRect) -> (Vec<f64>, Vec<f64>) {
    rect.corners()
        .iter()
        .chain(rect.corners().first())
        .map(|c| (c.x, c.y))
        .unzip()
}

fn tree_segments(nodes: &[Node]) -> (Vec<f64>, Vec<f64>) {
    let mut x = Vec::with_capacity(nodes.len() * 3);
    let mut y = Vec::with_capacity(nodes.len() * 3);
    for node in nodes {
        if let Some(parent) = node.parent.and_then(|i| nodes.get(i)) {
            x.extend([parent.pose.x, node.pose.x, f64::NAN]);
            y.extend([parent.pose.y, node.pose.y, f64::NAN]);
        }
    }
    (x, y)
}

fn covariance_ellipse(center: &Point2D, covariance: &Matrix2<f64>, n_sigma: f64) -> (Vec<f64>, Vec<f64>) {
    let eigen = SymmetricEigen::new(*covariance);
    let axes = eigen.eigenvalues.map(|v| n_sigma * v.max(0.0).sqrt());
    let vectors = eigen.eigenvectors;

    (0..=36)
        .map(|i| {
            let t = i as f64 / 36.0 * 2.0 * std::f64::consts::PI;
            let local = nalgebra::Vector2::new(axes[0] * t.cos(), axes[1] * t.sin());
            let p = vectors * local;
            (center.x + p[0], center.y + p[1])
        })
        .unzip()
}

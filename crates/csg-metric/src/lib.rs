pub mod boundary;
pub mod chamfer;
pub mod iou;
pub mod transform;

use std::fmt;
use std::str::FromStr;

use csg_core::{Canvas, GridShape};
use serde::{Deserialize, Serialize};

pub use boundary::{boundary_count, boundary_mask};
pub use chamfer::chamfer_distance;
pub use iou::iou_distance;
pub use transform::squared_distance_field;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("canvas shape {canvas} does not match target shape {target}")]
    ShapeMismatch { canvas: GridShape, target: GridShape },
    #[error("unknown metric '{0}', expected 'chamfer' or 'iou'")]
    Unknown(String),
}

/// Dissimilarity measure between a rendered canvas and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Chamfer,
    Iou,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::Chamfer => "chamfer",
            Metric::Iou => "iou",
        }
    }

    pub fn distance(self, canvas: &Canvas, target: &Canvas) -> Result<f64, MetricError> {
        if canvas.shape() != target.shape() {
            return Err(MetricError::ShapeMismatch {
                canvas: canvas.shape(),
                target: target.shape(),
            });
        }
        Ok(match self {
            Metric::Chamfer => chamfer_distance(canvas, target),
            Metric::Iou => iou_distance(canvas, target),
        })
    }

    /// Largest score the metric assigns on this grid; used for programs that cannot be drawn.
    pub fn worst_distance(self, shape: GridShape) -> f64 {
        match self {
            Metric::Chamfer => shape.diagonal().max(1.0),
            Metric::Iou => 1.0,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = MetricError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chamfer" => Ok(Metric::Chamfer),
            "iou" => Ok(Metric::Iou),
            _ => Err(MetricError::Unknown(value.to_string())),
        }
    }
}

/// Scores `canvas` against `target`; fails when their grid shapes differ.
pub fn distance(canvas: &Canvas, target: &Canvas, metric: Metric) -> Result<f64, MetricError> {
    metric.distance(canvas, target)
}

#[cfg(test)]
mod tests {
    use csg_core::{Canvas, Circle, GridShape, rasterize};

    use super::{Metric, MetricError, distance};

    #[test]
    fn parses_metric_names() {
        assert_eq!("chamfer".parse::<Metric>(), Ok(Metric::Chamfer));
        assert_eq!(" IoU ".parse::<Metric>(), Ok(Metric::Iou));
        assert_eq!(
            "hausdorff".parse::<Metric>(),
            Err(MetricError::Unknown("hausdorff".to_string()))
        );
        let parsed: Metric = serde_json::from_str("\"iou\"").expect("serde name");
        assert_eq!(parsed, Metric::Iou);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let a = Canvas::empty(GridShape::planar(8, 8));
        let b = Canvas::empty(GridShape::planar(8, 9));
        let err = distance(&a, &b, Metric::Chamfer).expect_err("shapes differ");
        assert!(err.to_string().contains("8x8 does not match target shape 8x9"));
    }

    #[test]
    fn self_distance_is_zero_for_every_metric() {
        let shape = GridShape::planar(16, 16);
        let canvas = rasterize(&Circle::new([8.0, 8.0], 5.0), shape);
        for metric in [Metric::Chamfer, Metric::Iou] {
            assert_eq!(distance(&canvas, &canvas, metric), Ok(0.0));
            assert!(metric.worst_distance(shape) > 0.0);
        }
    }
}

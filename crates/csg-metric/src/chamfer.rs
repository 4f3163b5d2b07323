use csg_core::Canvas;

use crate::boundary::boundary_mask;
use crate::iou::iou_distance;
use crate::transform::squared_distance_field;

/// Symmetric chamfer distance between the boundaries of two same-shaped canvases.
///
/// Mean of the two directed averages of nearest-boundary distances, measured
/// in cells. Two blank canvases score 0; a blank canvas against a non-blank
/// one scores the grid diagonal. Canvases with equal boundaries but different
/// occupancy fall back to the (positive) IoU distance, so 0 always means identical.
pub fn chamfer_distance(a: &Canvas, b: &Canvas) -> f64 {
    let shape = a.shape();
    assert_eq!(shape, b.shape(), "chamfer operands must share a grid shape");

    let edges_a = boundary_mask(a);
    let edges_b = boundary_mask(b);
    let count_a = edges_a.iter().filter(|&&edge| edge).count();
    let count_b = edges_b.iter().filter(|&&edge| edge).count();

    match (count_a, count_b) {
        (0, 0) => return 0.0,
        (0, _) | (_, 0) => return shape.diagonal().max(1.0),
        _ => {}
    }

    let field_a = squared_distance_field(shape, &edges_a);
    let field_b = squared_distance_field(shape, &edges_b);
    let a_to_b = directed_mean(&edges_a, &field_b, count_a);
    let b_to_a = directed_mean(&edges_b, &field_a, count_b);
    let distance = 0.5 * (a_to_b + b_to_a);

    if distance == 0.0 && a != b {
        iou_distance(a, b)
    } else {
        distance
    }
}

fn directed_mean(edges: &[bool], field: &[f64], count: usize) -> f64 {
    let total = edges
        .iter()
        .zip(field)
        .filter(|(edge, _)| **edge)
        .map(|(_, squared)| squared.sqrt())
        .sum::<f64>();
    total / count as f64
}

#[cfg(test)]
mod tests {
    use csg_core::{Canvas, Circle, GridShape, Square, rasterize};

    use super::chamfer_distance;

    fn point(shape: GridShape, x: usize, y: usize) -> Canvas {
        let mut canvas = Canvas::empty(shape);
        canvas.set(x, y, 0, true);
        canvas
    }

    #[test]
    fn identical_canvases_score_zero() {
        let shape = GridShape::planar(32, 32);
        let canvas = rasterize(&Circle::new([12.0, 15.0], 7.0), shape);
        assert_eq!(chamfer_distance(&canvas, &canvas.clone()), 0.0);
        assert_eq!(
            chamfer_distance(&Canvas::empty(shape), &Canvas::empty(shape)),
            0.0
        );
    }

    #[test]
    fn single_cells_score_their_euclidean_offset() {
        let shape = GridShape::planar(10, 10);
        let d = chamfer_distance(&point(shape, 2, 2), &point(shape, 5, 6));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn distance_is_symmetric_and_grows_with_offset() {
        let shape = GridShape::planar(40, 40);
        let base = rasterize(&Square::new([20.0, 20.0], 6.0), shape);
        let near = rasterize(&Square::new([21.0, 20.0], 6.0), shape);
        let far = rasterize(&Square::new([25.0, 20.0], 6.0), shape);

        let d_near = chamfer_distance(&base, &near);
        let d_far = chamfer_distance(&base, &far);
        assert!((d_near - chamfer_distance(&near, &base)).abs() < 1e-12);
        assert!(d_near > 0.0);
        assert!(d_far > d_near, "near={d_near}, far={d_far}");
    }

    #[test]
    fn blank_against_shape_scores_diagonal() {
        let shape = GridShape::planar(4, 5);
        let d = chamfer_distance(&Canvas::empty(shape), &point(shape, 1, 1));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn equal_boundaries_with_different_interiors_stay_positive() {
        let shape = GridShape::planar(5, 5);
        let filled = rasterize(&Square::new([2.0, 2.0], 1.5), shape);
        let mut ring = filled.clone();
        ring.set(2, 2, 0, false);
        let d = chamfer_distance(&filled, &ring);
        assert!((d - 1.0 / 9.0).abs() < 1e-12);
    }
}

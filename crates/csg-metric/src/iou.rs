use csg_core::Canvas;

/// `1 - |A ∩ B| / |A ∪ B|`; two blank canvases score 0.
pub fn iou_distance(a: &Canvas, b: &Canvas) -> f64 {
    assert_eq!(a.shape(), b.shape(), "iou operands must share a grid shape");
    let (mut shared, mut either) = (0usize, 0usize);
    for (&x, &y) in a.cells().iter().zip(b.cells()) {
        shared += usize::from(x && y);
        either += usize::from(x || y);
    }
    if either == 0 {
        0.0
    } else {
        1.0 - shared as f64 / either as f64
    }
}

#[cfg(test)]
mod tests {
    use csg_core::{Canvas, GridShape};

    use super::iou_distance;

    fn strip(bits: &[u8]) -> Canvas {
        let cells = bits.iter().map(|&bit| bit == 1).collect::<Vec<_>>();
        Canvas::from_cells(GridShape::planar(bits.len(), 1), cells).expect("valid strip")
    }

    #[test]
    fn partial_overlap() {
        let a = strip(&[1, 1, 1, 1, 0, 0]);
        let b = strip(&[0, 0, 1, 1, 1, 1]);
        assert!((iou_distance(&a, &b) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn identical_and_disjoint_extremes() {
        let a = strip(&[1, 0, 1]);
        assert_eq!(iou_distance(&a, &a), 0.0);
        assert_eq!(iou_distance(&a, &strip(&[0, 1, 0])), 1.0);
        assert_eq!(iou_distance(&strip(&[0, 0]), &strip(&[0, 0])), 0.0);
    }
}

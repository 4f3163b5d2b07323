use crate::canvas::{Canvas, GridShape};
use crate::primitives::Sdf;

/// Rasterizes a shape by testing every cell sample point for strict membership.
pub fn rasterize<S>(sdf: &S, shape: GridShape) -> Canvas
where
    S: Sdf + ?Sized,
{
    let mut canvas = Canvas::empty(shape);
    rasterize_into(sdf, &mut canvas);
    canvas
}

/// Like [`rasterize`], reusing the allocation of an existing canvas.
pub fn rasterize_into<S>(sdf: &S, canvas: &mut Canvas)
where
    S: Sdf + ?Sized,
{
    let shape = canvas.shape();
    for (index, cell) in canvas.cells_mut().iter_mut().enumerate() {
        *cell = sdf.contains(shape.point(index));
    }
}

#[cfg(test)]
mod tests {
    use crate::canvas::GridShape;
    use crate::primitives::{Circle, Cube, Square};

    use super::rasterize;

    #[test]
    fn square_rasterizes_to_odd_block() {
        let canvas = rasterize(&Square::new([4.0, 4.0], 2.0), GridShape::planar(9, 9));
        // Cells 3..=5 on each axis are strictly within half side 2.
        assert_eq!(canvas.count(), 9);
        assert!(canvas.get(3, 3, 0));
        assert!(canvas.get(5, 5, 0));
        assert!(!canvas.get(6, 4, 0));
    }

    #[test]
    fn circle_cell_count_is_reproducible() {
        let shape = GridShape::planar(16, 16);
        let a = rasterize(&Circle::new([8.0, 8.0], 3.0), shape);
        let b = rasterize(&Circle::new([8.0, 8.0], 3.0), shape);
        assert_eq!(a, b);
        // x^2 + y^2 < 9 holds for 25 lattice offsets.
        assert_eq!(a.count(), 25);
    }

    #[test]
    fn cube_fills_volume_block() {
        let canvas = rasterize(&Cube::new([2.0, 2.0, 2.0], 1.5), GridShape::volume(5, 5, 5));
        assert_eq!(canvas.count(), 27);
    }
}

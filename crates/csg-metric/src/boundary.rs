use csg_core::Canvas;

/// Marks occupied cells that touch background along a grid axis.
///
/// Neighbours outside the grid count as background. Planar canvases only look
/// at in-plane neighbours.
pub fn boundary_mask(canvas: &Canvas) -> Vec<bool> {
    let shape = canvas.shape();
    let [width, height, depth] = shape.dims();
    let cells = canvas.cells();
    let volumetric = shape.rank() == 3;
    let mut mask = vec![false; cells.len()];

    for (index, &occupied) in cells.iter().enumerate() {
        if !occupied {
            continue;
        }
        let [x, y, z] = shape.coords(index);
        let mut edge = x == 0
            || x + 1 == width
            || y == 0
            || y + 1 == height
            || !cells[index - 1]
            || !cells[index + 1]
            || !cells[index - width]
            || !cells[index + width];
        if volumetric && !edge {
            let plane = width * height;
            edge = z == 0 || z + 1 == depth || !cells[index - plane] || !cells[index + plane];
        }
        mask[index] = edge;
    }

    mask
}

/// Number of boundary cells.
pub fn boundary_count(canvas: &Canvas) -> usize {
    boundary_mask(canvas).into_iter().filter(|&edge| edge).count()
}

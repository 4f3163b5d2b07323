use csg_core::GridShape;

/// Stand-in for "no seed on this line"; larger than any squared grid distance.
const FAR: f64 = 1.0e12;

/// Exact squared Euclidean distance from every cell to the nearest seed cell.
///
/// Separable lower-envelope transform, one pass per grid axis. Cells are
/// sampled at integer coordinates, matching the renderer. With no seeds at
/// all every entry is at least `1e12`.
pub fn squared_distance_field(shape: GridShape, seeds: &[bool]) -> Vec<f64> {
    assert_eq!(seeds.len(), shape.len(), "seed mask must cover the grid");
    let [width, height, depth] = shape.dims();
    let mut field = seeds
        .iter()
        .map(|&seed| if seed { 0.0 } else { FAR })
        .collect::<Vec<_>>();

    let longest = width.max(height).max(depth);
    let mut scratch = LineScratch::new(longest);

    let axes = [(width, 1usize), (height, width), (depth, width * height)];
    for (axis, &(len, stride)) in axes.iter().enumerate() {
        if len < 2 {
            continue;
        }
        for start in line_starts(shape, axis) {
            scratch.transform(&mut field, start, stride, len);
        }
    }

    field
}

fn line_starts(shape: GridShape, axis: usize) -> Vec<usize> {
    let [width, height, depth] = shape.dims();
    let mut starts = Vec::new();
    match axis {
        0 => {
            for z in 0..depth {
                for y in 0..height {
                    starts.push(shape.index(0, y, z));
                }
            }
        }
        1 => {
            for z in 0..depth {
                for x in 0..width {
                    starts.push(shape.index(x, 0, z));
                }
            }
        }
        _ => {
            for y in 0..height {
                for x in 0..width {
                    starts.push(shape.index(x, y, 0));
                }
            }
        }
    }
    starts
}

#[derive(Debug)]
struct LineScratch {
    values: Vec<f64>,
    vertices: Vec<usize>,
    bounds: Vec<f64>,
}

impl LineScratch {
    fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
            vertices: vec![0; len],
            bounds: vec![0.0; len + 1],
        }
    }

    fn transform(&mut self, field: &mut [f64], start: usize, stride: usize, len: usize) {
        for i in 0..len {
            self.values[i] = field[start + i * stride];
        }
        let f = &self.values[..len];
        let v = &mut self.vertices;
        let z = &mut self.bounds;

        let mut k = 0usize;
        v[0] = 0;
        z[0] = f64::NEG_INFINITY;
        z[1] = f64::INFINITY;
        for q in 1..len {
            let mut s = parabola_intersection(f, q, v[k]);
            while s <= z[k] {
                k -= 1;
                s = parabola_intersection(f, q, v[k]);
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = f64::INFINITY;
        }

        k = 0;
        for q in 0..len {
            while z[k + 1] < q as f64 {
                k += 1;
            }
            let offset = q as f64 - v[k] as f64;
            field[start + q * stride] = offset * offset + f[v[k]];
        }
    }
}

#[inline]
fn parabola_intersection(f: &[f64], q: usize, p: usize) -> f64 {
    let (qf, pf) = (q as f64, p as f64);
    ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
}

use std::fmt;

use crate::primitives::Point3;

/// Marks a comment line in the `grid` text format.
const COMMENT: &str = "//";

/// Dimensions of an occupancy grid. Planar grids have `depth == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    width: usize,
    height: usize,
    depth: usize,
    rank: usize,
}

impl GridShape {
    pub fn planar(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self {
            width,
            height,
            depth: 1,
            rank: 2,
        }
    }

    pub fn volume(width: usize, height: usize, depth: usize) -> Self {
        assert!(
            width > 0 && height > 0 && depth > 0,
            "grid dimensions must be positive"
        );
        Self {
            width,
            height,
            depth,
            rank: 3,
        }
    }

    /// Square (rank 2) or cubic (rank 3) grid with `resolution` cells per side.
    pub fn for_rank(rank: usize, resolution: usize) -> Self {
        if rank == 3 {
            Self::volume(resolution, resolution, resolution)
        } else {
            Self::planar(resolution, resolution)
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Extents ordered as `[width, height, depth]`.
    pub fn dims(&self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }

    pub fn len(&self) -> usize {
        self.width * self.height * self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    #[inline]
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let x = index % self.width;
        let y = (index / self.width) % self.height;
        let z = index / (self.width * self.height);
        [x, y, z]
    }

    /// Sample location of a cell: its integer coordinates.
    #[inline]
    pub fn point(&self, index: usize) -> Point3 {
        let [x, y, z] = self.coords(index);
        [x as f64, y as f64, z as f64]
    }

    /// Length of the grid diagonal, the largest distance two cells can be apart.
    pub fn diagonal(&self) -> f64 {
        let [w, h, d] = self.dims();
        let (w, h, d) = ((w - 1) as f64, (h - 1) as f64, (d - 1) as f64);
        (w * w + h * h + d * d).sqrt()
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rank == 3 {
            write!(f, "{}x{}x{}", self.width, self.height, self.depth)
        } else {
            write!(f, "{}x{}", self.width, self.height)
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanvasFormatError {
    #[error("line {line}: expected 'grid <width> <height> [<depth>]' header")]
    Header { line: usize },
    #[error("line {line}: invalid grid dimension '{value}'")]
    Dimension { line: usize, value: String },
    #[error("line {line}: expected a row of {expected} cells, got {found}")]
    RowLength {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid cell character '{ch}'")]
    Cell { line: usize, ch: char },
    #[error("grid {shape} ended after {found} of {expected} rows")]
    Truncated {
        shape: GridShape,
        expected: usize,
        found: usize,
    },
    #[error("expected {expected} cells for grid {shape}, got {found}")]
    CellCount {
        shape: GridShape,
        expected: usize,
        found: usize,
    },
}

/// Boolean occupancy grid: `true` marks cells inside the geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    shape: GridShape,
    cells: Vec<bool>,
}

impl Canvas {
    pub fn empty(shape: GridShape) -> Self {
        Self {
            shape,
            cells: vec![false; shape.len()],
        }
    }

    pub fn from_cells(shape: GridShape, cells: Vec<bool>) -> Result<Self, CanvasFormatError> {
        if cells.len() != shape.len() {
            return Err(CanvasFormatError::CellCount {
                shape,
                expected: shape.len(),
                found: cells.len(),
            });
        }
        Ok(Self { shape, cells })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [bool] {
        &mut self.cells
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> bool {
        self.cells[self.shape.index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: bool) {
        let index = self.shape.index(x, y, z);
        self.cells[index] = value;
    }

    /// Number of occupied cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    pub fn is_blank(&self) -> bool {
        !self.cells.iter().any(|&cell| cell)
    }

    /// Serializes into the `grid` text format read by [`parse_canvases`].
    pub fn to_text(&self) -> String {
        let [width, height, depth] = self.shape.dims();
        let mut out = String::with_capacity(self.cells.len() + height * depth + 24);
        if self.shape.rank() == 3 {
            out.push_str(&format!("grid {width} {height} {depth}\n"));
        } else {
            out.push_str(&format!("grid {width} {height}\n"));
        }
        for row in self.cells.chunks(width) {
            out.extend(row.iter().map(|&cell| if cell { '1' } else { '0' }));
            out.push('\n');
        }
        out
    }
}

/// Parses a sequence of canvases in the `grid` text format.
///
/// Each canvas starts with `grid <width> <height> [<depth>]` and is followed
/// by `height * depth` rows of `width` cells (`1`/`#` inside, `0`/`.` outside).
/// Blank lines and `//` comment lines between canvases are ignored.
pub fn parse_canvases(source: &str) -> Result<Vec<Canvas>, CanvasFormatError> {
    let mut canvases = Vec::new();
    let mut lines = source.lines().enumerate().peekable();

    while let Some((line_no, line)) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT) {
            continue;
        }

        let shape = parse_header(trimmed, line_no + 1)?;
        let rows = shape.height() * shape.depth();
        let mut cells = Vec::with_capacity(shape.len());
        for row in 0..rows {
            let Some((row_line_no, row_text)) = lines.next() else {
                return Err(CanvasFormatError::Truncated {
                    shape,
                    expected: rows,
                    found: row,
                });
            };
            parse_row(row_text.trim(), row_line_no + 1, shape.width(), &mut cells)?;
        }
        canvases.push(Canvas::from_cells(shape, cells)?);
    }

    Ok(canvases)
}

fn parse_header(text: &str, line: usize) -> Result<GridShape, CanvasFormatError> {
    let parts = text.split_whitespace().collect::<Vec<_>>();
    if parts.first() != Some(&"grid") || !(parts.len() == 3 || parts.len() == 4) {
        return Err(CanvasFormatError::Header { line });
    }

    let mut dims = Vec::with_capacity(3);
    for value in &parts[1..] {
        match value.parse::<usize>() {
            Ok(dim) if dim > 0 => dims.push(dim),
            _ => {
                return Err(CanvasFormatError::Dimension {
                    line,
                    value: value.to_string(),
                });
            }
        }
    }

    Ok(match dims.as_slice() {
        [width, height] => GridShape::planar(*width, *height),
        [width, height, depth] => GridShape::volume(*width, *height, *depth),
        _ => return Err(CanvasFormatError::Header { line }),
    })
}

fn parse_row(
    text: &str,
    line: usize,
    width: usize,
    cells: &mut Vec<bool>,
) -> Result<(), CanvasFormatError> {
    let found = text.chars().count();
    if found != width {
        return Err(CanvasFormatError::RowLength {
            line,
            expected: width,
            found,
        });
    }
    for ch in text.chars() {
        match ch {
            '1' | '#' => cells.push(true),
            '0' | '.' => cells.push(false),
            _ => return Err(CanvasFormatError::Cell { line, ch }),
        }
    }
    Ok(())
}

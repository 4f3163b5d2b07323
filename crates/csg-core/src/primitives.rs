use std::fmt;

/// Cartesian point used for membership evaluation.
///
/// Planar shapes read only the first two components.
pub type Point3 = [f64; 3];

/// Signed distance style field: negative strictly inside, non-negative outside.
pub trait Sdf {
    fn evaluate(&self, point: Point3) -> f64;

    /// Closed-form membership test. Points on the surface are outside.
    #[inline]
    fn contains(&self, point: Point3) -> bool {
        self.evaluate(point) < 0.0
    }
}

const SQRT_3_OVER_2: f64 = 0.866_025_403_784_438_6;

#[inline]
fn length2(v: [f64; 2]) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

#[inline]
fn length3(v: Point3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[inline]
fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Disc in the canvas plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    center: [f64; 2],
    radius: f64,
}

impl Circle {
    pub fn new(center: [f64; 2], radius: f64) -> Self {
        Self { center, radius }
    }
}

impl Sdf for Circle {
    #[inline]
    fn evaluate(&self, point: Point3) -> f64 {
        length2([point[0] - self.center[0], point[1] - self.center[1]]) - self.radius
    }
}

/// Axis-aligned square parameterized by its half side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Square {
    center: [f64; 2],
    half_side: f64,
}

impl Square {
    pub fn new(center: [f64; 2], half_side: f64) -> Self {
        Self { center, half_side }
    }
}

impl Sdf for Square {
    #[inline]
    fn evaluate(&self, point: Point3) -> f64 {
        let q = [
            (point[0] - self.center[0]).abs() - self.half_side,
            (point[1] - self.center[1]).abs() - self.half_side,
        ];
        let outside = length2([q[0].max(0.0), q[1].max(0.0)]);
        let inside = q[0].max(q[1]).min(0.0);
        outside + inside
    }
}

/// Upward-pointing equilateral triangle in image coordinates (y grows downwards),
/// parameterized by its circumradius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    center: [f64; 2],
    radius: f64,
}

impl Triangle {
    pub fn new(center: [f64; 2], radius: f64) -> Self {
        Self { center, radius }
    }
}

impl Sdf for Triangle {
    #[inline]
    fn evaluate(&self, point: Point3) -> f64 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        // Outward edge normals; every edge sits at the inradius (half the circumradius).
        let bottom = dy;
        let right = SQRT_3_OVER_2 * dx - 0.5 * dy;
        let left = -SQRT_3_OVER_2 * dx - 0.5 * dy;
        bottom.max(right).max(left) - 0.5 * self.radius
    }
}

/// Sphere centered anywhere in the volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Point3,
    radius: f64,
}

impl Sphere {
    pub fn new(center: Point3, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl Sdf for Sphere {
    #[inline]
    fn evaluate(&self, point: Point3) -> f64 {
        length3(sub(point, self.center)) - self.radius
    }
}

/// Axis-aligned cube using a half side on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cube {
    center: Point3,
    half_side: f64,
}

impl Cube {
    pub fn new(center: Point3, half_side: f64) -> Self {
        Self { center, half_side }
    }
}

impl Sdf for Cube {
    #[inline]
    fn evaluate(&self, point: Point3) -> f64 {
        let d = sub(point, self.center);
        let q = [
            d[0].abs() - self.half_side,
            d[1].abs() - self.half_side,
            d[2].abs() - self.half_side,
        ];
        let outside = length3([q[0].max(0.0), q[1].max(0.0), q[2].max(0.0)]);
        let inside = q[0].max(q[1]).max(q[2]).min(0.0);
        outside + inside
    }
}

/// Finite cylinder aligned with the Z axis, `height` is the full extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    center: Point3,
    radius: f64,
    height: f64,
}

impl Cylinder {
    pub fn new(center: Point3, radius: f64, height: f64) -> Self {
        Self {
            center,
            radius,
            height,
        }
    }
}

impl Sdf for Cylinder {
    #[inline]
    fn evaluate(&self, point: Point3) -> f64 {
        let p = sub(point, self.center);
        let d = [
            length2([p[0], p[1]]) - self.radius,
            p[2].abs() - self.height * 0.5,
        ];
        let outside = length2([d[0].max(0.0), d[1].max(0.0)]);
        let inside = d[0].max(d[1]).min(0.0);
        outside + inside
    }
}

/// Primitive shapes understood by the drawing grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Circle,
    Square,
    Triangle,
    Sphere,
    Cube,
    Cylinder,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 6] = [
        PrimitiveKind::Circle,
        PrimitiveKind::Square,
        PrimitiveKind::Triangle,
        PrimitiveKind::Sphere,
        PrimitiveKind::Cube,
        PrimitiveKind::Cylinder,
    ];

    /// Grammar symbol that introduces this primitive, e.g. `c` in `c(32,32,8)`.
    pub fn symbol(self) -> &'static str {
        match self {
            PrimitiveKind::Circle => "c",
            PrimitiveKind::Square => "s",
            PrimitiveKind::Triangle => "t",
            PrimitiveKind::Sphere => "sp",
            PrimitiveKind::Cube => "cu",
            PrimitiveKind::Cylinder => "cy",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.symbol() == symbol)
    }

    pub fn arity(self) -> usize {
        match self {
            PrimitiveKind::Circle | PrimitiveKind::Square | PrimitiveKind::Triangle => 3,
            PrimitiveKind::Sphere | PrimitiveKind::Cube => 4,
            PrimitiveKind::Cylinder => 5,
        }
    }

    /// 2 for planar shapes, 3 for volumetric ones.
    pub fn rank(self) -> usize {
        match self {
            PrimitiveKind::Circle | PrimitiveKind::Square | PrimitiveKind::Triangle => 2,
            PrimitiveKind::Sphere | PrimitiveKind::Cube | PrimitiveKind::Cylinder => 3,
        }
    }

    /// Parameter indices holding sizes (radius, half side, height).
    pub fn size_slots(self) -> &'static [usize] {
        match self {
            PrimitiveKind::Circle | PrimitiveKind::Square | PrimitiveKind::Triangle => &[2],
            PrimitiveKind::Sphere | PrimitiveKind::Cube => &[3],
            PrimitiveKind::Cylinder => &[3, 4],
        }
    }

    pub fn is_size_slot(self, index: usize) -> bool {
        self.size_slots().contains(&index)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("primitive '{kind}' takes {expected} parameters, got {found}")]
pub struct ArityError {
    pub kind: PrimitiveKind,
    pub expected: usize,
    pub found: usize,
}

/// A primitive instance: its kind plus exactly `kind.arity()` numeric parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    kind: PrimitiveKind,
    params: Vec<f64>,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind, params: Vec<f64>) -> Result<Self, ArityError> {
        if params.len() != kind.arity() {
            return Err(ArityError {
                kind,
                expected: kind.arity(),
                found: params.len(),
            });
        }
        Ok(Self { kind, params })
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Returns a copy with one parameter replaced, leaving `self` untouched.
    pub fn with_param(&self, index: usize, value: f64) -> Self {
        let mut params = self.params.clone();
        params[index] = value;
        Self {
            kind: self.kind,
            params,
        }
    }
}

impl Sdf for Primitive {
    fn evaluate(&self, point: Point3) -> f64 {
        let p = &self.params;
        match self.kind {
            PrimitiveKind::Circle => Circle::new([p[0], p[1]], p[2]).evaluate(point),
            PrimitiveKind::Square => Square::new([p[0], p[1]], p[2]).evaluate(point),
            PrimitiveKind::Triangle => Triangle::new([p[0], p[1]], p[2]).evaluate(point),
            PrimitiveKind::Sphere => Sphere::new([p[0], p[1], p[2]], p[3]).evaluate(point),
            PrimitiveKind::Cube => Cube::new([p[0], p[1], p[2]], p[3]).evaluate(point),
            PrimitiveKind::Cylinder => {
                Cylinder::new([p[0], p[1], p[2]], p[3], p[4]).evaluate(point)
            }
        }
    }
}

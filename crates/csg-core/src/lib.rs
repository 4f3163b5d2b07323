pub mod canvas;
pub mod evaluate;
pub mod operations;
pub mod primitives;

pub use canvas::{Canvas, CanvasFormatError, GridShape, parse_canvases};
pub use evaluate::{rasterize, rasterize_into};
pub use operations::{SetOperator, difference, intersection, union};
pub use primitives::{
    ArityError, Circle, Cube, Cylinder, Point3, Primitive, PrimitiveKind, Sdf, Sphere, Square,
    Triangle,
};

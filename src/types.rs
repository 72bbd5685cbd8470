// Provides basic types.

pub type Vec2d = ultraviolet::DVec2;
pub type Vec3d = ultraviolet::DVec3;

/// Points and directions share the vector type; the distinction lives in the
/// field names.
pub type Point2d = Vec2d;
pub type Point3d = Vec3d;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    #[inline]
    pub fn of(self, p: Point2d) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }
}

use std::ops::{Add, AddAssign, Sub};

use glam::Vec3;

/// A position in world space.
///
/// Kept apart from [Vec3] so that positions and directions can't be mixed up: a point plus a
/// direction is a point, the difference of two points is a direction.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point(pub Vec3);

impl Point {
    pub const ORIGIN: Point = Point(Vec3::ZERO);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    pub fn vec(self) -> Vec3 {
        self.0
    }

    pub fn from_array(a: [f32; 3]) -> Self {
        Self(Vec3::from_array(a))
    }

    pub fn to_array(self) -> [f32; 3] {
        self.0.to_array()
    }

    /// Direction (not normalized) going from `self` to `other`
    pub fn to(self, other: Point) -> Vec3 {
        other.0 - self.0
    }

    pub fn distance(self, other: Point) -> f32 {
        self.0.distance(other.0)
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point(self.0.lerp(other.0, t))
    }
}

impl From<[f32; 3]> for Point {
    fn from(a: [f32; 3]) -> Self {
        Self::from_array(a)
    }
}

impl From<Point> for [f32; 3] {
    fn from(p: Point) -> Self {
        p.to_array()
    }
}

impl Add<Vec3> for Point {
    type Output = Point;

    fn add(self, offset: Vec3) -> Point {
        Point(self.0 + offset)
    }
}

impl AddAssign<Vec3> for Point {
    fn add_assign(&mut self, offset: Vec3) {
        self.0 += offset;
    }
}

impl Sub<Vec3> for Point {
    type Output = Point;

    fn sub(self, offset: Vec3) -> Point {
        Point(self.0 - offset)
    }
}

impl Sub for Point {
    type Output = Vec3;

    fn sub(self, other: Point) -> Vec3 {
        other.to(self)
    }
}

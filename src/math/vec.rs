pub use glam::{Mat4, Vec2, Vec3};

pub trait ReflectVecExt {
    fn reflect(self, normal: Vec3) -> Vec3;
}

impl ReflectVecExt for Vec3 {
    fn reflect(self, normal: Vec3) -> Vec3 {
        self - (2.0 * self.dot(normal) * normal)
    }
}

pub trait Vec3SameDirExt {
    fn same_direction(self, other: Self) -> Self;
}

impl Vec3SameDirExt for Vec3 {
    /// Return self if self and other are pointing in the same general direction (self.dot(other) > 0.0) else, returns -self
    fn same_direction(self, other: Self) -> Self {
        if self.dot(other) > 0.0 {
            self
        } else {
            -self
        }
    }
}

/// Colors are stored as linear rgb in a [Vec3]
pub trait ColorExt {
    fn max_channel(self) -> f32;
}

impl ColorExt for Vec3 {
    fn max_channel(self) -> f32 {
        self.max_element()
    }
}

use glam::Vec3;

use crate::ray::Ray;

use super::point::Point;

/// Axis Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    /// Should have all coordinates >= min
    pub max: Point,
}

impl Bounds {
    /// Contains nothing, the neutral element of [Bounds::union]
    pub const EMPTY: Bounds = Bounds {
        min: Point(Vec3::splat(f32::INFINITY)),
        max: Point(Vec3::splat(f32::NEG_INFINITY)),
    };

    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            min: Point(Vec3::min(a.vec(), b.vec())),
            max: Point(Vec3::max(a.vec(), b.vec())),
        }
    }

    pub fn from_center_half_size(center: Point, half_size: Vec3) -> Self {
        Self::from_points(center - half_size, center + half_size)
    }

    pub fn enclosing<I: IntoIterator<Item = Point>>(points: I) -> Self {
        points.into_iter().fold(Self::EMPTY, Self::grow)
    }

    pub fn is_empty(&self) -> bool {
        let d = self.max - self.min;
        d.x < 0.0 || d.y < 0.0 || d.z < 0.0
    }

    pub fn grow(self, point: Point) -> Self {
        Self {
            min: Point(Vec3::min(self.min.vec(), point.vec())),
            max: Point(Vec3::max(self.max.vec(), point.vec())),
        }
    }

    pub fn union(self, other: Bounds) -> Self {
        Self {
            min: Point(Vec3::min(self.min.vec(), other.min.vec())),
            max: Point(Vec3::max(self.max.vec(), other.max.vec())),
        }
    }

    /// Grown by `margin` on every side. Flat boxes (planar meshes) have an empty slab
    /// interval and must be padded before being hit tested.
    pub fn padded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        let p = point.vec();
        self.min.vec().cmple(p).all() && p.cmple(self.max.vec()).all()
    }

    pub fn hit(&self, ray: &Ray) -> bool {
        self.hit_raw(ray.origin.vec(), ray.direction)
    }

    /// Slab test. Only tells whether the ray meets the box at some t > 0.
    ///
    /// A null component of `direction` gives an infinite inverse, which the slab logic handles:
    /// the ray is then parallel to the slab and only the sign of the infinity matters.
    pub fn hit_raw(&self, origin: Vec3, direction: Vec3) -> bool {
        let min = self.min.vec();
        let max = self.max.vec();

        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let inv_d = 1.0 / direction[axis];
            let mut t0 = (min[axis] - origin[axis]) * inv_d;
            let mut t1 = (max[axis] - origin[axis]) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            // f32::max and f32::min discard a NaN operand (0 * inf when the origin lies on a slab plane)
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_max <= t_min {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Bounds {
        Bounds::from_points(Point::new(-1., -1., -1.), Point::new(1., 1., 1.))
    }

    #[test]
    fn hit_straight_on() {
        let ray = Ray::new(Point::new(0., 0., -5.), Vec3::Z);
        assert!(unit_box().hit(&ray));
    }

    #[test]
    fn parallel_miss() {
        let ray = Ray::new(Point::new(0., 0., -5.), Vec3::X);
        assert!(!unit_box().hit(&ray));
    }

    #[test]
    fn inside_any_direction() {
        let dirs = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Z,
            Vec3::new(1., 2., -3.),
            Vec3::new(-0.3, -0.3, 0.9),
        ];
        for d in dirs {
            assert!(unit_box().hit(&Ray::new(Point::new(0.2, -0.5, 0.1), d)), "{d}");
        }
    }

    #[test]
    fn behind_origin() {
        let ray = Ray::new(Point::new(0., 0., 5.), Vec3::Z);
        assert!(!unit_box().hit(&ray));
    }

    #[test]
    fn negative_zero_component() {
        let b = unit_box();
        assert!(b.hit_raw(Vec3::new(0., 0., -5.), Vec3::new(-0.0, -0.0, 1.0)));
        assert!(!b.hit_raw(Vec3::new(2., 0., -5.), Vec3::new(-0.0, 0.0, 1.0)));
    }

    #[test]
    fn origin_on_slab_plane_is_determinate() {
        // 0 * inf = NaN on the x axis
        let b = unit_box();
        let hit = b.hit_raw(Vec3::new(1., 0., -5.), Vec3::Z);
        assert_eq!(hit, b.hit_raw(Vec3::new(1., 0., -5.), Vec3::Z));
        assert!(hit);
    }

    #[test]
    fn diagonal() {
        let b = unit_box();
        assert!(b.hit(&Ray::new(Point::new(-5., -5., -5.), Vec3::ONE)));
        assert!(!b.hit(&Ray::new(Point::new(-5., -5., -5.), Vec3::new(1., 1., -1.))));
    }

    #[test]
    fn flat_box() {
        let flat = Bounds::from_points(Point::new(-1., 0., -1.), Point::new(1., 0., 1.));
        assert!(!flat.hit(&Ray::new(Point::new(0., 2., 0.), Vec3::NEG_Y)));

        let floor = flat.padded(1e-4);
        assert!(floor.hit(&Ray::new(Point::new(0., 2., 0.), Vec3::NEG_Y)));
        assert!(floor.hit(&Ray::new(Point::new(0.5, -2., 0.), Vec3::new(0.1, 1., 0.))));
        assert!(!floor.hit(&Ray::new(Point::new(3., 2., 0.), Vec3::NEG_Y)));
        assert!(!floor.hit(&Ray::new(Point::new(0., 2., 0.), Vec3::X)));
    }

    #[test]
    fn enclosing() {
        let b = Bounds::enclosing([
            Point::new(1., 0., 0.),
            Point::new(-1., 2., 0.),
            Point::new(0., 0., 3.),
        ]);
        assert_eq!(b.min, Point::new(-1., 0., 0.));
        assert_eq!(b.max, Point::new(1., 2., 3.));
        assert!(b.contains(Point::new(0., 1., 1.)));
        assert!(!b.contains(Point::new(0., 3., 1.)));
        assert!(Bounds::EMPTY.is_empty());
        assert!(Bounds::enclosing([]).is_empty());
    }
}

use crate::math::{point::Point, vec::Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Point, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Ray starting slightly off a surface, along `offset`, so that it doesn't hit the surface it
    /// starts on
    pub fn leaving(point: Point, offset: Vec3, direction: Vec3) -> Self {
        Self::new(point + offset, direction)
    }

    pub fn at(&self, t: f32) -> Point {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_direction() {
        let ray = Ray::new(Point::new(1., 0., 0.), Vec3::new(-3., 3., 0.));
        assert!((ray.direction.length() - 1.0).abs() < 1e-6);
        assert_eq!(ray.at(0.0), ray.origin);

        let far = ray.at(2f32.sqrt());
        assert!(far.distance(Point::new(0., 1., 0.)) < 1e-5);
    }

    #[test]
    fn leaving_a_surface() {
        let ray = Ray::leaving(Point::ORIGIN, Vec3::Y * 1e-3, Vec3::X);
        assert_eq!(ray.origin, Point::new(0., 1e-3, 0.));
        assert_eq!(ray.direction, Vec3::X);
    }
}

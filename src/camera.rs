use crate::{
    math::{
        distributions::{Samplable, UniformUnitBall2},
        point::Point,
        vec::{Mat4, Vec3},
    },
    ray::Ray,
    rng::HashRng,
};

/// Position and orientation of a pinhole camera, plus its lens parameters.
///
/// The basis is right handed: `right = forward x up`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub position: Point,
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,

    /// Vertical field of view, in radians
    pub vfov: f32,

    /// Distance from the camera to the plane in focus, in world unit.
    /// Rays are aimed at points of this plane.
    pub focus_distance: f32,

    /// width / height
    pub aspect: f32,
}

impl CameraFrame {
    pub fn look_at(
        position: Point,
        target: Point,
        up_hint: Vec3,
        vfov: f32,
        focus_distance: f32,
        aspect: f32,
    ) -> Self {
        let forward = (target - position).try_normalize().unwrap_or(Vec3::NEG_Z);
        // A hint parallel to the view direction leaves the basis undefined, pick another one
        let right = forward
            .cross(up_hint)
            .try_normalize()
            .or_else(|| forward.cross(Vec3::Z).try_normalize())
            .unwrap_or_else(|| forward.cross(Vec3::X).normalize());
        let up = right.cross(forward);
        Self {
            position,
            right,
            up,
            forward,
            vfov,
            focus_distance,
            aspect,
        }
    }

    pub fn with_aspect(self, aspect: f32) -> Self {
        Self { aspect, ..self }
    }

    /// Height of the plane in focus, in world unit
    pub fn plane_height(&self) -> f32 {
        self.focus_distance * f32::tan(self.vfov / 2.) * 2.
    }

    /// Width of the plane in focus, in world unit
    pub fn plane_width(&self) -> f32 {
        self.plane_height() * self.aspect
    }

    /// (plane width, plane height, focus distance)
    pub fn view_params(&self) -> Vec3 {
        Vec3::new(self.plane_width(), self.plane_height(), self.focus_distance)
    }

    /// Maps camera space (x right, y up, z forward) to world space
    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_cols(
            self.right.extend(0.0),
            self.up.extend(0.0),
            self.forward.extend(0.0),
            self.position.vec().extend(1.0),
        )
    }

    /// Lower left corner of the plane in focus, in world space
    pub fn lower_left_corner(&self) -> Point {
        self.position + self.forward * self.focus_distance
            - self.right * (self.plane_width() / 2.)
            - self.up * (self.plane_height() / 2.)
    }
}

/// Represent a coordinate in the viewport space.
///
/// The viewport is mapped to the range $\left[0, 1\right]$ for both `u` and `v`.
///
/// $\left(0, 0\right)$ is the bottom left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportCoord {
    pub u: f32,
    pub v: f32,
}

impl ViewportCoord {
    /// Convert a pixel coordinate into viewport space. Pixel `0` and pixel `size - 1` land on the edges.
    ///
    /// A single pixel wide (or high) image is mapped to the middle of the viewport.
    pub fn from_pixel(x: f32, y: f32, width: u32, height: u32) -> Self {
        let normalize = |c: f32, size: u32| {
            if size > 1 {
                c / (size - 1) as f32
            } else {
                0.5
            }
        };
        Self {
            u: normalize(x, width),
            v: normalize(y, height),
        }
    }
}

/// Jitter radii, in pixel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Jitter {
    /// Anti aliasing: radius of the disk the aimed point is moved in
    pub diverge_strength: f32,
    /// Depth of field: radius of the disk the ray origin is moved in
    pub defocus_strength: f32,
}

/// Generate the rays of a pixel for a camera and an image size.
pub struct CameraRayGenerator {
    frame: CameraFrame,
    width: u32,
    height: u32,
    jitter: Jitter,

    lower_left: Point,
    horizontal: Vec3,
    vertical: Vec3,
}

impl CameraRayGenerator {
    pub fn new(frame: CameraFrame, width: u32, height: u32, jitter: Jitter) -> Self {
        Self {
            lower_left: frame.lower_left_corner(),
            horizontal: frame.right * frame.plane_width(),
            vertical: frame.up * frame.plane_height(),
            frame,
            width,
            height,
            jitter,
        }
    }

    pub fn frame(&self) -> &CameraFrame {
        &self.frame
    }

    /// Point of the plane in focus seen by the pixel `(x, y)`
    pub fn view_point(&self, x: f32, y: f32) -> Point {
        let ViewportCoord { u, v } = ViewportCoord::from_pixel(x, y, self.width, self.height);
        self.lower_left + u * self.horizontal + v * self.vertical
    }

    /// Ray from the camera position through the pixel, without any jitter
    pub fn pinhole_ray(&self, x: f32, y: f32) -> Ray {
        Ray::new(self.frame.position, self.view_point(x, y) - self.frame.position)
    }

    /// Offset in the (right, up) plane, in world unit.
    ///
    /// The disk is always sampled so that the consumed randomness does not depend on the strength.
    fn jitter_offset(&self, strength: f32, rng: &mut HashRng) -> Option<Vec3> {
        let d = UniformUnitBall2.sample_hashed(rng) * (strength / self.width as f32);
        (strength != 0.0).then(|| self.frame.right * d.x + self.frame.up * d.y)
    }

    /// Jittered and defocused ray for the pixel `(x, y)`.
    ///
    /// Consumes exactly four values of `rng`: two for the lens, then two for the aimed point.
    pub fn ray(&self, x: u32, y: u32, rng: &mut HashRng) -> Ray {
        let view_point = self.view_point(x as f32, y as f32);

        let defocus = self.jitter_offset(self.jitter.defocus_strength, rng);
        let diverge = self.jitter_offset(self.jitter.diverge_strength, rng);

        let origin = match defocus {
            Some(offset) => self.frame.position + offset,
            None => self.frame.position,
        };
        let target = match diverge {
            Some(offset) => view_point + offset,
            None => view_point,
        };
        Ray::new(origin, target - origin)
    }

    /// `count` independent rays for the pixel `(x, y)`
    pub fn rays<'a>(
        &'a self,
        x: u32,
        y: u32,
        count: u32,
        rng: &'a mut HashRng,
    ) -> impl Iterator<Item = Ray> + 'a {
        (0..count).map(move |_| self.ray(x, y, rng))
    }
}

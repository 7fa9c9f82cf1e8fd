//! Interface of the shading and accumulation kernels.
//!
//! A kernel only sees device buffers and the [TraceParams] block, exactly like a GPU program would.

pub mod blend;
pub mod cpu;

use bytemuck::{Pod, Zeroable};

use crate::{
    camera::CameraFrame,
    math::{point::Point, vec::Vec3},
    resources::{GpuBuffer, RenderTarget},
    scene::assembler::{GpuMeshInfo, GpuSphere, GpuTriangle},
    settings::{EnvironmentSettings, RenderSettings},
};

pub use blend::CpuAccumulateKernel;
pub use cpu::CpuTraceKernel;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuCamera {
    /// (plane width, plane height, focus distance, 0)
    pub view_params: [f32; 4],
    /// Column major camera to world matrix
    pub local_to_world: [[f32; 4]; 4],
}

impl From<&CameraFrame> for GpuCamera {
    fn from(camera: &CameraFrame) -> Self {
        Self {
            view_params: camera.view_params().extend(0.0).to_array(),
            local_to_world: camera.local_to_world().to_cols_array_2d(),
        }
    }
}

impl GpuCamera {
    /// Camera frame described by this block
    pub fn frame(&self) -> CameraFrame {
        let [right, up, forward, position] = self.local_to_world;
        let [plane_width, plane_height, focus_distance, _] = self.view_params;
        CameraFrame {
            position: Point::new(position[0], position[1], position[2]),
            right: Vec3::from_slice(&right[..3]),
            up: Vec3::from_slice(&up[..3]),
            forward: Vec3::from_slice(&forward[..3]),
            vfov: 2.0 * f32::atan(plane_height / (2.0 * focus_distance)),
            focus_distance,
            aspect: plane_width / plane_height,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuEnvironment {
    pub ground_color: [f32; 4],
    pub sky_color_horizon: [f32; 4],
    pub sky_color_zenith: [f32; 4],
    pub sun_direction: [f32; 4],
    pub sun_focus: f32,
    pub sun_intensity: f32,
    pub enabled: u32,
    pub _pad: u32,
}

impl From<&EnvironmentSettings> for GpuEnvironment {
    fn from(env: &EnvironmentSettings) -> Self {
        Self {
            ground_color: env.ground_color.extend(1.0).to_array(),
            sky_color_horizon: env.sky_color_horizon.extend(1.0).to_array(),
            sky_color_zenith: env.sky_color_zenith.extend(1.0).to_array(),
            sun_direction: env.sun_direction.extend(0.0).to_array(),
            sun_focus: env.sun_focus,
            sun_intensity: env.sun_intensity,
            enabled: env.enabled as u32,
            _pad: 0,
        }
    }
}

/// Uniform block of the trace kernel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TraceParams {
    pub camera: GpuCamera,
    pub environment: GpuEnvironment,
    pub max_bounce_count: u32,
    pub num_rays_per_pixel: u32,
    pub diverge_strength: f32,
    pub defocus_strength: f32,
    pub light_samples: u32,
    pub use_importance_sampling: u32,
    pub frame: u32,
    pub num_spheres: u32,
    pub num_meshes: u32,
    pub num_lights: u32,
    pub width: u32,
    pub height: u32,
}

/// Number of primitives of each kind in the bound buffers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimitiveCounts {
    pub spheres: u32,
    pub meshes: u32,
    pub lights: u32,
}

impl TraceParams {
    pub fn new(
        camera: &CameraFrame,
        settings: &RenderSettings,
        frame: u32,
        counts: PrimitiveCounts,
        (width, height): (u32, u32),
    ) -> Self {
        Self {
            camera: camera.into(),
            environment: (&settings.environment).into(),
            max_bounce_count: settings.max_bounce_count,
            num_rays_per_pixel: settings.num_rays_per_pixel,
            diverge_strength: settings.diverge_strength,
            defocus_strength: settings.defocus_strength,
            light_samples: settings.light_samples,
            use_importance_sampling: settings.use_importance_sampling as u32,
            frame,
            num_spheres: counts.spheres,
            num_meshes: counts.meshes,
            num_lights: counts.lights,
            width,
            height,
        }
    }
}

/// Everything bound to the trace kernel for one dispatch
pub struct TraceInputs<'a> {
    pub params: TraceParams,
    pub spheres: &'a GpuBuffer<GpuSphere>,
    pub triangles: &'a GpuBuffer<GpuTriangle>,
    pub mesh_info: &'a GpuBuffer<GpuMeshInfo>,
    pub lights: &'a GpuBuffer<u32>,
}

/// Computes one radiance image, one sample per pixel of the progressive average
pub trait TraceKernel: Send + Sync {
    fn name(&self) -> &str;
    fn dispatch(&self, inputs: &TraceInputs<'_>, output: &RenderTarget) -> anyhow::Result<()>;
}

/// `output = previous * (1 - w) + current * w` with `w = 1 / (frame + 1)`
pub trait AccumulateKernel: Send + Sync {
    fn name(&self) -> &str;
    fn dispatch(
        &self,
        current: &RenderTarget,
        previous: &RenderTarget,
        frame: u32,
        output: &RenderTarget,
    ) -> anyhow::Result<()>;
}

/// Source of the kernel programs. A missing program is reported as None.
pub trait KernelProvider: Send + Sync {
    fn trace_kernel(&self) -> Option<Box<dyn TraceKernel>>;
    fn accumulate_kernel(&self) -> Option<Box<dyn AccumulateKernel>>;
}

/// Kernels running on the host, with rayon
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuKernels;

impl KernelProvider for CpuKernels {
    fn trace_kernel(&self) -> Option<Box<dyn TraceKernel>> {
        Some(Box::new(CpuTraceKernel))
    }

    fn accumulate_kernel(&self) -> Option<Box<dyn AccumulateKernel>> {
        Some(Box::new(CpuAccumulateKernel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts() {
        assert_eq!(std::mem::size_of::<GpuCamera>(), 80);
        assert_eq!(std::mem::size_of::<GpuEnvironment>(), 80);
        assert_eq!(std::mem::size_of::<TraceParams>(), 208);
    }

    #[test]
    fn camera_round_trip() {
        let camera = CameraFrame::look_at(
            Point::new(1., 2., 3.),
            Point::new(0., 0., 0.),
            Vec3::Y,
            f32::to_radians(50.),
            2.5,
            1.5,
        );
        let back = GpuCamera::from(&camera).frame();
        assert_eq!(back.position, camera.position);
        assert!((back.forward - camera.forward).length() < 1e-6);
        assert!((back.vfov - camera.vfov).abs() < 1e-5);
        assert!((back.aspect - camera.aspect).abs() < 1e-5);
        assert_eq!(back.focus_distance, 2.5);
    }

    #[test]
    fn params() {
        let settings = RenderSettings {
            use_importance_sampling: true,
            ..Default::default()
        };
        let camera = CameraFrame::look_at(Point::ORIGIN, Point::new(0., 0., -1.), Vec3::Y, 1.0, 1.0, 1.0);
        let counts = PrimitiveCounts {
            spheres: 2,
            meshes: 3,
            lights: 1,
        };
        let p = TraceParams::new(&camera, &settings, 7, counts, (640, 480));
        assert_eq!(p.frame, 7);
        assert_eq!(p.use_importance_sampling, 1);
        assert_eq!(p.num_rays_per_pixel, 10);
        assert_eq!((p.num_spheres, p.num_meshes, p.num_lights), (2, 3, 1));
        assert_eq!((p.width, p.height), (640, 480));
        assert_eq!(p.environment.enabled, 1);
        assert_eq!(bytemuck::bytes_of(&p).len(), 208);
    }
}

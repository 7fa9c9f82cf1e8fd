pub mod accumulation;
pub mod camera;
pub mod kernel;
pub mod math;
pub mod ray;
pub mod renderer;
pub mod resources;
pub mod rng;
pub mod scene;
pub mod settings;
pub mod utils;

pub use rng::HashRng as Rng;

mod cornell;
mod spheres;

pub use cornell::CornellBoxScene;
pub use spheres::SpheresScene;

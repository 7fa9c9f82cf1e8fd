pub mod bounds;
pub mod distributions;
pub mod point;
pub mod stat;
pub mod vec;

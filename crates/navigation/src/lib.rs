pub mod camera;
pub mod navigator;

pub use camera::*;
pub use navigator::*;

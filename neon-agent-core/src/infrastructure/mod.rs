pub mod model;
pub mod neon;

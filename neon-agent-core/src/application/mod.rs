pub mod agent;
pub mod console;
pub mod formatter;
pub mod neon;
pub mod session;
pub mod tooling;

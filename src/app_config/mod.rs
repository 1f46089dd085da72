pub mod env;
pub mod log;
pub mod redis;

pub use env::AppConfig;

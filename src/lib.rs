pub mod analytics;
pub mod app;
pub mod app_config;
pub mod error;
pub mod time_util;

pub mod aggregate;
pub mod cache;
pub mod indicator;
pub mod model;
pub mod normalizer;
pub mod services;
pub mod store;

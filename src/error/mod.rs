pub mod app_error;

pub use app_error::{to_err, AppError};

use thiserror::Error;

/// 应用错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 数据源错误
    #[error("数据源错误: {0}")]
    Store(String),

    /// 单次查询键数超限
    #[error("查询键数超限: {requested} > {max}")]
    BatchTooLarge { requested: usize, max: usize },

    #[error("配置错误: {0}")]
    Config(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 未知错误
    #[error("未知错误: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Store(err.to_string())
    }
}

/// 把任何错误转换为 AppError::Unknown
pub fn to_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> AppError {
    AppError::Unknown(err.to_string())
}

use thiserror::Error;

use crate::compose::ComposeError;

#[derive(Error, Debug)]
pub enum PostcodeError {
    #[error("校验错误: {0}")]
    ValidationError(String),

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP 请求失败: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("持久化错误: {0}")]
    PersistenceError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("交互失败: {0}")]
    PromptError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL 解析错误: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for PostcodeError {
    fn from(err: anyhow::Error) -> Self {
        PostcodeError::Other(err.to_string())
    }
}

impl From<ComposeError> for PostcodeError {
    fn from(err: ComposeError) -> Self {
        PostcodeError::ValidationError(err.to_string())
    }
}

impl From<toml::de::Error> for PostcodeError {
    fn from(err: toml::de::Error) -> Self {
        PostcodeError::ConfigError(err.to_string())
    }
}

/// Result type for postcode crate
pub type Result<T> = std::result::Result<T, PostcodeError>;

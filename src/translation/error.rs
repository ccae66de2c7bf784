//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 速率限制错误
    #[error("请求速率过快，已达到限制")]
    RateLimitExceeded,

    /// 超时错误
    #[error("操作超时: {0}")]
    TimeoutError(String),

    /// 翻译服务返回非成功状态
    #[error("翻译服务错误: {0}")]
    TranslationServiceError(String),

    /// 响应格式错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::RateLimitExceeded => ErrorSeverity::Warning,
            TranslationError::TimeoutError(_) => ErrorSeverity::Warning,
            TranslationError::TranslationServiceError(_) => ErrorSeverity::Error,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            TranslationError::RateLimitExceeded => ErrorCategory::RateLimit,
            TranslationError::TimeoutError(_) => ErrorCategory::Timeout,
            TranslationError::TranslationServiceError(_) => ErrorCategory::Service,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let new_msg = |msg: String| format!("{} (上下文: {})", msg, context);

        match self {
            TranslationError::ConfigError(msg) => TranslationError::ConfigError(new_msg(msg)),
            TranslationError::NetworkError(msg) => TranslationError::NetworkError(new_msg(msg)),
            TranslationError::TimeoutError(msg) => TranslationError::TimeoutError(new_msg(msg)),
            TranslationError::TranslationServiceError(msg) => {
                TranslationError::TranslationServiceError(new_msg(msg))
            }
            TranslationError::ParseError(msg) => TranslationError::ParseError(new_msg(msg)),
            TranslationError::SerializationError(msg) => {
                TranslationError::SerializationError(new_msg(msg))
            }
            TranslationError::InvalidInput(msg) => TranslationError::InvalidInput(new_msg(msg)),
            TranslationError::InternalError(msg) => TranslationError::InternalError(new_msg(msg)),
            TranslationError::RateLimitExceeded => TranslationError::RateLimitExceeded,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    RateLimit,
    Timeout,
    Service,
    Parsing,
    Serialization,
    Input,
    Internal,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ConfigError(format!("TOML解析错误: {}", error))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslationError::TimeoutError(error.to_string())
        } else if error.is_decode() {
            TranslationError::ParseError(format!("响应解码失败: {}", error))
        } else if let Some(status) = error.status() {
            TranslationError::TranslationServiceError(format!("HTTP {}", status))
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &TranslationError, context: &str) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("{}: {}", context, error),
            ErrorSeverity::Warning => tracing::warn!("{}: {}", context, error),
            ErrorSeverity::Error => tracing::error!("{}: {}", context, error),
            ErrorSeverity::Critical => tracing::error!("{}（严重）: {}", context, error),
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }

    /// 创建响应格式错误
    pub fn malformed_response<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ParseError(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
        assert_eq!(
            TranslationError::NetworkError("down".into()).severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            TranslationError::ParseError("bad".into()).category(),
            ErrorCategory::Parsing
        );
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let error = TranslationError::TranslationServiceError("HTTP 500".into())
            .with_context("batch 2");
        assert!(matches!(error, TranslationError::TranslationServiceError(_)));
        assert!(error.to_string().contains("batch 2"));
        assert!(error.to_string().contains("HTTP 500"));

        let limited = TranslationError::RateLimitExceeded.with_context("ignored");
        assert!(matches!(limited, TranslationError::RateLimitExceeded));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let error: TranslationError = json_error.into();
        assert_eq!(error.category(), ErrorCategory::Serialization);
    }
}

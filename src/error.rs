//! SDK 错误类型
//!
//! 按远端 API 的失败方式划分错误：认证、校验、限流、服务端、网络、超时。
//! 调用方可以据此区分"请求根本没发出去"和"远端拒绝了请求"。

use thiserror::Error;

/// SDK 错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 认证失败（HTTP 401，API Key 无效或过期）
    #[error("认证失败: {message}")]
    Authentication { message: String },

    /// 请求校验失败（HTTP 400，或本地在发送前发现请求不合法）
    #[error("请求校验失败: {message}")]
    Validation { message: String },

    /// 请求频率限制（HTTP 429）
    #[error("请求频率限制: {message} (建议等待: {retry_after:?}秒)")]
    RateLimit {
        message: String,
        /// 服务端建议的等待秒数（来自 Retry-After 响应头）
        retry_after: Option<u64>,
    },

    /// 服务端错误（HTTP 5xx）
    #[error("服务端错误 ({status}): {message}")]
    Server { status: u16, message: String },

    /// 网络连接失败
    #[error("网络请求失败: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    /// 请求超时
    #[error("请求超时")]
    Timeout,

    /// API 返回了未预期的状态码
    #[error("API 返回意外响应 ({status}): {message}")]
    Api { status: u16, message: String },

    /// 响应 JSON 解析失败
    #[error("响应解析失败: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    /// 配置错误
    #[error("配置错误: {message}")]
    Config { message: String },
}

impl Error {
    /// 创建校验错误
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// 从 reqwest 错误分类：超时归为 Timeout，其余归为 Network
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network { source: err }
        }
    }

    /// 是否为可重试的瞬时错误（限流 / 服务端 / 网络 / 超时）
    ///
    /// 重试只发生在单次扫描客户端内部，批量层从不重试。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimit { .. } | Error::Server { .. } | Error::Network { .. } | Error::Timeout
        )
    }
}

/// SDK 结果类型别名
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        // 瞬时错误可重试
        assert!(Error::Timeout.is_retryable());
        assert!(Error::Server {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(Error::RateLimit {
            message: "too many requests".to_string(),
            retry_after: Some(2)
        }
        .is_retryable());

        // 调用方的问题不可重试
        assert!(!Error::validation("empty documents").is_retryable());
        assert!(!Error::Authentication {
            message: "bad key".to_string()
        }
        .is_retryable());
    }
}

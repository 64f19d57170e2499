//! HTTP 传输层
//!
//! 封装所有与远端 API 的 HTTP 交互：统一的请求头、超时、
//! 以及按状态码到错误类型的映射。上层客户端只关心业务语义。

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// SDK 的 User-Agent
const SDK_USER_AGENT: &str = concat!("koreshield-rust-sdk/", env!("CARGO_PKG_VERSION"));

/// HTTP 传输器
///
/// 持有 reqwest 连接池和基础地址，所有端点共用同一组默认请求头。
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// 根据配置创建传输器
    ///
    /// # 参数
    /// - `config`: SDK 配置（API Key、基础地址、超时）
    ///
    /// # 返回
    /// API Key 不是合法的请求头内容时返回配置错误
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", config.api_key);
        let auth_value = HeaderValue::from_str(&bearer)
            .map_err(|_| Error::config("API Key 包含非法字符"))?;
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(SDK_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(Error::from_reqwest)?;

        Ok(Self {
            client,
            base_url: config.base_url_trimmed().to_string(),
        })
    }

    /// 发送 POST 请求并解析 JSON 响应
    ///
    /// # 参数
    /// - `endpoint`: API 路径，如 `/v1/scan`
    /// - `body`: 请求体，序列化为 JSON
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        Self::handle_response(response).await
    }

    /// 发送 GET 请求并解析 JSON 响应
    ///
    /// # 参数
    /// - `endpoint`: API 路径
    /// - `params`: URL 查询参数
    pub async fn get<T>(&self, endpoint: &str, params: &[(String, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {} (参数: {})", url, params.len());

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        Self::handle_response(response).await
    }

    /// 按状态码把响应映射为结果或错误
    ///
    /// 映射规则：
    /// - 2xx: 解析响应体
    /// - 401: 认证失败
    /// - 400: 请求校验失败
    /// - 429: 频率限制（带 Retry-After）
    /// - 5xx: 服务端错误
    /// - 其他: 未预期响应
    async fn handle_response<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let text = response.text().await.map_err(Error::from_reqwest)?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|source| Error::Decode { source });
        }

        let message = Self::extract_message(&text, status);
        debug!("API 返回错误响应 ({}): {}", status, message);

        Err(match status {
            StatusCode::UNAUTHORIZED => Error::Authentication { message },
            StatusCode::BAD_REQUEST => Error::Validation { message },
            StatusCode::TOO_MANY_REQUESTS => Error::RateLimit {
                message,
                retry_after,
            },
            s if s.is_server_error() => Error::Server {
                status: s.as_u16(),
                message,
            },
            s => Error::Api {
                status: s.as_u16(),
                message,
            },
        })
    }

    /// 从错误响应体中提取 message 字段，取不到时退回状态码描述
    fn extract_message(body: &str, status: StatusCode) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| format!("HTTP {}", status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_from_json_body() {
        let body = r#"{"message": "Rate limit exceeded"}"#;
        assert_eq!(
            HttpTransport::extract_message(body, StatusCode::TOO_MANY_REQUESTS),
            "Rate limit exceeded"
        );
    }

    #[test]
    fn test_extract_message_fallback() {
        // 非 JSON 响应体退回状态码描述
        assert_eq!(
            HttpTransport::extract_message("<html>oops</html>", StatusCode::BAD_GATEWAY),
            "HTTP 502 Bad Gateway"
        );
    }

    #[test]
    fn test_transport_rejects_bad_api_key() {
        let mut config = Config::new("key-with-\n-newline");
        config.api_key = "bad\nkey".to_string();
        assert!(HttpTransport::new(&config).is_err(), "换行符不是合法请求头内容");
    }
}

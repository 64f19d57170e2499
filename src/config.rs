/// SDK 配置
///
/// 所有字段均有默认值，可通过环境变量覆盖。
/// API Key 没有可用的默认值，必须由调用方提供。
#[derive(Clone, Debug)]
pub struct Config {
    /// KoreShield API Key
    pub api_key: String,
    /// API 基础地址
    pub base_url: String,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
    /// 瞬时错误的最大重试次数
    pub retry_attempts: u32,
    /// 重试基础间隔（毫秒），按 2 的幂指数退避
    pub retry_delay_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.koreshield.com".to_string(),
            timeout_secs: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 使用指定的 API Key 创建配置，其余字段取默认值
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_key: std::env::var("KORESHIELD_API_KEY").unwrap_or(default.api_key),
            base_url: std::env::var("KORESHIELD_BASE_URL").unwrap_or(default.base_url),
            timeout_secs: std::env::var("KORESHIELD_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.timeout_secs),
            retry_attempts: std::env::var("KORESHIELD_RETRY_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_attempts),
            retry_delay_ms: std::env::var("KORESHIELD_RETRY_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_delay_ms),
            verbose_logging: std::env::var("KORESHIELD_VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 校验配置是否可用
    ///
    /// # 返回
    /// API Key 为空或基础地址不合法时返回配置错误
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.api_key.is_empty() {
            return Err(crate::error::Error::config("API Key 不能为空"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(crate::error::Error::config(format!(
                "基础地址不合法: {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// 去掉基础地址末尾的斜杠后返回
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "https://api.koreshield.com");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let config = Config::default();
        assert!(config.validate().is_err(), "空 API Key 应当校验失败");

        let config = Config::new("test-key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::new("test-key");
        config.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err(), "非 http 地址应当校验失败");
    }

    #[test]
    fn test_base_url_trimmed() {
        let mut config = Config::new("test-key");
        config.base_url = "https://api.test.com/".to_string();
        assert_eq!(config.base_url_trimmed(), "https://api.test.com");
    }
}

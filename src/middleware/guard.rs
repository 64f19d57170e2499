//! 请求审查适配器
//!
//! ## 职责
//!
//! - 从请求载荷中提取可疑文本（常见字段：prompt / message / content / text / query / input）
//! - 调用扫描能力并按阈值判定
//! - 产出三态裁决：放行、标记（附检测结果）、拦截（附检测结果）
//!
//! ## 设计特点
//!
//! - **失败放行**：扫描本身出错时记录日志并放行，安全扫描不应成为可用性风险
//! - **框架无关**：只依赖 path / method / 载荷字节，不绑定任何 Web 框架类型

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::shield_client::ShieldClient;
use crate::error::Result;
use crate::models::scan::{DetectionResult, ThreatLevel};

/// 单条文本扫描能力
///
/// 适配器依赖的唯一接口，由 `ShieldClient` 实现；
/// 测试时可以用内存实现替代。
#[async_trait]
pub trait PromptScanner: Send + Sync {
    /// 扫描一段文本
    async fn scan_text(&self, text: &str) -> Result<DetectionResult>;
}

#[async_trait]
impl PromptScanner for ShieldClient {
    async fn scan_text(&self, text: &str) -> Result<DetectionResult> {
        ShieldClient::scan_text(self, text).await
    }
}

/// 请求审查配置
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// 达到该威胁级别才标记/拦截
    pub threat_threshold: ThreatLevel,
    /// 是否拦截（false 时只标记不拦截）
    pub block_on_threat: bool,
    /// 跳过审查的路径
    pub exclude_paths: Vec<String>,
    /// 需要审查的 HTTP 方法
    pub scannable_methods: Vec<String>,
    /// 非 JSON 载荷的最大扫描字节数
    pub max_scan_bytes: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            threat_threshold: ThreatLevel::Medium,
            block_on_threat: false,
            exclude_paths: vec![
                "/health".to_string(),
                "/docs".to_string(),
                "/openapi.json".to_string(),
            ],
            scannable_methods: vec![
                "POST".to_string(),
                "PUT".to_string(),
                "PATCH".to_string(),
            ],
            max_scan_bytes: 10_000,
        }
    }
}

/// 请求裁决
#[derive(Debug)]
pub enum Verdict {
    /// 放行（安全、低于阈值、路径被排除或扫描失败）
    Allow,
    /// 标记：检出威胁但配置为不拦截，调用方可自行记录或降级处理
    Flag(DetectionResult),
    /// 拦截：检出威胁且配置为拦截
    Block(DetectionResult),
}

impl Verdict {
    /// 是否放行
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Verdict::Block(_))
    }
}

/// 请求审查适配器
pub struct RequestGuard<S: PromptScanner> {
    scanner: S,
    config: GuardConfig,
}

impl<S: PromptScanner> RequestGuard<S> {
    /// 创建适配器
    pub fn new(scanner: S, config: GuardConfig) -> Self {
        Self { scanner, config }
    }

    /// 审查一个请求
    ///
    /// # 参数
    /// - `path`: 请求路径
    /// - `method`: HTTP 方法（大写）
    /// - `payload`: 请求体字节
    ///
    /// # 返回
    /// 放行 / 标记 / 拦截；扫描失败一律放行
    pub async fn inspect(&self, path: &str, method: &str, payload: &[u8]) -> Verdict {
        if self.config.exclude_paths.iter().any(|p| p == path) {
            return Verdict::Allow;
        }
        if !self.config.scannable_methods.iter().any(|m| m == method) {
            return Verdict::Allow;
        }

        let text = self.extract_payload_text(payload);
        if text.is_empty() {
            return Verdict::Allow;
        }

        let result = match self.scanner.scan_text(&text).await {
            Ok(result) => result,
            Err(e) => {
                // 失败放行：扫描故障不能挡住正常请求
                warn!("⚠️ 请求审查扫描失败，放行: {}", e);
                return Verdict::Allow;
            }
        };

        if !result.is_safe && result.threat_level >= self.config.threat_threshold {
            if self.config.block_on_threat {
                warn!(
                    "🚫 拦截请求 {} (威胁级别: {}, 置信度: {:.2})",
                    path,
                    result.threat_level.as_str(),
                    result.confidence
                );
                return Verdict::Block(result);
            }
            debug!(
                "🚩 标记请求 {} (威胁级别: {})",
                path,
                result.threat_level.as_str()
            );
            return Verdict::Flag(result);
        }

        Verdict::Allow
    }

    /// 从请求载荷中提取待扫描文本
    ///
    /// JSON 载荷按常见字段提取；非 JSON 的小载荷按 UTF-8 整体扫描。
    fn extract_payload_text(&self, payload: &[u8]) -> String {
        if payload.is_empty() {
            return String::new();
        }

        if let Ok(value) = serde_json::from_slice::<Value>(payload) {
            return extract_text_fields(&value);
        }

        if payload.len() < self.config.max_scan_bytes {
            return String::from_utf8_lossy(payload).into_owned();
        }

        String::new()
    }
}

/// JSON 载荷中常见的文本字段
const TEXT_FIELDS: [&str; 6] = ["prompt", "message", "content", "text", "query", "input"];

/// 从 JSON 值中提取文本内容
fn extract_text_fields(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let texts: Vec<&str> = TEXT_FIELDS
                .iter()
                .filter_map(|field| map.get(*field).and_then(|v| v.as_str()))
                .collect();
            texts.join(" ")
        }
        Value::Array(items) => {
            let texts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            texts.join(" ")
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text_from_object() {
        let value = json!({
            "prompt": "hello",
            "query": "world",
            "unrelated": "skip me",
            "count": 3
        });
        assert_eq!(extract_text_fields(&value), "hello world");
    }

    #[test]
    fn test_extract_text_from_string_and_array() {
        assert_eq!(extract_text_fields(&json!("plain")), "plain");
        assert_eq!(extract_text_fields(&json!(["a", 1, "b"])), "a b");
        assert_eq!(extract_text_fields(&json!(42)), "");
    }
}

//! 扫描请求与检测结果的线上类型
//!
//! 这些类型与远端 API 的 JSON 契约一一对应。检测结果由远端服务独家产出，
//! SDK 只负责传递，不做任何加工。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 威胁级别
///
/// 有序枚举：safe < low < medium < high < critical，
/// 派生 `Ord` 以便做阈值比较和分块结果聚合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// 返回线上协议中使用的字符串形式
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Safe => "safe",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }
}

/// 检测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    Keyword,
    Pattern,
    Rule,
    Ml,
    Blocklist,
    Allowlist,
}

/// 单条检测指标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionIndicator {
    /// 检测方式
    #[serde(rename = "type")]
    pub kind: DetectionType,
    /// 该指标的威胁级别
    pub severity: ThreatLevel,
    /// 置信度，取值范围 [0.0, 1.0]
    pub confidence: f64,
    /// 人类可读的说明
    pub description: String,
    /// 附加信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// 一次安全扫描的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// 内容是否安全
    pub is_safe: bool,
    /// 整体威胁级别
    pub threat_level: ThreatLevel,
    /// 整体置信度，取值范围 [0.0, 1.0]
    pub confidence: f64,
    /// 检测指标列表
    #[serde(default)]
    pub indicators: Vec<DetectionIndicator>,
    /// 服务端处理耗时（毫秒）
    pub processing_time_ms: f64,
    /// 扫描标识
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
    /// 附加信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// 单条扫描请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    /// 待扫描的 prompt 文本
    pub prompt: String,
    /// 发起请求的用户标识
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// 会话标识
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// 附加信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ScanRequest {
    /// 创建只包含 prompt 的扫描请求
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            user_id: None,
            session_id: None,
            metadata: None,
        }
    }

    /// 设置用户标识
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// 设置会话标识
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// 设置附加信息
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// 扫描接口的完整响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    /// 检测结果
    pub result: DetectionResult,
    /// 请求标识
    pub request_id: String,
    /// 服务端时间戳
    pub timestamp: DateTime<Utc>,
    /// 服务端版本
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_level_ordering() {
        // 阈值比较依赖这个全序
        assert!(ThreatLevel::Safe < ThreatLevel::Low);
        assert!(ThreatLevel::Low < ThreatLevel::Medium);
        assert!(ThreatLevel::Medium < ThreatLevel::High);
        assert!(ThreatLevel::High < ThreatLevel::Critical);
    }

    #[test]
    fn test_threat_level_wire_format() {
        let json = serde_json::to_string(&ThreatLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");

        let level: ThreatLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(level, ThreatLevel::Medium);
    }

    #[test]
    fn test_scan_request_skips_empty_context() {
        let request = ScanRequest::new("hello");
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("user_id").is_none(), "未设置的字段不应出现在请求体中");
        assert_eq!(json.get("prompt").unwrap(), "hello");
    }

    #[test]
    fn test_detection_result_deserializes_without_optionals() {
        let json = r#"{
            "is_safe": false,
            "threat_level": "high",
            "confidence": 0.92,
            "processing_time_ms": 12.5
        }"#;
        let result: DetectionResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_safe);
        assert_eq!(result.threat_level, ThreatLevel::High);
        assert!(result.indicators.is_empty());
        assert!(result.scan_id.is_none());
    }
}

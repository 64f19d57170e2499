//! RAG 上下文扫描的线上类型
//!
//! 用于把"用户查询 + 召回的文档集合"整体送检，识别间接注入攻击。
//! 分类学（taxonomy）和跨文档分析由服务端产出，SDK 按不透明 JSON 透传。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::scan::ThreatLevel;

/// 一篇召回文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagDocument {
    /// 文档标识
    pub id: String,
    /// 文档内容
    pub content: String,
    /// 来源等附加信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RagDocument {
    /// 创建文档
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: None,
        }
    }

    /// 设置附加信息
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// RAG 扫描的可选配置覆盖
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagScanConfig {
    /// 最低置信度阈值，取值范围 [0.0, 1.0]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    /// 是否启用跨文档威胁分析
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_cross_document_analysis: Option<bool>,
    /// 单次扫描的最大文档数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_documents: Option<usize>,
}

/// RAG 上下文扫描请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagScanRequest {
    /// 用户的原始查询
    pub user_query: String,
    /// 召回的文档集合
    pub documents: Vec<RagDocument>,
    /// 配置覆盖
    #[serde(default)]
    pub config: RagScanConfig,
}

impl RagScanRequest {
    /// 创建 RAG 扫描请求
    pub fn new(user_query: impl Into<String>, documents: Vec<RagDocument>) -> Self {
        Self {
            user_query: user_query.into(),
            documents,
            config: RagScanConfig::default(),
        }
    }

    /// 设置配置覆盖
    pub fn with_config(mut self, config: RagScanConfig) -> Self {
        self.config = config;
        self
    }
}

/// RAG 上下文扫描响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagScanResponse {
    /// 整体是否安全
    pub is_safe: bool,
    /// 整体威胁级别
    pub overall_severity: ThreatLevel,
    /// 整体置信度，取值范围 [0.0, 1.0]
    pub overall_confidence: f64,
    /// 五维威胁分类（服务端结构，按原样透传）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Value>,
    /// 单文档与跨文档威胁分析（服务端结构，按原样透传）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_analysis: Option<Value>,
    /// 处理统计
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Value>,
    /// 请求标识
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_request_wire_shape() {
        let request = RagScanRequest::new(
            "Summarize my emails",
            vec![RagDocument::new("email_1", "Normal email content")],
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["user_query"], "Summarize my emails");
        assert_eq!(json["documents"][0]["id"], "email_1");
        // 空配置序列化为空对象，而不是缺失字段
        assert!(json["config"].is_object());
    }

    #[test]
    fn test_rag_response_deserializes_opaque_payloads() {
        let json = r#"{
            "is_safe": false,
            "overall_severity": "critical",
            "overall_confidence": 0.97,
            "taxonomy": {"injection_vectors": ["document"]}
        }"#;
        let response: RagScanResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.overall_severity, ThreatLevel::Critical);
        assert!(response.taxonomy.is_some());
        assert!(response.context_analysis.is_none());
    }
}

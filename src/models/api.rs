//! 历史查询、健康检查与客户端性能统计类型

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::scan::ThreatLevel;

/// 扫描历史的查询条件
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// 最大返回条数
    pub limit: usize,
    /// 分页偏移
    pub offset: usize,
    /// 按用户标识过滤
    pub user_id: Option<String>,
    /// 按威胁级别过滤
    pub threat_level: Option<ThreatLevel>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            user_id: None,
            threat_level: None,
        }
    }
}

impl HistoryQuery {
    /// 转换为 URL 查询参数
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        if let Some(user_id) = &self.user_id {
            params.push(("user_id".to_string(), user_id.clone()));
        }
        if let Some(level) = self.threat_level {
            params.push(("threat_level".to_string(), level.as_str().to_string()));
        }
        params
    }
}

/// 扫描历史的一页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHistoryPage {
    /// 本页扫描记录（服务端结构，按原样透传）
    #[serde(default)]
    pub scans: Vec<Value>,
    /// 符合条件的总条数
    #[serde(default)]
    pub total: u64,
    /// 本页条数上限
    #[serde(default)]
    pub limit: usize,
    /// 分页偏移
    #[serde(default)]
    pub offset: usize,
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// 服务状态描述
    pub status: String,
    /// 服务端版本
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// 客户端性能统计
///
/// 只在客户端启用统计时收集，随时可重置。
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    /// 累计请求数
    pub total_requests: u64,
    /// 累计失败数
    pub error_count: u64,
    /// 累计耗时（毫秒）
    pub total_processing_time_ms: f64,
    /// 平均响应耗时（毫秒）
    pub average_response_time_ms: f64,
    /// 每秒请求数
    pub requests_per_second: f64,
    /// 客户端运行时长（秒）
    pub uptime_seconds: f64,
    /// 流式扫描已处理的分块数
    pub streaming_chunks_processed: u64,
    /// 最近一次批量扫描的成功率
    pub batch_efficiency: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_query_params() {
        let query = HistoryQuery {
            threat_level: Some(ThreatLevel::High),
            ..Default::default()
        };
        let params = query.to_params();
        assert!(params.contains(&("limit".to_string(), "50".to_string())));
        assert!(params.contains(&("threat_level".to_string(), "high".to_string())));
        // 未设置的过滤条件不应出现
        assert!(!params.iter().any(|(k, _)| k == "user_id"));
    }
}

//! 客户端安全策略
//!
//! 在请求发出之前做一层本地过滤：命中白名单直接放行，
//! 命中黑名单直接判定为不安全，完全不产生网络请求。

use serde::{Deserialize, Serialize};

use crate::models::scan::ThreatLevel;

/// 客户端安全策略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// 策略名称
    pub name: String,
    /// 被本策略拦截的内容标记为该威胁级别
    pub threat_threshold: ThreatLevel,
    /// 白名单子串（不区分大小写），命中即放行
    #[serde(default)]
    pub allowlist_patterns: Vec<String>,
    /// 黑名单子串（不区分大小写），命中即拦截
    #[serde(default)]
    pub blocklist_patterns: Vec<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            threat_threshold: ThreatLevel::Medium,
            allowlist_patterns: Vec::new(),
            blocklist_patterns: Vec::new(),
        }
    }
}

impl SecurityPolicy {
    /// 创建命名策略，其余字段取默认值
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 判断 prompt 是否通过本策略
    ///
    /// 检查顺序：先白名单后黑名单，都未命中则放行。
    ///
    /// # 返回
    /// `true` 表示可以继续发送扫描请求
    pub fn allows(&self, prompt: &str) -> bool {
        let lowered = prompt.to_lowercase();

        for pattern in &self.allowlist_patterns {
            if lowered.contains(&pattern.to_lowercase()) {
                return true;
            }
        }

        for pattern in &self.blocklist_patterns {
            if lowered.contains(&pattern.to_lowercase()) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict_policy() -> SecurityPolicy {
        SecurityPolicy {
            name: "strict".to_string(),
            threat_threshold: ThreatLevel::Medium,
            allowlist_patterns: vec!["weather report".to_string()],
            blocklist_patterns: vec!["unsafe".to_string(), "hack".to_string()],
        }
    }

    #[test]
    fn test_allowlist_wins() {
        let policy = strict_policy();
        assert!(policy.allows("Today's weather report"));
        // 同时命中黑白名单时，白名单优先放行
        assert!(policy.allows("unsafe weather report"));
    }

    #[test]
    fn test_blocklist_blocks() {
        let policy = strict_policy();
        assert!(!policy.allows("This contains unsafe content"));
        // 不区分大小写
        assert!(!policy.allows("trying to HACK the system"));
    }

    #[test]
    fn test_neutral_content_passes() {
        let policy = strict_policy();
        assert!(policy.allows("This is neutral content"));
        // 默认策略没有任何 pattern，一律放行
        assert!(SecurityPolicy::default().allows("anything"));
    }
}

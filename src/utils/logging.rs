//! 日志工具模块
//!
//! 提供日志初始化和文本预览的辅助函数

use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 从 `RUST_LOG` 环境变量读取过滤规则，未设置时默认 `info`。
/// 重复调用是安全的（后续调用不生效）。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a very long text", 6), "a very...");
        // 按字符截断，多字节文本不会切坏
        assert_eq!(truncate_text("中文内容测试", 3), "中文内...");
    }
}

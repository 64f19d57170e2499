//! 流式长文本扫描 - 编排层
//!
//! 把超长内容切成带重叠的分块，经由批量扫描器有界并发送检，
//! 最后聚合出整体结论。重叠区保证跨分块边界的注入内容不会被切断漏检。

use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::scan::{DetectionIndicator, DetectionResult, ThreatLevel};
use crate::orchestrator::batch::{run_batch, BatchOptions};

/// 流式扫描选项
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// 每个分块的字符数
    pub chunk_size: usize,
    /// 相邻分块的重叠字符数，必须小于 chunk_size
    pub overlap: usize,
    /// 分块送检的最大并发数
    pub max_concurrent: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 100,
            max_concurrent: 5,
        }
    }
}

/// 流式扫描报告
#[derive(Debug)]
pub struct StreamScanReport {
    /// 每个分块的扫描结果（与分块顺序一致，失败的分块为 Err）
    pub chunk_results: Vec<Result<DetectionResult>>,
    /// 聚合后的整体结论
    pub overall: DetectionResult,
    /// 分块总数
    pub total_chunks: usize,
    /// 扫描失败的分块数
    pub failed_chunks: usize,
}

/// 把内容切成带重叠的分块
///
/// 按字符切分（不是字节），避免多字节文本被切在编码中间。
/// 每次前进 `chunk_size - overlap` 个字符，保证一定向前推进。
///
/// # 参数
/// - `content`: 原始内容
/// - `chunk_size`: 分块字符数
/// - `overlap`: 重叠字符数
pub fn create_chunks(content: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= chunk_size {
        return vec![content.to_string()];
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// 流式扫描长内容
///
/// # 参数
/// - `content`: 待扫描的长文本
/// - `options`: 分块与并发选项
/// - `scan_chunk`: 单分块扫描能力，由调用方提供
///
/// # 返回
/// 分块结果与聚合结论；内容为空或分块参数不合法时在发出任何请求前报错
pub async fn scan_stream<F, Fut>(
    content: &str,
    options: &StreamOptions,
    scan_chunk: F,
) -> Result<StreamScanReport>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<DetectionResult>>,
{
    if content.is_empty() {
        return Err(Error::validation("待扫描内容不能为空"));
    }
    if options.chunk_size == 0 {
        return Err(Error::validation("chunk_size 必须大于 0"));
    }
    if options.overlap >= options.chunk_size {
        return Err(Error::validation("overlap 必须小于 chunk_size"));
    }

    let chunks = create_chunks(content, options.chunk_size, options.overlap);
    let total_chunks = chunks.len();
    debug!("🧩 流式扫描: {} 字符切为 {} 块", content.chars().count(), total_chunks);

    let batch_options = BatchOptions::concurrent(options.max_concurrent);
    let chunk_results = run_batch(chunks, &batch_options, None, scan_chunk).await?;

    let overall = aggregate(&chunk_results, content, options);
    let failed_chunks = chunk_results.iter().filter(|r| r.is_err()).count();

    Ok(StreamScanReport {
        chunk_results,
        overall,
        total_chunks,
        failed_chunks,
    })
}

/// 聚合分块结果为整体结论
///
/// 整体威胁级别取各分块的最高值，置信度取平均值，
/// 全部成功分块均安全时整体才算安全。各分块的指标合并后附上分块下标。
fn aggregate(
    chunk_results: &[Result<DetectionResult>],
    content: &str,
    options: &StreamOptions,
) -> DetectionResult {
    let succeeded: Vec<(usize, &DetectionResult)> = chunk_results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().ok().map(|result| (i, result)))
        .collect();

    let threat_level = succeeded
        .iter()
        .map(|(_, r)| r.threat_level)
        .max()
        .unwrap_or(ThreatLevel::Safe);

    let confidence = if succeeded.is_empty() {
        0.0
    } else {
        succeeded.iter().map(|(_, r)| r.confidence).sum::<f64>() / succeeded.len() as f64
    };

    let is_safe = !succeeded.is_empty() && succeeded.iter().all(|(_, r)| r.is_safe);

    let mut indicators: Vec<DetectionIndicator> = Vec::new();
    for (chunk_index, result) in &succeeded {
        for indicator in &result.indicators {
            let mut tagged = indicator.clone();
            let mut metadata = tagged.metadata.take().unwrap_or_else(|| json!({}));
            if let Some(map) = metadata.as_object_mut() {
                map.insert("chunk_index".to_string(), json!(chunk_index));
            }
            tagged.metadata = Some(metadata);
            indicators.push(tagged);
        }
    }

    let processing_time_ms = succeeded.iter().map(|(_, r)| r.processing_time_ms).sum();

    DetectionResult {
        is_safe,
        threat_level,
        confidence,
        indicators,
        processing_time_ms,
        scan_id: Some(format!("stream_{}", Utc::now().timestamp())),
        metadata: Some(json!({
            "total_chunks": chunk_results.len(),
            "chunk_size": options.chunk_size,
            "overlap": options.overlap,
            "content_length": content.chars().count(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_single_chunk() {
        let chunks = create_chunks("short", 1000, 100);
        assert_eq!(chunks, vec!["short".to_string()]);
    }

    #[test]
    fn test_chunks_overlap() {
        let content = "This is a test content for chunking purposes.";
        let chunks = create_chunks(content, 10, 3);

        assert!(chunks.len() > 1);
        // 第一块是前 10 个字符
        assert_eq!(chunks[0], &content[..10]);
        // 第二块与第一块重叠 3 个字符
        assert!(chunks[1].starts_with(&content[7..10]));
    }

    #[test]
    fn test_chunks_cover_entire_content() {
        let content: String = std::iter::repeat('x').take(2500).collect();
        let chunks = create_chunks(&content, 1000, 100);

        // 最后一块必须到达内容末尾
        let last = chunks.last().unwrap();
        assert!(last.ends_with('x'));
        let covered = (chunks.len() - 1) * 900 + chunks.last().unwrap().len();
        assert!(covered >= 2500, "分块必须覆盖全部内容");
    }

    #[test]
    fn test_chunks_handle_multibyte() {
        // 多字节字符按字符数切分，不能切在编码中间
        let content: String = std::iter::repeat('中').take(25).collect();
        let chunks = create_chunks(&content, 10, 2);
        for chunk in &chunks {
            assert!(chunk.chars().all(|c| c == '中'));
        }
    }
}

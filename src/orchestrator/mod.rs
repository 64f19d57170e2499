//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把"扫描一条"的能力编排成批量与流式处理，是并发控制的唯一所在。
//!
//! ## 模块划分
//!
//! ### `batch` - 有界并发批量扫描器
//! - 持有每个输入的结果槽位（按原始下标寻址）
//! - 滑动窗口准入：任一请求完成立刻补位下一个，不等整批
//! - 单条失败隔离：错误写入对应槽位，不影响其他请求
//! - 每次完成后同步触发进度回调
//!
//! ### `stream` - 流式长文本扫描
//! - 把长文本切成带重叠的分块（Vec<String>）
//! - 复用 batch 的并发窗口逐块送检
//! - 聚合整体结论（最高威胁级别、平均置信度）
//!
//! ## 层次关系
//!
//! ```text
//! stream (处理长文本 → Vec<分块>)
//!     ↓
//! batch (处理 Vec<输入>)
//!     ↓
//! 单条扫描能力（由 clients 层提供）
//! ```

pub mod batch;
pub mod stream;

pub use batch::{run_batch, BatchOptions, ProgressCallback, ProgressEvent};
pub use stream::{create_chunks, scan_stream, StreamOptions, StreamScanReport};

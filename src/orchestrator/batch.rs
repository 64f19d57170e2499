//! 有界并发批量扫描器 - 编排层
//!
//! ## 职责
//!
//! 把"扫描一条输入"的能力放大为"扫描一批输入"，同时约束在途请求数量。
//!
//! ## 核心保证
//!
//! 1. **位置对应**：结果顺序与输入顺序一致，result[i] 永远对应 input[i]
//! 2. **滑动窗口**：任一请求完成立刻准入下一个待发输入，绝不等整批结束
//! 3. **失败隔离**：单条请求的失败只写入它自己的槽位，不取消其他请求
//! 4. **进度可见**：每条完成（无论成败）后同步触发一次进度回调
//!
//! ## 设计特点
//!
//! - **下标标记**：每个在途请求携带原始下标，完成后按下标归位
//! - **两条路径**：串行模式完全绕开窗口机制，保证请求本身按输入顺序发出
//! - **回调兜底**：回调内部 panic 被捕获，不会丢结果、不会中断批次
//!
//! ## 取消语义
//!
//! 丢弃（drop）本模块返回的 Future 会立即中止所有在途请求，
//! 已完成的槽位随 Future 一起丢弃。需要保留部分结果时请让 Future 跑完。

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// 批量扫描选项
///
/// 显式字段替代开放式参数包，默认值与远端服务的推荐值一致。
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 是否并发处理；为 false 时严格逐条顺序发送
    pub parallel: bool,
    /// 最大并发请求数，必须大于 0；超过输入数量时等效于输入数量
    pub max_concurrent: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_concurrent: 10,
        }
    }
}

impl BatchOptions {
    /// 创建串行模式选项
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            max_concurrent: 1,
        }
    }

    /// 创建并发模式选项
    ///
    /// # 参数
    /// - `max_concurrent`: 最大并发请求数
    pub fn concurrent(max_concurrent: usize) -> Self {
        Self {
            parallel: true,
            max_concurrent,
        }
    }
}

/// 进度事件
///
/// 每条输入完成后发出一次，仅用于展示，不会被重试或持久化。
#[derive(Debug)]
pub struct ProgressEvent<'a, R> {
    /// 已完成数量（含失败），从 1 单调递增到 total
    pub completed: usize,
    /// 输入总数
    pub total: usize,
    /// 刚完成的结果；该条失败时为 None
    pub latest: Option<&'a R>,
}

/// 进度回调类型
pub type ProgressCallback<'a, R> = &'a mut dyn FnMut(ProgressEvent<'_, R>);

/// 批量扫描
///
/// 对每条输入调用一次 `scan_one`，并发数不超过 `options.max_concurrent`。
/// 单条失败写入该条的槽位，不影响其他输入；只有发出任何请求之前的
/// 校验问题（如 `max_concurrent == 0`）才会让整个调用失败。
///
/// # 参数
/// - `inputs`: 有序的输入列表，可以为空
/// - `options`: 并发策略
/// - `progress`: 可选的进度回调，每条完成后同步触发一次
/// - `scan_one`: 单条扫描能力，由调用方提供
///
/// # 返回
/// 与输入等长、顺序一致的结果列表，每个元素是该条输入的成功结果或错误
pub async fn run_batch<T, R, F, Fut>(
    inputs: Vec<T>,
    options: &BatchOptions,
    mut progress: Option<ProgressCallback<'_, R>>,
    scan_one: F,
) -> Result<Vec<Result<R>>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    if options.max_concurrent == 0 {
        return Err(Error::validation("max_concurrent 必须大于 0"));
    }

    let total = inputs.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut slots: Vec<(usize, Result<R>)> = Vec::with_capacity(total);

    if !options.parallel {
        // 串行模式：上一条的结果落位之后，下一条才会发出
        debug!("📦 批量扫描开始: {} 条输入（串行模式）", total);

        for (index, input) in inputs.into_iter().enumerate() {
            let outcome = scan_one(input).await;
            record_and_report(&mut slots, &mut progress, index, outcome, total);
        }
    } else {
        let window = options.max_concurrent.min(total);
        debug!("📦 批量扫描开始: {} 条输入, 并发窗口 {}", total, window);

        let mut pending = inputs.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();

        // 先填满窗口
        for (index, input) in pending.by_ref().take(window) {
            in_flight.push(tagged(index, scan_one(input)));
        }

        // 任一请求完成即落位，并立刻准入下一个待发输入
        while let Some((index, outcome)) = in_flight.next().await {
            record_and_report(&mut slots, &mut progress, index, outcome, total);

            if let Some((next_index, input)) = pending.next() {
                in_flight.push(tagged(next_index, scan_one(input)));
            }
        }
    }

    // 按原始下标归位
    slots.sort_unstable_by_key(|(index, _)| *index);
    debug!("📦 批量扫描完成: {} 条", total);

    Ok(slots.into_iter().map(|(_, outcome)| outcome).collect())
}

/// 给在途请求附上原始下标
fn tagged<R>(
    index: usize,
    fut: impl Future<Output = Result<R>>,
) -> impl Future<Output = (usize, Result<R>)> {
    async move { (index, fut.await) }
}

/// 记录一条完成结果并触发进度回调
///
/// 先落位后回调：即使回调 panic，结果也已经保住。
fn record_and_report<R>(
    slots: &mut Vec<(usize, Result<R>)>,
    progress: &mut Option<ProgressCallback<'_, R>>,
    index: usize,
    outcome: Result<R>,
    total: usize,
) {
    if let Err(e) = &outcome {
        warn!("⚠️ 第 {} 条输入扫描失败: {}", index + 1, e);
    }

    slots.push((index, outcome));
    let completed = slots.len();

    let Some(callback) = progress.as_deref_mut() else {
        return;
    };

    if let Some((_, outcome)) = slots.last() {
        let event = ProgressEvent {
            completed,
            total,
            latest: outcome.as_ref().ok(),
        };
        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            warn!("⚠️ 进度回调发生 panic，已忽略并继续 ({}/{})", completed, total);
        }
    }
}

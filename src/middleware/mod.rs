//! 框架接入层
//!
//! 为 Web 框架提供统一的请求审查适配器。适配器只做一件事：
//! 给定请求载荷，返回放行 / 标记 / 拦截的裁决。
//! 具体框架（axum、actix 等）的中间件只需在各自的拦截点调用 `inspect`。

pub mod guard;

pub use guard::{GuardConfig, PromptScanner, RequestGuard, Verdict};

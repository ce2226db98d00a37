//! Redaction 模块 - 两策略脱敏引擎
//!
//! 确定性占位符替换始终可用；远程改写为可选能力，
//! 失败时按固定顺序回退 (rewrite -> deterministic)，绝不返回原文。

mod engine;
mod rewrite;

pub use engine::{RedactionEngine, RedactionResult, RedactionStrategy};
pub use rewrite::{
    HttpRewriteService, RewriteConfig, RewriteError, RewriteResponse, RewriteService,
    SharedRewriteService, TokenUsage, DEFAULT_REWRITE_TIMEOUT,
};

#[cfg(test)]
pub(crate) use rewrite::testing;

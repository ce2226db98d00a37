//! 脱敏引擎
//!
//! 两种可互换策略：确定性占位符替换 / 远程改写。
//! 改写路径任何失败都回退到确定性替换并在结果中携带原始失败原因，
//! 任何情况下都不返回未脱敏的原文。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::rewrite::{RewriteError, RewriteResponse, SharedRewriteService};
use crate::interceptor::{is_network_false_positive, Category, Finding, PatternCatalog};

/// 脱敏策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionStrategy {
    /// 确定性占位符替换 (纯本地，零成本，必定成功)
    Deterministic,
    /// 远程改写
    Rewrite,
}

impl RedactionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Rewrite => "rewrite",
        }
    }
}

/// 脱敏结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionResult {
    /// 实际使用的策略 (回退后为 Deterministic)
    pub strategy: RedactionStrategy,
    /// 脱敏后的文本
    pub output_text: String,
    /// 成本 (USD, 确定性策略为 0)
    pub cost: f64,
    /// 是否成功产出脱敏文本
    pub succeeded: bool,
    /// 改写失败时的原始原因 (回退成功时仍携带，供上层区分)
    pub error_reason: Option<String>,
}

/// 脱敏引擎
pub struct RedactionEngine {
    /// 共享模式目录 (与检测器同一份，保证替换与检测一致)
    catalog: Arc<PatternCatalog>,
    /// 可选的远程改写服务
    rewrite_service: Option<SharedRewriteService>,
}

impl RedactionEngine {
    /// 创建脱敏引擎
    ///
    /// # Arguments
    /// * `catalog` - 模式目录
    /// * `rewrite_service` - 改写服务，None 表示该能力未配置
    pub fn new(catalog: Arc<PatternCatalog>, rewrite_service: Option<SharedRewriteService>) -> Self {
        Self {
            catalog,
            rewrite_service,
        }
    }

    /// 是否配置了改写服务
    pub fn rewrite_available(&self) -> bool {
        self.rewrite_service.is_some()
    }

    /// 按选定策略脱敏
    ///
    /// Rewrite 策略失败时自动回退到 Deterministic；
    /// 回退结果 `succeeded = true` 且 `error_reason` 为原始失败。
    pub async fn redact(
        &self,
        text: &str,
        findings: &[Finding],
        strategy: RedactionStrategy,
    ) -> RedactionResult {
        match strategy {
            RedactionStrategy::Deterministic => self.redact_deterministic(text, findings),
            RedactionStrategy::Rewrite => match self.try_rewrite(text, findings).await {
                Ok(response) => RedactionResult {
                    strategy: RedactionStrategy::Rewrite,
                    output_text: response.text,
                    cost: response.cost_estimate,
                    succeeded: true,
                    error_reason: None,
                },
                Err(err) => {
                    warn!(error = %err, "rewrite unavailable, falling back to deterministic redaction");
                    let mut fallback = self.redact_deterministic(text, findings);
                    fallback.error_reason = Some(err.to_string());
                    fallback
                }
            },
        }
    }

    /// 确定性占位符替换
    ///
    /// 对每条 Finding 的模式执行全量替换，占位符按类别取定值。
    /// 网络类匹配沿用检测期的误报过滤，检测到什么就替换什么。
    pub(crate) fn redact_deterministic(&self, text: &str, findings: &[Finding]) -> RedactionResult {
        let mut output = text.to_string();

        for finding in findings {
            let Some(def) = self.catalog.find(&finding.pattern_id) else {
                continue;
            };
            let placeholder = format!("[REDACTED:{}]", def.category.as_str());

            if def.category == Category::Network {
                let haystack = output.clone();
                output = def
                    .matcher
                    .replace_all(&haystack, |caps: &regex::Captures| {
                        let mat = caps.get(0).unwrap();
                        if is_network_false_positive(def, &haystack, mat.start(), mat.as_str()) {
                            mat.as_str().to_string()
                        } else {
                            placeholder.clone()
                        }
                    })
                    .to_string();
            } else {
                output = def.matcher.replace_all(&output, placeholder.as_str()).to_string();
            }
        }

        RedactionResult {
            strategy: RedactionStrategy::Deterministic,
            output_text: output,
            cost: 0.0,
            succeeded: true,
            error_reason: None,
        }
    }

    /// 尝试远程改写
    async fn try_rewrite(
        &self,
        text: &str,
        findings: &[Finding],
    ) -> Result<RewriteResponse, RewriteError> {
        let service = self.rewrite_service.as_ref().ok_or(RewriteError::Disabled)?;

        let mut categories: Vec<Category> = Vec::new();
        for finding in findings {
            if !categories.contains(&finding.category) {
                categories.push(finding.category);
            }
        }

        let response = service.rewrite(text, &categories).await?;

        if response.text.trim().is_empty() {
            return Err(RewriteError::MalformedResponse(
                "empty rewrite output".to_string(),
            ));
        }

        Ok(response)
    }
}

//! 内置检测模式定义
//!
//! 包含常见敏感信息类别的识别模式与元数据。
//! 新增或调整模式只需修改本文件，不影响其他组件。

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::InterceptorError;

/// 敏感信息类别枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// API Key / Token 等服务凭证
    Credential,
    /// 个人身份标识 (SSN / 身份证号)
    PersonalId,
    /// 联系方式 (邮箱 / 手机号)
    Contact,
    /// 网络信息 (IP 地址)
    Network,
    /// 金融信息 (银行卡号)
    Financial,
    /// 通用 Secret/Password
    Secret,
    /// 用户自定义规则
    Custom,
}

impl Category {
    /// 获取占位符名称 (用于 [REDACTED:xxx] 格式)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credential => "CREDENTIAL",
            Self::PersonalId => "PERSONAL_ID",
            Self::Contact => "CONTACT",
            Self::Network => "NETWORK",
            Self::Financial => "FINANCIAL",
            Self::Secret => "SECRET",
            Self::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 严重程度
///
/// Ord 顺序: Low < Medium < High，用于取 Finding 列表的最大严重度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 检测模式 (未编译形态)
///
/// 用于内置模式表、用户自定义规则的存储与传输
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSeed {
    /// 模式 ID (全局唯一)
    pub id: String,
    /// 显示名称
    pub label: String,
    /// 正则表达式模式
    pub pattern: String,
    /// 敏感信息类别
    pub category: Category,
    /// 严重程度
    pub severity: Severity,
    /// 是否启用
    pub enabled: bool,
}

impl PatternSeed {
    /// 创建新模式
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        pattern: impl Into<String>,
        category: Category,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            pattern: pattern.into(),
            category,
            severity,
            enabled: true,
        }
    }

    /// 创建用户自定义模式
    pub fn custom(id: impl Into<String>, label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(id, label, pattern, Category::Custom, Severity::Medium)
    }
}

/// 编译后的检测模式
#[derive(Debug, Clone)]
pub struct PatternDefinition {
    /// 模式 ID
    pub id: String,
    /// 显示名称
    pub label: String,
    /// 敏感信息类别
    pub category: Category,
    /// 严重程度
    pub severity: Severity,
    /// 编译后的正则表达式
    pub matcher: Regex,
}

/// 内置检测模式集
pub static BUILTIN_PATTERNS: Lazy<Vec<PatternSeed>> = Lazy::new(|| {
    vec![
        // OpenAI API Key: sk-xxx 或 sk-proj-xxx
        PatternSeed::new(
            "openai_api_key",
            "OpenAI API Key",
            r"sk-(?:proj-)?[a-zA-Z0-9]{20,}",
            Category::Credential,
            Severity::High,
        ),
        // Anthropic API Key
        PatternSeed::new(
            "anthropic_api_key",
            "Anthropic API Key",
            r"sk-ant-[a-zA-Z0-9\-]{20,}",
            Category::Credential,
            Severity::High,
        ),
        // AWS Access Key ID
        PatternSeed::new(
            "aws_access_key",
            "AWS Access Key ID",
            r"AKIA[0-9A-Z]{16}",
            Category::Credential,
            Severity::High,
        ),
        // AWS Secret Access Key (40 char base64-like)
        PatternSeed::new(
            "aws_secret_key",
            "AWS Secret Access Key",
            r"(?i)aws[_\-]?secret[_\-]?(?:access[_\-]?)?key\s*[:=]\s*[A-Za-z0-9/+=]{40}",
            Category::Credential,
            Severity::High,
        ),
        // GitHub Token
        PatternSeed::new(
            "github_token",
            "GitHub Token",
            r"gh[pousr]_[A-Za-z0-9]{36,}",
            Category::Credential,
            Severity::High,
        ),
        // Google Cloud API Key
        PatternSeed::new(
            "google_cloud_key",
            "Google Cloud API Key",
            r"AIza[0-9A-Za-z\-_]{35}",
            Category::Credential,
            Severity::High,
        ),
        // Bearer Token
        PatternSeed::new(
            "bearer_token",
            "Bearer Token",
            r"Bearer\s+[A-Za-z0-9\-._~+/]+=*",
            Category::Credential,
            Severity::High,
        ),
        // JWT Token
        PatternSeed::new(
            "jwt_token",
            "JWT Token",
            r"eyJ[A-Za-z0-9\-_]+\.eyJ[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_.+/=]+",
            Category::Credential,
            Severity::High,
        ),
        // SSH/TLS 私钥头
        PatternSeed::new(
            "private_key",
            "Private Key Block",
            r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----",
            Category::Credential,
            Severity::High,
        ),
        // 美国社会安全号 SSN
        PatternSeed::new(
            "us_ssn",
            "US Social Security Number",
            r"\b\d{3}-\d{2}-\d{4}\b",
            Category::PersonalId,
            Severity::High,
        ),
        // 身份证号 (18 位)
        PatternSeed::new(
            "cn_id_card",
            "身份证号",
            r"\b\d{17}[0-9Xx]\b",
            Category::PersonalId,
            Severity::High,
        ),
        // 邮箱地址
        PatternSeed::new(
            "email_address",
            "Email Address",
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            Category::Contact,
            Severity::Medium,
        ),
        // 手机号 (11 位)
        PatternSeed::new(
            "mobile_number",
            "手机号",
            r"\b1[3-9]\d{9}\b",
            Category::Contact,
            Severity::Medium,
        ),
        // 银行卡号 (Visa / MasterCard / Amex / Discover)
        PatternSeed::new(
            "credit_card",
            "Credit Card Number",
            r"\b(?:4\d{3}|5[1-5]\d{2}|3[47]\d{2}|6(?:011|5\d{2}))[ -]?\d{4}[ -]?\d{4}[ -]?\d{1,4}\b",
            Category::Financial,
            Severity::High,
        ),
        // IPv4 地址 (匹配所有 IPv4，localhost 通过后处理过滤)
        PatternSeed::new(
            "ipv4_address",
            "IPv4 Address",
            r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b",
            Category::Network,
            Severity::Low,
        ),
        // IPv6 地址 (支持完整形式和常见压缩形式)
        PatternSeed::new(
            "ipv6_address",
            "IPv6 Address",
            r"\b(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b|\b(?:[0-9a-fA-F]{1,4}:){1,7}:\b|\b(?:[0-9a-fA-F]{1,4}:){1,6}:[0-9a-fA-F]{1,4}\b|\b::(?:[0-9a-fA-F]{1,4}:){0,5}[0-9a-fA-F]{1,4}\b",
            Category::Network,
            Severity::Low,
        ),
        // Generic Secret/Password patterns
        PatternSeed::new(
            "generic_secret",
            "Generic Secret",
            r#"(?i)(password|secret|token|api_key|apikey)\s*[:=]\s*["']?[^\s,;'"]{8,}["']?"#,
            Category::Secret,
            Severity::High,
        ),
    ]
});

/// 模式目录
///
/// 进程启动时一次性编译全部模式。编译失败属于目录编写错误，
/// 直接在构造阶段返回错误，不进入运行时恢复路径。
/// regex crate 的匹配引擎对输入长度线性，单个模式不会拖垮整条管线。
pub struct PatternCatalog {
    /// 编译后的模式列表 (仅启用项)
    definitions: Vec<PatternDefinition>,
    /// RegexSet 用于批量预筛
    regex_set: RegexSet,
}

impl PatternCatalog {
    /// 使用指定模式表创建目录
    ///
    /// # Arguments
    /// * `seeds` - 模式列表 (禁用项会被过滤)
    ///
    /// # Returns
    /// * `Result<Self, InterceptorError>` - 目录实例或编译错误
    pub fn new(seeds: Vec<PatternSeed>) -> Result<Self, InterceptorError> {
        let enabled: Vec<_> = seeds.into_iter().filter(|s| s.enabled).collect();

        let mut definitions = Vec::with_capacity(enabled.len());
        let mut patterns = Vec::with_capacity(enabled.len());

        for seed in &enabled {
            let matcher = Regex::new(&seed.pattern)?;
            definitions.push(PatternDefinition {
                id: seed.id.clone(),
                label: seed.label.clone(),
                category: seed.category,
                severity: seed.severity,
                matcher,
            });
            patterns.push(seed.pattern.as_str());
        }

        let regex_set = RegexSet::new(&patterns)?;

        Ok(Self {
            definitions,
            regex_set,
        })
    }

    /// 使用默认内置模式创建目录
    pub fn builtin() -> Result<Self, InterceptorError> {
        Self::new(BUILTIN_PATTERNS.clone())
    }

    /// 使用内置模式 + 自定义模式创建目录
    pub fn with_custom(custom: Vec<PatternSeed>) -> Result<Self, InterceptorError> {
        let mut seeds = BUILTIN_PATTERNS.clone();
        seeds.extend(custom);
        Self::new(seeds)
    }

    /// 全部启用的模式
    pub fn all_patterns(&self) -> &[PatternDefinition] {
        &self.definitions
    }

    /// 按 ID 查找模式
    pub fn find(&self, pattern_id: &str) -> Option<&PatternDefinition> {
        self.definitions.iter().find(|d| d.id == pattern_id)
    }

    /// 批量预筛用的 RegexSet
    pub(crate) fn regex_set(&self) -> &RegexSet {
        &self.regex_set
    }

    /// 模式数量
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

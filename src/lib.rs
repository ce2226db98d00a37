// PromptGuard Library
// 敏感信息拦截管线: 检测 -> 过滤 -> 评分 -> 拦截 -> 脱敏

pub mod controller;
pub mod error;
pub mod guard;
pub mod interceptor;
pub mod redaction;

pub use controller::{
    Backoff, InterceptionController, PassOutcome, RedactionRequest, RemediationOutcome,
    GRACE_WINDOW,
};
pub use error::{AppError, ErrorResponse};
pub use guard::{
    ControlId, ControlLocator, ControlSnapshot, ControlState, SharedControlLocator,
    SubmissionGuard, SubmitControl, TextInput,
};
pub use interceptor::{
    filter_findings, score, text_fingerprint, Category, Decision, Detector, EventSink, Finding,
    InterceptionEvent, InterceptorError, NullSink, PatternCatalog, PatternDefinition, PatternSeed,
    RiskAssessment, RiskLevel, RuleConfiguration, Severity, BUILTIN_PATTERNS, MIN_SCAN_CHARS,
};
pub use redaction::{
    HttpRewriteService, RedactionEngine, RedactionResult, RedactionStrategy, RewriteConfig,
    RewriteError, RewriteResponse, RewriteService, SharedRewriteService, TokenUsage,
};

//! Controller 模块 - 拦截编排
//!
//! 在每次文本变化信号上串起 检测 -> 过滤 -> 评分，驱动提交拦截器，
//! 并在用户选择后驱动脱敏引擎。所有协作方通过构造参数注入，无全局状态。
//!
//! 并发模型：协作式单写者。除改写调用外全部同步完成；
//! 在途脱敏携带发起时的文本代次，输入变化后到达的结果直接丢弃。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::guard::{SharedControlLocator, SubmissionGuard};
use crate::interceptor::{
    filter_findings, score, text_fingerprint, Decision, Detector, EventSink, Finding,
    InterceptionEvent, RiskAssessment, RuleConfiguration, MIN_SCAN_CHARS,
};
use crate::redaction::{RedactionEngine, RedactionResult, RedactionStrategy};

/// "直接发送" 后抑制再次拦截的宽限窗口
pub const GRACE_WINDOW: Duration = Duration::from_secs(10);

/// 控件重发现的退避参数
const DISCOVERY_BACKOFF_BASE: Duration = Duration::from_millis(500);
const DISCOVERY_BACKOFF_MAX: Duration = Duration::from_secs(10);

/// 指数退避计数器
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// 取下一次延迟并推进计数
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.attempt.min(16);
        let delay = self
            .base
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// 发现成功后归零
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// 单次检测 pass 的结果
#[derive(Debug, Clone)]
pub enum PassOutcome {
    /// 文本未变化或控制器已销毁，什么都没做
    NoChange,
    /// 文本低于最小长度，跳过检测 (如果之前处于拦截态则已解除)
    ShortCircuit { unblocked: bool },
    /// 命中临时信任指纹 (刚完成脱敏的文本)，本 pass 跳过拦截
    Trusted,
    /// 命中敏感内容，提交已拦截
    Blocked {
        findings: Vec<Finding>,
        assessment: RiskAssessment,
    },
    /// 宽限窗口内命中敏感内容，但不重新拦截
    GracePeriod {
        findings: Vec<Finding>,
        assessment: RiskAssessment,
    },
    /// 无敏感内容，提交放行
    Cleared { assessment: RiskAssessment },
}

/// 脱敏请求
///
/// 发起时从控制器摘出文本快照与代次；
/// 结果回填时代次不一致即视为过期。
#[derive(Debug, Clone)]
pub struct RedactionRequest {
    /// 发起时的文本
    pub text: String,
    /// 发起时的过滤后 Finding 列表
    pub findings: Vec<Finding>,
    /// 选定的策略
    pub mode: RedactionStrategy,
    /// 文本代次
    generation: u64,
}

/// 脱敏流程的结果
#[derive(Debug)]
pub enum RemediationOutcome {
    /// 脱敏已应用；residual 为对输出复检后仍存在的 Finding (警告性质)
    Applied {
        result: RedactionResult,
        residual: Vec<Finding>,
    },
    /// 输入在脱敏期间已变化，结果被丢弃
    Stale,
    /// 当前没有可脱敏的 Finding
    NoFindings,
}

/// 拦截控制器
///
/// InputSnapshot (最近一次处理的文本) 的唯一持有者；
/// GuardState 经由内部 SubmissionGuard 单点读写。
pub struct InterceptionController {
    detector: Detector,
    guard: SubmissionGuard,
    engine: Arc<RedactionEngine>,
    locator: SharedControlLocator,
    sink: Arc<dyn EventSink>,
    /// 当前规则快照 (None = 尚未加载，过滤时整体保留)
    rules: Option<RuleConfiguration>,
    /// 最近一次处理的文本
    last_text: String,
    /// 最近一次过滤后的 Finding 列表
    last_findings: Vec<Finding>,
    /// 文本代次，每次接受新文本时 +1
    generation: u64,
    /// 临时信任指纹 (刚脱敏文本的哈希，仅一个 pass 有效)
    trusted_fingerprint: Option<String>,
    /// 宽限窗口截止时间
    grace_until: Option<Instant>,
    /// 控件发现退避
    discovery_backoff: Backoff,
    next_discovery_at: Option<Instant>,
    torn_down: bool,
}

impl InterceptionController {
    /// 创建控制器
    ///
    /// # Arguments
    /// * `detector` - 检测器
    /// * `guard` - 提交拦截器 (控制器独占持有)
    /// * `engine` - 脱敏引擎
    /// * `locator` - 宿主控件定位器
    /// * `sink` - 事件收集方
    pub fn new(
        detector: Detector,
        guard: SubmissionGuard,
        engine: RedactionEngine,
        locator: SharedControlLocator,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            detector,
            guard,
            engine: Arc::new(engine),
            locator,
            sink,
            rules: None,
            last_text: String::new(),
            last_findings: Vec::new(),
            generation: 0,
            trusted_fingerprint: None,
            grace_until: None,
            discovery_backoff: Backoff::new(DISCOVERY_BACKOFF_BASE, DISCOVERY_BACKOFF_MAX),
            next_discovery_at: None,
            torn_down: false,
        }
    }

    /// 当前是否处于拦截态
    pub fn is_blocked(&self) -> bool {
        self.guard.is_blocked()
    }

    /// 共享脱敏引擎 (供宿主在不持有控制器借用的情况下执行在途脱敏)
    pub fn engine(&self) -> Arc<RedactionEngine> {
        Arc::clone(&self.engine)
    }

    /// 最近一次过滤后的 Finding 列表
    pub fn current_findings(&self) -> &[Finding] {
        &self.last_findings
    }

    /// 文本变化信号入口
    ///
    /// 相同文本直接跳过；新文本清除宽限窗口并推进代次后进入检测
    pub async fn on_text_changed(&mut self, text: &str) -> PassOutcome {
        if self.torn_down || text == self.last_text {
            return PassOutcome::NoChange;
        }

        // 文本变化即恢复正常检测，宽限只保护已放行的那一版输入
        self.grace_until = None;
        self.generation = self.generation.wrapping_add(1);
        self.last_text = text.to_string();

        self.evaluate().await
    }

    /// 接收新的规则快照，并对当前缓冲文本立即重过滤
    ///
    /// 不需要等待新的击键
    pub async fn update_rules(&mut self, rules: RuleConfiguration) -> PassOutcome {
        self.rules = Some(rules);
        if self.torn_down {
            return PassOutcome::NoChange;
        }
        self.evaluate().await
    }

    /// 对当前缓冲文本执行一次完整 pass
    async fn evaluate(&mut self) -> PassOutcome {
        // 短文本直接放行；若之前处于拦截态必须解除，拦截不能因疏漏而永久化
        if self.last_text.chars().count() < MIN_SCAN_CHARS {
            self.last_findings.clear();
            let was_blocked = self.guard.is_blocked();
            if was_blocked {
                let controls = self.locator.locate_submit_controls().await;
                self.guard.unblock(&controls);
                self.emit_event(Decision::Cleared, &[], None);
            }
            return PassOutcome::ShortCircuit {
                unblocked: was_blocked,
            };
        }

        // 临时信任只消费一次：命中则跳过本 pass，未命中也立即失效
        if let Some(fingerprint) = self.trusted_fingerprint.take() {
            if fingerprint == text_fingerprint(&self.last_text) {
                self.last_findings.clear();
                if self.guard.is_blocked() {
                    let controls = self.locator.locate_submit_controls().await;
                    self.guard.unblock(&controls);
                }
                return PassOutcome::Trusted;
            }
        }

        let findings = self.detector.detect(&self.last_text);
        let filtered = filter_findings(findings, self.rules.as_ref());
        let assessment = score(&filtered);
        self.last_findings = filtered.clone();

        if filtered.is_empty() {
            if self.guard.is_blocked() {
                let controls = self.locator.locate_submit_controls().await;
                self.guard.unblock(&controls);
                self.emit_event(Decision::Cleared, &[], None);
            }
            return PassOutcome::Cleared { assessment };
        }

        // 宽限窗口内不重新拦截，检测结果照常上报给调用方
        if let Some(until) = self.grace_until {
            if Instant::now() < until {
                return PassOutcome::GracePeriod {
                    findings: filtered,
                    assessment,
                };
            }
            self.grace_until = None;
        }

        let controls = self.locator.locate_submit_controls().await;
        if controls.is_empty() {
            // 没有可拦截目标不是致命问题，检测与脱敏照常工作
            warn!("no submit controls located, nothing to block");
        }
        let was_blocked = self.guard.is_blocked();
        self.guard.block(&controls);
        if !was_blocked {
            self.emit_event(Decision::Blocked, &filtered, None);
        }

        PassOutcome::Blocked {
            findings: filtered,
            assessment,
        }
    }

    /// 发起脱敏请求 (拆分式 API 的前半段)
    ///
    /// 返回 None 表示当前没有可脱敏的 Finding
    pub fn begin_remediation(&self, mode: RedactionStrategy) -> Option<RedactionRequest> {
        if self.last_findings.is_empty() {
            return None;
        }
        Some(RedactionRequest {
            text: self.last_text.clone(),
            findings: self.last_findings.clone(),
            mode,
            generation: self.generation,
        })
    }

    /// 回填脱敏结果 (拆分式 API 的后半段)
    ///
    /// 代次不一致或控制器已销毁时结果被静默丢弃
    pub async fn apply_redaction(
        &mut self,
        request: &RedactionRequest,
        result: RedactionResult,
    ) -> RemediationOutcome {
        if self.torn_down || request.generation != self.generation {
            debug!("input changed while redaction was in flight, discarding result");
            return RemediationOutcome::Stale;
        }

        // 回填宿主输入框
        if let Some(input) = self.locator.locate_input().await {
            input.set_text(&result.output_text);
        }

        // 对输出复检：残留 Finding 以警告形式上报，不静默隐藏
        let residual = filter_findings(
            self.detector.detect(&result.output_text),
            self.rules.as_ref(),
        );
        if !residual.is_empty() {
            warn!(
                residual = residual.len(),
                "redacted output still contains findings"
            );
        }

        // 脱敏后的文本临时信任一个 pass，下一次变化信号照常复检
        self.trusted_fingerprint = Some(text_fingerprint(&result.output_text));

        let controls = self.locator.locate_submit_controls().await;
        self.guard.unblock(&controls);
        self.emit_event(Decision::Remediated, &request.findings, Some(result.strategy));

        RemediationOutcome::Applied { result, residual }
    }

    /// 一次完成的脱敏入口
    ///
    /// 适用于宿主不并发处理输入的简单场景；
    /// 需要容忍在途输入变化时改用 begin_remediation/apply_redaction
    pub async fn remediate(&mut self, mode: RedactionStrategy) -> RemediationOutcome {
        let Some(request) = self.begin_remediation(mode) else {
            return RemediationOutcome::NoFindings;
        };
        let engine = self.engine();
        let result = engine
            .redact(&request.text, &request.findings, request.mode)
            .await;
        self.apply_redaction(&request, result).await
    }

    /// 用户选择直接发送
    ///
    /// 解除拦截并打开宽限窗口；后续新的文本变化恢复正常检测
    pub async fn send_anyway(&mut self) {
        let controls = self.locator.locate_submit_controls().await;
        self.guard.unblock(&controls);
        self.grace_until = Some(Instant::now() + GRACE_WINDOW);
        let findings = self.last_findings.clone();
        self.emit_event(Decision::Overridden, &findings, None);
    }

    /// 将当前拦截状态重新应用到最新发现的控件集
    ///
    /// 宿主在轮询循环里调用；定位结果为空时按指数退避跳过后续调用
    pub async fn refresh_controls(&mut self) {
        if let Some(at) = self.next_discovery_at {
            if Instant::now() < at {
                return;
            }
        }

        let controls = self.locator.locate_submit_controls().await;
        if controls.is_empty() {
            let delay = self.discovery_backoff.next_delay();
            self.next_discovery_at = Some(Instant::now() + delay);
            debug!(
                delay_ms = delay.as_millis() as u64,
                "no submit controls located, backing off"
            );
            return;
        }

        self.discovery_backoff.reset();
        self.next_discovery_at = None;
        self.guard.sync(&controls);
    }

    /// 宿主视图销毁
    ///
    /// 使全部在途脱敏请求过期并还原控件；之后的信号一律忽略
    pub async fn teardown(&mut self) {
        self.torn_down = true;
        self.generation = self.generation.wrapping_add(1);
        let controls = self.locator.locate_submit_controls().await;
        self.guard.unblock(&controls);
    }

    /// 上报结构化事件 (fire-and-forget，收集失败不影响主循环)
    fn emit_event(
        &self,
        decision: Decision,
        findings: &[Finding],
        strategy: Option<RedactionStrategy>,
    ) {
        let mut categories = Vec::new();
        for finding in findings {
            if !categories.contains(&finding.category) {
                categories.push(finding.category);
            }
        }
        let risk_level = score(findings).risk_level;
        self.sink
            .emit(InterceptionEvent::new(decision, categories, risk_level, strategy));
    }
}

#[cfg(test)]
mod controller_tests {
    use super::*;
    use crate::guard::testing::{FakeControl, FakeInput, FakeLocator};
    use crate::guard::{ControlState, SubmitControl, TextInput};
    use crate::interceptor::testing::RecordingSink;
    use crate::interceptor::{Category, PatternCatalog, RiskLevel};
    use crate::redaction::testing::ScriptedRewriteService;
    use crate::redaction::{RewriteError, SharedRewriteService};

    struct Harness {
        controller: InterceptionController,
        locator: Arc<FakeLocator>,
        sink: Arc<RecordingSink>,
        control: Arc<FakeControl>,
        input: Arc<FakeInput>,
    }

    fn harness_with_rewrite(service: Option<ScriptedRewriteService>) -> Harness {
        let catalog = Arc::new(PatternCatalog::builtin().unwrap());
        let detector = Detector::new(Arc::clone(&catalog));
        let rewrite = service.map(|s| Arc::new(s) as SharedRewriteService);
        let engine = RedactionEngine::new(catalog, rewrite);

        let locator = FakeLocator::new();
        let control = FakeControl::new("send", "Send");
        let input = FakeInput::new();
        locator.set_controls(vec![Arc::clone(&control) as Arc<dyn SubmitControl>]);
        locator.set_input(Arc::clone(&input) as Arc<dyn TextInput>);

        let sink = Arc::new(RecordingSink::new());
        let controller = InterceptionController::new(
            detector,
            SubmissionGuard::new(),
            engine,
            Arc::clone(&locator) as SharedControlLocator,
            Arc::clone(&sink) as Arc<dyn EventSink>,
        );

        Harness {
            controller,
            locator,
            sink,
            control,
            input,
        }
    }

    fn harness() -> Harness {
        harness_with_rewrite(None)
    }

    const SSN_TEXT: &str = "My SSN is 123-45-6789";

    #[tokio::test]
    async fn test_clean_text_allows_submission() {
        let mut h = harness();
        let outcome = h.controller.on_text_changed("hello world").await;

        assert!(matches!(outcome, PassOutcome::Cleared { .. }));
        assert!(!h.controller.is_blocked());
        assert!(h.control.state().enabled);
    }

    #[tokio::test]
    async fn test_sensitive_text_blocks() {
        let mut h = harness();
        let outcome = h.controller.on_text_changed(SSN_TEXT).await;

        let PassOutcome::Blocked {
            findings,
            assessment,
        } = outcome
        else {
            panic!("expected Blocked outcome");
        };
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::PersonalId);
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.integrity_score, 70);

        assert!(h.controller.is_blocked());
        assert!(!h.control.state().enabled);
        assert!(h.control.is_intercepting());
        assert_eq!(h.sink.decisions(), vec![Decision::Blocked]);
    }

    #[tokio::test]
    async fn test_unchanged_text_is_noop() {
        let mut h = harness();
        h.controller.on_text_changed(SSN_TEXT).await;
        let outcome = h.controller.on_text_changed(SSN_TEXT).await;
        assert!(matches!(outcome, PassOutcome::NoChange));
        // 事件不重复上报
        assert_eq!(h.sink.decisions(), vec![Decision::Blocked]);
    }

    #[tokio::test]
    async fn test_rule_update_clears_block_without_keystroke() {
        let mut h = harness();
        h.controller.on_text_changed(SSN_TEXT).await;
        assert!(h.controller.is_blocked());

        // 用户关闭 personal_id 类别拦截
        let mut rules = RuleConfiguration::new();
        rules.set_category(Category::PersonalId, false);
        let outcome = h.controller.update_rules(rules).await;

        assert!(matches!(outcome, PassOutcome::Cleared { .. }));
        assert!(!h.controller.is_blocked());
        assert!(h.control.state().enabled);
        assert_eq!(h.control.state().label, "Send");
    }

    #[tokio::test]
    async fn test_shrink_below_threshold_unblocks() {
        let mut h = harness();
        h.controller
            .on_text_changed("flagged content with SSN 123-45-6789 padding!!")
            .await;
        assert!(h.controller.is_blocked());

        let outcome = h.controller.on_text_changed("hi").await;
        let PassOutcome::ShortCircuit { unblocked } = outcome else {
            panic!("expected ShortCircuit outcome");
        };
        assert!(unblocked);
        assert!(!h.controller.is_blocked());
        assert!(h.control.state().enabled);
        assert_eq!(h.control.state().label, "Send");
    }

    #[tokio::test]
    async fn test_block_then_clear_restores_control_exactly() {
        let mut h = harness();
        let mut original = ControlState::new(true, "Send");
        original.classes = vec!["btn".to_string()];
        h.control.apply(&original);

        h.controller.on_text_changed(SSN_TEXT).await;
        h.controller.on_text_changed("all clear now").await;

        assert_eq!(h.control.state(), original);
        assert_eq!(
            h.sink.decisions(),
            vec![Decision::Blocked, Decision::Cleared]
        );
    }

    #[tokio::test]
    async fn test_remediate_deterministic_replaces_input() {
        let mut h = harness();
        h.controller.on_text_changed(SSN_TEXT).await;

        let outcome = h.controller.remediate(RedactionStrategy::Deterministic).await;
        let RemediationOutcome::Applied { result, residual } = outcome else {
            panic!("expected Applied outcome");
        };

        assert_eq!(result.output_text, "My SSN is [REDACTED:PERSONAL_ID]");
        assert!(residual.is_empty());
        assert_eq!(h.input.text(), "My SSN is [REDACTED:PERSONAL_ID]");
        assert!(!h.controller.is_blocked());
        assert_eq!(
            h.sink.decisions(),
            vec![Decision::Blocked, Decision::Remediated]
        );
    }

    #[tokio::test]
    async fn test_remediated_text_trusted_for_one_pass() {
        let mut h = harness();
        h.controller.on_text_changed(SSN_TEXT).await;
        let RemediationOutcome::Applied { result, .. } =
            h.controller.remediate(RedactionStrategy::Deterministic).await
        else {
            panic!("expected Applied outcome");
        };

        // 宿主随后送来替换文本的变化信号：临时信任，保持放行
        let outcome = h.controller.on_text_changed(&result.output_text).await;
        assert!(matches!(outcome, PassOutcome::Trusted));
        assert!(!h.controller.is_blocked());

        // 信任只有一个 pass：再次出现敏感内容照常拦截
        let outcome = h.controller.on_text_changed(SSN_TEXT).await;
        assert!(matches!(outcome, PassOutcome::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_remediate_rewrite_timeout_falls_back() {
        let service = ScriptedRewriteService::new();
        service.push_err(RewriteError::Timeout);
        let mut h = harness_with_rewrite(Some(service));

        h.controller.on_text_changed(SSN_TEXT).await;
        let RemediationOutcome::Applied { result, residual } =
            h.controller.remediate(RedactionStrategy::Rewrite).await
        else {
            panic!("expected Applied outcome");
        };

        assert_eq!(result.strategy, RedactionStrategy::Deterministic);
        assert!(result.succeeded);
        assert!(result.error_reason.as_deref().unwrap().contains("timed out"));
        assert!(result.output_text.contains("[REDACTED:PERSONAL_ID]"));
        assert!(!result.output_text.contains("123-45-6789"));
        assert!(residual.is_empty());
    }

    #[tokio::test]
    async fn test_stale_redaction_discarded() {
        let mut h = harness();

        // T1 被拦截，发起脱敏
        h.controller.on_text_changed(SSN_TEXT).await;
        let req1 = h
            .controller
            .begin_remediation(RedactionStrategy::Deterministic)
            .unwrap();

        // T1 的结果尚未回来，输入已经变成 T2
        h.controller
            .on_text_changed("newer text with SSN 987-65-4321")
            .await;
        let req2 = h
            .controller
            .begin_remediation(RedactionStrategy::Deterministic)
            .unwrap();

        let engine = h.controller.engine();
        let result1 = engine.redact(&req1.text, &req1.findings, req1.mode).await;
        let result2 = engine.redact(&req2.text, &req2.findings, req2.mode).await;

        // T1 的结果过期，必须丢弃；T2 的结果正常应用
        let outcome1 = h.controller.apply_redaction(&req1, result1).await;
        assert!(matches!(outcome1, RemediationOutcome::Stale));
        assert!(h.input.text().is_empty());

        let outcome2 = h.controller.apply_redaction(&req2, result2).await;
        assert!(matches!(outcome2, RemediationOutcome::Applied { .. }));
        assert!(!h.input.text().contains("987-65-4321"));
        assert!(h.input.text().contains("[REDACTED:PERSONAL_ID]"));
    }

    #[tokio::test]
    async fn test_remediate_without_findings() {
        let mut h = harness();
        h.controller.on_text_changed("nothing sensitive").await;
        let outcome = h.controller.remediate(RedactionStrategy::Deterministic).await;
        assert!(matches!(outcome, RemediationOutcome::NoFindings));
    }

    #[tokio::test]
    async fn test_send_anyway_opens_grace_window() {
        let mut h = harness();
        h.controller.on_text_changed(SSN_TEXT).await;
        assert!(h.controller.is_blocked());

        h.controller.send_anyway().await;
        assert!(!h.controller.is_blocked());
        assert!(h.control.state().enabled);
        assert_eq!(
            h.sink.decisions(),
            vec![Decision::Blocked, Decision::Overridden]
        );

        // 宽限窗口内的重过滤 (同一文本) 不重新拦截
        let outcome = h.controller.update_rules(RuleConfiguration::new()).await;
        assert!(matches!(outcome, PassOutcome::GracePeriod { .. }));
        assert!(!h.controller.is_blocked());

        // 新的文本变化恢复正常检测
        let outcome = h
            .controller
            .on_text_changed("different text, SSN 987-65-4321")
            .await;
        assert!(matches!(outcome, PassOutcome::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_empty_control_set_tolerated() {
        let mut h = harness();
        h.locator.set_controls(vec![]);

        let outcome = h.controller.on_text_changed(SSN_TEXT).await;
        assert!(matches!(outcome, PassOutcome::Blocked { .. }));
        assert!(h.controller.is_blocked());

        // 控件随后出现，refresh 补拦截
        h.locator
            .set_controls(vec![Arc::clone(&h.control) as Arc<dyn SubmitControl>]);
        h.controller.refresh_controls().await;
        assert!(!h.control.state().enabled);
        assert!(h.control.is_intercepting());
    }

    #[tokio::test]
    async fn test_refresh_backs_off_after_empty_discovery() {
        let mut h = harness();
        h.locator.set_controls(vec![]);
        h.controller.on_text_changed(SSN_TEXT).await;

        // 第一次 refresh 发现为空，进入退避
        h.controller.refresh_controls().await;

        // 控件出现，但仍在退避窗口内，本次跳过
        h.locator
            .set_controls(vec![Arc::clone(&h.control) as Arc<dyn SubmitControl>]);
        h.controller.refresh_controls().await;
        assert!(h.control.state().enabled);
    }

    #[tokio::test]
    async fn test_rediscovered_control_reblocked() {
        let mut h = harness();
        h.controller.on_text_changed(SSN_TEXT).await;
        assert!(!h.control.state().enabled);

        // 框架重渲染换出新按钮
        let replacement = FakeControl::new("send-v2", "Send");
        h.locator
            .set_controls(vec![Arc::clone(&replacement) as Arc<dyn SubmitControl>]);
        h.controller.refresh_controls().await;

        assert!(!replacement.state().enabled);
        assert!(replacement.is_intercepting());
    }

    #[tokio::test]
    async fn test_teardown_discards_in_flight_redaction() {
        let mut h = harness();
        h.controller.on_text_changed(SSN_TEXT).await;
        let req = h
            .controller
            .begin_remediation(RedactionStrategy::Deterministic)
            .unwrap();
        let engine = h.controller.engine();
        let result = engine.redact(&req.text, &req.findings, req.mode).await;

        h.controller.teardown().await;

        let outcome = h.controller.apply_redaction(&req, result).await;
        assert!(matches!(outcome, RemediationOutcome::Stale));
        assert!(h.input.text().is_empty());
        assert!(h.control.state().enabled);

        // 销毁后的信号一律忽略
        let outcome = h.controller.on_text_changed("more text 123-45-6789").await;
        assert!(matches!(outcome, PassOutcome::NoChange));
    }

    #[tokio::test]
    async fn test_blocked_event_carries_categories_and_risk() {
        let mut h = harness();
        h.controller.on_text_changed(SSN_TEXT).await;

        let events = h.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].decision, Decision::Blocked);
        assert_eq!(events[0].categories, vec![Category::PersonalId]);
        assert_eq!(events[0].risk_level, RiskLevel::High);
        assert!(events[0].strategy_used.is_none());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }
}

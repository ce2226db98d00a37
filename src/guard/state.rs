//! 提交拦截状态机
//!
//! 两个状态: Unblocked / Blocked。block 懒捕获控件快照并禁用控件，
//! unblock 精确还原全部被捕获属性。两个入口都允许携带与上次不同的
//! 控件集重复调用 (宿主框架可能随时重渲染替换按钮)。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::control::{ControlId, ControlSnapshot, SubmitControl};

/// 拦截态控件追加的 class
pub const BLOCKED_CLASS: &str = "pg-blocked";

/// 拦截态控件显示文本
pub const BLOCKED_LABEL: &str = "已拦截";

/// Guard 内部状态
///
/// 快照表在每次成功 unblock 后清空，不会无界增长
#[derive(Debug, Default)]
pub struct GuardState {
    /// 当前是否处于拦截态
    pub blocked: bool,
    /// 控件快照 (控件 ID -> 拦截前状态)
    snapshots: HashMap<ControlId, ControlSnapshot>,
}

/// 提交拦截器
///
/// GuardState 的唯一持有者；自动检测与用户操作两条触发路径
/// 都必须经由 block/unblock 进入，保证同一时刻只有一个写者。
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    state: GuardState,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前是否处于拦截态
    pub fn is_blocked(&self) -> bool {
        self.state.blocked
    }

    /// 当前持有的快照数量
    pub fn snapshot_count(&self) -> usize {
        self.state.snapshots.len()
    }

    /// 进入拦截态
    ///
    /// 对每个控件：没有快照则先捕获，然后写入禁用态并挂接拦截器。
    /// 幂等：已拦截的控件不会重复捕获快照，重复调用不产生额外副作用。
    pub fn block(&mut self, controls: &[Arc<dyn SubmitControl>]) {
        for control in controls {
            let id = control.id();

            // 快照已存在说明该控件已被拦截过，禁止覆盖原始状态
            self.state
                .snapshots
                .entry(id)
                .or_insert_with(|| ControlSnapshot::capture(control.as_ref()));

            let mut blocked_state = control.state();
            blocked_state.enabled = false;
            blocked_state.label = BLOCKED_LABEL.to_string();
            if !blocked_state.classes.iter().any(|c| c == BLOCKED_CLASS) {
                blocked_state.classes.push(BLOCKED_CLASS.to_string());
            }
            control.apply(&blocked_state);
            control.set_intercepting(true);
        }

        if !self.state.blocked {
            debug!(controls = controls.len(), "submission guard entering blocked state");
        }
        self.state.blocked = true;
    }

    /// 解除拦截态
    ///
    /// 有快照的控件精确还原；没有快照的控件 (拦截开始后才出现)
    /// 还原为中性默认值：启用、移除拦截 class、移除拦截器，
    /// 不触碰其余属性。快照表随后整体清空。
    pub fn unblock(&mut self, controls: &[Arc<dyn SubmitControl>]) {
        for control in controls {
            match self.state.snapshots.remove(&control.id()) {
                Some(snapshot) => {
                    control.apply(&snapshot.state);
                }
                None => {
                    restore_neutral(control.as_ref());
                }
            }
            control.set_intercepting(false);
        }

        // 留在表中的快照对应已从页面消失的控件，直接丢弃
        if !self.state.snapshots.is_empty() {
            debug!(
                orphaned = self.state.snapshots.len(),
                "dropping snapshots for controls no longer present"
            );
            self.state.snapshots.clear();
        }

        if self.state.blocked {
            debug!("submission guard restored to unblocked state");
        }
        self.state.blocked = false;
    }

    /// 将当前状态重新应用到 (可能已变化的) 控件集
    ///
    /// 拦截态下新发现的控件会被补拦截；非拦截态下无需动作，
    /// 新控件本来就处于自然状态。
    pub fn sync(&mut self, controls: &[Arc<dyn SubmitControl>]) {
        if self.state.blocked {
            self.block(controls);
        }
    }
}

/// 中性还原：启用控件并去掉拦截痕迹，保留宿主自己的属性
fn restore_neutral(control: &dyn SubmitControl) {
    let mut state = control.state();
    state.enabled = true;
    if state.label == BLOCKED_LABEL {
        state.label = String::new();
    }
    state.classes.retain(|c| c != BLOCKED_CLASS);
    control.apply(&state);
}

//! 提交控件句柄与定位器接口
//!
//! 宿主页面如何发现输入框和提交按钮由外部定位器负责，
//! Guard 只依赖这里定义的句柄接口，不关心控件如何被 (重新) 发现。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 控件 ID
pub type ControlId = String;

/// 控件的可观测状态
///
/// 快照/恢复的粒度：这里列出的每个字段都必须精确还原
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    /// 是否可用
    pub enabled: bool,
    /// 显示文本
    pub label: String,
    /// class 列表
    pub classes: Vec<String>,
    /// 内联样式
    pub style: Option<String>,
}

impl ControlState {
    pub fn new(enabled: bool, label: impl Into<String>) -> Self {
        Self {
            enabled,
            label: label.into(),
            classes: Vec::new(),
            style: None,
        }
    }
}

/// 控件快照
///
/// 首次拦截某控件时懒创建，恢复成功后删除
#[derive(Debug, Clone)]
pub struct ControlSnapshot {
    /// 拦截前的完整状态
    pub state: ControlState,
}

impl ControlSnapshot {
    /// 从控件当前状态捕获快照
    pub fn capture(control: &dyn SubmitControl) -> Self {
        Self {
            state: control.state(),
        }
    }
}

/// 提交控件句柄
///
/// 宿主持有真实控件，这里只暴露状态读写与事件拦截开关
pub trait SubmitControl: Send + Sync {
    /// 控件 ID (同一控件跨次发现必须稳定)
    fn id(&self) -> ControlId;

    /// 读取当前可观测状态
    fn state(&self) -> ControlState;

    /// 整体写回状态
    fn apply(&self, state: &ControlState);

    /// 挂接/移除捕获阶段拦截器 (click/keyboard/submit 一律取消)
    fn set_intercepting(&self, intercepting: bool);

    /// 当前是否挂有拦截器
    fn is_intercepting(&self) -> bool;
}

/// 输入框句柄
pub trait TextInput: Send + Sync {
    /// 读取当前文本
    fn text(&self) -> String;

    /// 整体替换文本
    fn set_text(&self, text: &str);
}

/// 控件定位器接口
///
/// 宿主页面的 DOM 可能随时被框架重渲染替换，
/// 定位结果允许为空或与上次不同，调用方必须容忍。
#[async_trait]
pub trait ControlLocator: Send + Sync {
    /// 定位输入框
    async fn locate_input(&self) -> Option<Arc<dyn TextInput>>;

    /// 定位全部提交控件
    async fn locate_submit_controls(&self) -> Vec<Arc<dyn SubmitControl>>;
}

/// 共享的 ControlLocator 类型别名
pub type SharedControlLocator = Arc<dyn ControlLocator>;

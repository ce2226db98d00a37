//! Guard 模块 - 提交拦截状态机
//!
//! 拦截态下禁用宿主页面的提交控件并取消提交事件，
//! 解除时保证控件精确还原到拦截前的状态。

mod control;
mod state;

pub use control::{
    ControlId, ControlLocator, ControlSnapshot, ControlState, SharedControlLocator, SubmitControl,
    TextInput,
};
pub use state::{GuardState, SubmissionGuard, BLOCKED_CLASS, BLOCKED_LABEL};

#[cfg(test)]
pub(crate) use control::testing;

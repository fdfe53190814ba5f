//! 状态机层错误类型定义

use crate::state::{ParamKind, StateId};
use bigbot_driver::DriverError;
use bigbot_tools::ConfigError;
use thiserror::Error;

/// 状态机层错误类型
#[derive(Error, Debug)]
pub enum FsmError {
    /// 请求的状态未注册（启动期配置错误，致命）
    #[error("Configuration error: state {id} is not registered")]
    Configuration { id: StateId },

    /// 状态参数类型不匹配
    #[error("State {id} expects {expected:?} parameters, got {actual:?}")]
    InvalidStateParams {
        id: StateId,
        expected: ParamKind,
        actual: ParamKind,
    },

    /// 配置校验失败
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// 驱动层错误（硬件故障、非法输入等）
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl FsmError {
    /// 是否为可恢复的硬件错误
    pub fn is_transient(&self) -> bool {
        matches!(self, FsmError::Driver(DriverError::Hal(e)) if !e.is_fatal())
    }
}

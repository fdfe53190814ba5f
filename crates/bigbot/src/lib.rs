//! BigBot - 比赛机器人运行时
//!
//! 一台差速底盘 + 舵机夹爪的比赛机器人，在限定的比赛时间内按预先编排的
//! 命令序列行动，遇到障碍时暂停、障碍消失后从中断处继续。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **硬件抽象层** (`hal`): 电机、舵机、测距、拉线、显示屏的 Trait 与模拟实现
//! - **驱动层** (`driver`): 底盘运动、舵机组、超声波避障、可暂停的倒计时
//! - **行为层** (`fsm`): 状态注册表、命令与序列、顶层状态机
//! - **工具** (`tools`): TOML 配置、队伍颜色
//!
//! # 快速开始
//!
//! ```rust
//! use bigbot::prelude::*;
//! ```

pub use bigbot_driver as driver;
pub use bigbot_fsm as fsm;
pub use bigbot_hal as hal;
pub use bigbot_tools as tools;

pub mod prelude;

// 常用类型
pub use bigbot_driver::{DriverError, Robot, RobotBuilder};
pub use bigbot_fsm::{
    Command, FsmError, RobotFsm, Sequence, SequenceCatalog, StateId, StateParams, StateRegistry,
};
pub use bigbot_hal::HalError;
pub use bigbot_tools::{ConfigError, RobotConfig, TeamColor};

use tracing_subscriber::EnvFilter;

/// 日志初始化错误
pub type LoggerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 初始化 `tracing` 日志输出
///
/// 优先使用 `RUST_LOG` 环境变量；未设置时使用 `default_directive`（如 `"info"`）。
///
/// # 错误
///
/// 全局订阅者已经设置过时返回错误。
///
/// # 示例
///
/// ```rust
/// let _ = bigbot::init_logger("bigbot=debug");
/// ```
pub fn init_logger(default_directive: &str) -> Result<(), LoggerError> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?;
    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}

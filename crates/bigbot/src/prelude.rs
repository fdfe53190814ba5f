//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use bigbot::prelude::*;
//! ```

// 行为层
pub use bigbot_fsm::{
    Command, RobotFsm, Sequence, SequenceCatalog, StateId, StateParams, StateRegistry, StepHook,
    StepRecorder,
};

// 驱动层
pub use bigbot_driver::{Robot, RobotBuilder, ServoGroup, UsEvent, UsPosition};

// 配置
pub use bigbot_tools::{RobotConfig, TeamColor};

// 错误类型
pub use bigbot_driver::DriverError;
pub use bigbot_fsm::FsmError;
pub use bigbot_hal::HalError;

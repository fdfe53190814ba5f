//! # BigBot FSM
//!
//! 比赛机器人的行为层：
//!
//! - [`state`]: 行为状态、注册表与工厂、当前状态管理
//! - [`command`]: 序列中的原子步骤（即时命令 / 有时长命令）
//! - [`sequence_manager`]: 逐条执行命令序列，支持暂停与恢复
//! - [`catalog`]: 比赛用的具名序列（按队伍颜色镜像）
//! - [`machine`]: 顶层状态机，处理开赛、避障和比赛超时
//!
//! # 线程模型
//!
//! 所有状态和命令回调都在调用 [`RobotFsm::update`] 的线程上执行。
//! 唯一的额外线程是定时调度线程，它只通过 Channel 通知倒计时到期。

pub mod catalog;
pub mod clock;
pub mod command;
pub mod error;
pub mod hooks;
pub mod machine;
pub mod sequence;
pub mod sequence_manager;
pub mod state;

pub use catalog::SequenceCatalog;
pub use clock::MatchClock;
pub use command::{Command, CommandContext, CommandKind, ImmediateOp, Progress, TimedOp};
pub use error::FsmError;
pub use hooks::{HookManager, StepEvent, StepHook, StepInfo, StepPosition, StepRecorder};
pub use machine::RobotFsm;
pub use sequence::Sequence;
pub use sequence_manager::{ManagerPhase, SequenceManager, StepOutcome};
pub use state::{
    ParamKind, State, StateContext, StateFactory, StateId, StateMachine, StateParams,
    StateRegistry,
};

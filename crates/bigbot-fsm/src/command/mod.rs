//! 命令（序列中的原子步骤）
//!
//! 命令分两类（封闭枚举，穷尽匹配）：
//!
//! - [`ImmediateCommand`]: 执行即完成，不需要计时
//! - [`TimedCommand`]: `execute()` 返回所需时长，由倒计时决定何时完成
//!
//! # 生命周期
//!
//! ```text
//! execute() ──> [pause() ──> resume()]* ──> finished()
//! ```
//!
//! 失败或复位时先 `abort()` 中止动作，再 `finished()` 收尾。
//! `finished()` 对每个命令实例只生效一次，重复调用是记录告警的空操作。
//!
//! # 恢复策略
//!
//! 运动命令在暂停后恢复时只下发**剩余**的距离/角度：
//! `amount × (1 − elapsed / time_needed)`，与倒计时的剩余时间一致。

mod immediate;
mod timed;

pub use immediate::{ImmediateCommand, ImmediateOp};
pub use timed::{TimedCommand, TimedOp};

use crate::clock::MatchClock;
use crate::error::FsmError;
use crate::state::{StateId, StateParams};
use bigbot_driver::{MotionKind, Robot, ServoGroup, UsPosition};
use std::time::{Duration, Instant};

/// 命令类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Immediate,
    TimeBased,
}

/// 命令回调可访问的上下文
pub struct CommandContext<'a> {
    pub robot: &'a mut Robot,
    pub clock: &'a MatchClock,
    /// 本轮 `update()` 的时刻
    pub now: Instant,
}

/// 暂停时的执行进度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub elapsed: Duration,
    pub time_needed: Duration,
}

impl Progress {
    pub fn new(elapsed: Duration, time_needed: Duration) -> Self {
        Self {
            elapsed,
            time_needed,
        }
    }

    /// 尚未完成的比例 `[0.0, 1.0]`
    pub fn remaining_fraction(&self) -> f64 {
        if self.time_needed.is_zero() {
            return 0.0;
        }
        (1.0 - self.elapsed.as_secs_f64() / self.time_needed.as_secs_f64()).clamp(0.0, 1.0)
    }
}

/// 命令
#[derive(Debug, Clone)]
pub enum Command {
    Immediate(ImmediateCommand),
    TimeBased(TimedCommand),
}

impl Command {
    // ========== 构造 ==========

    pub fn move_forward(distance_cm: f64, speed: f64) -> Self {
        Self::motion(MotionKind::Forward, distance_cm, speed)
    }

    pub fn move_backward(distance_cm: f64, speed: f64) -> Self {
        Self::motion(MotionKind::Backward, distance_cm, speed)
    }

    pub fn rotate_left(degrees: f64, speed: f64) -> Self {
        Self::motion(MotionKind::RotateLeft, degrees, speed)
    }

    pub fn rotate_right(degrees: f64, speed: f64) -> Self {
        Self::motion(MotionKind::RotateRight, degrees, speed)
    }

    pub fn motion(kind: MotionKind, amount: f64, speed: f64) -> Self {
        Command::TimeBased(TimedCommand::new(TimedOp::Motion {
            kind,
            amount,
            speed,
        }))
    }

    /// 舵机动作，`state` 为对应的行为状态（OpenClaw / CloseClaw / Actuate）
    pub fn servo(group: ServoGroup, angles: &[f64], state: StateId) -> Self {
        Command::TimeBased(TimedCommand::new(TimedOp::Servo {
            group,
            angles: angles.iter().copied().collect(),
            state,
        }))
    }

    /// 等待固定时长（期间禁用全部超声波传感器）
    pub fn wait(duration: Duration) -> Self {
        Command::TimeBased(TimedCommand::new(TimedOp::Wait { duration }))
    }

    /// 等待到比赛时间 `match_time`
    pub fn wait_until(match_time: Duration) -> Self {
        Command::TimeBased(TimedCommand::new(TimedOp::WaitUntil { match_time }))
    }

    pub fn stop() -> Self {
        Command::Immediate(ImmediateCommand::new(ImmediateOp::Stop))
    }

    pub fn show_score() -> Self {
        Command::Immediate(ImmediateCommand::new(ImmediateOp::ShowScore))
    }

    pub fn enable_sensors(positions: &[UsPosition]) -> Self {
        Command::Immediate(ImmediateCommand::new(ImmediateOp::EnableSensors(
            positions.iter().copied().collect(),
        )))
    }

    pub fn disable_sensors(positions: &[UsPosition]) -> Self {
        Command::Immediate(ImmediateCommand::new(ImmediateOp::DisableSensors(
            positions.iter().copied().collect(),
        )))
    }

    pub fn toggle_sensors(positions: &[UsPosition]) -> Self {
        Command::Immediate(ImmediateCommand::new(ImmediateOp::ToggleSensors(
            positions.iter().copied().collect(),
        )))
    }

    // ========== 查询 ==========

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Immediate(_) => CommandKind::Immediate,
            Command::TimeBased(_) => CommandKind::TimeBased,
        }
    }

    /// 用于日志的名称
    pub fn name(&self) -> &'static str {
        match self {
            Command::Immediate(cmd) => cmd.op().name(),
            Command::TimeBased(cmd) => cmd.op().name(),
        }
    }

    /// 命令所代表的行为状态；不改变行为状态的命令返回 `None`
    pub fn state(&self) -> Option<(StateId, StateParams)> {
        match self {
            Command::Immediate(cmd) => cmd.op().state(),
            Command::TimeBased(cmd) => Some(cmd.op().state()),
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            Command::Immediate(cmd) => cmd.is_finished(),
            Command::TimeBased(cmd) => cmd.is_finished(),
        }
    }

    /// 左右镜像（用于另一种队伍颜色）
    pub fn mirrored(&self) -> Self {
        match self {
            Command::Immediate(cmd) => Command::Immediate(cmd.mirrored()),
            Command::TimeBased(cmd) => Command::TimeBased(cmd.mirrored()),
        }
    }

    // ========== 生命周期 ==========

    pub fn pause(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), FsmError> {
        match self {
            Command::Immediate(_) => Ok(()),
            Command::TimeBased(cmd) => cmd.pause(ctx),
        }
    }

    pub fn resume(&mut self, ctx: &mut CommandContext<'_>, progress: Progress) -> Result<(), FsmError> {
        match self {
            Command::Immediate(_) => Ok(()),
            Command::TimeBased(cmd) => cmd.resume(ctx, progress),
        }
    }

    /// 中止正在进行的动作（不等同于完成）
    pub fn abort(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), FsmError> {
        match self {
            Command::Immediate(_) => Ok(()),
            Command::TimeBased(cmd) => cmd.abort(ctx),
        }
    }

    /// 完成清理（仅第一次调用生效）
    pub fn finished(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), FsmError> {
        match self {
            Command::Immediate(cmd) => cmd.finished(ctx),
            Command::TimeBased(cmd) => cmd.finished(ctx),
        }
    }
}

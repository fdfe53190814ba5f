//! 即时命令

use super::CommandContext;
use crate::error::FsmError;
use crate::state::{StateId, StateParams};
use bigbot_driver::UsPositions;
use tracing::{debug, warn};

/// 即时命令的具体操作
#[derive(Debug, Clone, PartialEq)]
pub enum ImmediateOp {
    /// 停车
    Stop,
    /// 在显示屏上显示预期得分
    ShowScore,
    EnableSensors(UsPositions),
    DisableSensors(UsPositions),
    /// 翻转传感器启用状态（常成对出现在会被自身结构触发的动作前后）
    ToggleSensors(UsPositions),
}

impl ImmediateOp {
    pub fn name(&self) -> &'static str {
        match self {
            ImmediateOp::Stop => "Stop",
            ImmediateOp::ShowScore => "ShowScore",
            ImmediateOp::EnableSensors(_) => "EnableSensors",
            ImmediateOp::DisableSensors(_) => "DisableSensors",
            ImmediateOp::ToggleSensors(_) => "ToggleSensors",
        }
    }

    pub fn state(&self) -> Option<(StateId, StateParams)> {
        match self {
            ImmediateOp::Stop => Some((StateId::Stop, StateParams::None)),
            _ => None,
        }
    }

    fn mirrored(&self) -> Self {
        let mirror = |positions: &UsPositions| -> UsPositions {
            positions.iter().map(|p| p.mirrored()).collect()
        };
        match self {
            ImmediateOp::EnableSensors(p) => ImmediateOp::EnableSensors(mirror(p)),
            ImmediateOp::DisableSensors(p) => ImmediateOp::DisableSensors(mirror(p)),
            ImmediateOp::ToggleSensors(p) => ImmediateOp::ToggleSensors(mirror(p)),
            other => other.clone(),
        }
    }
}

/// 即时命令：`execute()` 之后立即 `finished()`
#[derive(Debug, Clone)]
pub struct ImmediateCommand {
    op: ImmediateOp,
    finished: bool,
}

impl ImmediateCommand {
    pub fn new(op: ImmediateOp) -> Self {
        Self { op, finished: false }
    }

    pub fn op(&self) -> &ImmediateOp {
        &self.op
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn mirrored(&self) -> Self {
        Self::new(self.op.mirrored())
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), FsmError> {
        match &self.op {
            ImmediateOp::Stop => ctx.robot.motors_mut().stop()?,
            ImmediateOp::ShowScore => ctx.robot.show_score()?,
            ImmediateOp::EnableSensors(positions) => {
                for &position in positions {
                    ctx.robot.ultrasonic_mut().enable_sensor(position);
                }
            },
            ImmediateOp::DisableSensors(positions) => {
                for &position in positions {
                    ctx.robot.ultrasonic_mut().disable_sensor(position);
                }
            },
            ImmediateOp::ToggleSensors(positions) => {
                for &position in positions {
                    ctx.robot.ultrasonic_mut().toggle_sensor(position);
                }
            },
        }
        debug!("{} executed", self.op.name());
        Ok(())
    }

    pub fn finished(&mut self, _ctx: &mut CommandContext<'_>) -> Result<(), FsmError> {
        if self.finished {
            warn!("{} already finished", self.op.name());
            return Ok(());
        }
        self.finished = true;
        Ok(())
    }
}

//! 行为状态
//!
//! 每个 [`StateId`] 对应一个 [`State`] 实例，由 [`StateFactory`] 按需创建并缓存。
//! 状态切换通过 [`StateMachine::set_state`] 完成：先 `exit()` 旧状态，再 `enter()` 新状态。
//!
//! 状态参数是按状态分类的强类型结构（[`StateParams`]），
//! 在调用处校验类型，避免"字符串键 + 任意值"的参数包。

mod builtin;
mod machine;
mod registry;

pub use builtin::{ActionState, AvoidObstacleState, IdleState, StopState};
pub use machine::StateMachine;
pub use registry::{StateConstructor, StateFactory, StateRegistry};

use crate::clock::MatchClock;
use crate::error::FsmError;
use bigbot_driver::Robot;
use bigbot_tools::RobotConfig;
use smallvec::SmallVec;
use std::fmt;
use std::time::{Duration, Instant};

/// 状态标识（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateId {
    Idle,
    MoveForward,
    MoveBackward,
    RotateLeft,
    RotateRight,
    Stop,
    OpenClaw,
    CloseClaw,
    Actuate,
    Wait,
    AvoidObstacle,
}

impl StateId {
    pub const ALL: [StateId; 11] = [
        StateId::Idle,
        StateId::MoveForward,
        StateId::MoveBackward,
        StateId::RotateLeft,
        StateId::RotateRight,
        StateId::Stop,
        StateId::OpenClaw,
        StateId::CloseClaw,
        StateId::Actuate,
        StateId::Wait,
        StateId::AvoidObstacle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateId::Idle => "idle",
            StateId::MoveForward => "move-forward",
            StateId::MoveBackward => "move-backward",
            StateId::RotateLeft => "rotate-left",
            StateId::RotateRight => "rotate-right",
            StateId::Stop => "stop",
            StateId::OpenClaw => "open-claw",
            StateId::CloseClaw => "close-claw",
            StateId::Actuate => "actuate",
            StateId::Wait => "wait",
            StateId::AvoidObstacle => "avoid-obstacle",
        }
    }

    /// 该状态接受的参数类型
    pub fn param_kind(self) -> ParamKind {
        match self {
            StateId::MoveForward | StateId::MoveBackward => ParamKind::Movement,
            StateId::RotateLeft | StateId::RotateRight => ParamKind::Rotation,
            StateId::OpenClaw | StateId::CloseClaw | StateId::Actuate => ParamKind::Actuation,
            StateId::Wait => ParamKind::Wait,
            StateId::Idle | StateId::Stop | StateId::AvoidObstacle => ParamKind::None,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 参数类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    None,
    Movement,
    Rotation,
    Actuation,
    Wait,
}

/// 状态参数
///
/// `None` 表示"使用状态自身的默认值"，任何状态都接受。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StateParams {
    #[default]
    None,
    Movement {
        distance_cm: f64,
        speed: f64,
    },
    Rotation {
        degrees: f64,
        speed: f64,
    },
    Actuation {
        angles: SmallVec<[f64; 4]>,
    },
    Wait {
        duration: Duration,
    },
}

impl StateParams {
    pub fn kind(&self) -> ParamKind {
        match self {
            StateParams::None => ParamKind::None,
            StateParams::Movement { .. } => ParamKind::Movement,
            StateParams::Rotation { .. } => ParamKind::Rotation,
            StateParams::Actuation { .. } => ParamKind::Actuation,
            StateParams::Wait { .. } => ParamKind::Wait,
        }
    }

    pub fn actuation(angles: &[f64]) -> Self {
        StateParams::Actuation {
            angles: SmallVec::from_slice(angles),
        }
    }

    /// 校验参数是否可以用于 `id`
    pub fn check(&self, id: StateId) -> Result<(), FsmError> {
        let actual = self.kind();
        let expected = id.param_kind();
        if actual == ParamKind::None || actual == expected {
            Ok(())
        } else {
            Err(FsmError::InvalidStateParams {
                id,
                expected,
                actual,
            })
        }
    }
}

/// 状态回调可访问的上下文
pub struct StateContext<'a> {
    pub robot: &'a mut Robot,
    pub clock: &'a mut MatchClock,
    pub config: &'a RobotConfig,
    /// 本轮 `update()` 的时刻
    pub now: Instant,
}

/// 行为状态
///
/// 实例由工厂缓存，整个状态机生命周期内每个 [`StateId`] 只有一个实例。
pub trait State: Send {
    fn id(&self) -> StateId;

    /// 进入状态
    fn enter(&mut self, ctx: &mut StateContext<'_>, params: &StateParams) -> Result<(), FsmError>;

    /// 每个周期调用一次（仅当前状态）
    fn execute(&mut self, ctx: &mut StateContext<'_>) -> Result<(), FsmError> {
        let _ = ctx;
        Ok(())
    }

    /// 离开状态
    fn exit(&mut self, ctx: &mut StateContext<'_>) -> Result<(), FsmError> {
        let _ = ctx;
        Ok(())
    }

    /// 最近一次进入时的参数（用于避障后恢复）
    fn params(&self) -> StateParams {
        StateParams::None
    }
}

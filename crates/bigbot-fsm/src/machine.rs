//! 顶层状态机
//!
//! [`RobotFsm::update`] 由主循环按固定周期调用，每次按以下优先级处理：
//!
//! 1. 比赛未开始：只执行当前状态（Idle 检查启动拉线）
//! 2. 比赛超时：暂停序列、停车、进入 Stop，此后 `update()` 为空操作
//! 3. 避障事件：检测到障碍时暂停序列并进入 AvoidObstacle，障碍消失后恢复
//! 4. 正常推进：由序列管理器执行下一步，新命令开始时进入其对应的状态

use crate::clock::MatchClock;
use crate::command::CommandContext;
use crate::error::FsmError;
use crate::hooks::StepHook;
use crate::sequence::Sequence;
use crate::sequence_manager::{SequenceManager, StepOutcome};
use crate::state::{StateContext, StateId, StateMachine, StateParams, StateRegistry};
use bigbot_driver::{Robot, UsEvent};
use bigbot_tools::RobotConfig;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// 状态和命令回调共享的运行环境
struct Env {
    robot: Robot,
    clock: MatchClock,
    config: RobotConfig,
}

impl Env {
    fn state_ctx(&mut self, now: Instant) -> StateContext<'_> {
        StateContext {
            robot: &mut self.robot,
            clock: &mut self.clock,
            config: &self.config,
            now,
        }
    }

    fn command_ctx(&mut self, now: Instant) -> CommandContext<'_> {
        CommandContext {
            robot: &mut self.robot,
            clock: &self.clock,
            now,
        }
    }
}

/// 机器人顶层状态机
///
/// # 示例
///
/// ```rust,no_run
/// use bigbot_driver::RobotBuilder;
/// use bigbot_fsm::{RobotFsm, SequenceCatalog, StateRegistry};
/// use bigbot_tools::{RobotConfig, TeamColor};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let motors: Box<dyn bigbot_hal::MotorDriver> = unimplemented!();
/// let config = RobotConfig::default();
/// let robot = RobotBuilder::new().config(config.clone()).motors(motors).build()?;
/// let plan = SequenceCatalog::new(&config.motion).match_plan(TeamColor::Yellow);
/// let mut fsm = RobotFsm::new(robot, config, StateRegistry::with_defaults(), plan)?;
/// while !fsm.is_end_of_match() {
///     fsm.update()?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct RobotFsm {
    env: Env,
    states: StateMachine,
    sequences: SequenceManager,
    /// 避障前的状态，障碍消失后恢复
    paused_state: Option<(StateId, StateParams)>,
    end_of_match: bool,
    last_event: UsEvent,
    shut_down: bool,
}

impl RobotFsm {
    /// 创建状态机并进入 Idle
    ///
    /// # 错误
    ///
    /// - 配置数值越界：[`FsmError::Config`]
    /// - 注册表缺少 Idle：[`FsmError::Configuration`]
    /// - 定时线程启动失败、Idle 进入失败：[`FsmError::Driver`]
    pub fn new(
        robot: Robot,
        config: RobotConfig,
        registry: StateRegistry,
        sequences: Vec<Sequence>,
    ) -> Result<Self, FsmError> {
        config.validate()?;
        let clock = MatchClock::new(config.match_.duration());
        let mut fsm = Self {
            env: Env {
                robot,
                clock,
                config,
            },
            states: StateMachine::new(registry),
            sequences: SequenceManager::spawn(sequences)?,
            paused_state: None,
            end_of_match: false,
            last_event: UsEvent::NoEvent,
            shut_down: false,
        };

        let mut ctx = fsm.env.state_ctx(Instant::now());
        fsm.states.set_state(&mut ctx, StateId::Idle, StateParams::None)?;
        Ok(fsm)
    }

    // ========== 查询 ==========

    pub fn current_state(&self) -> Option<StateId> {
        self.states.current()
    }

    pub fn current_params(&self) -> StateParams {
        self.states.current_params()
    }

    pub fn paused_state(&self) -> Option<&(StateId, StateParams)> {
        self.paused_state.as_ref()
    }

    pub fn is_end_of_match(&self) -> bool {
        self.end_of_match
    }

    pub fn is_match_started(&self) -> bool {
        self.env.clock.is_started()
    }

    /// 所有序列已执行完毕
    pub fn is_finished(&self) -> bool {
        self.sequences.all_sequences_completed()
    }

    pub fn last_event(&self) -> UsEvent {
        self.last_event
    }

    pub fn clock(&self) -> &MatchClock {
        &self.env.clock
    }

    pub fn config(&self) -> &RobotConfig {
        &self.env.config
    }

    pub fn robot(&self) -> &Robot {
        &self.env.robot
    }

    pub fn robot_mut(&mut self) -> &mut Robot {
        &mut self.env.robot
    }

    pub fn sequences(&self) -> &SequenceManager {
        &self.sequences
    }

    pub fn states(&self) -> &StateMachine {
        &self.states
    }

    pub fn add_hook(&mut self, hook: Arc<dyn StepHook>) {
        self.sequences.add_hook(hook);
    }

    // ========== 主循环 ==========

    /// 执行一个周期
    pub fn update(&mut self) -> Result<(), FsmError> {
        self.update_at(Instant::now())
    }

    /// 以给定时刻执行一个周期
    ///
    /// # 错误
    ///
    /// 只返回不可恢复的错误（配置错误、硬件不可用等）；
    /// 可恢复的硬件错误会记录告警并让机器人进入 Stop。
    pub fn update_at(&mut self, now: Instant) -> Result<(), FsmError> {
        if self.end_of_match || self.shut_down {
            return Ok(());
        }

        if !self.env.clock.is_started() {
            self.execute_current(now)?;
            if self.env.clock.is_started() {
                info!(
                    "Match started ({:?}, score {})",
                    self.env.clock.duration(),
                    self.env.robot.score()
                );
            }
            return Ok(());
        }

        if self.env.clock.is_over_at(now) {
            return self.end_match(now);
        }

        let event = {
            let ultrasonic = self.env.robot.ultrasonic_mut();
            ultrasonic.measure_distances();
            ultrasonic.check_obstacles()
        };
        self.last_event = event;

        match event {
            UsEvent::ObstacleDetected => {
                self.sequences.pause(&mut self.env.command_ctx(now));
                if self.paused_state.is_none()
                    && let Some(current) = self.states.current()
                    && current != StateId::AvoidObstacle
                {
                    self.paused_state = Some((current, self.states.current_params()));
                }
                self.transition(now, StateId::AvoidObstacle, StateParams::None)
            },
            UsEvent::ObstaclePresent => self.execute_current(now),
            UsEvent::ObstacleCleared => {
                let (id, params) = self
                    .paused_state
                    .take()
                    .unwrap_or((StateId::Stop, StateParams::None));
                self.transition(now, id, params)?;
                let outcome = self.sequences.resume(&mut self.env.command_ctx(now));
                self.apply(now, outcome)
            },
            UsEvent::NoEvent => {
                let outcome = self.sequences.execute_step(&mut self.env.command_ctx(now));
                self.apply(now, outcome)?;
                self.execute_current(now)
            },
        }
    }

    fn end_match(&mut self, now: Instant) -> Result<(), FsmError> {
        info!("Match over after {:?}", self.env.clock.elapsed_at(now));
        self.sequences.pause(&mut self.env.command_ctx(now));
        if let Err(e) = self.env.robot.motors_mut().stop() {
            warn!("Failed to stop motors at end of match: {}", e);
        }
        self.paused_state = None;
        self.end_of_match = true;
        self.transition(now, StateId::Stop, StateParams::None)
    }

    /// 处理序列管理器的结果
    fn apply(&mut self, now: Instant, outcome: StepOutcome) -> Result<(), FsmError> {
        match outcome {
            StepOutcome::Started {
                state: Some((id, params)),
                ..
            } => self.transition(now, id, params),
            StepOutcome::Failed { position, error } => {
                if !error.is_transient() {
                    return Err(error);
                }
                warn!("Step {} aborted after hardware fault, stopping", position);
                self.transition(now, StateId::Stop, StateParams::None)
            },
            _ => Ok(()),
        }
    }

    /// 切换状态；可恢复的硬件错误转为停车
    fn transition(&mut self, now: Instant, id: StateId, params: StateParams) -> Result<(), FsmError> {
        let mut ctx = self.env.state_ctx(now);
        match self.states.set_state(&mut ctx, id, params) {
            Ok(_) => Ok(()),
            Err(e) if e.is_transient() => {
                warn!("Entering {} failed: {}", id, e);
                self.force_stop(now);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    fn execute_current(&mut self, now: Instant) -> Result<(), FsmError> {
        let mut ctx = self.env.state_ctx(now);
        match self.states.execute_current(&mut ctx) {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient() => {
                warn!("State {:?} failed: {}", self.states.current(), e);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    /// 尽力停车并进入 Stop（错误只记录）
    fn force_stop(&mut self, now: Instant) {
        if let Err(e) = self.env.robot.motors_mut().stop() {
            warn!("Emergency stop failed: {}", e);
        }
        if self.states.current() != Some(StateId::Stop) {
            let mut ctx = self.env.state_ctx(now);
            if let Err(e) = self.states.set_state(&mut ctx, StateId::Stop, StateParams::None) {
                warn!("Entering stop failed: {}", e);
            }
        }
    }

    // ========== 关闭 ==========

    /// 中止活动命令、停车并释放舵机；重复调用为空操作
    pub fn shutdown(&mut self) -> Result<(), FsmError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.sequences.shutdown(&mut self.env.command_ctx(Instant::now()));
        self.env.robot.shutdown()?;
        info!("Robot shut down");
        Ok(())
    }
}

impl Drop for RobotFsm {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Shutdown failed: {}", e);
        }
    }
}

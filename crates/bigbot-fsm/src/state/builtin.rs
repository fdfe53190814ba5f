//! 内置状态

use super::{State, StateContext, StateId, StateParams};
use crate::error::FsmError;
use std::time::Instant;
use tracing::{debug, info, warn};

// ============================================================
// Idle：等待开赛
// ============================================================

/// 赛前等待状态
///
/// 进入时停车并记录拉线基准读数；每个周期检查拉线，
/// 读数变化（或配置为不等待拉线）即启动比赛时钟。
#[derive(Debug, Default)]
pub struct IdleState;

impl IdleState {
    pub fn new() -> Self {
        Self
    }
}

impl State for IdleState {
    fn id(&self) -> StateId {
        StateId::Idle
    }

    fn enter(&mut self, ctx: &mut StateContext<'_>, _params: &StateParams) -> Result<(), FsmError> {
        ctx.robot.motors_mut().stop()?;
        if !ctx.clock.is_started()
            && ctx.config.match_.wait_for_start_switch
            && let Some(switch) = ctx.robot.start_switch_mut()
        {
            switch.arm()?;
            info!("Waiting for start switch");
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut StateContext<'_>) -> Result<(), FsmError> {
        if ctx.clock.is_started() {
            return Ok(());
        }
        let start = if !ctx.config.match_.wait_for_start_switch {
            true
        } else {
            match ctx.robot.start_switch_mut() {
                Some(switch) => switch.triggered()?,
                None => {
                    warn!("No start switch installed, starting immediately");
                    true
                },
            }
        };
        if start {
            ctx.clock.start(ctx.now);
        }
        Ok(())
    }
}

// ============================================================
// Stop：停车（故障/比赛结束的安全状态）
// ============================================================

#[derive(Debug, Default)]
pub struct StopState;

impl StopState {
    pub fn new() -> Self {
        Self
    }
}

impl State for StopState {
    fn id(&self) -> StateId {
        StateId::Stop
    }

    fn enter(&mut self, ctx: &mut StateContext<'_>, _params: &StateParams) -> Result<(), FsmError> {
        ctx.robot.motors_mut().stop()?;
        Ok(())
    }
}

// ============================================================
// AvoidObstacle：被障碍阻挡
// ============================================================

/// 避障状态
///
/// 进入时停车；阻挡时间超过 `obstacle.max_blocked_s` 时告警一次。
#[derive(Debug, Default)]
pub struct AvoidObstacleState {
    blocked_since: Option<Instant>,
    warned: bool,
}

impl AvoidObstacleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocked_since(&self) -> Option<Instant> {
        self.blocked_since
    }
}

impl State for AvoidObstacleState {
    fn id(&self) -> StateId {
        StateId::AvoidObstacle
    }

    fn enter(&mut self, ctx: &mut StateContext<'_>, _params: &StateParams) -> Result<(), FsmError> {
        self.blocked_since = Some(ctx.now);
        self.warned = false;
        ctx.robot.motors_mut().stop()?;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut StateContext<'_>) -> Result<(), FsmError> {
        if let Some(since) = self.blocked_since {
            let blocked = ctx.now.saturating_duration_since(since);
            if !self.warned && blocked >= ctx.config.obstacle.max_blocked() {
                warn!("Blocked by an obstacle for {:?}", blocked);
                self.warned = true;
            }
        }
        Ok(())
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) -> Result<(), FsmError> {
        if let Some(since) = self.blocked_since.take() {
            info!(
                "Obstacle avoidance lasted {:?}",
                ctx.now.saturating_duration_since(since)
            );
        }
        Ok(())
    }
}

// ============================================================
// 动作状态：运动、夹爪、舵机、等待
// ============================================================

/// 动作状态
///
/// 实际的执行器调用由命令完成，这里只记录机器人"正在做什么"及其参数，
/// 供状态查询和避障后恢复使用。
#[derive(Debug)]
pub struct ActionState {
    id: StateId,
    params: StateParams,
}

impl ActionState {
    pub fn new(id: StateId) -> Self {
        Self {
            id,
            params: StateParams::None,
        }
    }
}

impl State for ActionState {
    fn id(&self) -> StateId {
        self.id
    }

    fn enter(&mut self, _ctx: &mut StateContext<'_>, params: &StateParams) -> Result<(), FsmError> {
        // 未给参数时沿用上一次的参数
        if *params != StateParams::None {
            self.params = params.clone();
        }
        debug!("Entering {} {:?}", self.id, self.params);
        Ok(())
    }

    fn params(&self) -> StateParams {
        self.params.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MatchClock;
    use bigbot_driver::{Robot, RobotBuilder};
    use bigbot_tools::RobotConfig;
    use std::time::Duration;

    fn setup() -> (Robot, bigbot_driver::SimProbes) {
        let (builder, probes) = RobotBuilder::simulated();
        (builder.build().unwrap(), probes)
    }

    #[test]
    fn test_idle_waits_for_switch_change() {
        let (mut robot, probes) = setup();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let now = Instant::now();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now,
        };

        let mut idle = IdleState::new();
        idle.enter(&mut ctx, &StateParams::None).unwrap();
        idle.execute(&mut ctx).unwrap();
        assert!(!ctx.clock.is_started());

        probes.start_switch.toggle();
        idle.execute(&mut ctx).unwrap();
        assert!(ctx.clock.is_started());
        assert_eq!(ctx.clock.elapsed_at(now), Duration::ZERO);
    }

    #[test]
    fn test_idle_without_switch_wait_starts_immediately() {
        let (mut robot, _probes) = setup();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let mut config = RobotConfig::default();
        config.match_.wait_for_start_switch = false;
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        let mut idle = IdleState::new();
        idle.enter(&mut ctx, &StateParams::None).unwrap();
        idle.execute(&mut ctx).unwrap();
        assert!(ctx.clock.is_started());
    }

    #[test]
    fn test_stop_and_avoid_obstacle_brake() {
        let (mut robot, probes) = setup();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        ctx.robot.motors_mut().move_forward(10.0, 0.5).unwrap();
        StopState::new().enter(&mut ctx, &StateParams::None).unwrap();
        assert!(probes.motors.is_stopped());

        ctx.robot.motors_mut().move_forward(10.0, 0.5).unwrap();
        let mut avoid = AvoidObstacleState::new();
        avoid.enter(&mut ctx, &StateParams::None).unwrap();
        assert!(probes.motors.is_stopped());
        assert!(avoid.blocked_since().is_some());
        avoid.exit(&mut ctx).unwrap();
        assert!(avoid.blocked_since().is_none());
    }

    #[test]
    fn test_action_state_keeps_params() {
        let (mut robot, _probes) = setup();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        let params = StateParams::Rotation {
            degrees: 90.0,
            speed: 0.5,
        };
        let mut state = ActionState::new(StateId::RotateLeft);
        state.enter(&mut ctx, &params).unwrap();
        assert_eq!(state.params(), params);
        state.enter(&mut ctx, &StateParams::None).unwrap();
        assert_eq!(state.params(), params);
    }
}

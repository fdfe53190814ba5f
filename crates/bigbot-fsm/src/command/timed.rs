//! 有时长的命令

use super::{CommandContext, Progress};
use crate::error::FsmError;
use crate::state::{StateId, StateParams};
use bigbot_driver::{MotionKind, ServoGroup, UsPositions};
use smallvec::SmallVec;
use std::time::Duration;
use tracing::{debug, warn};

/// 有时长命令的具体操作
#[derive(Debug, Clone, PartialEq)]
pub enum TimedOp {
    /// 底盘运动（距离单位 cm，旋转单位度）
    Motion {
        kind: MotionKind,
        amount: f64,
        speed: f64,
    },
    /// 舵机组动作
    Servo {
        group: ServoGroup,
        angles: SmallVec<[f64; 4]>,
        state: StateId,
    },
    /// 固定时长等待
    Wait { duration: Duration },
    /// 等到比赛进行到 `match_time`
    WaitUntil { match_time: Duration },
}

impl TimedOp {
    pub fn name(&self) -> &'static str {
        match self {
            TimedOp::Motion { kind, .. } => match kind {
                MotionKind::Forward => "MoveForward",
                MotionKind::Backward => "MoveBackward",
                MotionKind::RotateLeft => "RotateLeft",
                MotionKind::RotateRight => "RotateRight",
            },
            TimedOp::Servo { .. } => "Servo",
            TimedOp::Wait { .. } => "Wait",
            TimedOp::WaitUntil { .. } => "WaitUntil",
        }
    }

    pub fn state(&self) -> (StateId, StateParams) {
        match self {
            TimedOp::Motion {
                kind,
                amount,
                speed,
            } => {
                let (distance_cm, speed) = (*amount, *speed);
                match kind {
                    MotionKind::Forward => (
                        StateId::MoveForward,
                        StateParams::Movement { distance_cm, speed },
                    ),
                    MotionKind::Backward => (
                        StateId::MoveBackward,
                        StateParams::Movement { distance_cm, speed },
                    ),
                    MotionKind::RotateLeft => (
                        StateId::RotateLeft,
                        StateParams::Rotation {
                            degrees: distance_cm,
                            speed,
                        },
                    ),
                    MotionKind::RotateRight => (
                        StateId::RotateRight,
                        StateParams::Rotation {
                            degrees: distance_cm,
                            speed,
                        },
                    ),
                }
            },
            TimedOp::Servo { angles, state, .. } => (
                *state,
                StateParams::Actuation {
                    angles: angles.clone(),
                },
            ),
            TimedOp::Wait { duration } => (
                StateId::Wait,
                StateParams::Wait {
                    duration: *duration,
                },
            ),
            TimedOp::WaitUntil { .. } => (StateId::Wait, StateParams::None),
        }
    }

    fn mirrored(&self) -> Self {
        match self {
            TimedOp::Motion {
                kind,
                amount,
                speed,
            } => TimedOp::Motion {
                kind: kind.mirrored(),
                amount: *amount,
                speed: *speed,
            },
            other => other.clone(),
        }
    }
}

/// 有时长的命令
#[derive(Debug, Clone)]
pub struct TimedCommand {
    op: TimedOp,
    time_needed: Duration,
    /// `Wait` 期间被禁用、完成时需要恢复的传感器
    suppressed: UsPositions,
    finished: bool,
}

impl TimedCommand {
    pub fn new(op: TimedOp) -> Self {
        Self {
            op,
            time_needed: Duration::ZERO,
            suppressed: UsPositions::new(),
            finished: false,
        }
    }

    pub fn op(&self) -> &TimedOp {
        &self.op
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `execute()` 返回的时长
    pub fn time_needed(&self) -> Duration {
        self.time_needed
    }

    pub(crate) fn mirrored(&self) -> Self {
        Self::new(self.op.mirrored())
    }

    /// 开始执行，返回所需时长
    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<Duration, FsmError> {
        let time_needed = match &self.op {
            TimedOp::Motion {
                kind,
                amount,
                speed,
            } => ctx.robot.motors_mut().perform(*kind, *amount, *speed)?,
            TimedOp::Servo { group, angles, .. } => {
                let servos = ctx.robot.servos_mut()?;
                let time_needed = servos.compute_time_needed(*group, angles)?;
                servos.set_group(*group, angles)?;
                time_needed
            },
            TimedOp::Wait { duration } => {
                let ultrasonic = ctx.robot.ultrasonic_mut();
                self.suppressed = ultrasonic.enabled_sensors();
                for &position in &self.suppressed {
                    ultrasonic.disable_sensor(position);
                }
                *duration
            },
            TimedOp::WaitUntil { match_time } => {
                match_time.saturating_sub(ctx.clock.elapsed_at(ctx.now))
            },
        };
        self.time_needed = time_needed;
        debug!("{} executed, needs {:?}", self.op.name(), time_needed);
        Ok(time_needed)
    }

    pub fn pause(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), FsmError> {
        if let TimedOp::Motion { .. } = self.op {
            ctx.robot.motors_mut().stop()?;
        }
        Ok(())
    }

    /// 恢复：运动命令只下发剩余部分，舵机命令重新下发目标角度
    pub fn resume(&mut self, ctx: &mut CommandContext<'_>, progress: Progress) -> Result<(), FsmError> {
        match &self.op {
            TimedOp::Motion {
                kind,
                amount,
                speed,
            } => {
                let remaining = amount * progress.remaining_fraction();
                debug!(
                    "Resuming {} with {:.1}{} of {:.1}{}",
                    self.op.name(),
                    remaining,
                    kind.unit(),
                    amount,
                    kind.unit()
                );
                ctx.robot.motors_mut().perform(*kind, remaining, *speed)?;
            },
            TimedOp::Servo { group, angles, .. } => {
                ctx.robot.servos_mut()?.set_group(*group, angles)?;
            },
            TimedOp::Wait { .. } | TimedOp::WaitUntil { .. } => {},
        }
        Ok(())
    }

    pub fn abort(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), FsmError> {
        if let TimedOp::Motion { .. } = self.op {
            ctx.robot.motors_mut().stop()?;
        }
        Ok(())
    }

    /// 完成：运动命令停车，等待命令恢复被禁用的传感器
    pub fn finished(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), FsmError> {
        if self.finished {
            warn!("{} already finished", self.op.name());
            return Ok(());
        }
        self.finished = true;
        match self.op {
            TimedOp::Motion { .. } => ctx.robot.motors_mut().stop()?,
            TimedOp::Wait { .. } => {
                for &position in &self.suppressed {
                    ctx.robot.ultrasonic_mut().enable_sensor(position);
                }
                self.suppressed.clear();
            },
            TimedOp::Servo { .. } | TimedOp::WaitUntil { .. } => {},
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MatchClock;
    use bigbot_driver::{Robot, RobotBuilder, SimProbes, UsPosition};
    use std::time::Instant;

    fn robot() -> (Robot, SimProbes) {
        let (builder, probes) = RobotBuilder::simulated();
        (builder.build().unwrap(), probes)
    }

    #[test]
    fn test_motion_resume_issues_remaining_distance() {
        let (mut robot, probes) = robot();
        let clock = MatchClock::new(Duration::from_secs(100));
        let mut ctx = CommandContext {
            robot: &mut robot,
            clock: &clock,
            now: Instant::now(),
        };

        let mut cmd = TimedCommand::new(TimedOp::Motion {
            kind: MotionKind::Forward,
            amount: 50.0,
            speed: 0.5,
        });
        // 50cm @ 10cm/s = 5s
        assert_eq!(cmd.execute(&mut ctx).unwrap(), Duration::from_secs(5));

        cmd.pause(&mut ctx).unwrap();
        assert!(probes.motors.is_stopped());

        // 已走 2s（40%），剩余 30cm
        let progress = Progress::new(Duration::from_secs(2), Duration::from_secs(5));
        cmd.resume(&mut ctx, progress).unwrap();
        assert_eq!(probes.motors.last_command(), Some((0.5, 0.5)));
        assert_eq!(probes.motors.moves().len(), 2);

        let motors = ctx.robot.motors();
        let (kind, remaining) = motors.last_motion().unwrap();
        assert_eq!(kind, MotionKind::Forward);
        assert!((remaining - 30.0).abs() < 1e-9, "remaining = {}", remaining);
        let remaining_time = motors.time_needed(kind, remaining, 0.5).unwrap();
        assert!(
            remaining_time.abs_diff(Duration::from_secs(3)) < Duration::from_millis(1),
            "remaining time = {:?}",
            remaining_time
        );

        cmd.finished(&mut ctx).unwrap();
        assert!(probes.motors.is_stopped());
    }

    #[test]
    fn test_motion_resume_with_nothing_left_does_not_drive() {
        let (mut robot, probes) = robot();
        let clock = MatchClock::new(Duration::from_secs(100));
        let mut ctx = CommandContext {
            robot: &mut robot,
            clock: &clock,
            now: Instant::now(),
        };

        let mut cmd = TimedCommand::new(TimedOp::Motion {
            kind: MotionKind::RotateLeft,
            amount: 90.0,
            speed: 0.5,
        });
        cmd.execute(&mut ctx).unwrap();
        cmd.pause(&mut ctx).unwrap();
        let time_needed = cmd.time_needed();
        cmd.resume(&mut ctx, Progress::new(time_needed, time_needed))
            .unwrap();
        assert_eq!(probes.motors.moves().len(), 1);
        assert!(probes.motors.is_stopped());
    }

    #[test]
    fn test_servo_duration_and_state() {
        let (mut robot, probes) = robot();
        let clock = MatchClock::new(Duration::from_secs(100));
        let mut ctx = CommandContext {
            robot: &mut robot,
            clock: &clock,
            now: Instant::now(),
        };

        let mut cmd = TimedCommand::new(TimedOp::Servo {
            group: ServoGroup::CentralClaws,
            angles: SmallVec::from_slice(&[120.0, 60.0]),
            state: StateId::OpenClaw,
        });
        assert_eq!(
            cmd.execute(&mut ctx).unwrap(),
            Duration::from_secs_f64(1.2)
        );
        assert_eq!(probes.servos.angle(0), Some(120.0));
        assert_eq!(probes.servos.angle(1), Some(60.0));
        assert_eq!(cmd.op().state().0, StateId::OpenClaw);
    }

    #[test]
    fn test_wait_suppresses_and_restores_sensors() {
        let (mut robot, _probes) = robot();
        robot.ultrasonic_mut().disable_sensor(UsPosition::BackLeft);
        let clock = MatchClock::new(Duration::from_secs(100));
        let mut ctx = CommandContext {
            robot: &mut robot,
            clock: &clock,
            now: Instant::now(),
        };

        let mut cmd = TimedCommand::new(TimedOp::Wait {
            duration: Duration::from_millis(300),
        });
        assert_eq!(cmd.execute(&mut ctx).unwrap(), Duration::from_millis(300));
        assert!(ctx.robot.ultrasonic().enabled_sensors().is_empty());

        cmd.finished(&mut ctx).unwrap();
        // 只恢复等待前已启用的传感器
        assert_eq!(ctx.robot.ultrasonic().enabled_sensors().len(), 3);
        assert!(!ctx.robot.ultrasonic().is_enabled(UsPosition::BackLeft));
    }

    #[test]
    fn test_wait_until_uses_match_time() {
        let (mut robot, _probes) = robot();
        let t0 = Instant::now();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        clock.start(t0);
        let mut ctx = CommandContext {
            robot: &mut robot,
            clock: &clock,
            now: t0 + Duration::from_secs(80),
        };

        let mut cmd = TimedCommand::new(TimedOp::WaitUntil {
            match_time: Duration::from_secs(85),
        });
        assert_eq!(cmd.execute(&mut ctx).unwrap(), Duration::from_secs(5));

        ctx.now = t0 + Duration::from_secs(90);
        let mut late = TimedCommand::new(TimedOp::WaitUntil {
            match_time: Duration::from_secs(85),
        });
        assert_eq!(late.execute(&mut ctx).unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_hardware_error_propagates() {
        let (mut robot, probes) = robot();
        probes.motors.fail_next(1);
        let clock = MatchClock::new(Duration::from_secs(100));
        let mut ctx = CommandContext {
            robot: &mut robot,
            clock: &clock,
            now: Instant::now(),
        };

        let mut cmd = TimedCommand::new(TimedOp::Motion {
            kind: MotionKind::Forward,
            amount: 10.0,
            speed: 0.5,
        });
        let err = cmd.execute(&mut ctx).unwrap_err();
        assert!(err.is_transient());
    }
}

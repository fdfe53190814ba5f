//! 集成测试共用的模拟机器人装置

#![allow(dead_code)]

use bigbot::driver::{RobotBuilder, SimProbes};
use bigbot::fsm::{RobotFsm, Sequence, StateRegistry, StepEvent, StepRecorder};
use bigbot::RobotConfig;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 状态机 + 模拟硬件探针 + 步骤事件
pub struct Rig {
    pub fsm: RobotFsm,
    pub probes: SimProbes,
    pub events: Receiver<StepEvent>,
}

impl Rig {
    pub fn new(config: RobotConfig, sequences: Vec<Sequence>) -> Self {
        Self::with_registry(config, StateRegistry::with_defaults(), sequences)
    }

    pub fn with_registry(
        config: RobotConfig,
        registry: StateRegistry,
        sequences: Vec<Sequence>,
    ) -> Self {
        let (builder, probes) = RobotBuilder::simulated();
        let robot = builder.config(config.clone()).build().unwrap();
        let mut fsm = RobotFsm::new(robot, config, registry, sequences).unwrap();
        let (recorder, events) = StepRecorder::new();
        fsm.add_hook(Arc::new(recorder));
        Self { fsm, probes, events }
    }

    /// 执行一次 update，返回本次的时刻和产生的事件
    pub fn tick(&mut self) -> (Instant, Vec<StepEvent>) {
        let now = Instant::now();
        self.fsm.update_at(now).unwrap();
        (now, self.events.try_iter().collect())
    }

    /// 以 1ms 周期运行，直到某次 update 产生满足条件的事件
    pub fn run_until_event(
        &mut self,
        timeout: Duration,
        mut pred: impl FnMut(&StepEvent) -> bool,
    ) -> Instant {
        let deadline = Instant::now() + timeout;
        loop {
            assert!(Instant::now() < deadline, "expected event did not occur");
            let (now, events) = self.tick();
            if events.iter().any(&mut pred) {
                return now;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// 运行到所有序列完成，返回期间的全部事件
    pub fn run_to_completion(&mut self, timeout: Duration) -> Vec<StepEvent> {
        let deadline = Instant::now() + timeout;
        let mut all = Vec::new();
        while !self.fsm.is_finished() {
            assert!(Instant::now() < deadline, "sequences did not complete");
            let (_, events) = self.tick();
            all.extend(events);
            std::thread::sleep(Duration::from_millis(1));
        }
        all
    }
}

/// 不等待拉线，第一次 update 即开赛
pub fn no_switch_config() -> RobotConfig {
    let mut config = RobotConfig::default();
    config.match_.wait_for_start_switch = false;
    config
}

/// 所有动作都在几毫秒内完成的标定
pub fn fast_config() -> RobotConfig {
    let mut config = no_switch_config();
    config.motion.full_speed_cm_per_s = 4000.0;
    config.motion.full_speed_deg_per_s = 20000.0;
    config.servo.degrees_per_second = 20000.0;
    config.servo.min_move_s = 0.002;
    config
}

pub fn sleep_until(deadline: Instant) {
    std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
}

pub fn assert_close(actual: Duration, expected: Duration, tolerance: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= tolerance,
        "expected {:?} ± {:?}, got {:?}",
        expected,
        tolerance,
        actual
    );
}

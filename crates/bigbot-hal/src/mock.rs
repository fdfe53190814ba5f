//! 模拟硬件后端
//!
//! 每个模拟设备都与一个 `*Probe` 共享内部状态（`Arc<Mutex<..>>`）：
//! 设备交给驱动层使用，探针留在测试/演示代码中用于观察输出和注入输入。
//!
//! ```rust
//! use bigbot_hal::MotorDriver;
//! use bigbot_hal::mock::SimMotors;
//!
//! let (mut motors, probe) = SimMotors::new();
//! motors.drive(0.5, 0.5).unwrap();
//! assert_eq!(probe.last_command(), Some((0.5, 0.5)));
//! ```

use crate::{HalError, MotorDriver, RangeSensor, ScoreDisplay, ServoDriver, StartSwitch};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

// ============================================================
// 电机
// ============================================================

#[derive(Debug, Default)]
struct MotorState {
    history: Vec<(f64, f64)>,
    brakes: usize,
    fail_next: usize,
}

/// 模拟差速电机
pub struct SimMotors {
    state: Arc<Mutex<MotorState>>,
}

/// [`SimMotors`] 的观察探针
#[derive(Clone)]
pub struct MotorProbe {
    state: Arc<Mutex<MotorState>>,
}

impl SimMotors {
    pub fn new() -> (Self, MotorProbe) {
        let state = Arc::new(Mutex::new(MotorState::default()));
        (
            Self {
                state: state.clone(),
            },
            MotorProbe { state },
        )
    }
}

impl MotorDriver for SimMotors {
    fn drive(&mut self, left: f64, right: f64) -> Result<(), HalError> {
        let mut state = self.state.lock();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(HalError::Fault("simulated motor fault".to_string()));
        }
        trace!("sim motors: left={:.2} right={:.2}", left, right);
        state.history.push((left, right));
        Ok(())
    }

    fn brake(&mut self) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.brakes += 1;
        state.history.push((0.0, 0.0));
        Ok(())
    }
}

impl MotorProbe {
    /// 最近一次输出的占空比
    pub fn last_command(&self) -> Option<(f64, f64)> {
        self.state.lock().history.last().copied()
    }

    /// 全部输出历史（包括刹车产生的 `(0.0, 0.0)`）
    pub fn history(&self) -> Vec<(f64, f64)> {
        self.state.lock().history.clone()
    }

    /// 非零输出（即真正让机器人运动的指令）
    pub fn moves(&self) -> Vec<(f64, f64)> {
        self.state
            .lock()
            .history
            .iter()
            .copied()
            .filter(|&(l, r)| l != 0.0 || r != 0.0)
            .collect()
    }

    pub fn brake_count(&self) -> usize {
        self.state.lock().brakes
    }

    /// 电机当前是否处于停止状态
    pub fn is_stopped(&self) -> bool {
        matches!(self.last_command(), None | Some((0.0, 0.0)))
    }

    /// 让接下来的 `count` 次 `drive()` 调用失败（刹车不受影响）
    pub fn fail_next(&self, count: usize) {
        self.state.lock().fail_next = count;
    }
}

// ============================================================
// 舵机
// ============================================================

#[derive(Debug)]
struct ServoState {
    angles: Vec<Option<f64>>,
    writes: usize,
}

/// 模拟舵机板
pub struct SimServos {
    state: Arc<Mutex<ServoState>>,
}

/// [`SimServos`] 的观察探针
#[derive(Clone)]
pub struct ServoProbe {
    state: Arc<Mutex<ServoState>>,
}

impl SimServos {
    pub fn new(channels: usize) -> (Self, ServoProbe) {
        let state = Arc::new(Mutex::new(ServoState {
            angles: vec![None; channels],
            writes: 0,
        }));
        (
            Self {
                state: state.clone(),
            },
            ServoProbe { state },
        )
    }
}

impl ServoDriver for SimServos {
    fn channel_count(&self) -> usize {
        self.state.lock().angles.len()
    }

    fn set_angle(&mut self, channel: usize, angle: Option<f64>) -> Result<(), HalError> {
        let mut state = self.state.lock();
        let count = state.angles.len();
        let slot = state
            .angles
            .get_mut(channel)
            .ok_or(HalError::InvalidChannel { channel, count })?;
        *slot = angle;
        state.writes += 1;
        Ok(())
    }
}

impl ServoProbe {
    pub fn angle(&self, channel: usize) -> Option<f64> {
        self.state.lock().angles.get(channel).copied().flatten()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// 所有通道是否都已释放
    pub fn all_released(&self) -> bool {
        self.state.lock().angles.iter().all(Option::is_none)
    }
}

// ============================================================
// 测距传感器
// ============================================================

#[derive(Debug, Default)]
struct RangeState {
    distance: Option<f64>,
    failing: bool,
    reads: usize,
}

/// 模拟超声波传感器（初始无回波）
pub struct SimRangeSensor {
    state: Arc<Mutex<RangeState>>,
}

/// [`SimRangeSensor`] 的输入探针
#[derive(Clone)]
pub struct RangeProbe {
    state: Arc<Mutex<RangeState>>,
}

impl SimRangeSensor {
    pub fn new() -> (Self, RangeProbe) {
        let state = Arc::new(Mutex::new(RangeState::default()));
        (
            Self {
                state: state.clone(),
            },
            RangeProbe { state },
        )
    }
}

impl RangeSensor for SimRangeSensor {
    fn distance_cm(&mut self) -> Result<Option<f64>, HalError> {
        let mut state = self.state.lock();
        state.reads += 1;
        if state.failing {
            return Err(HalError::Fault("simulated echo timeout".to_string()));
        }
        Ok(state.distance)
    }
}

impl RangeProbe {
    /// 设置下一次读数；`None` 表示无回波
    pub fn set_distance(&self, distance: Option<f64>) {
        self.state.lock().distance = distance;
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().reads
    }
}

// ============================================================
// 启动开关
// ============================================================

/// 模拟启动拉线
pub struct SimStartSwitch {
    closed: Arc<Mutex<bool>>,
}

/// [`SimStartSwitch`] 的输入探针
#[derive(Clone)]
pub struct SwitchProbe {
    closed: Arc<Mutex<bool>>,
}

impl SimStartSwitch {
    /// 创建开关，`closed` 为初始状态（拉线插入时为闭合）
    pub fn new(closed: bool) -> (Self, SwitchProbe) {
        let closed = Arc::new(Mutex::new(closed));
        (
            Self {
                closed: closed.clone(),
            },
            SwitchProbe { closed },
        )
    }
}

impl StartSwitch for SimStartSwitch {
    fn is_closed(&mut self) -> Result<bool, HalError> {
        Ok(*self.closed.lock())
    }
}

impl SwitchProbe {
    /// 翻转开关状态（模拟拔出拉线）
    pub fn toggle(&self) {
        let mut closed = self.closed.lock();
        *closed = !*closed;
    }
}

// ============================================================
// 显示屏
// ============================================================

#[derive(Debug, Default)]
struct DisplayState {
    lines: Vec<(u8, String)>,
    clears: usize,
}

/// 模拟显示屏
pub struct SimDisplay {
    state: Arc<Mutex<DisplayState>>,
}

/// [`SimDisplay`] 的观察探针
#[derive(Clone)]
pub struct DisplayProbe {
    state: Arc<Mutex<DisplayState>>,
}

impl SimDisplay {
    pub fn new() -> (Self, DisplayProbe) {
        let state = Arc::new(Mutex::new(DisplayState::default()));
        (
            Self {
                state: state.clone(),
            },
            DisplayProbe { state },
        )
    }
}

impl ScoreDisplay for SimDisplay {
    fn clear(&mut self) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.lines.clear();
        state.clears += 1;
        Ok(())
    }

    fn write_line(&mut self, row: u8, text: &str) -> Result<(), HalError> {
        self.state.lock().lines.push((row, text.to_string()));
        Ok(())
    }
}

impl DisplayProbe {
    /// 自上次清屏以来写入的内容
    pub fn lines(&self) -> Vec<(u8, String)> {
        self.state.lock().lines.clone()
    }

    pub fn clear_count(&self) -> usize {
        self.state.lock().clears
    }
}

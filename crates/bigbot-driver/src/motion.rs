//! 差速底盘运动控制
//!
//! 开环控制：按标定的满速线速度/角速度估算动作所需时间，
//! 电机只负责"开始运动"和"停止"，到时停止由上层的倒计时完成。

use crate::error::DriverError;
use bigbot_hal::MotorDriver;
use bigbot_tools::MotionConfig;
use std::time::Duration;
use tracing::{debug, trace};

/// 底盘动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionKind {
    Forward,
    Backward,
    RotateLeft,
    RotateRight,
}

impl MotionKind {
    /// 左右轮方向（`+1` 正转，`-1` 反转）
    pub fn wheel_signs(self) -> (f64, f64) {
        match self {
            MotionKind::Forward => (1.0, 1.0),
            MotionKind::Backward => (-1.0, -1.0),
            MotionKind::RotateLeft => (-1.0, 1.0),
            MotionKind::RotateRight => (1.0, -1.0),
        }
    }

    pub fn is_rotation(self) -> bool {
        matches!(self, MotionKind::RotateLeft | MotionKind::RotateRight)
    }

    /// 左右镜像（直线运动不变）
    pub fn mirrored(self) -> Self {
        match self {
            MotionKind::RotateLeft => MotionKind::RotateRight,
            MotionKind::RotateRight => MotionKind::RotateLeft,
            other => other,
        }
    }

    /// 动作量的单位（用于日志）
    pub fn unit(self) -> &'static str {
        if self.is_rotation() { "deg" } else { "cm" }
    }
}

/// 底盘控制器
pub struct MotorsControl {
    driver: Box<dyn MotorDriver>,
    config: MotionConfig,
    moving: bool,
    last_motion: Option<(MotionKind, f64)>,
}

impl MotorsControl {
    pub fn new(driver: Box<dyn MotorDriver>, config: MotionConfig) -> Self {
        Self {
            driver,
            config,
            moving: false,
            last_motion: None,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// 电机当前是否在输出
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// 最近一次实际下发的动作及其动作量
    pub fn last_motion(&self) -> Option<(MotionKind, f64)> {
        self.last_motion
    }

    /// 直线前进 `distance_cm`，返回预计耗时
    pub fn move_forward(&mut self, distance_cm: f64, speed: f64) -> Result<Duration, DriverError> {
        self.perform(MotionKind::Forward, distance_cm, speed)
    }

    pub fn move_backward(&mut self, distance_cm: f64, speed: f64) -> Result<Duration, DriverError> {
        self.perform(MotionKind::Backward, distance_cm, speed)
    }

    /// 原地左转 `degrees`，返回预计耗时
    pub fn rotate_left_degrees(&mut self, degrees: f64, speed: f64) -> Result<Duration, DriverError> {
        self.perform(MotionKind::RotateLeft, degrees, speed)
    }

    pub fn rotate_right_degrees(
        &mut self,
        degrees: f64,
        speed: f64,
    ) -> Result<Duration, DriverError> {
        self.perform(MotionKind::RotateRight, degrees, speed)
    }

    /// 估算动作耗时：`amount / (speed × 满速速率)`
    ///
    /// # 错误
    ///
    /// - `speed` 不在 `(0, 1]` 内
    /// - `amount` 为负数或非有限值
    /// - 耗时超出 `Duration` 的表示范围
    pub fn time_needed(&self, kind: MotionKind, amount: f64, speed: f64) -> Result<Duration, DriverError> {
        if !(speed > 0.0 && speed <= 1.0) {
            return Err(DriverError::InvalidInput(format!(
                "speed {} out of range (0, 1]",
                speed
            )));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(DriverError::InvalidInput(format!(
                "{:?} amount {} must be a non-negative number",
                kind, amount
            )));
        }
        let rate = if kind.is_rotation() {
            self.config.full_speed_deg_per_s
        } else {
            self.config.full_speed_cm_per_s
        };
        Duration::try_from_secs_f64(amount / (speed * rate)).map_err(|e| {
            DriverError::InvalidInput(format!("{:?} amount {} too large: {}", kind, amount, e))
        })
    }

    /// 执行一个底盘动作，返回预计耗时
    ///
    /// 动作量为零时不驱动电机，直接返回零耗时。
    pub fn perform(&mut self, kind: MotionKind, amount: f64, speed: f64) -> Result<Duration, DriverError> {
        let time_needed = self.time_needed(kind, amount, speed)?;
        if time_needed.is_zero() {
            trace!("Skipping {:?} with zero amount", kind);
            return Ok(Duration::ZERO);
        }

        let (left, right) = kind.wheel_signs();
        self.driver.drive(left * speed, right * speed)?;
        self.moving = true;
        self.last_motion = Some((kind, amount));
        debug!(
            "Motors: {:?} {:.1}{} at {:.2} ({:?})",
            kind,
            amount,
            kind.unit(),
            speed,
            time_needed
        );
        Ok(time_needed)
    }

    /// 停止电机
    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.driver.brake()?;
        if self.moving {
            trace!("Motors stopped");
        }
        self.moving = false;
        Ok(())
    }
}

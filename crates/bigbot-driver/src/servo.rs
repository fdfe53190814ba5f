//! 舵机组控制
//!
//! 通道布局：
//!
//! | 通道 | 用途 |
//! |------|------|
//! | 0, 1 | 中央夹爪 |
//! | 2, 3 | 外侧夹爪 |
//! | 4, 5 | 木板推杆 |
//! | 6    | 铰链 |
//! | 7    | 横幅展开 |

use crate::error::DriverError;
use bigbot_hal::ServoDriver;
use bigbot_tools::ServoConfig;
use std::ops::Range;
use std::time::Duration;
use tracing::debug;

/// 标准舵机板通道数
pub const SERVO_CHANNELS: usize = 8;

/// 舵机组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServoGroup {
    /// 从通道 0 开始的全部通道（按传入角度数量）
    All,
    CentralClaws,
    Outer,
    PlankPushers,
    Hinge,
    BannerDeployer,
}

impl ServoGroup {
    /// 该组占用的通道；`All` 按传入角度数量决定
    pub fn channels(self, angle_count: usize) -> Range<usize> {
        match self {
            ServoGroup::All => 0..angle_count,
            ServoGroup::CentralClaws => 0..2,
            ServoGroup::Outer => 2..4,
            ServoGroup::PlankPushers => 4..6,
            ServoGroup::Hinge => 6..7,
            ServoGroup::BannerDeployer => 7..8,
        }
    }
}

/// 舵机控制器
///
/// 记录每个通道最后一次下发的角度（初始为 0°），用于估算动作耗时。
pub struct ServoControl {
    driver: Box<dyn ServoDriver>,
    config: ServoConfig,
    last_angles: Vec<f64>,
}

impl ServoControl {
    pub fn new(driver: Box<dyn ServoDriver>, config: ServoConfig) -> Self {
        let count = driver.channel_count();
        Self {
            driver,
            config,
            last_angles: vec![0.0; count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.last_angles.len()
    }

    /// 最后一次下发的角度
    pub fn last_angle(&self, channel: usize) -> Option<f64> {
        self.last_angles.get(channel).copied()
    }

    fn resolve(&self, group: ServoGroup, angles: &[f64]) -> Result<Range<usize>, DriverError> {
        let channels = group.channels(angles.len());
        if channels.len() != angles.len() {
            return Err(DriverError::InvalidInput(format!(
                "{:?} expects {} angles, got {}",
                group,
                channels.len(),
                angles.len()
            )));
        }
        if channels.end > self.last_angles.len() {
            return Err(DriverError::InvalidInput(format!(
                "{:?} needs channel {} but the board has {}",
                group,
                channels.end - 1,
                self.last_angles.len()
            )));
        }
        Ok(channels)
    }

    /// 估算舵机组到达目标角度所需时间
    ///
    /// `max(max |Δangle| / degrees_per_second, min_move_s)`；没有角度时返回最短时间。
    pub fn compute_time_needed(&self, group: ServoGroup, angles: &[f64]) -> Result<Duration, DriverError> {
        let channels = self.resolve(group, angles)?;
        let max_diff = channels
            .zip(angles)
            .map(|(channel, &angle)| (angle - self.last_angles[channel]).abs())
            .fold(0.0_f64, f64::max);
        let seconds = (max_diff / self.config.degrees_per_second).max(self.config.min_move_s);
        Duration::try_from_secs_f64(seconds).map_err(|e| {
            DriverError::InvalidInput(format!("{:?} move to {:?} takes too long: {}", group, angles, e))
        })
    }

    /// 设置舵机组角度
    pub fn set_group(&mut self, group: ServoGroup, angles: &[f64]) -> Result<(), DriverError> {
        let channels = self.resolve(group, angles)?;
        for (channel, &angle) in channels.zip(angles) {
            self.driver.set_angle(channel, Some(angle))?;
            self.last_angles[channel] = angle;
        }
        debug!("Servos {:?} -> {:?}", group, angles);
        Ok(())
    }

    pub fn set_angles(&mut self, angles: &[f64]) -> Result<(), DriverError> {
        self.set_group(ServoGroup::All, angles)
    }

    pub fn set_central_claw_angles(&mut self, angles: [f64; 2]) -> Result<(), DriverError> {
        self.set_group(ServoGroup::CentralClaws, &angles)
    }

    pub fn set_outer_angles(&mut self, angles: [f64; 2]) -> Result<(), DriverError> {
        self.set_group(ServoGroup::Outer, &angles)
    }

    pub fn set_plank_pusher_angles(&mut self, angles: [f64; 2]) -> Result<(), DriverError> {
        self.set_group(ServoGroup::PlankPushers, &angles)
    }

    pub fn set_hinge_angle(&mut self, angle: f64) -> Result<(), DriverError> {
        self.set_group(ServoGroup::Hinge, &[angle])
    }

    pub fn set_banner_deployer_angle(&mut self, angle: f64) -> Result<(), DriverError> {
        self.set_group(ServoGroup::BannerDeployer, &[angle])
    }

    /// 释放所有通道（停止输出）
    pub fn release_all(&mut self) -> Result<(), DriverError> {
        for channel in 0..self.last_angles.len() {
            self.driver.set_angle(channel, None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigbot_hal::mock::{ServoProbe, SimServos};

    fn servos() -> (ServoControl, ServoProbe) {
        let (driver, probe) = SimServos::new(SERVO_CHANNELS);
        (
            ServoControl::new(Box::new(driver), ServoConfig::default()),
            probe,
        )
    }

    #[test]
    fn test_time_needed_uses_largest_delta() {
        let (mut servos, _probe) = servos();
        // 初始角度为 0，100°/s
        let time = servos
            .compute_time_needed(ServoGroup::Outer, &[50.0, 150.0])
            .unwrap();
        assert_eq!(time, Duration::from_secs_f64(1.5));

        servos.set_outer_angles([50.0, 150.0]).unwrap();
        let time = servos
            .compute_time_needed(ServoGroup::Outer, &[60.0, 130.0])
            .unwrap();
        assert_eq!(time, Duration::from_secs_f64(0.2));
    }

    #[test]
    fn test_time_needed_minimum() {
        let (servos, _probe) = servos();
        let time = servos
            .compute_time_needed(ServoGroup::Hinge, &[2.0])
            .unwrap();
        assert_eq!(time, Duration::from_secs_f64(0.1));

        let time = servos.compute_time_needed(ServoGroup::All, &[]).unwrap();
        assert_eq!(time, Duration::from_secs_f64(0.1));
    }

    #[test]
    fn test_time_needed_out_of_range_rejected() {
        let (servos, _probe) = servos();
        assert!(matches!(
            servos.compute_time_needed(ServoGroup::Hinge, &[1e308]),
            Err(DriverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_group_channel_mapping() {
        let (mut servos, probe) = servos();
        servos.set_plank_pusher_angles([10.0, 20.0]).unwrap();
        servos.set_banner_deployer_angle(90.0).unwrap();
        assert_eq!(probe.angle(4), Some(10.0));
        assert_eq!(probe.angle(5), Some(20.0));
        assert_eq!(probe.angle(7), Some(90.0));
        assert_eq!(servos.last_angle(7), Some(90.0));
        assert_eq!(probe.angle(0), None);
    }

    #[test]
    fn test_wrong_angle_count_rejected() {
        let (mut servos, probe) = servos();
        assert!(servos.set_group(ServoGroup::Outer, &[1.0]).is_err());
        assert!(servos.set_angles(&[0.0; 9]).is_err());
        assert_eq!(probe.write_count(), 0);
    }

    #[test]
    fn test_release_all() {
        let (mut servos, probe) = servos();
        servos.set_angles(&[90.0; SERVO_CHANNELS]).unwrap();
        servos.release_all().unwrap();
        assert!(probe.all_released());
    }
}

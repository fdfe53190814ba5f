//! Builder 模式实现
//!
//! 提供链式构造 [`Robot`] 实例的便捷方式。

use crate::display::ScoreBoard;
use crate::error::DriverError;
use crate::motion::MotorsControl;
use crate::robot::Robot;
use crate::servo::ServoControl;
use crate::start_switch::StartSwitchReader;
use crate::ultrasonic::{UltrasonicController, UsPosition};
use bigbot_hal::{MotorDriver, RangeSensor, ScoreDisplay, ServoDriver, StartSwitch};
use bigbot_tools::RobotConfig;

/// Robot Builder（链式构造）
///
/// 只有电机是必需的，其余设备缺省时对应功能不可用。
///
/// # Example
///
/// ```
/// use bigbot_driver::RobotBuilder;
/// use bigbot_hal::mock::SimMotors;
///
/// let (motors, _probe) = SimMotors::new();
/// let robot = RobotBuilder::new()
///     .motors(Box::new(motors))
///     .score(42)
///     .build()
///     .unwrap();
/// assert_eq!(robot.score(), 42);
/// ```
pub struct RobotBuilder {
    config: RobotConfig,
    motors: Option<Box<dyn MotorDriver>>,
    servos: Option<Box<dyn ServoDriver>>,
    range_sensors: Vec<(UsPosition, Box<dyn RangeSensor>)>,
    start_switch: Option<Box<dyn StartSwitch>>,
    display: Option<Box<dyn ScoreDisplay>>,
    score: u32,
}

impl RobotBuilder {
    /// 创建新的 Builder（默认配置）
    pub fn new() -> Self {
        Self {
            config: RobotConfig::default(),
            motors: None,
            servos: None,
            range_sensors: Vec::new(),
            start_switch: None,
            display: None,
            score: 0,
        }
    }

    /// 设置标定/阈值配置
    pub fn config(mut self, config: RobotConfig) -> Self {
        self.config = config;
        self
    }

    pub fn motors(mut self, driver: Box<dyn MotorDriver>) -> Self {
        self.motors = Some(driver);
        self
    }

    pub fn servos(mut self, driver: Box<dyn ServoDriver>) -> Self {
        self.servos = Some(driver);
        self
    }

    /// 登记一个超声波传感器
    pub fn range_sensor(mut self, position: UsPosition, sensor: Box<dyn RangeSensor>) -> Self {
        self.range_sensors.push((position, sensor));
        self
    }

    pub fn start_switch(mut self, switch: Box<dyn StartSwitch>) -> Self {
        self.start_switch = Some(switch);
        self
    }

    pub fn display(mut self, display: Box<dyn ScoreDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    /// 预期得分（显示在屏幕上）
    pub fn score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }

    /// 构建 Robot
    ///
    /// # 错误
    ///
    /// 未提供电机驱动时返回 [`DriverError::MissingDevice`]。
    pub fn build(self) -> Result<Robot, DriverError> {
        let motors = self.motors.ok_or(DriverError::MissingDevice("motors"))?;

        let mut ultrasonic = UltrasonicController::new(self.config.obstacle.clone());
        for (position, sensor) in self.range_sensors {
            ultrasonic.add_sensor(position, sensor);
        }

        Ok(Robot {
            motors: MotorsControl::new(motors, self.config.motion.clone()),
            servos: self
                .servos
                .map(|driver| ServoControl::new(driver, self.config.servo.clone())),
            ultrasonic,
            start_switch: self.start_switch.map(StartSwitchReader::new),
            score_board: self.display.map(ScoreBoard::new),
            score: self.score,
        })
    }
}

impl Default for RobotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "mock")]
pub use simulated::SimProbes;

#[cfg(feature = "mock")]
mod simulated {
    use super::RobotBuilder;
    use crate::servo::SERVO_CHANNELS;
    use crate::ultrasonic::UsPosition;
    use bigbot_hal::mock::{
        DisplayProbe, MotorProbe, RangeProbe, ServoProbe, SimDisplay, SimMotors, SimRangeSensor,
        SimServos, SimStartSwitch, SwitchProbe,
    };
    use std::collections::BTreeMap;

    /// 模拟硬件的全部探针
    #[derive(Clone)]
    pub struct SimProbes {
        pub motors: MotorProbe,
        pub servos: ServoProbe,
        pub ranges: BTreeMap<UsPosition, RangeProbe>,
        pub start_switch: SwitchProbe,
        pub display: DisplayProbe,
    }

    impl SimProbes {
        /// 所有传感器设置同一读数
        pub fn set_all_distances(&self, distance: Option<f64>) {
            for probe in self.ranges.values() {
                probe.set_distance(distance);
            }
        }

        pub fn range(&self, position: UsPosition) -> Option<&RangeProbe> {
            self.ranges.get(&position)
        }
    }

    impl RobotBuilder {
        /// 使用全套模拟硬件（四个超声波、8 通道舵机、拉线插入）
        pub fn simulated() -> (Self, SimProbes) {
            let (motors, motor_probe) = SimMotors::new();
            let (servos, servo_probe) = SimServos::new(SERVO_CHANNELS);
            let (switch, switch_probe) = SimStartSwitch::new(true);
            let (display, display_probe) = SimDisplay::new();

            let mut builder = Self::new()
                .motors(Box::new(motors))
                .servos(Box::new(servos))
                .start_switch(Box::new(switch))
                .display(Box::new(display));

            let mut ranges = BTreeMap::new();
            for position in UsPosition::ALL {
                let (sensor, probe) = SimRangeSensor::new();
                builder = builder.range_sensor(position, Box::new(sensor));
                ranges.insert(position, probe);
            }

            (
                builder,
                SimProbes {
                    motors: motor_probe,
                    servos: servo_probe,
                    ranges,
                    start_switch: switch_probe,
                    display: display_probe,
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigbot_hal::mock::{SimMotors, SimServos};

    #[test]
    fn test_build_requires_motors() {
        let result = RobotBuilder::new().build();
        assert!(matches!(result, Err(DriverError::MissingDevice("motors"))));
    }

    #[test]
    fn test_optional_devices() {
        let (motors, _probe) = SimMotors::new();
        let mut robot = RobotBuilder::new()
            .motors(Box::new(motors))
            .build()
            .unwrap();
        assert!(robot.servos_mut().is_err());
        assert!(robot.start_switch_mut().is_none());
        // 没有显示屏时显示分数为空操作
        assert!(robot.show_score().is_ok());
    }

    #[test]
    fn test_shutdown_stops_everything() {
        let (motors, motor_probe) = SimMotors::new();
        let (servos, servo_probe) = SimServos::new(8);
        let mut robot = RobotBuilder::new()
            .motors(Box::new(motors))
            .servos(Box::new(servos))
            .build()
            .unwrap();

        robot.motors_mut().move_forward(10.0, 0.5).unwrap();
        robot.servos_mut().unwrap().set_hinge_angle(45.0).unwrap();
        robot.shutdown().unwrap();

        assert!(motor_probe.is_stopped());
        assert!(servo_probe.all_released());
    }
}

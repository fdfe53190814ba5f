//! 机器人硬件集合
//!
//! [`Robot`] 把所有硬件协作者收拢在一起，由状态机独占持有。

use crate::display::ScoreBoard;
use crate::error::DriverError;
use crate::motion::MotorsControl;
use crate::servo::ServoControl;
use crate::start_switch::StartSwitchReader;
use crate::ultrasonic::UltrasonicController;
use tracing::{info, warn};

pub struct Robot {
    pub(crate) motors: MotorsControl,
    pub(crate) servos: Option<ServoControl>,
    pub(crate) ultrasonic: UltrasonicController,
    pub(crate) start_switch: Option<StartSwitchReader>,
    pub(crate) score_board: Option<ScoreBoard>,
    pub(crate) score: u32,
}

impl Robot {
    pub fn motors(&self) -> &MotorsControl {
        &self.motors
    }

    pub fn motors_mut(&mut self) -> &mut MotorsControl {
        &mut self.motors
    }

    /// 舵机控制器
    ///
    /// # 错误
    ///
    /// 未安装舵机板时返回 [`DriverError::MissingDevice`]。
    pub fn servos_mut(&mut self) -> Result<&mut ServoControl, DriverError> {
        self.servos.as_mut().ok_or(DriverError::MissingDevice("servos"))
    }

    pub fn ultrasonic(&self) -> &UltrasonicController {
        &self.ultrasonic
    }

    pub fn ultrasonic_mut(&mut self) -> &mut UltrasonicController {
        &mut self.ultrasonic
    }

    pub fn start_switch_mut(&mut self) -> Option<&mut StartSwitchReader> {
        self.start_switch.as_mut()
    }

    /// 预期得分
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn set_score(&mut self, score: u32) {
        self.score = score;
    }

    /// 在显示屏上显示预期得分；没有显示屏时为空操作
    pub fn show_score(&mut self) -> Result<(), DriverError> {
        let score = self.score;
        match self.score_board.as_mut() {
            Some(board) => board.show_score(score),
            None => Ok(()),
        }
    }

    /// 停止所有执行器（电机刹车、释放舵机）
    ///
    /// 尽力而为：某个设备失败不影响其他设备，返回第一个错误。
    pub fn shutdown(&mut self) -> Result<(), DriverError> {
        let motors = self.motors.stop();
        if let Err(e) = &motors {
            warn!("Failed to stop motors during shutdown: {}", e);
        }
        let servos = match self.servos.as_mut() {
            Some(servos) => servos.release_all(),
            None => Ok(()),
        };
        if let Err(e) = &servos {
            warn!("Failed to release servos during shutdown: {}", e);
        }
        info!("Robot actuators shut down");
        motors.and(servos)
    }
}

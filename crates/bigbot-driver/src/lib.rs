//! 驱动层模块
//!
//! 本模块在硬件抽象层之上提供机器人的硬件协作者，包括：
//! - 差速底盘运动（开环，按标定估算耗时）
//! - 舵机组控制（按角度差估算耗时）
//! - 超声波避障（阈值 + 边沿检测）
//! - 启动拉线、分数显示
//! - 可暂停/恢复的倒计时与调度线程
//!
//! # 使用场景
//!
//! 状态机（`bigbot-fsm`）通过 [`Robot`] 访问所有硬件，
//! 通过 [`TimerService`] 为有时长的命令计时。

mod builder;
mod display;
mod error;
pub mod motion;
mod robot;
pub mod servo;
mod start_switch;
pub mod timer;
pub mod ultrasonic;

#[cfg(feature = "mock")]
pub use builder::SimProbes;
pub use builder::RobotBuilder;
pub use display::ScoreBoard;
pub use error::DriverError;
pub use motion::{MotionKind, MotorsControl};
pub use robot::Robot;
pub use servo::{SERVO_CHANNELS, ServoControl, ServoGroup};
pub use start_switch::StartSwitchReader;
pub use timer::{Countdown, CountdownPhase, TimerExpired, TimerService, TimerToken};
pub use ultrasonic::{UltrasonicController, UsEvent, UsPosition, UsPositions};

//! # BigBot Tools - 共享配置和数据结构
//!
//! **依赖原则**: 位于依赖图底部，不依赖任何其他 bigbot crate
//!
//! ## 包含模块
//!
//! - `config` - 机器人配置（TOML，全部字段带默认值）
//! - `color` - 队伍颜色

pub mod color;
pub mod config;

pub use color::TeamColor;
pub use config::{
    ConfigError, MatchConfig, MotionConfig, ObstacleConfig, RobotConfig, ServoConfig,
};

//! # 机器人配置
//!
//! 比赛时长、运动标定、避障阈值和舵机速度模型。
//!
//! 所有字段都有默认值，配置文件只需写出要覆盖的字段：
//!
//! ```toml
//! [match]
//! duration_s = 90.0
//!
//! [obstacle]
//! threshold_cm = 25.0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config value: {field} = {value} ({reason})")]
    InvalidValue {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// 机器人配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotConfig {
    /// 比赛设置
    #[serde(rename = "match")]
    pub match_: MatchConfig,

    /// 运动标定
    pub motion: MotionConfig,

    /// 避障设置
    pub obstacle: ObstacleConfig,

    /// 舵机速度模型
    pub servo: ServoConfig,
}

impl RobotConfig {
    /// 从 TOML 文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析配置并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RobotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 校验数值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        seconds("match.duration_s", self.match_.duration_s)?;
        positive("match.tick_ms", self.match_.tick_ms as f64)?;
        positive("motion.full_speed_cm_per_s", self.motion.full_speed_cm_per_s)?;
        positive(
            "motion.full_speed_deg_per_s",
            self.motion.full_speed_deg_per_s,
        )?;
        positive("motion.quarter_turn_degrees", self.motion.quarter_turn_degrees)?;
        positive("obstacle.threshold_cm", self.obstacle.threshold_cm)?;
        non_negative("obstacle.clear_margin_cm", self.obstacle.clear_margin_cm)?;
        seconds("obstacle.max_blocked_s", self.obstacle.max_blocked_s)?;
        positive("servo.degrees_per_second", self.servo.degrees_per_second)?;
        non_negative("servo.min_move_s", self.servo.min_move_s)?;
        if Duration::try_from_secs_f64(self.servo.min_move_s).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "servo.min_move_s",
                value: self.servo.min_move_s,
                reason: "too large for a duration",
            });
        }

        let speed = self.motion.default_speed;
        if !(speed > 0.0 && speed <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "motion.default_speed",
                value: speed,
                reason: "must be in (0, 1]",
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be positive",
        })
    }
}

/// 正数且能表示为 `Duration` 的秒数
fn seconds(field: &'static str, value: f64) -> Result<(), ConfigError> {
    positive(field, value)?;
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "too large for a duration",
        });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must not be negative",
        })
    }
}

/// 比赛设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    /// 比赛时长（秒）
    pub duration_s: f64,
    /// 主循环周期（毫秒）
    pub tick_ms: u64,
    /// 是否等待启动拉线；为 false 时第一次 `update()` 即开赛
    pub wait_for_start_switch: bool,
    /// 未在命令行指定时显示的预期得分
    pub default_score: u32,
}

impl MatchConfig {
    /// 比赛时长，`duration_s` 须已通过 [`RobotConfig::validate`]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_s)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            duration_s: 100.0,
            tick_ms: 10,
            wait_for_start_switch: true,
            default_score: 0,
        }
    }
}

/// 运动标定
///
/// 电机开环控制：满占空比下的线速度/角速度，按 `speed` 线性缩放。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotionConfig {
    /// 满速直线速度（cm/s）
    pub full_speed_cm_per_s: f64,
    /// 满速原地旋转角速度（°/s）
    pub full_speed_deg_per_s: f64,
    /// 序列中使用的默认速度（0, 1]
    pub default_speed: f64,
    /// 实测"直角转弯"需要下发的角度（轮子打滑，略大于 90°）
    pub quarter_turn_degrees: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            full_speed_cm_per_s: 20.0,
            full_speed_deg_per_s: 180.0,
            default_speed: 0.5,
            quarter_turn_degrees: 100.0,
        }
    }
}

/// 避障设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObstacleConfig {
    /// 小于该距离视为障碍（cm）
    pub threshold_cm: f64,
    /// 解除障碍需要额外超出的距离（cm），防止阈值附近抖动
    pub clear_margin_cm: f64,
    /// 被阻挡超过该时长后告警（秒）
    pub max_blocked_s: f64,
}

impl ObstacleConfig {
    pub fn max_blocked(&self) -> Duration {
        Duration::from_secs_f64(self.max_blocked_s)
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            threshold_cm: 20.0,
            clear_margin_cm: 3.0,
            max_blocked_s: 10.0,
        }
    }
}

/// 舵机速度模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServoConfig {
    /// 舵机转动速度（°/s）
    pub degrees_per_second: f64,
    /// 最短动作时间（秒）
    pub min_move_s: f64,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            degrees_per_second: 100.0,
            min_move_s: 0.1,
        }
    }
}

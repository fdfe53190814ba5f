//! # BigBot Hardware Abstraction Layer
//!
//! 硬件抽象层，提供统一的执行器/传感器接口抽象。
//!
//! 上层（`bigbot-driver`）只通过这里定义的窄接口访问硬件：
//!
//! - [`MotorDriver`]: 左右轮差速电机
//! - [`ServoDriver`]: 多通道舵机板
//! - [`RangeSensor`]: 单个超声波测距传感器
//! - [`StartSwitch`]: 比赛启动拉线（舌簧开关）
//! - [`ScoreDisplay`]: 分数显示屏
//!
//! 启用 `mock` feature 后，[`mock`] 模块提供纯内存实现，用于测试和无硬件演示。

use thiserror::Error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// 硬件层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device not available: {0}")]
    Unavailable(String),
    #[error("Invalid channel: {channel} (device has {count})")]
    InvalidChannel { channel: usize, count: usize },
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    #[error("Device fault: {0}")]
    Fault(String),
}

impl HalError {
    /// 是否为致命错误（设备不可用，重试无意义）
    pub fn is_fatal(&self) -> bool {
        matches!(self, HalError::Unavailable(_))
    }
}

/// 差速电机驱动
///
/// `left` / `right` 为归一化占空比，范围 `[-1.0, 1.0]`，负值表示反转。
pub trait MotorDriver: Send {
    fn drive(&mut self, left: f64, right: f64) -> Result<(), HalError>;

    /// 刹车（默认实现：两侧占空比置零）
    fn brake(&mut self) -> Result<(), HalError> {
        self.drive(0.0, 0.0)
    }
}

/// 多通道舵机驱动
pub trait ServoDriver: Send {
    /// 可用通道数量
    fn channel_count(&self) -> usize;

    /// 设置通道角度（度）；`None` 表示释放该通道（停止输出 PWM）
    fn set_angle(&mut self, channel: usize, angle: Option<f64>) -> Result<(), HalError>;
}

/// 超声波测距传感器
pub trait RangeSensor: Send {
    /// 读取距离（厘米）；`Ok(None)` 表示没有回波（超出量程）
    fn distance_cm(&mut self) -> Result<Option<f64>, HalError>;
}

/// 比赛启动开关
pub trait StartSwitch: Send {
    fn is_closed(&mut self) -> Result<bool, HalError>;
}

/// 分数显示屏
pub trait ScoreDisplay: Send {
    fn clear(&mut self) -> Result<(), HalError>;
    fn write_line(&mut self, row: u8, text: &str) -> Result<(), HalError>;
}

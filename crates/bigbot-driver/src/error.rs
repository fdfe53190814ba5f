//! 驱动层错误类型定义

use bigbot_hal::HalError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 硬件错误
    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),

    /// 定时器调度线程启动失败
    #[error("Failed to spawn timer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// 无效输入（如速度越界、角度数量不匹配）
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 构建 Robot 时缺少必需的设备
    #[error("Missing device: {0}")]
    MissingDevice(&'static str),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use bigbot_hal::HalError;

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Hal(HalError::Fault("stall".to_string()));
        let msg = format!("{}", err);
        assert!(msg.contains("Hardware error"), "Hal error message: {}", msg);
        assert!(msg.contains("stall"));

        let err = DriverError::InvalidInput("speed 1.5".to_string());
        assert_eq!(format!("{}", err), "Invalid input: speed 1.5");

        let err = DriverError::MissingDevice("motors");
        assert_eq!(format!("{}", err), "Missing device: motors");
    }

    #[test]
    fn test_from_hal_error() {
        let err: DriverError = HalError::Unavailable("servo board".to_string()).into();
        assert!(matches!(err, DriverError::Hal(HalError::Unavailable(_))));
    }
}

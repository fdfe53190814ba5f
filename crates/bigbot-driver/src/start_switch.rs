//! 比赛启动拉线
//!
//! 与开关的具体电平无关：记录基准读数，读数发生变化即视为触发。

use crate::error::DriverError;
use bigbot_hal::StartSwitch;
use tracing::info;

pub struct StartSwitchReader {
    switch: Box<dyn StartSwitch>,
    baseline: Option<bool>,
}

impl StartSwitchReader {
    pub fn new(switch: Box<dyn StartSwitch>) -> Self {
        Self {
            switch,
            baseline: None,
        }
    }

    pub fn read(&mut self) -> Result<bool, DriverError> {
        Ok(self.switch.is_closed()?)
    }

    /// 以当前读数作为基准
    pub fn arm(&mut self) -> Result<(), DriverError> {
        self.baseline = Some(self.read()?);
        Ok(())
    }

    /// 读数是否已偏离基准；尚未设置基准时先设置并返回 `false`
    pub fn triggered(&mut self) -> Result<bool, DriverError> {
        let value = self.read()?;
        match self.baseline {
            Some(baseline) if baseline != value => {
                info!("Start switch triggered");
                Ok(true)
            },
            Some(_) => Ok(false),
            None => {
                self.baseline = Some(value);
                Ok(false)
            },
        }
    }
}

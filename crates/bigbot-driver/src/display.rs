//! 分数显示

use crate::error::DriverError;
use bigbot_hal::ScoreDisplay;
use tracing::debug;

pub struct ScoreBoard {
    display: Box<dyn ScoreDisplay>,
}

impl ScoreBoard {
    pub fn new(display: Box<dyn ScoreDisplay>) -> Self {
        Self { display }
    }

    /// 清屏后显示预期得分
    pub fn show_score(&mut self, score: u32) -> Result<(), DriverError> {
        self.display.clear()?;
        self.display.write_line(0, &format!("Score: {}", score))?;
        debug!("Display shows score {}", score);
        Ok(())
    }

    pub fn show_message(&mut self, text: &str) -> Result<(), DriverError> {
        self.display.clear()?;
        self.display.write_line(0, text)?;
        Ok(())
    }
}

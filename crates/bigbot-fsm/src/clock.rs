//! 比赛计时

use std::time::{Duration, Instant};

/// 比赛时钟
///
/// 拉线触发后开始计时，超过比赛时长即视为比赛结束。
#[derive(Debug, Clone)]
pub struct MatchClock {
    started_at: Option<Instant>,
    duration: Duration,
}

impl MatchClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            started_at: None,
            duration,
        }
    }

    /// 开始计时；已开始时为空操作
    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// 比赛已进行的时间；未开始时为零
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.duration.saturating_sub(self.elapsed_at(now))
    }

    /// 是否已超过比赛时长
    pub fn is_over_at(&self, now: Instant) -> bool {
        self.is_started() && self.elapsed_at(now) >= self.duration
    }
}
